//! Glucose-Ketone Index derived from same-day glucose and ketone readings.
//!
//! GKI = glucose (mg/dL) / (ketones (mmol/L) * 18)

use std::fmt;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::date_range::DateWindow;
use crate::models::{GLUCOSE_TYPE_NAME, KETONES_TYPE_NAME, Measurement, MeasurementType};

/// mg/dL per mmol/L of glucose.
pub const GLUCOSE_MMOL_FACTOR: f64 = 18.0;
pub const MAX_GKI: f64 = 9.0;

/// Which measurement types play the glucose and ketone roles.
#[derive(Debug, Clone, PartialEq)]
pub struct GkiConfig {
    pub glucose_type: String,
    pub ketones_type: String,
    pub max_index: f64,
}

impl Default for GkiConfig {
    fn default() -> Self {
        Self {
            glucose_type: GLUCOSE_TYPE_NAME.to_string(),
            ketones_type: KETONES_TYPE_NAME.to_string(),
            max_index: MAX_GKI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GkiPoint {
    /// Timestamp of the glucose reading the point was derived from.
    pub timestamp: DateTime<Local>,
    pub gki: f64,
}

impl GkiPoint {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    #[must_use]
    pub fn band(&self) -> GkiBand {
        GkiBand::classify(self.gki)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GkiBand {
    /// 0.5 to 1.0
    Therapeutic,
    /// above 1.0 to 3.0
    High,
    /// above 3.0 to 6.0
    Moderate,
    /// above 6.0 to 9.0
    Low,
    Other,
}

impl GkiBand {
    #[must_use]
    pub fn classify(gki: f64) -> Self {
        if (0.5..=1.0).contains(&gki) {
            Self::Therapeutic
        } else if gki > 1.0 && gki <= 3.0 {
            Self::High
        } else if gki > 3.0 && gki <= 6.0 {
            Self::Moderate
        } else if gki > 6.0 && gki <= 9.0 {
            Self::Low
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Therapeutic => "Therapeutic ketosis",
            Self::High => "High ketosis",
            Self::Moderate => "Moderate ketosis",
            Self::Low => "Low ketosis",
            Self::Other => "Out of range",
        }
    }
}

impl fmt::Display for GkiBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A zero ketone reading gives `inf` (or `NaN` for 0/0); neither survives
/// the upper bound in [`compute_gki`].
#[must_use]
pub fn glucose_ketone_index(glucose: f64, ketones: f64) -> f64 {
    glucose / (ketones * GLUCOSE_MMOL_FACTOR)
}

/// Derive the GKI series for the readings inside `window`.
///
/// Each glucose reading pairs with the first ketone reading (in input order)
/// from the same local calendar day. Points above the configured maximum are
/// dropped, and the result is ordered by glucose timestamp.
#[must_use]
pub fn compute_gki(
    measurements: &[Measurement],
    types: &[MeasurementType],
    window: &DateWindow,
    config: &GkiConfig,
) -> Vec<GkiPoint> {
    let find_type = |name: &str| types.iter().find(|t| t.name == name).map(|t| t.id);
    let (Some(glucose_id), Some(ketones_id)) = (
        find_type(&config.glucose_type),
        find_type(&config.ketones_type),
    ) else {
        tracing::debug!("glucose or ketones type missing, no GKI series");
        return Vec::new();
    };

    let in_window = window.filter(measurements);
    let ketones: Vec<&Measurement> = in_window
        .iter()
        .copied()
        .filter(|m| m.belongs_to(ketones_id))
        .collect();

    let mut points: Vec<GkiPoint> = in_window
        .iter()
        .filter(|m| m.belongs_to(glucose_id))
        .filter_map(|glucose| {
            let day = glucose.timestamp.date_naive();
            let ketone = ketones.iter().find(|k| k.timestamp.date_naive() == day)?;
            let gki = glucose_ketone_index(glucose.value, ketone.value);
            (gki <= config.max_index).then_some(GkiPoint {
                timestamp: glucose.timestamp,
                gki,
            })
        })
        .collect();

    points.sort_by_key(|p| p.timestamp);
    tracing::debug!(points = points.len(), "computed GKI series");
    points
}
