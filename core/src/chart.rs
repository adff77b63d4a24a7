//! Data preparation for the chart views: per-type series, the shared scale
//! used when two types are drawn on one chart, and tap selection.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::date_range::DateWindow;
use crate::gki::GkiPoint;
use crate::models::Measurement;

/// Headroom added above and below the data on each merged-chart axis.
pub const AXIS_PADDING: f64 = 10.0;
/// Merged charts plot both series on a shared `0..=100` scale.
pub const NORMALIZED_MAX: f64 = 100.0;

/// Readings of one type inside `window`, oldest first.
#[must_use]
pub fn series_for_type<'a>(
    measurements: &'a [Measurement],
    type_id: i64,
    window: &DateWindow,
) -> Vec<&'a Measurement> {
    let mut series: Vec<&Measurement> = window
        .filter(measurements)
        .into_iter()
        .filter(|m| m.belongs_to(type_id))
        .collect();
    series.sort_by_key(|m| m.timestamp);
    series
}

/// Value range of one axis on a merged chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Span of `values` widened by [`AXIS_PADDING`] on both sides. An empty
    /// series spans `0..=100` before padding.
    #[must_use]
    pub fn padded<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let (min, max) = values
            .into_iter()
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, NORMALIZED_MAX));
        Self {
            min: min - AXIS_PADDING,
            max: max + AXIS_PADDING,
        }
    }

    /// Map `value` onto the shared scale. A degenerate range puts every value
    /// in the middle.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return NORMALIZED_MAX / 2.0;
        }
        (value - self.min) / (self.max - self.min) * NORMALIZED_MAX
    }

    #[must_use]
    pub fn denormalize(&self, normalized: f64) -> f64 {
        normalized / NORMALIZED_MAX * (self.max - self.min) + self.min
    }
}

/// The point closest in time to `at`, as picked by a tap on the chart.
#[must_use]
pub fn nearest_point(points: &[GkiPoint], at: DateTime<Local>) -> Option<&GkiPoint> {
    points
        .iter()
        .min_by_key(|p| (p.timestamp - at).num_milliseconds().unsigned_abs())
}
