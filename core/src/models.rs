use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::customization::Color;

/// Name of the type whose readings feed the glucose side of the GKI.
pub const GLUCOSE_TYPE_NAME: &str = "Glucose";
/// Name of the type whose readings feed the ketones side of the GKI.
pub const KETONES_TYPE_NAME: &str = "Ketones";

pub const DEFAULT_TYPE_COLOR_HEX: &str = "007AFF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementType {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub unit: String,
    pub color_hex: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub emoji: Option<String>,
    pub is_system_type: bool,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub value: f64,
    pub timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    // Joined type, absent when the reference no longer resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<MeasurementType>,
}

impl Measurement {
    #[must_use]
    pub fn type_id(&self) -> Option<i64> {
        self.measurement_type.as_ref().map(|t| t.id)
    }

    #[must_use]
    pub fn belongs_to(&self, type_id: i64) -> bool {
        self.type_id() == Some(type_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurementType {
    pub name: String,
    pub unit: String,
    pub color_hex: String,
    pub emoji: Option<String>,
    pub is_system_type: bool,
}

impl NewMeasurementType {
    #[must_use]
    pub fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            color_hex: DEFAULT_TYPE_COLOR_HEX.to_string(),
            emoji: None,
            is_system_type: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurement {
    pub type_id: i64,
    pub value: f64,
    pub timestamp: DateTime<Local>,
    pub notes: Option<String>,
}

/// The types every fresh store starts with.
#[must_use]
pub fn default_measurement_types() -> Vec<NewMeasurementType> {
    let system = |name: &str, unit: &str, color: &str, emoji: &str| NewMeasurementType {
        name: name.to_string(),
        unit: unit.to_string(),
        color_hex: color.to_string(),
        emoji: Some(emoji.to_string()),
        is_system_type: true,
    };
    vec![
        system(GLUCOSE_TYPE_NAME, "mg/dL", "FF6B6B", "🩸"),
        system(KETONES_TYPE_NAME, "mmol/L", "4ECDC4", "🔥"),
        system("Weight", "Lbs", "95E1D3", "⚖️"),
    ]
}

pub fn validate_measurement_type(new_type: &NewMeasurementType) -> Result<()> {
    if new_type.name.trim().is_empty() {
        bail!("Measurement type name must not be empty");
    }
    if new_type.unit.trim().is_empty() {
        bail!("Measurement type unit must not be empty");
    }
    if Color::from_hex(&new_type.color_hex).is_none() {
        bail!(
            "Invalid color '{}'. Use 6 (RRGGBB) or 8 (AARRGGBB) hex digits",
            new_type.color_hex
        );
    }
    Ok(())
}

/// Parse a user-typed reading. Anything that is not a plain number is rejected.
pub fn parse_measurement_value(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid value '{raw}'. Enter a number like '95.5'"))?;
    if !value.is_finite() {
        bail!("Value must be a finite number");
    }
    Ok(value)
}

/// Empty notes are stored as absent, never as an empty string.
#[must_use]
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_type() -> MeasurementType {
        MeasurementType {
            id: 3,
            uuid: "abc".to_string(),
            name: "Weight".to_string(),
            unit: "Lbs".to_string(),
            color_hex: "95E1D3".to_string(),
            emoji: None,
            is_system_type: false,
            created_at: Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_default_types_are_system_types() {
        let defaults = default_measurement_types();
        let names: Vec<&str> = defaults.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Glucose", "Ketones", "Weight"]);
        assert!(defaults.iter().all(|t| t.is_system_type));
        assert!(defaults.iter().all(|t| validate_measurement_type(t).is_ok()));
    }

    #[test]
    fn test_validate_type_empty_name() {
        let t = NewMeasurementType::new("  ", "kg");
        let err = validate_measurement_type(&t).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_validate_type_empty_unit() {
        let t = NewMeasurementType::new("Steps", "");
        assert!(validate_measurement_type(&t).is_err());
    }

    #[test]
    fn test_validate_type_color() {
        let mut t = NewMeasurementType::new("Steps", "count");
        t.color_hex = "#FF6B6B".to_string();
        assert!(validate_measurement_type(&t).is_ok());
        t.color_hex = "FFF".to_string();
        assert!(validate_measurement_type(&t).is_err());
    }

    #[test]
    fn test_parse_measurement_value() {
        assert!((parse_measurement_value("95.5").unwrap() - 95.5).abs() < f64::EPSILON);
        assert!((parse_measurement_value(" 12 ").unwrap() - 12.0).abs() < f64::EPSILON);
        assert!(parse_measurement_value("abc").is_err());
        assert!(parse_measurement_value("").is_err());
        assert!(parse_measurement_value("inf").is_err());
    }

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(Some(String::new())), None);
        assert_eq!(normalize_notes(None), None);
        assert_eq!(
            normalize_notes(Some("fasting".to_string())).as_deref(),
            Some("fasting")
        );
    }

    #[test]
    fn test_measurement_type_reference() {
        let mut m = Measurement {
            id: 1,
            uuid: String::new(),
            value: 180.0,
            timestamp: Local.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
            notes: None,
            measurement_type: Some(sample_type()),
        };
        assert_eq!(m.type_id(), Some(3));
        assert!(m.belongs_to(3));
        assert!(!m.belongs_to(4));

        m.measurement_type = None;
        assert_eq!(m.type_id(), None);
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("measurement_type").is_none());
        assert!(json.get("notes").is_none());
    }
}
