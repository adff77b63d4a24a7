//! Per-type chart styling and the hex color format it is persisted in.
//!
//! A type without a stored record renders with [`ChartCustomization::default`].
//! Saving always writes all six settings; callers round-trip the value they
//! got from [`customization_for`] and change the fields they care about.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::RecordStore;

/// An RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self::from_argb8(0xFF, red, green, blue)
    }

    #[must_use]
    pub fn from_argb8(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: f64::from(red) / 255.0,
            green: f64::from(green) / 255.0,
            blue: f64::from(blue) / 255.0,
            alpha: f64::from(alpha) / 255.0,
        }
    }

    /// Parse `RRGGBB` (opaque) or `AARRGGBB`, with or without a leading `#`.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let int = u32::from_str_radix(hex, 16).ok()?;
        let [a, r, g, b] = int.to_be_bytes();
        match hex.len() {
            6 => Some(Self::from_rgb8(r, g, b)),
            8 => Some(Self::from_argb8(a, r, g, b)),
            _ => None,
        }
    }

    /// Format as six uppercase hex digits. Alpha is dropped.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!(
            "{:02X}{:02X}{:02X}",
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue)
        )
    }
}

#[allow(clippy::cast_sign_loss)]
fn channel_to_u8(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[must_use]
pub fn default_chart_color() -> Color {
    Color::from_rgb8(0x00, 0x7A, 0xFF)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartCustomization {
    pub point_size: f64,
    pub point_color: Color,
    pub show_points: bool,
    pub show_line: bool,
    pub line_color: Color,
    pub line_width: f64,
}

impl Default for ChartCustomization {
    fn default() -> Self {
        Self {
            point_size: 8.0,
            point_color: default_chart_color(),
            show_points: true,
            show_line: true,
            line_color: default_chart_color(),
            line_width: 2.0,
        }
    }
}

/// Persisted form of a [`ChartCustomization`], one per measurement type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationRecord {
    pub type_id: i64,
    pub point_size: f64,
    pub point_color_hex: String,
    pub show_points: bool,
    pub show_line: bool,
    pub line_color_hex: String,
    pub line_width: f64,
}

impl CustomizationRecord {
    #[must_use]
    pub fn from_settings(type_id: i64, settings: &ChartCustomization) -> Self {
        Self {
            type_id,
            point_size: settings.point_size,
            point_color_hex: settings.point_color.to_hex(),
            show_points: settings.show_points,
            show_line: settings.show_line,
            line_color_hex: settings.line_color.to_hex(),
            line_width: settings.line_width,
        }
    }

    /// Unparseable stored colors fall back to the default chart color.
    #[must_use]
    pub fn to_settings(&self) -> ChartCustomization {
        ChartCustomization {
            point_size: self.point_size,
            point_color: Color::from_hex(&self.point_color_hex).unwrap_or_else(default_chart_color),
            show_points: self.show_points,
            show_line: self.show_line,
            line_color: Color::from_hex(&self.line_color_hex).unwrap_or_else(default_chart_color),
            line_width: self.line_width,
        }
    }
}

pub fn customization_for<S: RecordStore + ?Sized>(
    store: &S,
    type_id: i64,
) -> Result<ChartCustomization> {
    Ok(store
        .get_customization(type_id)?
        .map(|record| record.to_settings())
        .unwrap_or_default())
}

pub fn save_customization<S: RecordStore + ?Sized>(
    store: &S,
    type_id: i64,
    settings: &ChartCustomization,
) -> Result<()> {
    store.upsert_customization(&CustomizationRecord::from_settings(type_id, settings))?;
    tracing::debug!(type_id, "saved chart customization");
    Ok(())
}
