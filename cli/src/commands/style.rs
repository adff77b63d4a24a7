use anyhow::{Context, Result, bail};

use chartbook_core::customization::{ChartCustomization, Color};
use chartbook_core::service::ChartbookService;

/// Settings given on the command line; `None` keeps the stored value.
pub(crate) struct StyleChanges {
    pub point_size: Option<f64>,
    pub point_color: Option<String>,
    pub show_points: Option<bool>,
    pub show_line: Option<bool>,
    pub line_color: Option<String>,
    pub line_width: Option<f64>,
}

impl StyleChanges {
    fn apply(&self, settings: &mut ChartCustomization) -> Result<()> {
        if let Some(size) = self.point_size {
            settings.point_size = positive("Point size", size)?;
        }
        if let Some(ref hex) = self.point_color {
            settings.point_color = parse_color(hex)?;
        }
        if let Some(show) = self.show_points {
            settings.show_points = show;
        }
        if let Some(show) = self.show_line {
            settings.show_line = show;
        }
        if let Some(ref hex) = self.line_color {
            settings.line_color = parse_color(hex)?;
        }
        if let Some(width) = self.line_width {
            settings.line_width = positive("Line width", width)?;
        }
        Ok(())
    }
}

fn positive(what: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{what} must be greater than 0");
    }
    Ok(value)
}

fn parse_color(hex: &str) -> Result<Color> {
    Color::from_hex(hex).with_context(|| format!("Invalid color '{hex}'. Use RRGGBB hex"))
}

fn print_settings(measurement_type: &str, settings: &ChartCustomization) {
    let on_off = |b: bool| if b { "on" } else { "off" };
    println!("Chart style for {measurement_type}:\n");
    println!(
        "  Points: {} (size {}, #{})",
        on_off(settings.show_points),
        settings.point_size,
        settings.point_color.to_hex()
    );
    println!(
        "  Line:   {} (width {}, #{})",
        on_off(settings.show_line),
        settings.line_width,
        settings.line_color.to_hex()
    );
}

pub(crate) fn cmd_style_show(
    service: &ChartbookService,
    measurement_type: &str,
    json: bool,
) -> Result<()> {
    let settings = service.get_customization(measurement_type)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(measurement_type, &settings);
    }
    Ok(())
}

pub(crate) fn cmd_style_set(
    service: &ChartbookService,
    measurement_type: &str,
    changes: &StyleChanges,
    json: bool,
) -> Result<()> {
    let mut settings = service.get_customization(measurement_type)?;
    changes.apply(&mut settings)?;
    service.set_customization(measurement_type, &settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(measurement_type, &settings);
    }
    Ok(())
}
