use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use chartbook_core::gki::GkiPoint;
use chartbook_core::service::ChartbookService;

use super::helpers::{format_timestamp, parse_timestamp, resolve_window};

#[derive(Serialize)]
struct GkiEntry<'a> {
    #[serde(flatten)]
    point: &'a GkiPoint,
    band: &'static str,
}

pub(crate) fn cmd_gki(
    service: &ChartbookService,
    range: &str,
    from: Option<String>,
    to: Option<String>,
    at: Option<String>,
    json: bool,
) -> Result<()> {
    let window = resolve_window(range, from, to)?;
    let points: Vec<GkiPoint> = match at {
        Some(at) => {
            let at = parse_timestamp(Some(at))?;
            service.gki_point_near(&window, at)?.into_iter().collect()
        }
        None => service.gki_series(&window)?,
    };

    if json {
        let entries: Vec<GkiEntry> = points
            .iter()
            .map(|point| GkiEntry {
                point,
                band: point.band().label(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if points.is_empty() {
        eprintln!(
            "No GKI data. Log Glucose and Ketones readings on the same day to see the index."
        );
        return Ok(());
    }

    #[derive(Tabled)]
    struct GkiRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "GKI")]
        gki: String,
        #[tabled(rename = "Band")]
        band: String,
    }

    let rows: Vec<GkiRow> = points
        .iter()
        .map(|p| GkiRow {
            time: format_timestamp(&p.timestamp),
            gki: format!("{:.2}", p.gki),
            band: p.band().to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
