use anyhow::Result;

use chartbook_core::service::ChartbookService;

use super::helpers::{
    format_timestamp, json_error, parse_timestamp, print_measurement_table, resolve_window,
};

pub(crate) fn cmd_log(
    service: &ChartbookService,
    measurement_type: &str,
    value: &str,
    at: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let timestamp = parse_timestamp(at)?;
    let logged = service.log_measurement(measurement_type, value, timestamp, notes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logged)?);
    } else {
        let unit = logged
            .measurement_type
            .as_ref()
            .map(|t| t.unit.as_str())
            .unwrap_or_default();
        println!(
            "Logged {measurement_type} {} {unit} at {} [id {}]",
            logged.value,
            format_timestamp(&logged.timestamp),
            logged.id
        );
        if let Some(ref n) = logged.notes {
            println!("  Notes: {n}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_list(
    service: &ChartbookService,
    measurement_type: Option<&str>,
    range: &str,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let window = resolve_window(range, from, to)?;
    let measurements = service.list_measurements(measurement_type, &window)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&measurements)?);
    } else if measurements.is_empty() {
        eprintln!("No measurements in this range. Use `chartbook log` to record one.");
    } else {
        print_measurement_table(&measurements);
        if let Some(name) = measurement_type {
            let axis = service.chart_axis(name, &window)?;
            println!("Chart axis: {:.1} to {:.1}", axis.min, axis.max);
        }
    }
    Ok(())
}

pub(crate) fn cmd_delete(service: &ChartbookService, id: i64, json: bool) -> Result<()> {
    match service.delete_measurement(id) {
        Ok(()) if json => println!("{}", serde_json::json!({ "deleted": id })),
        Ok(()) => println!("Deleted measurement {id}"),
        Err(e) if json => println!("{}", json_error(&format!("{e:#}"))),
        Err(e) => return Err(e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartbook_core::date_range::DateWindow;
    use chrono::Local;

    #[test]
    fn test_log_then_list() {
        let service = ChartbookService::new_in_memory().unwrap();
        cmd_log(
            &service,
            "Glucose",
            "92",
            Some("2024-03-01 07:45".to_string()),
            Some("fasting".to_string()),
            true,
        )
        .unwrap();
        cmd_list(&service, Some("Glucose"), "all", None, None, false).unwrap();

        let all = service
            .list_measurements(None, &DateWindow::unbounded(Local::now()))
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].notes.as_deref(), Some("fasting"));
    }

    #[test]
    fn test_log_rejects_unknown_type() {
        let service = ChartbookService::new_in_memory().unwrap();
        assert!(cmd_log(&service, "Steps", "100", None, None, false).is_err());
    }

    #[test]
    fn test_delete_missing_reports_json_error() {
        let service = ChartbookService::new_in_memory().unwrap();
        assert!(cmd_delete(&service, 42, true).is_ok());
        assert!(cmd_delete(&service, 42, false).is_err());
    }
}
