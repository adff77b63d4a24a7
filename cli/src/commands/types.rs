use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use chartbook_core::models::NewMeasurementType;
use chartbook_core::service::ChartbookService;

pub(crate) fn cmd_type_add(
    service: &ChartbookService,
    name: &str,
    unit: &str,
    color: &str,
    emoji: Option<String>,
    json: bool,
) -> Result<()> {
    let created = service.add_measurement_type(&NewMeasurementType {
        name: name.trim().to_string(),
        unit: unit.trim().to_string(),
        color_hex: color.trim_start_matches('#').to_uppercase(),
        emoji: emoji.filter(|e| !e.is_empty()),
        is_system_type: false,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!(
            "Added type '{}' ({}) [id {}]",
            created.name, created.unit, created.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_type_list(service: &ChartbookService, json: bool) -> Result<()> {
    let types = service.list_measurement_types()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }
    if types.is_empty() {
        eprintln!("No measurement types. Use `chartbook seed` or `chartbook type add`.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TypeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "")]
        emoji: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Color")]
        color: String,
        #[tabled(rename = "System")]
        system: String,
    }

    let rows: Vec<TypeRow> = types
        .iter()
        .map(|t| TypeRow {
            id: t.id,
            emoji: t.emoji.clone().unwrap_or_default(),
            name: t.name.clone(),
            unit: t.unit.clone(),
            color: format!("#{}", t.color_hex),
            system: if t.is_system_type { "yes" } else { "" }.to_string(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_type_delete(service: &ChartbookService, name: &str, json: bool) -> Result<()> {
    let measurement_type = service.find_measurement_type(name)?;
    if !service.delete_measurement_type(measurement_type.id)? {
        bail!("Measurement type '{name}' not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": measurement_type.id }));
    } else {
        println!("Deleted type '{name}' and its measurements");
    }
    Ok(())
}

pub(crate) fn cmd_seed(service: &ChartbookService, json: bool) -> Result<()> {
    let created = service.seed_default_types()?;

    if json {
        println!("{}", serde_json::json!({ "created": created }));
    } else if created == 0 {
        println!("Measurement types already exist, nothing seeded");
    } else {
        println!("Created {created} default measurement types");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_add_normalizes_color() {
        let service = ChartbookService::new_in_memory().unwrap();
        cmd_type_add(&service, " Steps ", "count", "#ff9500", None, true).unwrap();
        let steps = service.find_measurement_type("Steps").unwrap();
        assert_eq!(steps.color_hex, "FF9500");
        assert!(!steps.is_system_type);
    }

    #[test]
    fn test_type_add_rejects_bad_color() {
        let service = ChartbookService::new_in_memory().unwrap();
        assert!(cmd_type_add(&service, "Steps", "count", "orange", None, false).is_err());
    }

    #[test]
    fn test_type_delete() {
        let service = ChartbookService::new_in_memory().unwrap();
        cmd_type_delete(&service, "Weight", true).unwrap();
        assert!(service.find_measurement_type("Weight").is_err());
        assert!(cmd_type_delete(&service, "Weight", true).is_err());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let service = ChartbookService::new_in_memory().unwrap();
        cmd_seed(&service, true).unwrap();
        assert_eq!(service.list_measurement_types().unwrap().len(), 3);
    }
}
