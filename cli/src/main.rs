mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::commands::{
    StyleChanges, cmd_delete, cmd_export, cmd_gki, cmd_import, cmd_list, cmd_log, cmd_seed,
    cmd_style_set, cmd_style_show, cmd_type_add, cmd_type_delete, cmd_type_list,
};
use crate::config::Config;
use chartbook_core::service::ChartbookService;

#[derive(Parser)]
#[command(
    name = "chartbook",
    version,
    about = "Track health measurements and chart them over time"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage measurement types
    Type {
        #[command(subcommand)]
        command: TypeCommands,
    },
    /// Log a measurement
    Log {
        /// Measurement type name (e.g. "Glucose")
        measurement_type: String,
        /// Value in the type's unit
        value: String,
        /// When it was taken (YYYY-MM-DD HH:MM[:SS], YYYY-MM-DD, today, yesterday; default: now)
        #[arg(long)]
        at: Option<String>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List measurements
    List {
        /// Only show this measurement type
        #[arg(short = 't', long = "type")]
        measurement_type: Option<String>,
        /// Date range: 7d, 30d, 90d, custom, all
        #[arg(short, long, default_value = "all")]
        range: String,
        /// Custom range start (YYYY-MM-DD). Implies --range custom.
        #[arg(long)]
        from: Option<String>,
        /// Custom range end (YYYY-MM-DD). Implies --range custom.
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a measurement by ID
    Delete {
        /// Measurement ID to delete
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all measurements to CSV
    Export {
        /// Output file (default: ChartAnything_Export_<date>.csv in the current directory)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import measurements from a CSV export
    Import {
        /// Path to the CSV file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the glucose-ketone index series
    Gki {
        /// Date range: 7d, 30d, 90d, custom, all
        #[arg(short, long, default_value = "all")]
        range: String,
        /// Custom range start (YYYY-MM-DD). Implies --range custom.
        #[arg(long)]
        from: Option<String>,
        /// Custom range end (YYYY-MM-DD). Implies --range custom.
        #[arg(long)]
        to: Option<String>,
        /// Only show the point closest to this time (YYYY-MM-DD HH:MM[:SS])
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change how a measurement type is charted
    Style {
        #[command(subcommand)]
        command: StyleCommands,
    },
    /// Create the default measurement types if none exist
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TypeCommands {
    /// Add a measurement type
    Add {
        /// Type name
        name: String,
        /// Unit label (e.g. "mg/dL")
        unit: String,
        /// Chart color as RRGGBB hex
        #[arg(long, default_value = "007AFF")]
        color: String,
        /// Emoji shown next to the name
        #[arg(long)]
        emoji: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List measurement types
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a measurement type and all of its measurements
    Delete {
        /// Type name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StyleCommands {
    /// Show chart settings for a type
    Show {
        /// Type name
        measurement_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change chart settings for a type. Unspecified settings keep their value.
    Set {
        /// Type name
        measurement_type: String,
        /// Point size
        #[arg(long)]
        point_size: Option<f64>,
        /// Point color as RRGGBB hex
        #[arg(long)]
        point_color: Option<String>,
        /// Draw data points
        #[arg(long)]
        show_points: Option<bool>,
        /// Draw the connecting line
        #[arg(long)]
        show_line: Option<bool>,
        /// Line color as RRGGBB hex
        #[arg(long)]
        line_color: Option<String>,
        /// Line width
        #[arg(long)]
        line_width: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(db = %config.db_path.display(), "opening database");
    let service = ChartbookService::new(&config.db_path)?;

    match cli.command {
        Commands::Type { command } => match command {
            TypeCommands::Add {
                name,
                unit,
                color,
                emoji,
                json,
            } => cmd_type_add(&service, &name, &unit, &color, emoji, json),
            TypeCommands::List { json } => cmd_type_list(&service, json),
            TypeCommands::Delete { name, json } => cmd_type_delete(&service, &name, json),
        },
        Commands::Log {
            measurement_type,
            value,
            at,
            notes,
            json,
        } => cmd_log(&service, &measurement_type, &value, at, notes, json),
        Commands::List {
            measurement_type,
            range,
            from,
            to,
            json,
        } => cmd_list(
            &service,
            measurement_type.as_deref(),
            &range,
            from,
            to,
            json,
        ),
        Commands::Delete { id, json } => cmd_delete(&service, id, json),
        Commands::Export { out, json } => cmd_export(&service, out, json),
        Commands::Import { file, json } => cmd_import(&service, &file, json),
        Commands::Gki {
            range,
            from,
            to,
            at,
            json,
        } => cmd_gki(&service, &range, from, to, at, json),
        Commands::Style { command } => match command {
            StyleCommands::Show {
                measurement_type,
                json,
            } => cmd_style_show(&service, &measurement_type, json),
            StyleCommands::Set {
                measurement_type,
                point_size,
                point_color,
                show_points,
                show_line,
                line_color,
                line_width,
                json,
            } => cmd_style_set(
                &service,
                &measurement_type,
                &StyleChanges {
                    point_size,
                    point_color,
                    show_points,
                    show_line,
                    line_color,
                    line_width,
                },
                json,
            ),
        },
        Commands::Seed { json } => cmd_seed(&service, json),
    }
}
