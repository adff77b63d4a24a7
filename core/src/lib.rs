//! Core of the chartbook measurement tracker: models, CSV exchange, GKI
//! derivation, chart settings and the SQLite store.

pub mod chart;
pub mod csv_codec;
pub mod customization;
pub mod date_range;
pub mod db;
pub mod error;
pub mod gki;
pub mod models;
pub mod service;
pub mod store;
