mod gki;
mod helpers;
mod measurement;
mod style;
mod transfer;
mod types;

pub(crate) use gki::cmd_gki;
pub(crate) use measurement::{cmd_delete, cmd_list, cmd_log};
pub(crate) use style::{StyleChanges, cmd_style_set, cmd_style_show};
pub(crate) use transfer::{cmd_export, cmd_import};
pub(crate) use types::{cmd_seed, cmd_type_add, cmd_type_delete, cmd_type_list};
