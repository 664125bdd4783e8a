pub mod demo;
pub mod diff;
pub mod log;
pub mod status;

use std::path::PathBuf;

pub fn get_db_path(custom_path: Option<PathBuf>) -> PathBuf {
    custom_path.unwrap_or_else(|| PathBuf::from(".entrack").join("entrack.db"))
}
