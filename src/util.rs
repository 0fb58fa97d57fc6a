use std::path::PathBuf;

pub const DATA_DIR: &str = "data";
pub const DB_FILE: &str = "navgraph.db";

/// Graph store used when neither `--db`, the config file nor `VSPATH_DB` names one.
pub fn default_db_path() -> PathBuf {
    PathBuf::from(DATA_DIR).join(DB_FILE)
}
