use std::path::PathBuf;

const DATA_DIR_ENV: &str = "WATCHDOG_DATA_DIR";
const DATA_DIR_NAME: &str = ".api-watchdog";

/// `--data-dir`, then `$WATCHDOG_DATA_DIR`, then `~/.api-watchdog`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf, String> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|err| format!("resolve HOME: {}", err))?;
    Ok(PathBuf::from(home).join(DATA_DIR_NAME))
}
