use std::path::PathBuf;

use crate::Result;

const DB_FILE_NAME: &str = "api-watchdog.sqlite";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug)]
pub struct AppPaths {
    pub app_data_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let db_path = app_data_dir.join(DB_FILE_NAME);
        let config_path = app_data_dir.join(CONFIG_FILE_NAME);
        Self {
            app_data_dir,
            db_path,
            config_path,
        }
    }
}

pub fn ensure_app_data_dir(paths: &AppPaths) -> Result<()> {
    std::fs::create_dir_all(&paths.app_data_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_inside_the_data_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = AppPaths::new(dir.path().join("nested"));
        ensure_app_data_dir(&paths).expect("create dir");
        assert!(paths.app_data_dir.is_dir());
        assert_eq!(paths.db_path.parent(), Some(paths.app_data_dir.as_path()));
        assert!(paths.config_path.ends_with("config.toml"));
    }
}
