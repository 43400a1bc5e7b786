use std::fs;
use std::path::{Path, PathBuf};

use watchdog_app::WatchdogConfig;

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: WatchdogConfig,
    pub file: PathBuf,
    pub created: bool,
}

/// Reads `file`, writing a default configuration there first when it does
/// not exist yet.
pub fn load_or_create(file: &Path) -> Result<ConfigLoad, String> {
    if file.exists() {
        let contents = fs::read_to_string(file)
            .map_err(|err| format!("read config {}: {}", file.display(), err))?;
        let config: WatchdogConfig = toml::from_str(&contents)
            .map_err(|err| format!("parse config {}: {}", file.display(), err))?;
        return Ok(ConfigLoad {
            config,
            file: file.to_path_buf(),
            created: false,
        });
    }

    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir)
            .map_err(|err| format!("create config dir {}: {}", dir.display(), err))?;
    }
    let config = WatchdogConfig::default();
    let contents =
        toml::to_string_pretty(&config).map_err(|err| format!("serialize config: {}", err))?;
    fs::write(file, contents).map_err(|err| format!("write config {}: {}", file.display(), err))?;

    Ok(ConfigLoad {
        config,
        file: file.to_path_buf(),
        created: true,
    })
}
