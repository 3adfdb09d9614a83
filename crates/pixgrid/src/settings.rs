use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use once_cell::sync::Lazy;
use pixgrid_engine::EngineConfig;

const PROJECT_QUALIFIER: &str = "com";
const PROJECT_ORGANIZATION: &str = "pixgrid";
const PROJECT_APPLICATION: &str = "pixgrid";

/// Lazily initialized project directories (computed once on first access)
pub(crate) static PROJECT_DIRS: Lazy<Option<directories::ProjectDirs>> =
    Lazy::new(|| directories::ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORGANIZATION, PROJECT_APPLICATION));

pub struct Settings;

impl Settings {
    pub const FILE_NAME: &'static str = "pixgrid.toml";

    pub fn config_dir() -> Option<PathBuf> {
        PROJECT_DIRS.as_ref().map(|p| p.config_dir().to_path_buf())
    }

    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join(Self::FILE_NAME))
    }

    /// Config directory, created if missing.
    pub fn log_dir() -> Option<PathBuf> {
        let dir = Self::config_dir()?;
        if !dir.exists() {
            if let Err(err) = fs::create_dir_all(&dir) {
                eprintln!("Can't create configuration directory {}: {err}", dir.display());
                return None;
            }
        }
        Some(dir)
    }

    /// Loads the engine configuration.
    ///
    /// An explicit `path` has to exist. Without one, `pixgrid.toml` in the
    /// config directory is used if present, otherwise the defaults.
    pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("configuration file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => match Self::config_file() {
                Some(file) if file.exists() => file,
                _ => {
                    log::debug!("no configuration file, using defaults");
                    return Ok(EngineConfig::default());
                }
            },
        };
        Self::read_config(&file)
    }

    fn read_config(file: &Path) -> anyhow::Result<EngineConfig> {
        let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        let config: EngineConfig = toml::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
        config.validate()?;
        log::info!("configuration loaded from {}", file.display());
        Ok(config)
    }
}
