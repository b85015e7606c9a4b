//! Loading and saving `config.json`.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::model::Configuration;
use crate::config::suppression::{SUPPRESSION_GRACE, WriteSuppression};
use crate::errors::SoundboardError;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Overrides config file resolution when set to a non-empty path.
pub const CONFIG_PATH_ENV: &str = "SOUNDPAD_CONFIG";

/// Result of a load: always a usable document, plus what went wrong if anything.
#[derive(Debug)]
pub struct Loaded {
    pub config: Configuration,
    pub warning: Option<SoundboardError>,
}

/// Owns the config file path, the last known good document and the write
/// suppression shared with the watcher.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    suppression: Arc<WriteSuppression>,
    grace: Duration,
    last_good: Option<Configuration>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            suppression: Arc::new(WriteSuppression::new()),
            grace: SUPPRESSION_GRACE,
            last_good: None,
        }
    }

    /// Overrides how long suppression outlives a write.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Locates `config.json`: next to the executable, else in the working
    /// directory, else (to be created) next to the executable.
    pub fn resolve_path() -> PathBuf {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cwd = env::current_dir().ok();
        resolve_among(exe_dir.as_deref(), cwd.as_deref())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative pad paths are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    pub fn suppression(&self) -> Arc<WriteSuppression> {
        Arc::clone(&self.suppression)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppression.is_suppressed()
    }

    pub fn last_good(&self) -> Option<&Configuration> {
        self.last_good.as_ref()
    }

    /// Reads and normalizes the document.
    ///
    /// A missing file is created with the example document. A read or parse
    /// failure yields the last known good document (defaults on first load)
    /// together with the error.
    pub fn load(&mut self) -> Loaded {
        if !self.path.exists() {
            log::info!("No config at {}, writing defaults", self.path.display());
            let config = Configuration::with_examples();
            let warning = self.save(&config).err();
            return Loaded { config, warning };
        }

        match self.read() {
            Ok(mut config) => {
                config.normalize();
                log::debug!(
                    "Loaded {} ({}x{} grid)",
                    self.path.display(),
                    config.grid_rows,
                    config.grid_cols
                );
                self.last_good = Some(config.clone());
                Loaded {
                    config,
                    warning: None,
                }
            }
            Err(err) => {
                log::warn!("{err}");
                Loaded {
                    config: self.last_good.clone().unwrap_or_default(),
                    warning: Some(err),
                }
            }
        }
    }

    fn read(&self) -> Result<Configuration, SoundboardError> {
        let json = fs::read_to_string(&self.path).map_err(|source| SoundboardError::ConfigIo {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SoundboardError::ConfigParse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes `config` as pretty JSON, replacing the file in one rename.
    ///
    /// Suppression is armed for the duration of the write and released
    /// `grace` after it, whether or not the write succeeded.
    pub fn save(&mut self, config: &Configuration) -> Result<(), SoundboardError> {
        let io_err = |source| SoundboardError::ConfigIo {
            path: self.path.clone(),
            source,
        };
        let mut json = serde_json::to_string_pretty(config)
            .map_err(|err| io_err(std::io::Error::from(err)))?;
        json.push('\n');

        {
            let _guard = self.suppression.arm(self.grace);
            write_atomically(&self.path, json.as_bytes()).map_err(io_err)?;
        }

        log::debug!("Saved {}", self.path.display());
        self.last_good = Some(config.clone());
        Ok(())
    }
}

fn resolve_among(exe_dir: Option<&Path>, cwd: Option<&Path>) -> PathBuf {
    let exe_config = exe_dir.map(|dir| dir.join(CONFIG_FILE_NAME));
    let cwd_config = cwd.map(|dir| dir.join(CONFIG_FILE_NAME));

    let existing = [exe_config.as_ref(), cwd_config.as_ref()]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_file())
        .cloned();
    existing
        .or(exe_config)
        .or(cwd_config)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Readers see either the old or the new file, never a partial one.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
