//! Profile persistence.
//!
//! Each profile is a pretty-printed JSON file named `<name>.json` in the
//! profiles directory. Saving an existing name overwrites it.

use crate::model::JobConfiguration;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile name '{0}': avoid empty names, <>:\"/\\|?* and control characters")]
    InvalidName(String),
    #[error("profile storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("profile '{name}' is malformed: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value store of named job configurations.
pub trait ProfileStore {
    fn save(&self, name: &str, config: &JobConfiguration) -> Result<(), ProfileError>;
    /// `Ok(None)` when no profile of that name exists.
    fn load(&self, name: &str) -> Result<Option<JobConfiguration>, ProfileError>;
    /// Sorted profile names.
    fn list(&self) -> Result<Vec<String>, ProfileError>;
    /// `Ok(false)` when no profile of that name exists.
    fn delete(&self, name: &str) -> Result<bool, ProfileError>;
}

/// Validate a profile name, since it maps directly to a file name.
pub fn validate_name(name: &str) -> Result<&str, ProfileError> {
    // Control characters are rejected anywhere, including ones trim would drop.
    let trimmed = name.trim();
    let bad = name.chars().any(char::is_control)
        || trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.chars().any(|c| RESERVED_CHARS.contains(&c));
    if bad {
        Err(ProfileError::InvalidName(name.to_string()))
    } else {
        Ok(trimmed)
    }
}

/// Default profiles directory under the platform config dir.
pub fn default_profiles_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("robackup")
        .join("profiles")
}

pub struct FsProfileStore {
    dir: PathBuf,
}

impl FsProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, ProfileError> {
        let name = validate_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    fn ensure_dir(&self) -> Result<(), ProfileError> {
        fs::create_dir_all(&self.dir).map_err(|source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

impl ProfileStore for FsProfileStore {
    fn save(&self, name: &str, config: &JobConfiguration) -> Result<(), ProfileError> {
        let path = self.path_for(name)?;
        self.ensure_dir()?;
        let data = serde_json::to_string_pretty(config).map_err(|source| {
            ProfileError::Malformed {
                name: name.to_string(),
                source,
            }
        })?;
        fs::write(&path, data).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(profile = name, path = %path.display(), "profile saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<JobConfiguration>, ProfileError> {
        let path = self.path_for(name)?;
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ProfileError::Io { path, source }),
        };
        let mut config: JobConfiguration =
            serde_json::from_str(&data).map_err(|source| ProfileError::Malformed {
                name: name.to_string(),
                source,
            })?;
        config.normalize();
        tracing::info!(profile = name, "profile loaded");
        Ok(Some(config))
    }

    fn list(&self) -> Result<Vec<String>, ProfileError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|x| x.to_str()) == Some("json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<bool, ProfileError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(profile = name, "profile deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ProfileError::Io { path, source }),
        }
    }
}
