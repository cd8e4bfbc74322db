//! Persistent configuration for quick-sh.
//!
//! The whole tool state lives in one JSON document, `~/.quick-sh/config.json`.
//! It is read once per invocation into a [`Config`] value which is then passed
//! explicitly to every resolver. The remote script cache lives next to it in
//! `~/.quick-sh/remote-scripts`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::remote::Source;

/// Default directory holding the configuration file and the remote cache
pub const DEFAULT_CONFIG_DIR: &str = "~/.quick-sh";
/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Name of the remote script cache directory inside the configuration directory
pub const REMOTE_SCRIPTS_DIR_NAME: &str = "remote-scripts";

/// The persisted configuration document.
///
/// Keys the tool does not know about (and the opaque `ai` section) are kept
/// so that rewriting the file never drops settings owned by other tools.
/// A source entry that does not parse is kept verbatim in
/// [`Config::unrecognized_sources`] and written back unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "ConfigDocument", into = "ConfigDocument")]
pub struct Config {
    pub script_path: Option<PathBuf>,
    pub language: Option<String>,
    pub sources: IndexMap<String, Source>,
    pub unrecognized_sources: IndexMap<String, Value>,
    pub ai: Option<Value>,
    pub extra: Map<String, Value>,
}

impl Config {
    /// Whether a source called `name` is stored, parsed or not.
    #[must_use]
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name) || self.unrecognized_sources.contains_key(name)
    }
}

/// On-disk shape of [`Config`], with source entries left as raw JSON.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    sources: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ai: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<ConfigDocument> for Config {
    fn from(document: ConfigDocument) -> Self {
        let mut sources = IndexMap::new();
        let mut unrecognized_sources = IndexMap::new();

        for (name, entry) in document.sources {
            match Source::deserialize(&entry) {
                Ok(source) => {
                    sources.insert(name, source);
                }
                Err(e) => {
                    warn!("Ignoring source `{name}`: {e}");
                    unrecognized_sources.insert(name, entry);
                }
            }
        }

        Self {
            script_path: document.script_path,
            language: document.language,
            sources,
            unrecognized_sources,
            ai: document.ai,
            extra: document.extra,
        }
    }
}

impl From<Config> for ConfigDocument {
    fn from(config: Config) -> Self {
        let mut sources: IndexMap<String, Value> = config
            .sources
            .into_iter()
            .filter_map(|(name, source)| match serde_json::to_value(&source) {
                Ok(entry) => Some((name, entry)),
                Err(e) => {
                    warn!("Could not serialise source `{name}`: {e}");
                    None
                }
            })
            .collect();
        sources.extend(config.unrecognized_sources);

        Self {
            script_path: config.script_path,
            language: config.language,
            sources,
            ai: config.ai,
            extra: config.extra,
        }
    }
}

/// Resolves the configuration directory.
///
/// If a custom directory is provided, uses that. Otherwise, uses
/// [`DEFAULT_CONFIG_DIR`]. Shell expansions like `~` are resolved.
///
/// # Examples
///
/// ```
/// use quick_sh_core::config::get_config_dir;
///
/// let custom = get_config_dir(Some("/tmp/quick-sh"));
/// assert_eq!(custom, std::path::PathBuf::from("/tmp/quick-sh"));
/// ```
pub fn get_config_dir(config_dir_arg: Option<&str>) -> PathBuf {
    let config_dir = config_dir_arg.unwrap_or(DEFAULT_CONFIG_DIR);

    PathBuf::from(shellexpand::tilde(config_dir).to_string())
}

/// Reads and writes the configuration document in a configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    pub fn remote_scripts_dir(&self) -> PathBuf {
        self.dir.join(REMOTE_SCRIPTS_DIR_NAME)
    }

    /// Returns the persisted configuration.
    ///
    /// A missing, unreadable or malformed file yields an empty configuration;
    /// this never fails.
    pub fn read(&self) -> Config {
        let path = self.config_file();
        if !path.exists() {
            return Config::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Could not read config `{}`: {e}", path.display());
                return Config::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Could not parse config `{}`: {e}", path.display());
            Config::default()
        })
    }

    /// Writes the configuration with two-space indentation, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, or the file
    /// cannot be serialised or written.
    pub fn write(&self, config: &Config) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::io_error("config directory", &self.dir, e))?;

        let path = self.config_file();
        let mut content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::json_error("writing", "config", &path, e))?;
        content.push('\n');

        fs::write(&path, content).map_err(|e| Error::io_error("config file", &path, e))
    }

    /// Sets the script root directory, storing it as an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] if `path` is not an existing directory,
    /// or an IO error if the configuration cannot be written.
    pub fn set_script_path(&self, path: &Path) -> Result<PathBuf> {
        let absolute = std::path::absolute(path).map_err(|_| Error::PathNotFound(path.into()))?;

        if !absolute.is_dir() {
            return Err(Error::PathNotFound(absolute));
        }

        let mut config = self.read();
        config.script_path = Some(absolute.clone());
        self.write(&config)?;

        Ok(absolute)
    }
}
