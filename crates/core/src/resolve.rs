//! Resolution of a script name to something runnable.
//!
//! Stages are tried in a fixed order: alias, local script, downloaded remote
//! script, system PATH. The first match wins. Errors raised by a stage (a
//! broken alias, a directory without entry point) stop resolution instead of
//! falling through to the next stage.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::alias::{alias_file_path, resolve_alias};
use crate::config::{Config, ConfigStore};
use crate::error::{Error, Result};
use crate::execution::{self, Launch};
use crate::locator::{locate, scan_scripts, Located, ScanOptions, ScriptInfo};
use crate::remote::{Fetch, HttpFetcher, RemoteIndex};

/// Looks up executables on the system PATH.
pub trait PathLookup {
    fn find(&self, command: &str) -> Option<PathBuf>;
}

/// [`PathLookup`] backed by the `which` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPath;

impl PathLookup for SystemPath {
    fn find(&self, command: &str) -> Option<PathBuf> {
        which::which(command).ok()
    }
}

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Alias { name: String, launch: Launch },
    File(PathBuf),
    Directory { dir: PathBuf, entry: PathBuf },
    Remote { source_name: String, path: PathBuf },
    System(String),
}

impl Target {
    #[must_use]
    pub fn launch(&self) -> Launch {
        match self {
            Self::Alias { launch, .. } => launch.clone(),
            Self::File(path) | Self::Remote { path, .. } => Launch::Script(path.clone()),
            Self::Directory { entry, .. } => Launch::Script(entry.clone()),
            Self::System(command) => Launch::Program(command.into()),
        }
    }
}

impl From<Located> for Target {
    fn from(located: Located) -> Self {
        match located {
            Located::File(path) => Self::File(path),
            Located::Directory { dir, entry } => Self::Directory { dir, entry },
        }
    }
}

/// Resolves names against one loaded [`Config`].
pub struct Dispatcher<'a, F = HttpFetcher> {
    config: &'a Config,
    remote: &'a RemoteIndex<F>,
    path_lookup: &'a dyn PathLookup,
}

impl<'a, F: Fetch> Dispatcher<'a, F> {
    pub fn new(
        config: &'a Config,
        remote: &'a RemoteIndex<F>,
        path_lookup: &'a dyn PathLookup,
    ) -> Self {
        Self {
            config,
            remote,
            path_lookup,
        }
    }

    fn searched_locations(&self, script_root: &Path) -> Vec<String> {
        vec![
            format!("alias config: {}", alias_file_path(script_root).display()),
            format!("script directory: {}", script_root.display()),
            format!("remote scripts: {}", self.remote.cache_root().display()),
            "system PATH".to_string(),
        ]
    }

    /// Resolves `name` to a [`Target`].
    ///
    /// # Errors
    ///
    /// - [`Error::NoPathConfigured`] before anything else when no script root
    ///   is configured
    /// - alias errors from [`resolve_alias`]
    /// - [`Error::NoEntryPoint`] from [`locate`]
    /// - [`Error::CommandNotFound`] when every stage comes up empty
    pub fn resolve(&self, name: &str) -> Result<Target> {
        let script_root = self
            .config
            .script_path
            .as_deref()
            .ok_or(Error::NoPathConfigured)?;

        if name.is_empty() {
            return Err(Error::CommandNotFound {
                name: name.to_string(),
                searched: self.searched_locations(script_root),
            });
        }

        debug!("Resolving `{name}` in `{}`", script_root.display());

        if let Some(launch) = resolve_alias(script_root, name, self.path_lookup)? {
            return Ok(Target::Alias {
                name: name.to_string(),
                launch,
            });
        }

        if let Some(located) = locate(script_root, name)? {
            return Ok(located.into());
        }

        if let Some(remote) = self.remote.find(self.config, name) {
            info!(
                "Executing remote script: {}/{}",
                remote.source_name,
                remote
                    .path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            );
            return Ok(Target::Remote {
                source_name: remote.source_name,
                path: remote.path,
            });
        }

        if let Some(path) = self.path_lookup.find(name) {
            debug!("Found `{name}` on PATH at `{}`", path.display());
            return Ok(Target::System(name.to_string()));
        }

        Err(Error::CommandNotFound {
            name: name.to_string(),
            searched: self.searched_locations(script_root),
        })
    }
}

/// Resolves `name` with the configuration of `store` and runs it.
///
/// Returns the exit code the process should terminate with.
///
/// # Errors
///
/// Returns any resolution error from [`Dispatcher::resolve`] or execution
/// error from [`execution::execute`].
pub fn execute_script(store: &ConfigStore, name: &str, args: &[String]) -> Result<i32> {
    let config = store.read();
    let remote = RemoteIndex::new(store.remote_scripts_dir());
    let dispatcher = Dispatcher::new(&config, &remote, &SystemPath);

    let target = dispatcher.resolve(name)?;
    execution::execute(&target.launch(), args)
}

/// Every script discoverable under `script_root`, for listings.
#[must_use]
pub fn list_resolvable(script_root: &Path, options: ScanOptions) -> Vec<ScriptInfo> {
    scan_scripts(script_root, options)
}
