//! Remote script sources and the local cache of downloaded scripts.
//!
//! Sources are registered in [`Config::sources`]; each one owns a cache
//! directory `<cache root>/<source name>/` holding the scripts downloaded from
//! it. HTTP access goes through the [`Fetch`] trait.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::execution::{has_script_extension, SCRIPT_EXTENSIONS};
use crate::locator::is_rooted;

/// Client-side timeout of a single download
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;
const DEFAULT_BRANCH: &str = "main";
const GITHUB_RAW_HOST: &str = "https://raw.githubusercontent.com";
/// Keys of a stored source that `--option` values may not set
pub const RESERVED_SOURCE_KEYS: [&str; 4] = ["type", "url", "branch", "addedAt"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Github,
    RawUrl,
    /// Accepted when registering a source, but not downloadable.
    Git,
}

impl SourceType {
    pub const ALL: [SourceType; 3] = [Self::Github, Self::RawUrl, Self::Git];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::RawUrl => "raw_url",
            Self::Git => "git",
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|source_type| source_type.as_str() == value)
            .ok_or_else(|| Error::InvalidSourceType {
                given: value.to_string(),
                supported: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}

/// A registered remote source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// Any other options given when the source was added.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Source {
    /// The URL `remote_path` is downloaded from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGithubUrl`] for a GitHub source whose URL has
    /// no owner and repository, and [`Error::UnsupportedSourceType`] for
    /// `git` sources.
    pub fn fetch_url(&self, remote_path: &str) -> Result<String> {
        match self.source_type {
            SourceType::Github => {
                let (owner, repo) = parse_github_repo(&self.url)
                    .ok_or_else(|| Error::InvalidGithubUrl(self.url.clone()))?;
                let branch = self.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
                Ok(format!(
                    "{GITHUB_RAW_HOST}/{owner}/{repo}/{branch}/{remote_path}"
                ))
            }
            SourceType::RawUrl => {
                let base = self.url.strip_suffix('/').unwrap_or(&self.url);
                Ok(format!("{base}/{remote_path}"))
            }
            SourceType::Git => Err(Error::UnsupportedSourceType(self.source_type.to_string())),
        }
    }
}

/// Extracts `(owner, repo)` from a `github.com/<owner>/<repo>` URL.
fn parse_github_repo(url: &str) -> Option<(&str, &str)> {
    let (_, rest) = url.split_once("github.com/")?;
    let mut segments = rest.split('/');
    let owner = segments.next().filter(|segment| !segment.is_empty())?;
    let repo = segments.next().filter(|segment| !segment.is_empty())?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    Some((owner, repo))
}

/// Retrieves the body of a URL.
pub trait Fetch {
    /// # Errors
    ///
    /// Returns [`Error::Download`] on network failure or a non-200 response.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) fetcher following 301/302 redirects.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            timeout: DOWNLOAD_TIMEOUT,
        }
    }
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if matches!(
            attempt.status(),
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
        ) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(redirect_policy())
            .build()
            .map_err(|e| Error::download_error(url, e))?;

        let response = client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::download_error(url, "request timed out")
            } else {
                Error::download_error(url, e)
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::download_error(url, format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .map_err(|e| Error::download_error(url, e))?;

        Ok(body.to_vec())
    }
}

/// Extra settings for [`RemoteIndex::add_source`].
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub branch: Option<String>,
    pub extra: Map<String, Value>,
    /// Replace an existing source with the same name instead of failing.
    pub overwrite: bool,
}

/// A source together with the number of scripts cached for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub name: String,
    pub source: Source,
    pub script_count: usize,
}

/// The scripts cached for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedScripts {
    pub source_name: String,
    pub source_type: SourceType,
    pub scripts: Vec<String>,
}

/// A downloaded script matched by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMatch {
    pub source_name: String,
    pub path: PathBuf,
}

/// Source registry operations on a [`Config`] plus the on-disk script cache.
#[derive(Debug, Clone)]
pub struct RemoteIndex<F = HttpFetcher> {
    cache_root: PathBuf,
    fetcher: F,
}

impl RemoteIndex<HttpFetcher> {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self::with_fetcher(cache_root, HttpFetcher::default())
    }
}

/// Accepts names that stay a single entry when joined onto a directory.
fn check_plain_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) if component == name => Ok(name),
        _ => Err(Error::InvalidName(name.to_string())),
    }
}

fn cached_file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

impl<F: Fetch> RemoteIndex<F> {
    pub fn with_fetcher(cache_root: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            cache_root: cache_root.into(),
            fetcher,
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub fn source_dir(&self, source_name: &str) -> PathBuf {
        self.cache_root.join(source_name)
    }

    /// Registers a source in `config`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSourceArgument`] if name, type or URL is empty
    /// - [`Error::InvalidName`] if `name` is not a plain file name
    /// - [`Error::InvalidSourceType`] if `source_type` is unknown
    /// - [`Error::ReservedSourceOption`] if an extra option would shadow one
    ///   of [`RESERVED_SOURCE_KEYS`]
    /// - [`Error::DuplicateSource`] if the name is taken and
    ///   `options.overwrite` is not set
    pub fn add_source(
        &self,
        config: &mut Config,
        name: &str,
        source_type: &str,
        url: &str,
        options: SourceOptions,
    ) -> Result<()> {
        if name.is_empty() || source_type.is_empty() || url.is_empty() {
            return Err(Error::MissingSourceArgument);
        }

        check_plain_name(name)?;
        let source_type = source_type.parse::<SourceType>()?;

        if let Some(key) = RESERVED_SOURCE_KEYS
            .into_iter()
            .find(|key| options.extra.contains_key(*key))
        {
            return Err(Error::ReservedSourceOption(key.to_string()));
        }

        if config.has_source(name) && !options.overwrite {
            return Err(Error::DuplicateSource(name.to_string()));
        }

        let source = Source {
            source_type,
            url: url.to_string(),
            branch: options.branch,
            added_at: Some(Utc::now()),
            options: options.extra,
        };

        info!("Adding source `{name}` ({source_type}) at {url}");
        config.unrecognized_sources.shift_remove(name);
        config.sources.insert(name.to_string(), source);

        Ok(())
    }

    /// Removes a source from `config` along with its cached scripts.
    ///
    /// Returns whether a cache directory was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if there is no such source, or an IO
    /// error if the cache directory cannot be deleted. Entries that could not
    /// be parsed can be removed as well.
    pub fn remove_source(&self, config: &mut Config, name: &str) -> Result<bool> {
        check_plain_name(name)?;
        let removed = config.sources.shift_remove(name).is_some()
            | config.unrecognized_sources.shift_remove(name).is_some();
        if !removed {
            return Err(Error::SourceNotFound(name.to_string()));
        }

        let dir = self.source_dir(name);
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir).map_err(|e| Error::io_error("source cache", &dir, e))?;
        info!("Deleted cached scripts in `{}`", dir.display());

        Ok(true)
    }

    /// Every source in configuration order.
    #[must_use]
    pub fn list_sources(&self, config: &Config) -> Vec<SourceSummary> {
        config
            .sources
            .iter()
            .map(|(name, source)| SourceSummary {
                name: name.clone(),
                source: source.clone(),
                script_count: cached_file_names(&self.source_dir(name)).len(),
            })
            .collect()
    }

    /// Downloads `remote_path` from a source into its cache directory.
    ///
    /// The file is named `local_name`, or the last segment of `remote_path`.
    /// An existing file of that name is replaced. Scripts are marked
    /// executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`], [`Error::InvalidName`] for a
    /// `local_name` that is not a plain file name, URL errors from
    /// [`Source::fetch_url`], [`Error::Download`], or an IO error when
    /// writing the file.
    pub fn download(
        &self,
        config: &Config,
        source_name: &str,
        remote_path: &str,
        local_name: Option<&str>,
    ) -> Result<PathBuf> {
        let source = config
            .sources
            .get(source_name)
            .ok_or_else(|| Error::SourceNotFound(source_name.to_string()))?;

        check_plain_name(source_name)?;
        let url = source.fetch_url(remote_path)?;

        let file_name = match local_name {
            Some(local_name) => check_plain_name(local_name)?.to_string(),
            None => Path::new(remote_path)
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| Error::download_error(&url, "remote path has no file name"))?,
        };

        info!("Downloading {url}");
        let body = self.fetcher.fetch(&url)?;

        let dir = self.source_dir(source_name);
        fs::create_dir_all(&dir).map_err(|e| Error::io_error("source cache", &dir, e))?;

        let path = dir.join(file_name);
        fs::write(&path, body).map_err(|e| Error::io_error("downloaded script", &path, e))?;

        if has_script_extension(&path) {
            set_executable(&path)?;
        }

        Ok(path)
    }

    /// Finds a cached script called `name`.
    ///
    /// Sources are searched in configuration order; inside a source the
    /// exact name is tried before `.js`, `.sh` and `.mjs` suffixes.
    #[must_use]
    pub fn find(&self, config: &Config, name: &str) -> Option<RemoteMatch> {
        if is_rooted(name) {
            return None;
        }

        for source_name in config.sources.keys() {
            let dir = self.source_dir(source_name);
            if !dir.is_dir() {
                continue;
            }

            let mut candidates = vec![dir.join(name)];
            candidates.extend(
                SCRIPT_EXTENSIONS
                    .iter()
                    .map(|extension| dir.join(format!("{name}.{extension}"))),
            );

            if let Some(path) = candidates.into_iter().find(|path| path.exists()) {
                debug!("Found remote script `{}`", path.display());
                return Some(RemoteMatch {
                    source_name: source_name.clone(),
                    path,
                });
            }
        }

        None
    }

    /// Deletes one cached script; the source directory goes too once empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] unless both names are plain file names,
    /// [`Error::ScriptNotFound`] if the script is not cached, or an IO error
    /// if deletion fails.
    pub fn remove_script(&self, source_name: &str, script_name: &str) -> Result<()> {
        check_plain_name(source_name)?;
        check_plain_name(script_name)?;

        let dir = self.source_dir(source_name);
        let path = dir.join(script_name);

        if !path.is_file() {
            return Err(Error::ScriptNotFound {
                source_name: source_name.to_string(),
                script: script_name.to_string(),
            });
        }

        fs::remove_file(&path).map_err(|e| Error::io_error("downloaded script", &path, e))?;

        let is_empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(&dir).map_err(|e| Error::io_error("source cache", &dir, e))?;
        }

        Ok(())
    }

    /// Cached scripts of every source that has any, in configuration order.
    #[must_use]
    pub fn list_scripts(&self, config: &Config) -> Vec<CachedScripts> {
        config
            .sources
            .iter()
            .map(|(name, source)| CachedScripts {
                source_name: name.clone(),
                source_type: source.source_type,
                scripts: cached_file_names(&self.source_dir(name)),
            })
            .filter(|cached| !cached.scripts.is_empty())
            .collect()
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io_error("downloaded script", path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFetcher {
        body: Vec<u8>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn serving(body: &str) -> Self {
            Self {
                body: body.as_bytes().to_vec(),
                requested: RefCell::default(),
            }
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requested.borrow_mut().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher;

    impl Fetch for FailingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(Error::download_error(url, "HTTP 404 Not Found"))
        }
    }

    fn source(source_type: SourceType, url: &str) -> Source {
        Source {
            source_type,
            url: url.to_string(),
            branch: None,
            added_at: None,
            options: Map::new(),
        }
    }

    fn config_with(sources: &[(&str, Source)]) -> Config {
        let mut config = Config::default();
        for (name, source) in sources {
            config.sources.insert((*name).to_string(), source.clone());
        }
        config
    }

    #[test]
    fn test_source_type_parsing() {
        assert_eq!("raw_url".parse::<SourceType>().unwrap(), SourceType::RawUrl);
        let error = "svn".parse::<SourceType>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid source type `svn`. Supported types: github, raw_url, git"
        );
    }

    #[test]
    fn test_github_fetch_url() {
        let mut github = source(SourceType::Github, "https://github.com/octo/tools.git");
        assert_eq!(
            github.fetch_url("bin/deploy.sh").unwrap(),
            "https://raw.githubusercontent.com/octo/tools/main/bin/deploy.sh"
        );

        github.branch = Some("dev".to_string());
        assert_eq!(
            github.fetch_url("a.js").unwrap(),
            "https://raw.githubusercontent.com/octo/tools/dev/a.js"
        );
    }

    #[test]
    fn test_github_fetch_url_requires_repo() {
        let github = source(SourceType::Github, "https://github.com/octo");
        assert!(matches!(
            github.fetch_url("a.js"),
            Err(Error::InvalidGithubUrl(_))
        ));
    }

    #[test]
    fn test_raw_url_and_git_fetch_url() {
        let raw = source(SourceType::RawUrl, "https://example.com/scripts/");
        assert_eq!(
            raw.fetch_url("hello.sh").unwrap(),
            "https://example.com/scripts/hello.sh"
        );

        let git = source(SourceType::Git, "git@example.com:x.git");
        assert!(matches!(
            git.fetch_url("a.sh"),
            Err(Error::UnsupportedSourceType(_))
        ));
    }

    #[test]
    fn test_source_serialization_shape() {
        let mut raw = source(SourceType::RawUrl, "https://example.com");
        raw.branch = Some("main".to_string());
        raw.options
            .insert("token".to_string(), Value::String("x".to_string()));

        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["type"], "raw_url");
        assert_eq!(json["branch"], "main");
        assert_eq!(json["token"], "x");
        assert!(json.get("addedAt").is_none());
    }

    #[test]
    fn test_add_source_validation() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let mut config = Config::default();

        let invalid = index.add_source(&mut config, "s", "ftp", "x", SourceOptions::default());
        assert!(matches!(invalid, Err(Error::InvalidSourceType { .. })));

        let missing = index.add_source(&mut config, "", "github", "x", SourceOptions::default());
        assert!(matches!(missing, Err(Error::MissingSourceArgument)));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_add_source_duplicate_requires_overwrite() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let mut config = Config::default();

        index
            .add_source(&mut config, "s", "raw_url", "https://a", SourceOptions::default())
            .unwrap();
        let duplicate =
            index.add_source(&mut config, "s", "raw_url", "https://b", SourceOptions::default());
        assert!(matches!(duplicate, Err(Error::DuplicateSource(_))));
        assert_eq!(config.sources["s"].url, "https://a");

        let overwrite = SourceOptions {
            overwrite: true,
            ..SourceOptions::default()
        };
        index
            .add_source(&mut config, "s", "raw_url", "https://b", overwrite)
            .unwrap();
        assert_eq!(config.sources["s"].url, "https://b");
        assert!(config.sources["s"].added_at.is_some());
    }

    #[test]
    fn test_add_source_rejects_reserved_options() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let mut config = Config::default();

        for key in RESERVED_SOURCE_KEYS {
            let mut extra = Map::new();
            extra.insert(key.to_string(), Value::String("github".to_string()));
            let options = SourceOptions {
                extra,
                ..SourceOptions::default()
            };

            let result = index.add_source(&mut config, "s", "raw_url", "https://a", options);
            assert!(matches!(result, Err(Error::ReservedSourceOption(k)) if k == key));
        }
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_added_source_survives_a_rewrite() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let mut config = Config::default();
        let mut extra = Map::new();
        extra.insert("token".to_string(), Value::String("abc".to_string()));
        let options = SourceOptions {
            branch: Some("dev".to_string()),
            extra,
            overwrite: false,
        };

        index
            .add_source(&mut config, "s", "github", "https://github.com/o/r", options)
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let reread: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(reread.sources["s"], config.sources["s"]);
        assert!(reread.unrecognized_sources.is_empty());
    }

    #[test]
    fn test_unrecognized_source_can_be_replaced_or_removed() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let mut config: Config =
            serde_json::from_str(r#"{"sources": {"old": {"type": "svn", "url": "x"}}}"#).unwrap();
        assert!(config.sources.is_empty());

        let duplicate =
            index.add_source(&mut config, "old", "raw_url", "https://a", SourceOptions::default());
        assert!(matches!(duplicate, Err(Error::DuplicateSource(_))));

        let overwrite = SourceOptions {
            overwrite: true,
            ..SourceOptions::default()
        };
        index
            .add_source(&mut config, "old", "raw_url", "https://a", overwrite)
            .unwrap();
        assert!(config.unrecognized_sources.is_empty());
        assert_eq!(config.sources["old"].url, "https://a");

        let mut config: Config =
            serde_json::from_str(r#"{"sources": {"old": {"type": "svn", "url": "x"}}}"#).unwrap();
        assert!(!index.remove_source(&mut config, "old").unwrap());
        assert!(!config.has_source("old"));
    }

    #[test]
    fn test_names_must_stay_inside_the_cache() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("remote-scripts");
        let index = RemoteIndex::with_fetcher(&cache, FakeFetcher::serving("x"));
        let mut config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);
        let outside = root.path().join("config.json");
        fs::write(&outside, "{}").unwrap();

        for name in ["../../config.json", "../config.json", "a/b", "..", "", "/tmp/x"] {
            let removed = index.remove_script("s", name);
            assert!(matches!(removed, Err(Error::InvalidName(_))), "{name}");

            let downloaded = index.download(&config, "s", "x.sh", Some(name));
            assert!(matches!(downloaded, Err(Error::InvalidName(_))), "{name}");
        }
        assert!(matches!(
            index.remove_script("..", "config.json"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            index.add_source(&mut config, "../x", "raw_url", "https://a", SourceOptions::default()),
            Err(Error::InvalidName(_))
        ));

        assert!(outside.exists());
        assert!(!cache.exists());
        assert!(index.fetcher.requested.borrow().is_empty());
    }

    #[test]
    fn test_find_ignores_rooted_names() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);
        fs::create_dir_all(index.source_dir("s")).unwrap();
        let elsewhere = TempDir::new().unwrap();
        let script = elsewhere.path().join("tool.sh");
        fs::write(&script, "").unwrap();

        assert!(index.find(&config, script.to_str().unwrap()).is_none());
    }

    #[test]
    fn test_remove_source_cascades_to_cache() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::serving("echo"));
        let mut config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);

        index.download(&config, "s", "x.sh", None).unwrap();
        assert!(index.source_dir("s").exists());

        assert!(index.remove_source(&mut config, "s").unwrap());
        assert!(!index.source_dir("s").exists());
        assert!(config.sources.is_empty());

        let again = index.remove_source(&mut config, "s");
        assert!(matches!(again, Err(Error::SourceNotFound(_))));
    }

    #[test]
    fn test_download_writes_body_and_sets_mode() {
        let cache = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving("#!/bin/sh\necho hi\n");
        let index = RemoteIndex::with_fetcher(cache.path(), fetcher);
        let config = config_with(&[("gh", source(SourceType::Github, "https://github.com/o/r"))]);

        let path = index
            .download(&config, "gh", "scripts/greet.sh", None)
            .unwrap();

        assert_eq!(path, cache.path().join("gh").join("greet.sh"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\necho hi\n");
        assert_eq!(
            index.fetcher.requested.borrow().as_slice(),
            ["https://raw.githubusercontent.com/o/r/main/scripts/greet.sh"]
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_download_twice_overwrites() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::serving("v"));
        let config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);

        let first = index.download(&config, "s", "x.js", Some("tool.js")).unwrap();
        let second = index.download(&config, "s", "x.js", Some("tool.js")).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached_file_names(&index.source_dir("s")), vec!["tool.js"]);
    }

    #[test]
    fn test_download_failures() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FailingFetcher);
        let config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);

        let unknown = index.download(&config, "nope", "x.sh", None);
        assert!(matches!(unknown, Err(Error::SourceNotFound(_))));

        let failed = index.download(&config, "s", "x.sh", None);
        assert!(matches!(failed, Err(Error::Download { .. })));
        assert!(!index.source_dir("s").exists());
    }

    #[test]
    fn test_find_respects_source_and_extension_order() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::default());
        let config = config_with(&[
            ("first", source(SourceType::RawUrl, "https://a")),
            ("second", source(SourceType::RawUrl, "https://b")),
        ]);

        fs::create_dir_all(index.source_dir("first")).unwrap();
        fs::create_dir_all(index.source_dir("second")).unwrap();
        fs::write(index.source_dir("first").join("tool.sh"), "").unwrap();
        fs::write(index.source_dir("first").join("tool.mjs"), "").unwrap();
        fs::write(index.source_dir("second").join("tool"), "").unwrap();

        let found = index.find(&config, "tool").unwrap();
        assert_eq!(found.source_name, "first");
        assert_eq!(found.path, index.source_dir("first").join("tool.sh"));

        assert!(index.find(&config, "other").is_none());
    }

    #[test]
    fn test_remove_script_cleans_empty_source_dir() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::serving("x"));
        let config = config_with(&[("s", source(SourceType::RawUrl, "https://a"))]);

        index.download(&config, "s", "a.sh", None).unwrap();
        index.download(&config, "s", "b.sh", None).unwrap();

        index.remove_script("s", "a.sh").unwrap();
        assert!(index.source_dir("s").exists());
        assert_eq!(index.list_scripts(&config)[0].scripts, vec!["b.sh"]);

        index.remove_script("s", "b.sh").unwrap();
        assert!(!index.source_dir("s").exists());
        assert!(index.list_scripts(&config).is_empty());

        let missing = index.remove_script("s", "b.sh");
        assert!(matches!(missing, Err(Error::ScriptNotFound { .. })));
    }

    #[test]
    fn test_list_sources_counts_cached_scripts() {
        let cache = TempDir::new().unwrap();
        let index = RemoteIndex::with_fetcher(cache.path(), FakeFetcher::serving("x"));
        let config = config_with(&[
            ("b", source(SourceType::RawUrl, "https://b")),
            ("a", source(SourceType::Github, "https://github.com/o/r")),
        ]);
        index.download(&config, "b", "one.sh", None).unwrap();

        let summaries = index.list_sources(&config);
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(summaries[0].script_count, 1);
        assert_eq!(summaries[1].script_count, 0);
    }
}
