//! Finding scripts inside the script root.
//!
//! [`locate`] is used by dispatch and follows strict priority rules.
//! [`scan_scripts`] walks the tree for listings only and never fails.

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::alias::ALIAS_FILE_NAME;
use crate::error::{Error, Result};
use crate::execution::SCRIPT_EXTENSIONS;

/// Entry points of a directory script, in priority order
pub const INDEX_FILES: [&str; 3] = ["index.js", "index.sh", "index.mjs"];

/// Default recursion depth of [`scan_scripts`]
pub const DEFAULT_SCAN_DEPTH: usize = 3;

const DESCRIPTION_SCAN_LINES: usize = 10;

/// A script found by [`locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    File(PathBuf),
    Directory { dir: PathBuf, entry: PathBuf },
}

impl Located {
    /// The file that is actually executed.
    #[must_use]
    pub fn entry(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Directory { entry, .. } => entry,
        }
    }
}

fn find_index_file(dir: &Path) -> Option<&'static str> {
    INDEX_FILES
        .into_iter()
        .find(|index_file| dir.join(index_file).is_file())
}

/// Whether `name` would replace a base directory it is joined onto.
#[must_use]
pub fn is_rooted(name: &str) -> bool {
    let path = Path::new(name);
    path.has_root() || matches!(path.components().next(), Some(Component::Prefix(_)))
}

/// Finds the script called `name` inside `dir`.
///
/// A directory named `name` wins and must contain an entry point. Otherwise
/// `name`, `name.js`, `name.sh` and `name.mjs` are tried in that order.
/// An absolute `name` never matches.
///
/// # Errors
///
/// Returns [`Error::NoEntryPoint`] if `dir/name` is a directory without an
/// index file.
pub fn locate(dir: &Path, name: &str) -> Result<Option<Located>> {
    if is_rooted(name) {
        debug!("`{name}` is rooted, skipping `{}`", dir.display());
        return Ok(None);
    }

    let candidate = dir.join(name);

    if candidate.is_dir() {
        return match find_index_file(&candidate) {
            Some(index_file) => {
                let entry = candidate.join(index_file);
                debug!("Found directory script `{}`", entry.display());
                Ok(Some(Located::Directory {
                    dir: candidate,
                    entry,
                }))
            }
            None => Err(Error::NoEntryPoint(candidate)),
        };
    }

    let mut variants = vec![candidate.clone()];
    variants.extend(
        SCRIPT_EXTENSIONS
            .iter()
            .map(|extension| dir.join(format!("{name}.{extension}"))),
    );

    for variant in variants {
        debug!("Trying `{}`", variant.display());
        if variant.is_file() {
            return Ok(Some(Located::File(variant)));
        }
    }

    Ok(None)
}

/// Options for [`scan_scripts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Number of directory levels visited below the root.
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SCAN_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptKind {
    File,
    Directory { entry: String },
}

/// A script discovered by [`scan_scripts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: String,
    pub kind: ScriptKind,
    /// Path relative to the scanned root, `/`-separated.
    pub path: String,
    pub description: Option<String>,
}

impl ScriptInfo {
    /// The directory part of [`ScriptInfo::path`], `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(parent, _)| parent)
    }
}

#[derive(Deserialize)]
struct PackageManifest {
    description: Option<String>,
}

fn package_description(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: PackageManifest = serde_json::from_str(&content).ok()?;
    manifest.description.filter(|description| !description.is_empty())
}

/// Extracts a description from the header comment of a script.
///
/// Looks at the first lines for `// Description:`, `// @description`,
/// `# Description:`, `# @description`, or any `Description: ...`.
#[must_use]
pub fn parse_description(content: &str) -> Option<String> {
    const MARKERS: [&str; 4] = [
        "// Description:",
        "// @description",
        "# Description:",
        "# @description",
    ];

    for line in content.lines().take(DESCRIPTION_SCAN_LINES) {
        let trimmed = line.trim();

        if let Some(rest) = MARKERS
            .iter()
            .find_map(|marker| trimmed.strip_prefix(marker))
        {
            return Some(rest.trim().to_string());
        }

        if let Some((_, rest)) = trimmed.split_once("Description:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }

    None
}

fn script_description(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    parse_description(&content).filter(|description| !description.is_empty())
}

fn is_skipped(file_name: &str) -> bool {
    file_name.starts_with('.') || file_name == ALIAS_FILE_NAME || file_name.starts_with("README")
}

fn is_script_file_name(file_name: &str) -> bool {
    SCRIPT_EXTENSIONS
        .iter()
        .any(|extension| file_name.ends_with(&format!(".{extension}")))
}

fn scan_dir(dir: &Path, base: &str, depth: usize, options: ScanOptions, out: &mut Vec<ScriptInfo>) {
    if depth >= options.max_depth {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping unreadable directory `{}`: {e}", dir.display());
            return;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !is_skipped(name))
        .collect();
    names.sort();

    for file_name in names {
        let path = dir.join(&file_name);
        let relative = if base.is_empty() {
            file_name.clone()
        } else {
            format!("{base}/{file_name}")
        };

        if path.is_dir() {
            if let Some(index_file) = find_index_file(&path) {
                let description = package_description(&path)
                    .or_else(|| script_description(&path.join(index_file)));
                out.push(ScriptInfo {
                    name: relative.clone(),
                    kind: ScriptKind::Directory {
                        entry: index_file.to_string(),
                    },
                    path: relative.clone(),
                    description,
                });
            }

            scan_dir(&path, &relative, depth + 1, options, out);
        } else if is_script_file_name(&file_name) {
            out.push(ScriptInfo {
                description: script_description(&path),
                name: file_name,
                kind: ScriptKind::File,
                path: relative,
            });
        }
    }
}

/// Lists every script reachable below `root`, up to `options.max_depth`
/// directory levels.
#[must_use]
pub fn scan_scripts(root: &Path, options: ScanOptions) -> Vec<ScriptInfo> {
    let mut scripts = Vec::new();
    scan_dir(root, "", 0, options, &mut scripts);
    scripts
}
