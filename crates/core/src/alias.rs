//! Alias definitions stored in `<scriptPath>/config.json`.
//!
//! The alias file is either a flat object of `name -> value` pairs or an
//! object whose `aliases` key holds that mapping. Each value is classified
//! once, when the file is loaded, into an [`AliasTarget`].

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::execution::Launch;
use crate::resolve::PathLookup;

/// File name of the alias configuration inside the script root
pub const ALIAS_FILE_NAME: &str = "config.json";
const WRAPPER_KEY: &str = "aliases";

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// An absolute path, given either as a bare string or as an absolute `bin`.
    AbsolutePath {
        path: PathBuf,
        description: Option<String>,
    },
    /// A bare, non-absolute string: a command looked up on PATH.
    SystemCommand(String),
    /// A `bin` relative to the script root.
    RelativeBin {
        path: PathBuf,
        description: Option<String>,
    },
}

/// Grouping used when listing aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AliasKind {
    Relative,
    Absolute,
    System,
}

impl AliasTarget {
    #[must_use]
    pub fn kind(&self) -> AliasKind {
        match self {
            Self::RelativeBin { .. } => AliasKind::Relative,
            Self::AbsolutePath { .. } => AliasKind::Absolute,
            Self::SystemCommand(_) => AliasKind::System,
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::AbsolutePath { description, .. } | Self::RelativeBin { description, .. } => {
                description.as_deref()
            }
            Self::SystemCommand(_) => None,
        }
    }

    /// The value as written in the alias file.
    #[must_use]
    pub fn bin(&self) -> String {
        match self {
            Self::AbsolutePath { path, .. } | Self::RelativeBin { path, .. } => {
                path.display().to_string()
            }
            Self::SystemCommand(command) => command.clone(),
        }
    }
}

/// A classified alias file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasValue {
    Target(AliasTarget),
    /// Neither a string nor an object with a string `bin`.
    Malformed,
}

/// The aliases of one script root, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: IndexMap<String, AliasValue>,
}

/// A JSON object where the first occurrence of a duplicated key is kept.
struct FirstWins<V>(IndexMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for FirstWins<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FirstWinsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for FirstWinsVisitor<V> {
            type Value = FirstWins<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = IndexMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.entry(key).or_insert(value);
                }
                Ok(FirstWins(entries))
            }
        }

        deserializer.deserialize_map(FirstWinsVisitor(PhantomData))
    }
}

/// Falsy JSON values mean "no alias" and let resolution fall through.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(string) => string.is_empty(),
        _ => false,
    }
}

fn classify(value: &Value) -> AliasValue {
    match value {
        Value::String(string) => {
            let path = Path::new(string);
            if path.is_absolute() {
                AliasValue::Target(AliasTarget::AbsolutePath {
                    path: path.to_path_buf(),
                    description: None,
                })
            } else {
                AliasValue::Target(AliasTarget::SystemCommand(string.clone()))
            }
        }
        Value::Object(object) => {
            let Some(Value::String(bin)) = object.get("bin") else {
                return AliasValue::Malformed;
            };
            if bin.is_empty() {
                return AliasValue::Malformed;
            }

            let description = object
                .get("description")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let path = PathBuf::from(bin);

            if path.is_absolute() {
                AliasValue::Target(AliasTarget::AbsolutePath { path, description })
            } else {
                AliasValue::Target(AliasTarget::RelativeBin { path, description })
            }
        }
        _ => AliasValue::Malformed,
    }
}

fn parse_entries(content: &str) -> serde_json::Result<IndexMap<String, Value>> {
    let document: FirstWins<Box<RawValue>> = serde_json::from_str(content)?;

    if let Some(raw) = document.0.get(WRAPPER_KEY) {
        if let Ok(FirstWins(aliases)) = serde_json::from_str::<FirstWins<Value>>(raw.get()) {
            return Ok(aliases);
        }
    }

    document
        .0
        .into_iter()
        .map(|(name, raw)| Ok((name, serde_json::from_str(raw.get())?)))
        .collect()
}

impl AliasMap {
    /// Parses the contents of an alias file.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `content` is not a JSON object.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let entries = parse_entries(content)?
            .into_iter()
            .filter(|(_, value)| !is_empty_value(value))
            .map(|(name, value)| {
                let classified = classify(&value);
                (name, classified)
            })
            .collect();

        Ok(Self { entries })
    }

    /// Loads the alias file of `script_root`.
    ///
    /// An absent file is an empty map. An unreadable or malformed file is
    /// logged and also treated as empty.
    pub fn load(script_root: &Path) -> Self {
        let path = alias_file_path(script_root);
        if !path.is_file() {
            return Self::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Ignoring unreadable alias file `{}`: {e}", path.display());
                return Self::default();
            }
        };

        Self::parse(&content).unwrap_or_else(|e| {
            warn!("Ignoring malformed alias file `{}`: {e}", path.display());
            Self::default()
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AliasValue> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &AliasValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[must_use]
pub fn alias_file_path(script_root: &Path) -> PathBuf {
    script_root.join(ALIAS_FILE_NAME)
}

/// Resolves `name` through the alias file of `script_root`.
///
/// Returns `Ok(None)` when there is no alias named `name`. An alias that
/// exists but cannot be honoured is an error, never a fall-through.
///
/// # Errors
///
/// - [`Error::AliasNotFound`] if the aliased path does not exist
/// - [`Error::AliasCommandNotFound`] if the aliased command is not on PATH
/// - [`Error::InvalidAlias`] if the alias value has an unsupported shape
pub fn resolve_alias(
    script_root: &Path,
    name: &str,
    path_lookup: &dyn PathLookup,
) -> Result<Option<Launch>> {
    let aliases = AliasMap::load(script_root);

    let Some(value) = aliases.get(name) else {
        debug!("No alias named `{name}`");
        return Ok(None);
    };

    let target = match value {
        AliasValue::Target(target) => target,
        AliasValue::Malformed => return Err(Error::InvalidAlias(name.to_string())),
    };

    let launch = match target {
        AliasTarget::SystemCommand(command) => {
            if path_lookup.find(command).is_none() {
                return Err(Error::AliasCommandNotFound {
                    alias: name.to_string(),
                    command: command.clone(),
                });
            }
            info!("Alias `{name}` runs system command `{command}`");
            Launch::Program(command.into())
        }
        AliasTarget::AbsolutePath { path, .. } => {
            if !path.exists() {
                return Err(Error::AliasNotFound(path.clone()));
            }
            info!("Alias `{name}` runs absolute path `{}`", path.display());
            Launch::for_path(path.clone())
        }
        AliasTarget::RelativeBin { path, .. } => {
            let full_path = script_root.join(path);
            if !full_path.exists() {
                return Err(Error::AliasNotFound(full_path));
            }
            info!("Alias `{name}` runs relative path `{}`", path.display());
            Launch::for_path(full_path)
        }
    };

    Ok(Some(launch))
}
