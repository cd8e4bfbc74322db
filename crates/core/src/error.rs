use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Path does not exist or is not a directory: `{}`", .0.display())]
    PathNotFound(PathBuf),

    #[error("No script path configured. Use `q --path <directory>` to set one.")]
    NoPathConfigured,

    #[error("Alias target not found: `{}`", .0.display())]
    AliasNotFound(PathBuf),

    #[error("Alias `{}` points to system command `{}`, which was not found on PATH", .alias, .command)]
    AliasCommandNotFound { alias: String, command: String },

    #[error("Invalid alias configuration for `{}`: expected a string or an object with `bin`", .0)]
    InvalidAlias(String),

    #[error("No index.js, index.sh, or index.mjs found in directory: `{}`", .0.display())]
    NoEntryPoint(PathBuf),

    #[error("Invalid source type `{}`. Supported types: {}", .given, .supported)]
    InvalidSourceType { given: String, supported: String },

    #[error("Source type `{}` is not supported for downloads yet", .0)]
    UnsupportedSourceType(String),

    #[error("Source name, type and URL are required")]
    MissingSourceArgument,

    #[error("Invalid source option `{}`: expected key=value", .0)]
    InvalidSourceOption(String),

    #[error("Option `{}` is reserved for the source definition", .0)]
    ReservedSourceOption(String),

    #[error("Source `{}` already exists. Use --force to replace it.", .0)]
    DuplicateSource(String),

    #[error("Invalid name `{}`: expected a plain file name", .0)]
    InvalidName(String),

    #[error("Source not found: `{}`", .0)]
    SourceNotFound(String),

    #[error("Invalid GitHub URL: `{}`", .0)]
    InvalidGithubUrl(String),

    #[error("Download of `{}` failed: {}", .url, .reason)]
    Download { url: String, reason: String },

    #[error("Remote script not found: `{}/{}`", .source_name, .script)]
    ScriptNotFound { source_name: String, script: String },

    #[error("Unsupported file type `{}` for `{}`", .extension, .path.display())]
    UnsupportedFileType { extension: String, path: PathBuf },

    #[error("Command not found: `{}`\nLooked in:\n{}", .name, bullet_list(.searched))]
    CommandNotFound { name: String, searched: Vec<String> },

    #[error("Failed to start `{}`: {}", .program, .original)]
    Spawn {
        program: String,
        original: std::io::Error,
    },

    #[error("Terminal output failed: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("Unsupported language `{}`. Supported: {}", .given, .supported)]
    UnsupportedLanguage { given: String, supported: String },

    #[error("IO error with {} at path `{}`: {}", .description, .path.display(), .original)]
    Io {
        description: String,
        path: PathBuf,
        original: std::io::Error,
    },

    #[error("Error {} {} file at `{}`: {}", .action, .description, .path.display(), .original)]
    Json {
        action: String,
        description: String,
        path: PathBuf,
        original: serde_json::Error,
    },
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    pub fn io_error(description: &str, path: impl Into<PathBuf>, original: std::io::Error) -> Self {
        Self::Io {
            description: description.to_string(),
            path: path.into(),
            original,
        }
    }

    pub fn json_error(
        action: &str,
        description: &str,
        path: impl Into<PathBuf>,
        original: serde_json::Error,
    ) -> Self {
        Self::Json {
            action: action.to_string(),
            description: description.to_string(),
            path: path.into(),
            original,
        }
    }

    pub fn download_error(url: &str, reason: impl ToString) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
