//! Command-line argument parsing.
//!
//! Management flags (`--path`, `--add-source`, ...) are handled before
//! anything else. A bare name runs a script and every argument after it is
//! handed to the script untouched, including ones that look like flags.

use clap::Parser;
use quick_sh_core::locator::DEFAULT_SCAN_DEPTH;

/// Command-line arguments for the `q` script runner.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use quick_sh_cli::cli_args::Args;
///
/// let args = Args::parse_from(["q", "deploy", "--dry-run"]);
/// assert_eq!(args.script(), Some("deploy"));
/// assert_eq!(args.script_args(), ["--dry-run"]);
/// ```
#[derive(Parser, Debug)]
#[command(name = "q", version, about = "Run scripts from your script directory by name")]
#[command(term_width = 0)] // Just to make testing across clap features easier
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Set the script directory.
    #[arg(long, value_name = "DIR")]
    pub path: Option<String>,

    /// Show the configured directory, aliases, scripts and downloaded scripts.
    #[arg(long, short = 'l', action)]
    pub list: bool,

    /// How many directory levels `--list` scans.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SCAN_DEPTH)]
    pub depth: usize,

    /// Set the display language, or show it when no code is given.
    #[arg(long, value_name = "CODE", num_args = 0..=1)]
    pub lang: Option<Option<String>>,

    /// List registered remote sources.
    #[arg(long, short = 's', action)]
    pub sources: bool,

    /// Register a remote source. TYPE is one of `github`, `raw_url`, `git`.
    #[arg(long, num_args = 3, value_names = ["NAME", "TYPE", "URL"])]
    pub add_source: Option<Vec<String>>,

    /// Branch used for a GitHub source (defaults to `main`).
    #[arg(long, requires = "add_source")]
    pub branch: Option<String>,

    /// Extra option stored with a new source.
    ///
    /// Multiple options can be provided with repeated `--option` flags.
    #[arg(long = "option", value_name = "KEY=VALUE", requires = "add_source", action = clap::ArgAction::Append)]
    pub source_options: Vec<String>,

    /// Replace a source that already exists.
    #[arg(long, requires = "add_source", action)]
    pub force: bool,

    /// Remove a source and its downloaded scripts.
    #[arg(long, value_name = "NAME")]
    pub remove_source: Option<String>,

    /// Download a script from a source, optionally under another name.
    #[arg(long, num_args = 2..=3, value_names = ["SOURCE", "REMOTE_PATH", "LOCAL_NAME"])]
    pub download: Option<Vec<String>>,

    /// List downloaded scripts.
    #[arg(long, visible_alias = "rl", action)]
    pub remote_list: bool,

    /// Delete one downloaded script.
    #[arg(long, num_args = 2, value_names = ["SOURCE", "SCRIPT"])]
    pub remove_remote: Option<Vec<String>>,

    /// Directory holding `config.json` and downloaded scripts.
    ///
    /// If not provided, defaults to `~/.quick-sh`.
    #[arg(long, env = "QUICK_SH_HOME", value_name = "DIR")]
    pub config_dir: Option<String>,

    /// Alias, script, remote script or system command to run, followed by
    /// the arguments passed to it unchanged.
    #[arg(
        value_name = "SCRIPT [ARGS]",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl Args {
    /// The name to resolve, if any.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments following the script name.
    #[must_use]
    pub fn script_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}
