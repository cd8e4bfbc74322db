//! Quick-sh Core Library
//!
//! This crate provides the core functionality for quick-sh, a launcher that
//! runs scripts from a personal script directory by short name.
//!
//! # Key Features
//!
//! - **Resolution**: Map a name to an alias, a local script, a downloaded
//!   remote script, or a system command, in that order
//! - **Execution**: Run the target with inherited stdio and pass its exit code back
//! - **Remote Sources**: Register script sources and cache downloaded scripts
//! - **Configuration Management**: Read and write `~/.quick-sh/config.json`
//! - **Error Handling**: One error type for every failure mode
//!
//! # Examples
//!
//! Running a script by name:
//!
//! ```no_run
//! use quick_sh_core::config::{get_config_dir, ConfigStore};
//! use quick_sh_core::execute_script;
//!
//! let store = ConfigStore::new(get_config_dir(None));
//! let code = execute_script(&store, "hello", &["world".to_string()])?;
//! std::process::exit(code);
//! # Ok::<(), quick_sh_core::error::Error>(())
//! ```

pub mod alias;
pub mod config;
pub mod error;
pub mod execution;
pub mod language;
pub mod locator;
pub mod remote;
pub mod resolve;

pub use resolve::{execute_script, list_resolvable};
