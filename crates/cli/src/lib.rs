//! Quick-sh CLI Library
//!
//! This crate provides the `q` command-line front end for quick-sh. It parses
//! arguments, runs the management actions, and hands script names to the
//! core crate for resolution and execution.
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing
//! - [`commands`]: One handler per action, returning the process exit code
//! - [`status`]: Listings for scripts, aliases, sources and languages
//!
//! # Examples
//!
//! ```bash
//! # Point quick-sh at a script directory
//! q --path ~/scripts
//!
//! # Run `~/scripts/deploy.sh` (or `deploy.js`, or `deploy/index.js`, ...)
//! q deploy --env prod
//!
//! # Show everything that can be run
//! q -l
//!
//! # Register a GitHub source and download a script from it
//! q --add-source tools github https://github.com/acme/tools
//! q --download tools bin/lint.sh
//! ```

pub mod cli_args;
pub mod commands;
pub mod status;
