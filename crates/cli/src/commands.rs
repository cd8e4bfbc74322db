//! Handlers for each CLI action.
//!
//! Every handler returns the exit code for the process. Management actions
//! print their results to stdout; failures to persist the configuration are
//! logged and do not change the exit code.

use std::io::stdout;
use std::path::Path;

use log::{debug, error, info};
use quick_sh_core::alias::AliasMap;
use quick_sh_core::config::{get_config_dir, Config, ConfigStore};
use quick_sh_core::error::{Error, Result};
use quick_sh_core::language::{self, current_language};
use quick_sh_core::locator::ScanOptions;
use quick_sh_core::remote::{RemoteIndex, SourceOptions};
use quick_sh_core::{execute_script, list_resolvable};
use serde_json::{Map, Value};

use crate::cli_args::Args;
use crate::status::{self, StatusReport};

const SUCCESS: i32 = 0;

fn save(store: &ConfigStore, config: &Config) {
    if let Err(e) = store.write(config) {
        error!("Could not save configuration: {e}");
    }
}

fn set_path(store: &ConfigStore, path: &str) -> Result<i32> {
    let absolute = store.set_script_path(Path::new(path))?;
    println!("Script directory set to: {}", absolute.display());
    Ok(SUCCESS)
}

fn show_status(store: &ConfigStore, depth: usize) -> Result<i32> {
    let config = store.read();
    let Some(script_root) = config.script_path.as_deref() else {
        println!("{}", Error::NoPathConfigured);
        return Ok(SUCCESS);
    };

    let aliases = AliasMap::load(script_root);
    let scripts = list_resolvable(script_root, ScanOptions { max_depth: depth });
    let remote_scripts = RemoteIndex::new(store.remote_scripts_dir()).list_scripts(&config);

    let report = StatusReport {
        script_root,
        aliases: &aliases,
        scripts: &scripts,
        remote_scripts: &remote_scripts,
    };
    status::print_status(&mut stdout(), &report)?;
    Ok(SUCCESS)
}

fn show_or_set_language(store: &ConfigStore, code: Option<&str>) -> Result<i32> {
    if let Some(code) = code {
        language::set_language(store, code)?;
        println!("Language set to: {code}");
        return Ok(SUCCESS);
    }

    let config = store.read();
    let (active, source) = current_language(&config);
    status::print_language(&mut stdout(), &active, config.language.as_deref(), &source)?;
    Ok(SUCCESS)
}

/// Splits repeated `key=value` flags into a JSON object.
///
/// # Errors
///
/// Returns [`Error::InvalidSourceOption`] for a value without `=` or with an
/// empty key.
pub fn parse_source_options(options: &[String]) -> Result<Map<String, Value>> {
    options
        .iter()
        .map(|option| match option.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                Ok((key.to_string(), Value::String(value.to_string())))
            }
            _ => Err(Error::InvalidSourceOption(option.clone())),
        })
        .collect()
}

fn add_source(store: &ConfigStore, args: &Args, values: &[String]) -> Result<i32> {
    let [name, source_type, url] = values else {
        return Err(Error::MissingSourceArgument);
    };

    let options = SourceOptions {
        branch: args.branch.clone(),
        extra: parse_source_options(&args.source_options)?,
        overwrite: args.force,
    };

    let index = RemoteIndex::new(store.remote_scripts_dir());
    let mut config = store.read();
    index.add_source(&mut config, name, source_type, url, options)?;
    save(store, &config);

    println!("Added source `{name}` ({source_type}): {url}");
    Ok(SUCCESS)
}

fn remove_source(store: &ConfigStore, name: &str) -> Result<i32> {
    let index = RemoteIndex::new(store.remote_scripts_dir());
    let mut config = store.read();
    let deleted_cache = index.remove_source(&mut config, name)?;
    save(store, &config);

    println!("Removed source `{name}`");
    if deleted_cache {
        println!("Deleted downloaded scripts of `{name}`");
    }
    Ok(SUCCESS)
}

fn download(store: &ConfigStore, values: &[String]) -> Result<i32> {
    let (source_name, remote_path, local_name) = match values {
        [source_name, remote_path] => (source_name, remote_path, None),
        [source_name, remote_path, local_name] => {
            (source_name, remote_path, Some(local_name.as_str()))
        }
        _ => return Err(Error::MissingSourceArgument),
    };

    let index = RemoteIndex::new(store.remote_scripts_dir());
    let config = store.read();
    let path = index.download(&config, source_name, remote_path, local_name)?;

    println!("Downloaded to: {}", path.display());
    Ok(SUCCESS)
}

fn remove_remote(store: &ConfigStore, values: &[String]) -> Result<i32> {
    let [source_name, script] = values else {
        return Err(Error::MissingSourceArgument);
    };

    RemoteIndex::new(store.remote_scripts_dir()).remove_script(source_name, script)?;
    println!("Removed remote script `{source_name}/{script}`");
    Ok(SUCCESS)
}

/// Runs the action selected by `args`.
///
/// Management flags are checked first, in a fixed order; a script name is
/// only dispatched when none of them is present.
///
/// # Errors
///
/// Returns any error raised by the selected action.
pub fn run(args: &Args) -> Result<i32> {
    let store = ConfigStore::new(get_config_dir(args.config_dir.as_deref()));
    debug!("Config directory: `{}`", store.dir().display());

    if let Some(path) = &args.path {
        return set_path(&store, path);
    }
    if let Some(code) = &args.lang {
        return show_or_set_language(&store, code.as_deref());
    }
    if args.sources {
        let config = store.read();
        let sources = RemoteIndex::new(store.remote_scripts_dir()).list_sources(&config);
        status::print_sources(&mut stdout(), &sources)?;
        return Ok(SUCCESS);
    }
    if let Some(values) = &args.add_source {
        return add_source(&store, args, values);
    }
    if let Some(name) = &args.remove_source {
        return remove_source(&store, name);
    }
    if let Some(values) = &args.download {
        return download(&store, values);
    }
    if args.remote_list {
        let config = store.read();
        let remote_scripts = RemoteIndex::new(store.remote_scripts_dir()).list_scripts(&config);
        status::print_remote_scripts(&mut stdout(), &remote_scripts)?;
        return Ok(SUCCESS);
    }
    if let Some(values) = &args.remove_remote {
        return remove_remote(&store, values);
    }
    if args.list {
        return show_status(&store, args.depth);
    }

    match args.script() {
        Some(name) => {
            info!("Running `{name}`");
            execute_script(&store, name, args.script_args())
        }
        None => {
            status::print_usage(&mut stdout())?;
            Ok(SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_options() {
        let options = parse_source_options(&[
            "token=abc".to_string(),
            "path=a=b".to_string(),
            "empty=".to_string(),
        ])
        .unwrap();

        assert_eq!(options["token"], "abc");
        assert_eq!(options["path"], "a=b");
        assert_eq!(options["empty"], "");
    }

    #[test]
    fn test_parse_source_options_rejects_bad_format() {
        let result = parse_source_options(&["token".to_string()]);
        assert!(matches!(result, Err(Error::InvalidSourceOption(option)) if option == "token"));

        let result = parse_source_options(&["=value".to_string()]);
        assert!(result.is_err());
    }
}
