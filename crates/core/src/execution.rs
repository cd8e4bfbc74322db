use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::{debug, info};

use crate::error::{Error, Result};

/// File extensions run through an interpreter, in lookup priority order
pub const SCRIPT_EXTENSIONS: [&str; 3] = ["js", "sh", "mjs"];

/// Environment variable carrying the invoker's working directory to scripts
pub const ORIGINAL_CWD_ENV: &str = "QUICK_SH_ORIGINAL_CWD";
/// Overrides the JavaScript runtime used for `.js` and `.mjs` scripts
pub const NODE_OVERRIDE_ENV: &str = "QUICK_SH_NODE";
/// Overrides the shell used for `.sh` scripts
pub const SH_OVERRIDE_ENV: &str = "QUICK_SH_SH";

const DEFAULT_NODE: &str = "node";
const DEFAULT_SH: &str = "sh";

/// How a resolved target is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// A script file run through its interpreter, chosen by extension.
    Script(PathBuf),
    /// A program spawned directly, by path or by PATH-resolved name.
    Program(OsString),
}

impl Launch {
    /// Scripts with a known extension go through an interpreter; anything
    /// else is spawned as a program.
    #[must_use]
    pub fn for_path(path: PathBuf) -> Self {
        if has_script_extension(&path) {
            Self::Script(path)
        } else {
            Self::Program(path.into_os_string())
        }
    }
}

#[must_use]
pub fn has_script_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| SCRIPT_EXTENSIONS.contains(&extension))
}

fn interpreter(override_env: &str, default: &str) -> OsString {
    env::var_os(override_env).unwrap_or_else(|| default.into())
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::fs::{set_permissions, Permissions};
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = set_permissions(path, Permissions::from_mode(0o755)) {
        debug!("Could not mark `{}` executable: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Builds the command for `launch` without running it.
///
/// `.js`/`.mjs` scripts keep the invoker's working directory, `.sh` scripts
/// run from their own directory. Scripts receive [`ORIGINAL_CWD_ENV`].
///
/// # Errors
///
/// Returns [`Error::UnsupportedFileType`] for a script whose extension has no
/// interpreter.
pub fn build_command(launch: &Launch, args: &[String]) -> Result<Command> {
    let original_cwd = env::current_dir().ok();

    let command = match launch {
        Launch::Program(program) => {
            let mut command = Command::new(program);
            command.args(args);
            command
        }
        Launch::Script(path) => {
            let extension = path
                .extension()
                .and_then(|extension| extension.to_str())
                .unwrap_or_default();

            let mut command = match extension {
                "js" | "mjs" => Command::new(interpreter(NODE_OVERRIDE_ENV, DEFAULT_NODE)),
                "sh" => {
                    make_executable(path);
                    let mut command = Command::new(interpreter(SH_OVERRIDE_ENV, DEFAULT_SH));
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        command.current_dir(parent);
                    }
                    command
                }
                _ => {
                    return Err(Error::UnsupportedFileType {
                        extension: extension.to_string(),
                        path: path.clone(),
                    })
                }
            };

            command.arg(path).args(args);
            if let Some(original_cwd) = original_cwd {
                command.env(ORIGINAL_CWD_ENV, original_cwd);
            }
            command
        }
    };

    Ok(command)
}

/// Runs a command with the caller's stdio attached and returns its exit code.
///
/// # Errors
///
/// Returns [`Error::Spawn`] if the process cannot be started or waited on.
pub fn execute_command(mut command: Command) -> Result<i32> {
    let program = command.get_program().to_string_lossy().to_string();
    let command = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("Spawning {command:?}");

    let status = command
        .spawn()
        .and_then(|mut child| child.wait())
        .map_err(|original| Error::Spawn { program, original })?;

    Ok(exit_code(status))
}

/// Starts `launch` with `args` and waits for it.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFileType`] or [`Error::Spawn`].
pub fn execute(launch: &Launch, args: &[String]) -> Result<i32> {
    match launch {
        Launch::Script(path) => info!("Executing: {}", path.display()),
        Launch::Program(program) => {
            info!("Executing system command: {}", program.to_string_lossy());
        }
    }
    if !args.is_empty() {
        info!("With args: {}", args.join(" "));
    }

    execute_command(build_command(launch, args)?)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::TempDir;

    fn args_of(command: &Command) -> Vec<&OsStr> {
        command.get_args().collect()
    }

    #[test]
    fn test_launch_for_path_by_extension() {
        assert_eq!(
            Launch::for_path(PathBuf::from("/s/a.mjs")),
            Launch::Script(PathBuf::from("/s/a.mjs"))
        );
        assert_eq!(
            Launch::for_path(PathBuf::from("/usr/bin/python3")),
            Launch::Program(OsString::from("/usr/bin/python3"))
        );
        assert_eq!(
            Launch::for_path(PathBuf::from("/s/notes.txt")),
            Launch::Program(OsString::from("/s/notes.txt"))
        );
    }

    #[test]
    fn test_program_keeps_args_unchanged() {
        let args = vec!["--version".to_string(), "a b".to_string()];
        let command =
            build_command(&Launch::Program(OsString::from("/usr/bin/python3")), &args).unwrap();

        assert_eq!(command.get_program(), "/usr/bin/python3");
        assert_eq!(args_of(&command), vec!["--version", "a b"]);
        assert!(command.get_current_dir().is_none());
    }

    #[test]
    fn test_js_script_uses_runtime_and_original_cwd() {
        let command = build_command(
            &Launch::Script(PathBuf::from("/scripts/hello.js")),
            &["world".to_string()],
        )
        .unwrap();

        assert_eq!(args_of(&command), vec!["/scripts/hello.js", "world"]);
        assert!(command.get_current_dir().is_none());
        assert!(command
            .get_envs()
            .any(|(key, value)| key == ORIGINAL_CWD_ENV && value.is_some()));
    }

    #[test]
    fn test_sh_script_runs_in_its_directory() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("build.sh");
        fs::write(&script, "exit 0\n").unwrap();

        let command = build_command(&Launch::Script(script.clone()), &[]).unwrap();

        assert_eq!(command.get_current_dir(), Some(dir.path()));
        assert_eq!(args_of(&command), vec![script.as_os_str()]);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = build_command(&Launch::Script(PathBuf::from("/s/tool.py")), &[]);
        assert!(
            matches!(result, Err(Error::UnsupportedFileType { extension, .. }) if extension == "py")
        );
    }

    #[test]
    fn test_spawn_failure_reports_program() {
        let result = execute(
            &Launch::Program(OsString::from("quick-sh-no-such-binary-xyz")),
            &[],
        );
        assert!(
            matches!(result, Err(Error::Spawn { program, .. }) if program == "quick-sh-no-such-binary-xyz")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_propagated() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "exit \"$1\"\n").unwrap();

        let code = execute(&Launch::Script(script), &["7".to_string()]).unwrap();
        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_sh_script_is_made_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("plain.sh");
        fs::write(&script, "exit 0\n").unwrap();

        build_command(&Launch::Script(script.clone()), &[]).unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
