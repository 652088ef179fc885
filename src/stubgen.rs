//! Stub generator invocation.
//!
//! Runs `pybind11-stubgen` (or a configured replacement command) against the
//! binding module and reports which stub files it wrote, by comparing
//! modification times under the output directory before and after the run.
//!
//! ## Interpreter Resolution Order
//!
//! 1. Explicit `--python` flag
//! 2. `generator.python` from the configuration file
//! 3. `$STUBFIX_PYTHON` environment variable
//! 4. `python3`, then `python`, from `$PATH`
//!
//! A configured `generator.program` replaces `<python> -m pybind11_stubgen`
//! entirely, so no interpreter is looked up in that case.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use stubfix_core::config::GeneratorConfig;
use stubfix_core::error::StubfixError;
use stubfix_core::snapshot::{compile_glob, ChangedFileSet, MtimeSnapshot};

/// Environment variable naming the interpreter that runs the generator.
pub const PYTHON_ENV_VAR: &str = "STUBFIX_PYTHON";

/// Interpreter names looked up on `$PATH`, in order.
const PYTHON_CANDIDATES: [&str; 2] = ["python3", "python"];

// ============================================================================
// Command Construction
// ============================================================================

/// Arguments handed to the generator after its program prefix.
///
/// Order: the submodule, one `--enum-class-locations` pair per location,
/// one `--ignore-unresolved-names` pair per pattern, `--output-dir`, then
/// `--exit-code` when enabled and finally any configured extra arguments.
pub fn generator_args(config: &GeneratorConfig, output_dir: &Path) -> Vec<String> {
    let mut args = vec![config.submodule.clone()];
    for location in &config.enum_class_locations {
        args.push("--enum-class-locations".to_string());
        args.push(location.clone());
    }
    for pattern in &config.ignore_unresolved_names {
        args.push("--ignore-unresolved-names".to_string());
        args.push(pattern.clone());
    }
    args.push("--output-dir".to_string());
    args.push(output_dir.to_string_lossy().into_owned());
    if config.exit_code {
        args.push("--exit-code".to_string());
    }
    args.extend(config.extra_args.iter().cloned());
    args
}

/// Find the interpreter that runs the generator.
pub fn resolve_python(
    explicit: Option<&Path>,
    configured: Option<&str>,
) -> Result<PathBuf, StubfixError> {
    if let Some(path) = explicit {
        debug!(python = %path.display(), "using interpreter from --python");
        return Ok(path.to_path_buf());
    }
    if let Some(path) = configured {
        debug!(python = path, "using interpreter from configuration");
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = env::var_os(PYTHON_ENV_VAR).filter(|value| !value.is_empty()) {
        debug!(python = ?path, "using interpreter from ${}", PYTHON_ENV_VAR);
        return Ok(PathBuf::from(path));
    }
    for name in PYTHON_CANDIDATES {
        if let Ok(path) = which::which(name) {
            debug!(python = %path.display(), "using interpreter from $PATH");
            return Ok(path);
        }
    }

    let mut searched = vec![format!("${}", PYTHON_ENV_VAR)];
    searched.extend(PYTHON_CANDIDATES.iter().map(|name| name.to_string()));
    Err(StubfixError::PythonNotFound { searched })
}

/// The full generator command line: program prefix followed by arguments.
pub fn generator_command(
    config: &GeneratorConfig,
    output_dir: &Path,
    python: Option<&Path>,
) -> Result<Vec<String>, StubfixError> {
    let mut command = match &config.program {
        Some(program) if program.is_empty() => {
            return Err(StubfixError::config(None, "generator.program is empty"));
        }
        Some(program) => program.clone(),
        None => {
            let python = resolve_python(python, config.python.as_deref())?;
            vec![
                python.to_string_lossy().into_owned(),
                "-m".to_string(),
                "pybind11_stubgen".to_string(),
            ]
        }
    };
    command.extend(generator_args(config, output_dir));
    Ok(command)
}

// ============================================================================
// Execution
// ============================================================================

/// Run `command` to completion with inherited standard streams.
///
/// Fails when the process cannot be started, exits unsuccessfully, or
/// outlives `timeout`.
pub fn run_command(command: &[String], timeout: Option<Duration>) -> Result<(), StubfixError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| StubfixError::invalid_args("empty generator command"))?;
    let command_line = command.join(" ");
    debug!(command = %command_line, "running stub generator");

    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| StubfixError::GeneratorSpawn {
            program: program.clone(),
            source,
        })?;

    let status = match timeout {
        Some(timeout) => {
            // Wait with timeout using OS-level waiting (no polling)
            let waited = child
                .wait_timeout(timeout)
                .map_err(|e| StubfixError::io(program, e))?;
            match waited {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    warn!(command = %command_line, ?timeout, "stub generator timed out");
                    return Err(StubfixError::GeneratorTimeout {
                        command: command_line,
                        seconds: timeout.as_secs(),
                    });
                }
            }
        }
        None => child.wait().map_err(|e| StubfixError::io(program, e))?,
    };

    debug!(elapsed = ?start.elapsed(), code = ?status.code(), "stub generator finished");
    if status.success() {
        Ok(())
    } else {
        Err(StubfixError::GeneratorFailed {
            command: command_line,
            code: status.code(),
        })
    }
}

/// Run the generator into `output_dir` and return the stub files it changed.
pub fn run_generator(
    config: &GeneratorConfig,
    output_dir: &Path,
    python: Option<&Path>,
) -> Result<ChangedFileSet, StubfixError> {
    let glob = compile_glob(&config.glob())?;
    let command = generator_command(config, output_dir, python)?;
    let timeout = config.timeout_secs.map(Duration::from_secs);

    let before = MtimeSnapshot::capture(output_dir, &glob)?;
    run_command(&command, timeout)?;
    let after = MtimeSnapshot::capture(output_dir, &glob)?;

    let changed = before.changed_since(&after);
    info!(
        output_dir = %output_dir.display(),
        matched = after.len(),
        changed = changed.len(),
        "stub generation complete"
    );
    Ok(changed)
}

/// Every stub file currently matching the glob, for runs without generation.
pub fn existing_stubs(
    config: &GeneratorConfig,
    output_dir: &Path,
) -> Result<ChangedFileSet, StubfixError> {
    let glob = compile_glob(&config.glob())?;
    Ok(MtimeSnapshot::capture(output_dir, &glob)?.into_changed())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arguments_match_f3d_invocation() {
        let config = GeneratorConfig::default();
        let args = generator_args(&config, Path::new("/tmp/stubs"));
        assert_eq!(
            args,
            vec![
                "f3d.pyf3d",
                "--enum-class-locations",
                "SaveFormat:Image",
                "--enum-class-locations",
                "BindingType:Interactor",
                "--enum-class-locations",
                "LightType:f3d",
                "--ignore-unresolved-names",
                r"f3d\.(vector3_t|point3_t)",
                "--output-dir",
                "/tmp/stubs",
                "--exit-code",
            ]
        );
    }

    #[test]
    fn extra_args_follow_exit_code() {
        let config = GeneratorConfig {
            exit_code: false,
            enum_class_locations: Vec::new(),
            ignore_unresolved_names: Vec::new(),
            extra_args: vec!["--numpy-array-remove-parameters".to_string()],
            ..GeneratorConfig::default()
        };
        let args = generator_args(&config, Path::new("out"));
        assert_eq!(
            args,
            vec![
                "f3d.pyf3d",
                "--output-dir",
                "out",
                "--numpy-array-remove-parameters"
            ]
        );
    }

    #[test]
    fn explicit_python_wins() {
        let python = resolve_python(Some(Path::new("/opt/py/bin/python")), Some("ignored"))
            .expect("explicit interpreter");
        assert_eq!(python, PathBuf::from("/opt/py/bin/python"));
    }

    #[test]
    fn configured_python_beats_environment() {
        let python = resolve_python(None, Some("/usr/local/bin/python3.12"))
            .expect("configured interpreter");
        assert_eq!(python, PathBuf::from("/usr/local/bin/python3.12"));
    }

    #[test]
    fn command_prefix_uses_python_module() {
        let config = GeneratorConfig::default();
        let command = generator_command(&config, Path::new("out"), Some(Path::new("py")))
            .expect("command");
        assert_eq!(&command[..4], &["py", "-m", "pybind11_stubgen", "f3d.pyf3d"]);
    }

    #[test]
    fn configured_program_replaces_prefix() {
        let config = GeneratorConfig {
            program: Some(vec!["stubgen-wrapper".to_string()]),
            ..GeneratorConfig::default()
        };
        let command = generator_command(&config, Path::new("out"), None).expect("command");
        assert_eq!(&command[..2], &["stubgen-wrapper", "f3d.pyf3d"]);
    }

    #[test]
    fn empty_program_is_a_config_error() {
        let config = GeneratorConfig {
            program: Some(Vec::new()),
            ..GeneratorConfig::default()
        };
        let err = generator_command(&config, Path::new("out"), None).unwrap_err();
        assert!(matches!(err, StubfixError::Config { .. }));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = run_command(&[], None).unwrap_err();
        assert!(matches!(err, StubfixError::InvalidArguments { .. }));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let command = vec!["/nonexistent/stubfix-generator".to_string()];
        let err = run_command(&command, None).unwrap_err();
        assert!(matches!(err, StubfixError::GeneratorSpawn { .. }));
    }
}
