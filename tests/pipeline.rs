//! End-to-end pipeline tests.
//!
//! The stub generator is replaced by a `sh -c` script through
//! `generator.program`, so these tests need a POSIX shell but no Python.

#![cfg(unix)]

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use stubfix::config::{Config, FixConfig};
use stubfix::error::StubfixError;
use stubfix::{run, RunOptions};

const GENERATED_STUB: &str = "\
from __future__ import annotations
import typing
__all__ = ['Image']
class Image:
    origin: f3d.point3_t
    def save(self, path: os.PathLike) -> None: ...
    def pixels(self) -> collections.abc.Sequence[float]: ...
";

const POSTPROCESSED_STUB: &str = "\
from __future__ import annotations
import pathlib
import os
import typing
__all__ = ['Image']

class Image:
    origin: tuple[float, float, float]

    def save(self, path: os.PathLike[str]) -> None:
        ...

    def pixels(self) -> list[float]:
        ...
";

/// Options whose generator runs `script` with the generator arguments as `$@`.
fn options_with_script(dir: &Path, script: &str) -> RunOptions {
    let mut options = RunOptions::new(dir);
    options.config.generator.program = Some(vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "stubgen".to_string(),
    ]);
    options
}

/// A script writing `content` to `relative` under `dir`.
fn write_script(dir: &Path, relative: &str, content: &str) -> String {
    let path = dir.join(relative);
    let parent = path.parent().expect("relative path has a parent");
    format!(
        "mkdir -p '{}' && cat > '{}' <<'STUB'\n{}STUB\n",
        parent.display(),
        path.display(),
        content
    )
}

fn write_old_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(old)
        .unwrap();
}

#[test]
fn generated_stub_is_postprocessed() {
    let dir = TempDir::new().unwrap();
    let untouched = "def f(p: f3d.point3_t) -> None: ...\n";
    write_old_file(&dir.path().join("f3d/old.pyi"), untouched);

    let script = write_script(dir.path(), "f3d/pyf3d.pyi", GENERATED_STUB);
    let report = run(&options_with_script(dir.path(), &script)).unwrap();

    let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["f3d/pyf3d.pyi"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("f3d/pyf3d.pyi")).unwrap(),
        POSTPROCESSED_STUB
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("f3d/old.pyi")).unwrap(),
        untouched
    );

    let file = &report.files[0];
    assert!(file.changed);
    assert!(file.written);
    assert!(file.imports_injected);
    assert_eq!(file.fixes_applied, 3);

    let header = format!("--- {}", dir.path().join("f3d/pyf3d.pyi").display());
    assert_eq!(report.diff[0], header);
    assert!(report
        .diff
        .contains(&"+    origin: tuple[float, float, float]".to_string()));
}

#[test]
fn regenerated_stub_with_newer_mtime_is_detected() {
    let dir = TempDir::new().unwrap();
    write_old_file(&dir.path().join("f3d/pyf3d.pyi"), "x: int\n");

    let script = write_script(dir.path(), "f3d/pyf3d.pyi", GENERATED_STUB);
    let report = run(&options_with_script(dir.path(), &script)).unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, "f3d/pyf3d.pyi");
}

#[test]
fn generator_receives_configured_arguments() {
    let dir = TempDir::new().unwrap();
    let args_file = dir.path().join("args.txt");
    let script = format!("printf '%s\\n' \"$@\" > '{}'", args_file.display());

    let report = run(&options_with_script(dir.path(), &script)).unwrap();
    assert!(report.files.is_empty());
    assert!(report.diff.is_empty());

    let args = fs::read_to_string(&args_file).unwrap();
    let expected = format!(
        "f3d.pyf3d\n\
         --enum-class-locations\nSaveFormat:Image\n\
         --enum-class-locations\nBindingType:Interactor\n\
         --enum-class-locations\nLightType:f3d\n\
         --ignore-unresolved-names\nf3d\\.(vector3_t|point3_t)\n\
         --output-dir\n{}\n\
         --exit-code\n",
        dir.path().display()
    );
    assert_eq!(args, expected);
}

#[test]
fn generator_failure_propagates_exit_code() {
    let dir = TempDir::new().unwrap();
    let err = run(&options_with_script(dir.path(), "exit 3")).unwrap_err();
    match &err {
        StubfixError::GeneratorFailed { code, .. } => assert_eq!(*code, Some(3)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn generator_timeout_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut options = options_with_script(dir.path(), "exec sleep 10");
    options.config.generator.timeout_secs = Some(1);

    let err = run(&options).unwrap_err();
    assert!(
        matches!(err, StubfixError::GeneratorTimeout { seconds: 1, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn invalid_rule_fails_before_generation() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("generator-ran");
    let mut options = options_with_script(dir.path(), &format!("touch '{}'", marker.display()));
    options.config.postprocess.fixes.push(FixConfig {
        pattern: "(".to_string(),
        substitution: "x".to_string(),
        only_for: None,
    });

    let err = run(&options).unwrap_err();
    assert!(matches!(err, StubfixError::InvalidPattern { .. }));
    assert!(!marker.exists());
}

#[test]
fn skip_generate_processes_every_matching_stub() {
    let dir = TempDir::new().unwrap();
    write_old_file(&dir.path().join("f3d/pyf3d.pyi"), GENERATED_STUB);
    write_old_file(
        &dir.path().join("f3d/sub/more.pyi"),
        "def f(v: f3d.vector3_t) -> None: ...\n",
    );
    write_old_file(&dir.path().join("other/skip.pyi"), "x: f3d.point3_t\n");
    write_old_file(&dir.path().join("f3d/notes.txt"), "not a stub\n");

    let mut options = RunOptions::new(dir.path());
    options.skip_generate = true;
    options.dry_run = true;
    let report = run(&options).unwrap();

    let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["f3d/pyf3d.pyi", "f3d/sub/more.pyi"]);
    assert!(report.files.iter().all(|f| f.changed && !f.written));
    assert_eq!(
        fs::read_to_string(dir.path().join("f3d/pyf3d.pyi")).unwrap(),
        GENERATED_STUB
    );
}

#[test]
fn report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    write_old_file(&dir.path().join("f3d/pyf3d.pyi"), GENERATED_STUB);

    let mut options = RunOptions::new(dir.path());
    options.skip_generate = true;
    options.dry_run = true;
    let report = run(&options).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["files"][0]["path"], "f3d/pyf3d.pyi");
    assert_eq!(json["files"][0]["fixes_applied"], 3);
    assert!(json["diff"].as_array().is_some_and(|diff| !diff.is_empty()));
}

#[test]
fn config_file_overrides_module_and_rules() {
    let dir = TempDir::new().unwrap();
    write_old_file(
        &dir.path().join("mylib/core.pyi"),
        "def f(x: mylib.Handle) -> mylib.Handle: ...\n",
    );

    let config = Config::parse(
        r#"
[generator]
module = "mylib"

[postprocess]
extra_imports = []

[[postprocess.fixes]]
pattern = 'mylib\.Handle'
substitution = 'int'
only_for = ["return"]
"#,
    )
    .unwrap();
    let mut options = RunOptions::new(dir.path());
    options.config = config;
    options.skip_generate = true;
    let report = run(&options).unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("mylib/core.pyi")).unwrap(),
        "def f(x: mylib.Handle) -> int:\n    ...\n"
    );
}
