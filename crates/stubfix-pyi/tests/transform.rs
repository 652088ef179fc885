// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Annotation rewriting tests for `StubTransformer`.
//!
//! Each case parses a small stub, applies the transformer and compares the
//! result against the normalised layout of the expected stub.

use difference::assert_diff;
use stubfix_core::config::PostprocessConfig;
use stubfix_core::diff::unified_diff;
use stubfix_core::fix::{FixTarget, StubRules, TypeFix};
use stubfix_pyi::{normalize, parse_module, postprocess_source, unparse, StubTransformer};

/// Strip the indentation shared by every non-blank line.
fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| if line.len() >= margin { &line[margin..] } else { "" })
        .collect::<Vec<_>>()
        .join("\n")
}

fn default_rules() -> StubRules {
    PostprocessConfig::default().compile().expect("default rules")
}

/// Apply the default fixes without extra imports.
fn postprocess(src: &str) -> String {
    let rules = default_rules();
    let transformer = StubTransformer::new(rules.fixes);
    postprocess_source(&dedent(src), &transformer, &[], "test.pyi")
        .expect("postprocess")
        .transformed
}

fn transform_with(transformer: &StubTransformer, src: &str, extra_imports: &[String]) -> String {
    let module = parse_module(&dedent(src)).expect("parse error");
    let outcome = transformer
        .transform(module, extra_imports)
        .expect("transform");
    unparse(&outcome.module)
}

fn assert_same(got: &str, expected: &str) {
    let expected = normalize(&dedent(expected)).expect("expected stub parses");
    if got != expected {
        assert_diff!(expected.as_str(), got, "\n", 0);
    }
}

#[test]
fn test_transformer_f3d_point_vector() {
    let src = "
    class A:
        p: f3d.point3_t
        v: f3d.vector3_t
        def f(p: f3d.point3_t) -> f3d.point3_t: ...
        def g(v: f3d.vector3_t) -> f3d.vector3_t: ...
    ";
    let expected = "
    class A:
        p: tuple[float,float,float]
        v: tuple[float,float,float]
        def f(p: tuple[float,float,float]) -> tuple[float,float,float]: ...
        def g(v: tuple[float,float,float]) -> tuple[float,float,float]: ...
    ";
    assert_same(&postprocess(src), expected);
}

#[test]
fn test_transformer_f3d_lists() {
    let src = "
    class A:
        xs: list[T]  # should stay
        def f(xs: collections.abc.Sequence[T]) -> collections.abc.Sequence[T]: ...
        def g(cb: Callable[[collections.abc.Sequence[T]], collections.abc.Sequence[T]]): ...
    ";
    let expected = "
    class A:
        xs: list[T]
        def f(xs: collections.abc.Sequence[T]) -> list[T]: ...
        def g(cb: Callable[[list[T]], collections.abc.Sequence[T]]): ...
    ";
    assert_same(&postprocess(src), expected);
}

#[test]
fn test_transformer_f3d_path() {
    let src = "
    class A:
        xs: pathlib.Path
        def f(p: os.PathLike | str | bytes) -> pathlib.Path: ...
    ";
    let expected = "
    class A:
        xs: pathlib.Path
        def f(p: os.PathLike[str] | str | bytes) -> pathlib.Path: ...
    ";
    assert_same(&postprocess(src), expected);
}

#[test]
fn test_transformer_f3d_path_at_end_of_annotation() {
    let src = "def f(p: str | os.PathLike) -> None: ...\n";
    let expected = "def f(p: str | os.PathLike[str]) -> None: ...\n";
    assert_same(&postprocess(src), expected);
}

#[test]
fn test_transformer_typefix_matching() {
    let fixes = FixTarget::ALL
        .iter()
        .map(|target| {
            TypeFix::new("T", &target.as_str().to_uppercase())
                .unwrap()
                .only_for([*target])
        })
        .collect();
    let transformer = StubTransformer::new(fixes);
    let src = "
    __all__: list[T] = ...

    def f1(a: T, b: T | None) -> list[T]:...

    class A:
        a: T
        b: T
        def f(a: T, b: T) -> T | None: ...
        def f(xs: list[T], cb: Callable[[T, T], T]) -> T: ...
    ";
    let expected = "
    __all__: list[ATTR] = ...

    def f1(a: ARG, b: ARG | None) -> list[RETURN]: ...

    class A:
        a: ATTR
        b: ATTR
        def f(a: ARG, b: ARG) -> RETURN | None: ...
        def f(xs: list[ARG], cb: Callable[[CB_ARG, CB_ARG], CB_RETURN]) -> RETURN: ...
    ";
    assert_same(&transform_with(&transformer, src, &[]), expected);
}

#[test]
fn test_transformer_extra_imports() {
    let transformer = StubTransformer::default();
    let src = "
    from __future__ import annotations
    # extra imports should go here
    import foo
    import bar
    ";
    let expected = "
    from __future__ import annotations
    import hello
    import world
    import foo
    import bar
    ";
    let imports = ["hello".to_string(), "world".to_string()];
    assert_same(&transform_with(&transformer, src, &imports), expected);
}

#[test]
fn test_default_rules_are_idempotent() {
    let src = "
    import os
    class Image:
        origin: f3d.point3_t
        def save(self, path: os.PathLike) -> None: ...
        def pixels(self) -> collections.abc.Sequence[float]: ...
        def on_change(self, cb: typing.Callable[[collections.abc.Sequence[int]], None]) -> None: ...
    ";
    let rules = default_rules();
    let transformer = StubTransformer::new(rules.fixes);
    let once = transform_with(&transformer, src, &rules.extra_imports);
    let module = parse_module(&once).expect("rewritten stub parses");
    let outcome = transformer.transform(module, &[]).expect("transform");
    assert_eq!(unparse(&outcome.module), once);
    assert_eq!(outcome.fixes_applied, 0);
}

#[test]
fn test_contexts_are_isolated() {
    let transformer = StubTransformer::new(vec![TypeFix::new("int", "float")
        .unwrap()
        .only_for([FixTarget::Return])]);
    let src = "
    x: int
    def f(a: int, cb: Callable[[int], int]) -> int: ...
    ";
    let expected = "
    x: int
    def f(a: int, cb: Callable[[int], int]) -> float: ...
    ";
    assert_same(&transform_with(&transformer, src, &[]), expected);
}

#[test]
fn test_fix_count_is_reported() {
    let rules = default_rules();
    let transformer = StubTransformer::new(rules.fixes);
    let src = "
    import f3d
    def f(p: f3d.point3_t, q: os.PathLike) -> f3d.vector3_t: ...
    ";
    let module = parse_module(&dedent(src)).expect("parse error");
    let outcome = transformer
        .transform(module, &rules.extra_imports)
        .expect("transform");
    assert_eq!(outcome.fixes_applied, 3);
    assert!(outcome.imports_injected);
}

#[test]
fn test_untouched_stub_has_empty_diff() {
    let rules = default_rules();
    let transformer = StubTransformer::new(rules.fixes);
    let src = "class A:\n    def f(self, x: int) -> str: ...  # nothing to fix\n";
    let result = postprocess_source(src, &transformer, &[], "a.pyi").expect("postprocess");
    assert_eq!(result.normalized, result.transformed);
    assert!(unified_diff(&result.normalized, &result.transformed, "a.pyi", "a.pyi", 1).is_empty());
}

#[test]
fn test_rewritten_stub_diff_shows_changed_lines() {
    let rules = default_rules();
    let transformer = StubTransformer::new(rules.fixes);
    let src = "def f(p: f3d.point3_t) -> None: ...\n";
    let result = postprocess_source(src, &transformer, &[], "a.pyi").expect("postprocess");
    let diff = unified_diff(&result.normalized, &result.transformed, "a.pyi", "a.pyi", 1);
    assert_eq!(
        diff,
        vec![
            "--- a.pyi",
            "+++ a.pyi",
            "@@ -1,2 +1,2 @@",
            "-def f(p: f3d.point3_t) -> None:",
            "+def f(p: tuple[float, float, float]) -> None:",
            "     ...",
        ]
    );
}

#[test]
fn test_syntax_error_names_the_file() {
    let transformer = StubTransformer::default();
    let err = postprocess_source("def f(\n", &transformer, &[], "f3d/pyf3d.pyi").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("f3d/pyf3d.pyi"), "{message}");
}
