// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parse/unparse tests.
//!
//! These tests verify that `unparse(parse(code))` produces the layout of
//! CPython's `ast.unparse` for the stub grammar, and that the layout is a
//! fixed point of another round trip.

use difference::assert_diff;
use itertools::Itertools;
use stubfix_pyi::{normalize, parse_expression, parse_module, prettify_error, unparse_expression};

/// Helper to visualize whitespace differences in test output
fn visualize(s: &str) -> String {
    s.replace(' ', "▩").lines().join("↩\n")
}

fn assert_unparses_to(input: &str, expected: &str) {
    let generated = match normalize(input) {
        Ok(text) => text,
        Err(e) => panic!("{}", prettify_error(&e, "input.pyi")),
    };
    if generated != expected {
        let got = visualize(&generated);
        let expected = visualize(expected);
        assert_diff!(expected.as_ref(), got.as_ref(), "", 0);
    }
    // The canonical layout survives another round trip.
    assert_eq!(normalize(&generated).expect("layout reparses"), generated);
}

fn assert_expression(input: &str, expected: &str) {
    let expr =
        parse_expression(input).unwrap_or_else(|e| panic!("'{}' doesn't parse: {}", input, e));
    assert_eq!(unparse_expression(&expr), expected, "unparsing '{}'", input);
}

#[test]
fn unparse_stub_layout() {
    let input = r#""""Module doc."""
from __future__ import annotations
import typing  # used below
__all__ = ['A', 'f']
class A(Base, metaclass=Meta):
    """Doc."""
    x: int = 1
    @property
    def size(self) -> tuple[int, int]: ...
    @overload
    def f(self, a: int, /, b: str = 'x', *args: int, c: float = 1.5, **kw: object) -> None:
        """Overload."""
def f(*, key: str) -> None: ...
"#;
    let expected = r#""""Module doc."""
from __future__ import annotations
import typing
__all__ = ['A', 'f']

class A(Base, metaclass=Meta):
    """Doc."""
    x: int = 1

    @property
    def size(self) -> tuple[int, int]:
        ...

    @overload
    def f(self, a: int, /, b: str='x', *args: int, c: float=1.5, **kw: object) -> None:
        """Overload."""

def f(*, key: str) -> None:
    ..."#;
    assert_unparses_to(input, expected);
}

#[test]
fn unparse_first_definition_has_no_leading_blank_line() {
    assert_unparses_to("@dataclass\nclass A: ...\n", "@dataclass\nclass A:\n    ...");
    assert_unparses_to("async def f() -> int: ...", "async def f() -> int:\n    ...");
}

#[test]
fn unparse_statement_after_class_is_not_separated() {
    assert_unparses_to("class A: pass\nx = 1\n", "class A:\n    pass\nx = 1");
}

#[test]
fn unparse_semicolon_separated_statements() {
    assert_unparses_to("x = 1; y = 2\n", "x = 1\ny = 2");
}

#[test]
fn unparse_assignments() {
    assert_unparses_to("a = b = 1\n", "a = b = 1");
    assert_unparses_to("a, b = 1, 2\n", "a, b = (1, 2)");
    assert_unparses_to("x: int\n", "x: int");
    assert_unparses_to("x : Final[int]=3\n", "x: Final[int] = 3");
}

#[test]
fn unparse_elif_chains() {
    let input = "if sys.version_info >= (3, 8):\n    import a\nelif X:\n    pass\nelse:\n    x: int\n";
    let expected = "if sys.version_info >= (3, 8):\n    import a\nelif X:\n    pass\nelse:\n    x: int";
    assert_unparses_to(input, expected);
}

#[test]
fn unparse_imports() {
    assert_unparses_to("from . import a\n", "from . import a");
    assert_unparses_to(
        "from ..pkg import (\n    a as b,\n    c,\n)\n",
        "from ..pkg import a as b, c",
    );
    assert_unparses_to("from x import *\n", "from x import *");
    assert_unparses_to("import os.path as p, sys\n", "import os.path as p, sys");
}

#[test]
fn unparse_comments_and_blank_lines_are_dropped() {
    assert_unparses_to("# header\n\n\nimport os  # trailing\n\n# footer\n", "import os");
}

#[test]
fn unparse_precedence() {
    assert_expression("(a + b) * c", "(a + b) * c");
    assert_expression("a + (b * c)", "a + b * c");
    assert_expression("a - (b - c)", "a - (b - c)");
    assert_expression("(a - b) - c", "a - b - c");
    assert_expression("(a or b) and c", "(a or b) and c");
    assert_expression("a or (b and c)", "a or (b and c)");
    assert_expression("(a and b) or c", "a and b or c");
    assert_expression("not (a == b)", "not a == b");
    assert_expression("-(x ** 2)", "-x ** 2");
    assert_expression("(-x) ** 2", "(-x) ** 2");
    assert_expression("2 ** -1", "2 ** (-1)");
    assert_expression("x if y else (z if w else v)", "x if y else z if w else v");
    assert_expression("(x if y else z).a", "(x if y else z).a");
    assert_expression("(int | None)", "int | None");
    assert_expression("a < b <= c", "a < b <= c");
}

#[test]
fn unparse_subscripts_and_calls() {
    assert_expression("Callable[[int, str], None]", "Callable[[int, str], None]");
    assert_expression("dict[str,  list[int]]", "dict[str, list[int]]");
    assert_expression("tuple[()]", "tuple[()]");
    assert_expression("tuple[int, ...]", "tuple[int, ...]");
    assert_expression("x[a,]", "x[a,]");
    assert_expression("tuple[*Ts]", "tuple[*Ts,]");
    assert_expression("tuple[int, *Ts]", "tuple[int, *Ts]");
    assert_expression("x[1:2, ::3]", "x[1:2, ::3]");
    assert_expression("f(*args, key=1, **kw)", "f(*args, key=1, **kw)");
    assert_expression("(1,)", "(1,)");
    assert_expression("{'a': 1, **rest}", "{'a': 1, **rest}");
    assert_expression("{1, 2}", "{1, 2}");
    assert_expression("1 .real", "1 .real");
}

#[test]
fn unparse_literals() {
    assert_expression("0x1F", "31");
    assert_expression("0o17", "15");
    assert_expression("0b101", "5");
    assert_expression("1_000", "1000");
    assert_expression("1e3", "1000.0");
    assert_expression("1.5j", "1.5j");
    assert_expression("'a' 'b'", "'ab'");
    assert_expression("\"it's\"", "\"it's\"");
    assert_expression("\"plain\"", "'plain'");
    assert_expression(r"b'\x00'", r"b'\x00'");
    assert_expression("u'x'", "u'x'");
    assert_expression("-1", "-1");
    assert_expression("None", "None");
    assert_expression("...", "...");
}

#[test]
fn unparse_fstrings() {
    assert_expression("'a' f'{b}'", "f'a{b}'");
    assert_expression("'{' f'{b}'", "f'{{{b}'");
    assert_expression("f\"{x!r:>10}\"", "f'{x!r:>10}'");
    assert_expression("f'{x:>{width}}'", "f'{x:>{width}}'");
    assert_expression("f'{x=}'", "f'x={x!r}'");
    assert_expression("f\"{d['k']}\"", "f\"{d['k']}\"");
    assert_expression("f\"{f'{x}'}\"", "f\"{f'{x}'}\"");
    assert_expression("f'{{literal}}'", "f'{{literal}}'");
    assert_expression(r"f'a\tb{c}'", r"f'a\tb{c}'");
    assert_expression("f'{ {1: 2}[1] }'", "f'{ {1: 2}[1]}'");
    assert_expression("f'{a if b else c}'", "f'{(a if b else c)}'");
    assert_expression("f'{a, b}'", "f'{(a, b)}'");
    assert_expression("f''", "f''");
}

#[test]
fn parse_errors() {
    for src in ["def f(:\n", "x = (\n", "lambda: 1\n", "x = 1 +\n", "class\n"] {
        assert!(parse_module(src).is_err(), "'{}' should not parse", src);
    }
}

#[test]
fn prettify_error_points_at_the_line() {
    let err = parse_module("import os\nclass A(:\n    ...\n").unwrap_err();
    let rendered = prettify_error(&err, "f3d/pyf3d.pyi");
    assert!(rendered.contains("f3d/pyf3d.pyi"), "{rendered}");
    assert!(rendered.contains("class A(:"), "{rendered}");
}
