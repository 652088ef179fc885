//! Type-fix rules: regex rewrites of annotation text scoped to a context.
//!
//! A [`TypeFix`] pairs a pattern over the unparsed text of a type annotation
//! with a substitution. Rules may be restricted to a subset of
//! [`FixTarget`]s, the syntactic positions an annotation can occupy.
//!
//! Applying a rule is a pure text-to-text step ([`TypeFix::apply`]); the
//! caller is responsible for re-parsing the result.
//!
//! ## Substitution templates
//!
//! Literal substitutions use the template syntax of Python's `re.sub`,
//! which is what rule authors write against:
//!
//! | template | meaning |
//! |----------|---------|
//! | `\1` .. `\99` | numbered group |
//! | `\g<1>`, `\g<name>` | numbered or named group |
//! | `\\` | a literal backslash |
//! | `\n`, `\t`, `\r`, `\f`, `\v`, `\a`, `\b` | control characters |
//!
//! Templates are translated to the `regex` crate's `${group}` form when the
//! rule is built. References to groups the pattern does not define are
//! rejected at that point.
//!
//! ## Patterns
//!
//! Patterns use the `regex` crate syntax. It has no lookaround and no
//! backreferences, so a Python rule such as `(os\.PathLike)(?!\[)` is written
//! as `(os\.PathLike)([^\[]|$)` with the substitution `\1[str]\2`.

use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::StubfixError;

// ============================================================================
// Fix Targets
// ============================================================================

/// Syntactic position of a type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixTarget {
    /// A parameter annotation: `def f(x: T)`.
    #[serde(rename = "arg", alias = "argument")]
    Argument,
    /// A return annotation: `def f() -> T`.
    #[serde(rename = "return")]
    Return,
    /// An annotated assignment: `x: T`.
    #[serde(rename = "attr", alias = "attribute")]
    Attribute,
    /// The argument list of a callable parameter: `Callable[[T], R]`.
    #[serde(rename = "cb_arg", alias = "callback_argument")]
    CallbackArgument,
    /// The return type of a callable parameter: `Callable[[A], T]`.
    #[serde(rename = "cb_return", alias = "callback_return")]
    CallbackReturn,
}

impl FixTarget {
    /// Every target, in declaration order.
    pub const ALL: [FixTarget; 5] = [
        FixTarget::Argument,
        FixTarget::Return,
        FixTarget::Attribute,
        FixTarget::CallbackArgument,
        FixTarget::CallbackReturn,
    ];

    /// The short name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            FixTarget::Argument => "arg",
            FixTarget::Return => "return",
            FixTarget::Attribute => "attr",
            FixTarget::CallbackArgument => "cb_arg",
            FixTarget::CallbackReturn => "cb_return",
        }
    }
}

impl fmt::Display for FixTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Substitutions
// ============================================================================

/// Function computing a replacement from a match.
pub type ReplaceFn = dyn Fn(&Captures<'_>) -> String + Send + Sync;

/// Replacement for the matches of a [`TypeFix`] pattern.
#[derive(Clone)]
pub enum Substitution {
    /// A template with group references.
    Literal {
        /// The template as written by the rule author (Python syntax).
        source: String,
        /// The same template in `regex` crate syntax.
        template: String,
    },
    /// A replacement computed from each match.
    Computed(Arc<ReplaceFn>),
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Literal { source, .. } => {
                f.debug_tuple("Literal").field(source).finish()
            }
            Substitution::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Translate a Python `re.sub` template into `regex` crate syntax.
fn translate_template(pattern: &Regex, source: &str) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                None => return Err("bad escape (end of template)".to_string()),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('f') => out.push('\x0c'),
                Some('v') => out.push('\x0b'),
                Some('a') => out.push('\x07'),
                Some('b') => out.push('\x08'),
                Some('0') => return Err("octal escapes are not supported".to_string()),
                Some(d) if d.is_ascii_digit() => {
                    let mut digits = d.to_string();
                    if let Some(&next) = chars.peek() {
                        if next.is_ascii_digit() {
                            digits.push(next);
                            chars.next();
                        }
                    }
                    let index: usize = digits
                        .parse()
                        .map_err(|_| format!("invalid group reference {}", digits))?;
                    check_group_index(pattern, index)?;
                    out.push_str(&format!("${{{}}}", index));
                }
                Some('g') => {
                    if chars.next() != Some('<') {
                        return Err("missing < after \\g".to_string());
                    }
                    let mut group = String::new();
                    loop {
                        match chars.next() {
                            Some('>') => break,
                            Some(ch) => group.push(ch),
                            None => return Err("missing >, unterminated name".to_string()),
                        }
                    }
                    if group.is_empty() {
                        return Err("missing group name".to_string());
                    }
                    if let Ok(index) = group.parse::<usize>() {
                        check_group_index(pattern, index)?;
                    } else if !pattern.capture_names().flatten().any(|name| name == group) {
                        return Err(format!("unknown group name '{}'", group));
                    }
                    out.push_str(&format!("${{{}}}", group));
                }
                Some(letter) if letter.is_ascii_alphabetic() => {
                    return Err(format!("bad escape \\{}", letter));
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }

    Ok(out)
}

fn check_group_index(pattern: &Regex, index: usize) -> Result<(), String> {
    if index >= pattern.captures_len() {
        Err(format!("invalid group reference {}", index))
    } else {
        Ok(())
    }
}

// ============================================================================
// TypeFix
// ============================================================================

/// A rewrite rule over the text of a type annotation.
#[derive(Debug, Clone)]
pub struct TypeFix {
    pattern: Regex,
    substitution: Substitution,
    only_for: Option<Vec<FixTarget>>,
}

impl TypeFix {
    /// Build a rule with a literal substitution template.
    pub fn new(pattern: &str, substitution: &str) -> Result<Self, StubfixError> {
        let regex = compile_pattern(pattern)?;
        let template = translate_template(&regex, substitution).map_err(|reason| {
            StubfixError::InvalidSubstitution {
                pattern: pattern.to_string(),
                substitution: substitution.to_string(),
                reason,
            }
        })?;
        Ok(TypeFix {
            pattern: regex,
            substitution: Substitution::Literal {
                source: substitution.to_string(),
                template,
            },
            only_for: None,
        })
    }

    /// Build a rule whose replacement is computed from each match.
    pub fn computed<F>(pattern: &str, replace: F) -> Result<Self, StubfixError>
    where
        F: Fn(&Captures<'_>) -> String + Send + Sync + 'static,
    {
        Ok(TypeFix {
            pattern: compile_pattern(pattern)?,
            substitution: Substitution::Computed(Arc::new(replace)),
            only_for: None,
        })
    }

    /// Restrict the rule to the given targets.
    ///
    /// An empty set leaves the rule unrestricted.
    pub fn only_for(mut self, targets: impl IntoIterator<Item = FixTarget>) -> Self {
        let targets: Vec<FixTarget> = targets.into_iter().collect();
        self.only_for = (!targets.is_empty()).then_some(targets);
        self
    }

    /// The pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The substitution of this rule.
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// The targets this rule is restricted to, if any.
    pub fn targets(&self) -> Option<&[FixTarget]> {
        self.only_for.as_deref()
    }

    /// Whether the rule may fire for an annotation at `target`.
    pub fn applies_to(&self, target: FixTarget) -> bool {
        match &self.only_for {
            Some(targets) => targets.contains(&target),
            None => true,
        }
    }

    /// Rewrite every match in `text`.
    ///
    /// Returns `None` when the pattern does not match, so callers can skip
    /// the re-parse.
    pub fn apply(&self, text: &str) -> Option<String> {
        if !self.pattern.is_match(text) {
            return None;
        }
        let replaced = match &self.substitution {
            Substitution::Literal { template, .. } => {
                self.pattern.replace_all(text, template.as_str())
            }
            Substitution::Computed(replace) => self
                .pattern
                .replace_all(text, |caps: &Captures<'_>| (**replace)(caps)),
        };
        Some(replaced.into_owned())
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, StubfixError> {
    Regex::new(pattern).map_err(|source| StubfixError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

// ============================================================================
// Rule Sets
// ============================================================================

/// The compiled post-processing rules for one run.
#[derive(Debug, Clone, Default)]
pub struct StubRules {
    /// Annotation rewrites, applied in order.
    pub fixes: Vec<TypeFix>,
    /// Modules imported ahead of the first `import` statement of each file.
    pub extra_imports: Vec<String>,
}

impl StubRules {
    /// Create a rule set.
    pub fn new(fixes: Vec<TypeFix>, extra_imports: Vec<String>) -> Self {
        StubRules {
            fixes,
            extra_imports,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_fix_replaces_every_match() {
        let fix = TypeFix::new(r"f3d\.(vector3_t|point3_t)", "tuple[float, float, float]")
            .unwrap();
        let out = fix.apply("dict[f3d.point3_t, f3d.vector3_t]").unwrap();
        assert_eq!(
            out,
            "dict[tuple[float, float, float], tuple[float, float, float]]"
        );
    }

    #[test]
    fn non_matching_fix_returns_none() {
        let fix = TypeFix::new(r"os\.PathLike", "str").unwrap();
        assert!(fix.apply("pathlib.Path").is_none());
    }

    #[test]
    fn python_group_references_are_translated() {
        let fix = TypeFix::new(r"(os\.PathLike)([^\[]|$)", r"\1[str]\2").unwrap();
        assert_eq!(
            fix.apply("os.PathLike | str").unwrap(),
            "os.PathLike[str] | str"
        );
        assert_eq!(fix.apply("os.PathLike").unwrap(), "os.PathLike[str]");
        assert!(fix.apply("os.PathLike[str]").is_none());
    }

    #[test]
    fn named_group_references_are_translated() {
        let fix =
            TypeFix::new(r"(?P<outer>list)\[(?P<inner>\w+)\]", r"\g<outer>[\g<2>]").unwrap();
        assert_eq!(fix.apply("list[int]").unwrap(), "list[int]");
        let fix = TypeFix::new(r"(?P<outer>list)\[(?P<inner>\w+)\]", r"set[\g<inner>]").unwrap();
        assert_eq!(fix.apply("list[int]").unwrap(), "set[int]");
    }

    #[test]
    fn dollar_signs_are_literal() {
        let fix = TypeFix::new("X", "$1").unwrap();
        assert_eq!(fix.apply("X").unwrap(), "$1");
    }

    #[test]
    fn escaped_backslash_is_literal() {
        let fix = TypeFix::new("X", r"a\\b").unwrap();
        assert_eq!(fix.apply("X").unwrap(), r"a\b");
    }

    #[test]
    fn missing_group_is_rejected() {
        let err = TypeFix::new(r"(a)", r"\2").unwrap_err();
        match err {
            StubfixError::InvalidSubstitution { reason, .. } => {
                assert_eq!(reason, "invalid group reference 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_group_name_is_rejected() {
        let err = TypeFix::new(r"(?P<a>x)", r"\g<b>").unwrap_err();
        assert!(matches!(err, StubfixError::InvalidSubstitution { .. }));
    }

    #[test]
    fn bad_letter_escape_is_rejected() {
        let err = TypeFix::new("x", r"\q").unwrap_err();
        assert!(err.to_string().contains("bad escape \\q"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = TypeFix::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, StubfixError::InvalidPattern { .. }));
    }

    #[test]
    fn computed_substitution_receives_captures() {
        let fix = TypeFix::computed(r"(\w+)_t\b", |caps| caps[1].to_uppercase()).unwrap();
        assert_eq!(fix.apply("vector3_t | point3_t").unwrap(), "VECTOR3 | POINT3");
    }

    #[test]
    fn only_for_restricts_targets() {
        let fix = TypeFix::new("T", "X")
            .unwrap()
            .only_for([FixTarget::Return, FixTarget::CallbackArgument]);
        assert!(fix.applies_to(FixTarget::Return));
        assert!(fix.applies_to(FixTarget::CallbackArgument));
        assert!(!fix.applies_to(FixTarget::Argument));
        assert!(!fix.applies_to(FixTarget::Attribute));
        assert!(!fix.applies_to(FixTarget::CallbackReturn));
    }

    #[test]
    fn unrestricted_fix_applies_everywhere() {
        let fix = TypeFix::new("T", "X").unwrap();
        assert!(FixTarget::ALL.iter().all(|t| fix.applies_to(*t)));
        assert!(fix.targets().is_none());
    }

    #[test]
    fn empty_only_for_is_unrestricted() {
        let fix = TypeFix::new("T", "X")
            .unwrap()
            .only_for(Vec::<FixTarget>::new());
        assert!(fix.targets().is_none());
        assert!(FixTarget::ALL.iter().all(|t| fix.applies_to(*t)));
    }

    #[test]
    fn targets_serialize_with_short_names() {
        let names: Vec<String> = FixTarget::ALL
            .iter()
            .map(|t| serde_json::to_string(t).unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "\"arg\"",
                "\"return\"",
                "\"attr\"",
                "\"cb_arg\"",
                "\"cb_return\""
            ]
        );
        let long: FixTarget = serde_json::from_str("\"callback_argument\"").unwrap();
        assert_eq!(long, FixTarget::CallbackArgument);
    }
}
