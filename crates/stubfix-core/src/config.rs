//! Configuration handling for stubfix
//!
//! Every field is defaulted, so an empty file (or no file at all) yields the
//! settings used for the f3d binding.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::StubfixError;
use crate::fix::{FixTarget, StubRules, TypeFix};

/// Stubfix configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Stub generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Post-processing rules
    #[serde(default)]
    pub postprocess: PostprocessConfig,
}

/// Settings for the external stub generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Top-level package whose stubs are post-processed
    #[serde(default = "default_module")]
    pub module: String,

    /// Module handed to the generator
    #[serde(default = "default_submodule")]
    pub submodule: String,

    /// Python interpreter used to run the generator
    #[serde(default)]
    pub python: Option<String>,

    /// Full command prefix replacing `<python> -m pybind11_stubgen`
    #[serde(default)]
    pub program: Option<Vec<String>>,

    /// `Enum:module` pairs passed as `--enum-class-locations`
    #[serde(default = "default_enum_class_locations")]
    pub enum_class_locations: Vec<String>,

    /// Patterns passed as `--ignore-unresolved-names`
    #[serde(default = "default_ignore_unresolved_names")]
    pub ignore_unresolved_names: Vec<String>,

    /// Pass `--exit-code` so generator errors fail the run
    #[serde(default = "default_exit_code")]
    pub exit_code: bool,

    /// Extra arguments appended after the generated ones
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Glob (relative to the output directory) selecting stub files
    #[serde(default)]
    pub glob: Option<String>,

    /// Kill the generator after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Post-processing rules as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostprocessConfig {
    /// Modules imported before the first `import` statement of each file
    #[serde(default = "default_extra_imports")]
    pub extra_imports: Vec<String>,

    /// Ordered type fixes
    #[serde(default = "default_fixes")]
    pub fixes: Vec<FixConfig>,
}

/// One type fix as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixConfig {
    /// Regular expression matched against unparsed annotation text, in the
    /// `regex` crate syntax (no lookaround, no backreferences)
    pub pattern: String,

    /// Replacement template (`\1`, `\g<name>` group references)
    pub substitution: String,

    /// Restrict the fix to these annotation positions; empty means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_for: Option<Vec<FixTarget>>,
}

fn default_module() -> String {
    "f3d".to_string()
}

fn default_submodule() -> String {
    "f3d.pyf3d".to_string()
}

fn default_enum_class_locations() -> Vec<String> {
    ["SaveFormat:Image", "BindingType:Interactor", "LightType:f3d"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_unresolved_names() -> Vec<String> {
    vec![r"f3d\.(vector3_t|point3_t)".to_string()]
}

fn default_exit_code() -> bool {
    true
}

fn default_extra_imports() -> Vec<String> {
    vec!["pathlib".to_string(), "os".to_string()]
}

fn default_fixes() -> Vec<FixConfig> {
    vec![
        FixConfig {
            pattern: r"f3d\.(vector3_t|point3_t)".to_string(),
            substitution: "tuple[float, float, float]".to_string(),
            only_for: None,
        },
        FixConfig {
            pattern: r"(os\.PathLike)([^\[]|$)".to_string(),
            substitution: r"\1[str]\2".to_string(),
            only_for: None,
        },
        FixConfig {
            pattern: r"collections\.abc\.Sequence\[".to_string(),
            substitution: "list[".to_string(),
            only_for: Some(vec![FixTarget::Return, FixTarget::CallbackArgument]),
        },
    ]
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            submodule: default_submodule(),
            python: None,
            program: None,
            enum_class_locations: default_enum_class_locations(),
            ignore_unresolved_names: default_ignore_unresolved_names(),
            exit_code: default_exit_code(),
            extra_args: Vec::new(),
            glob: None,
            timeout_secs: None,
        }
    }
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            extra_imports: default_extra_imports(),
            fixes: default_fixes(),
        }
    }
}

impl GeneratorConfig {
    /// Glob selecting stub files, defaulting to `<module>/**/*.pyi`.
    pub fn glob(&self) -> String {
        match &self.glob {
            Some(glob) => glob.clone(),
            None => format!("{}/**/*.pyi", self.module),
        }
    }
}

impl PostprocessConfig {
    /// Compile the configured fixes into rules ready for the transformer.
    pub fn compile(&self) -> Result<StubRules, StubfixError> {
        let fixes = self
            .fixes
            .iter()
            .map(|fix| {
                let compiled = TypeFix::new(&fix.pattern, &fix.substitution)?;
                Ok(match &fix.only_for {
                    Some(targets) => compiled.only_for(targets.iter().copied()),
                    None => compiled,
                })
            })
            .collect::<Result<Vec<_>, StubfixError>>()?;
        Ok(StubRules::new(fixes, self.extra_imports.clone()))
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, StubfixError> {
        let content = fs::read_to_string(path).map_err(|e| {
            StubfixError::config(Some(path), format!("failed to read config file: {}", e))
        })?;
        Self::parse_from(Some(path), &content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, StubfixError> {
        Self::parse_from(None, content)
    }

    fn parse_from(path: Option<&Path>, content: &str) -> Result<Self, StubfixError> {
        toml::from_str(content).map_err(|e| {
            StubfixError::config(path, format!("failed to parse config file: {}", e))
        })
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, StubfixError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_f3d_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.generator.module, "f3d");
        assert_eq!(config.generator.submodule, "f3d.pyf3d");
        assert!(config.generator.exit_code);
        assert_eq!(config.generator.glob(), "f3d/**/*.pyi");
        assert_eq!(config.postprocess.extra_imports, vec!["pathlib", "os"]);
        assert_eq!(config.postprocess.fixes.len(), 3);
        assert_eq!(
            config.postprocess.fixes[2].only_for,
            Some(vec![FixTarget::Return, FixTarget::CallbackArgument])
        );
    }

    #[test]
    fn default_rules_compile() {
        let rules = Config::default().postprocess.compile().unwrap();
        assert_eq!(rules.fixes.len(), 3);
        assert_eq!(
            rules.fixes[0].apply("f3d.vector3_t").as_deref(),
            Some("tuple[float, float, float]")
        );
        assert!(!rules.fixes[2].applies_to(FixTarget::Argument));
    }

    #[test]
    fn glob_follows_module() {
        let config = Config::parse("[generator]\nmodule = \"vtk\"\n").unwrap();
        assert_eq!(config.generator.glob(), "vtk/**/*.pyi");
        assert_eq!(config.generator.submodule, "f3d.pyf3d");
    }

    #[test]
    fn explicit_fixes_replace_defaults() {
        let config = Config::parse(
            r#"
[postprocess]
extra_imports = []

[[postprocess.fixes]]
pattern = 'numpy\.ndarray'
substitution = 'list[float]'
only_for = ["attr", "callback_return"]
"#,
        )
        .unwrap();
        assert!(config.postprocess.extra_imports.is_empty());
        assert_eq!(
            config.postprocess.fixes,
            vec![FixConfig {
                pattern: r"numpy\.ndarray".to_string(),
                substitution: "list[float]".to_string(),
                only_for: Some(vec![FixTarget::Attribute, FixTarget::CallbackReturn]),
            }]
        );
    }

    #[test]
    fn unknown_target_is_a_config_error() {
        let err = Config::parse(
            "[[postprocess.fixes]]\npattern = 'a'\nsubstitution = 'b'\nonly_for = ['param']\n",
        )
        .unwrap_err();
        assert!(matches!(err, StubfixError::Config { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_only_for_compiles_to_an_unrestricted_fix() {
        let config = Config::parse(
            "[[postprocess.fixes]]\npattern = 'a'\nsubstitution = 'b'\nonly_for = []\n",
        )
        .unwrap();
        let rules = config.postprocess.compile().unwrap();
        assert!(rules.fixes[0].targets().is_none());
        assert!(rules.fixes[0].applies_to(FixTarget::Attribute));
    }

    #[test]
    fn unknown_generator_key_is_rejected() {
        assert!(Config::parse("[generator]\nmodul = \"f3d\"\n").is_err());
    }

    #[test]
    fn invalid_substitution_surfaces_on_compile() {
        let config = Config::parse(
            "[[postprocess.fixes]]\npattern = '(a)'\nsubstitution = '\\2'\n",
        )
        .unwrap();
        let err = config.postprocess.compile().unwrap_err();
        assert!(matches!(err, StubfixError::InvalidSubstitution { .. }));
    }

    #[test]
    fn load_reads_file_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stubfix.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[generator]\nexit_code = false\ntimeout_secs = 30").unwrap();
        drop(file);

        let config = Config::load(&path).unwrap();
        assert!(!config.generator.exit_code);
        assert_eq!(config.generator.timeout_secs, Some(30));

        let missing = dir.path().join("missing.toml");
        let err = Config::load(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn load_or_default_without_path() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.generator.module, "f3d");
    }
}
