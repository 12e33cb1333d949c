//! JSON schema describing a command line, and building a [`Parser`] from it.

use crate::parser::{FlagLookup, Parser, Settings};
use crate::registry::{Limits, Scope, HELP_FLAG, HELP_SHORT};
use crate::value::{ArrayList, Kind, Value};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Program name used when the schema does not name one.
pub const FALLBACK_PROGRAM_NAME: &str = "(*.*)";

/// Errors that can occur while loading, validating or building a schema.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON schema: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate flag name: {0}")]
    DuplicateFlag(String),

    #[error("duplicate short option '{0}'")]
    DuplicateShort(char),

    #[error("duplicate argument name: {0}")]
    DuplicateArg(String),

    #[error("duplicate subcommand name: {0}")]
    DuplicateSubcommand(String),

    #[error("'{0}' is reserved for the built-in help flag")]
    ReservedName(String),

    #[error("invalid short option '{0}': must be a single ASCII letter")]
    InvalidShortOption(char),

    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    #[error("default for flag '{0}' is not a valid {1}")]
    InvalidDefault(String, &'static str),

    #[error("list flag '{0}' cannot have a default")]
    DefaultOnList(String),

    #[error("failed to register schema: {0}")]
    Register(#[from] crate::error::Error),
}

/// A positional argument.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgConfig {
    pub name: String,
    pub help: Option<String>,
}

/// A flag. An empty `name` declares a short-only flag.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagConfig {
    #[serde(default)]
    pub name: String,
    pub short: Option<char>,
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Accumulate values across occurrences instead of holding one.
    #[serde(default)]
    pub list: bool,
    /// A JSON bool, number or string matching `type`. Integers may also be
    /// given as strings, e.g. `"0x10"`.
    pub default: Option<serde_json::Value>,
    pub help: Option<String>,
}

impl FlagConfig {
    fn display_name(&self) -> String {
        match self.short {
            Some(short) if self.name.is_empty() => format!("-{}", short),
            _ => self.name.clone(),
        }
    }

    /// The registered default, derived from `default` and `type`.
    pub fn default_value(&self) -> Result<Value, ConfigError> {
        if self.list {
            if self.default.is_some() {
                return Err(ConfigError::DefaultOnList(self.display_name()));
            }
            return Ok(Value::List(ArrayList::new(self.kind)));
        }

        match &self.default {
            None => Ok(Value::zero(self.kind)),
            Some(json) => json_to_value(self.kind, json)
                .ok_or_else(|| ConfigError::InvalidDefault(self.display_name(), self.kind.name())),
        }
    }
}

fn json_to_value(kind: Kind, json: &serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    match (kind, json) {
        (Kind::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
        (Kind::String, Json::String(s)) => Some(Value::Str(s.clone())),
        (kind, Json::Number(n)) if kind.is_integer() => {
            let n = n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))?;
            Value::parse(kind, &n.to_string())
        }
        (kind, Json::String(s)) if kind.is_integer() => Value::parse(kind, s),
        _ => None,
    }
}

/// A subcommand with its own arguments and flags.
#[derive(Debug, Clone, Deserialize)]
pub struct SubcommandConfig {
    pub name: String,
    pub help: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgConfig>,
    #[serde(default)]
    pub flags: Vec<FlagConfig>,
}

/// Top-level schema for a program's command line.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub flag_lookup: FlagLookup,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub args: Vec<ArgConfig>,
    #[serde(default)]
    pub flags: Vec<FlagConfig>,
    #[serde(default)]
    pub subcommands: Vec<SubcommandConfig>,
}

impl Schema {
    /// Parse a JSON string into a Schema.
    pub fn from_json(json: &str) -> Result<Schema, ConfigError> {
        let schema: Schema = serde_json::from_str(json)?;
        Ok(schema)
    }

    /// Read and parse a JSON schema file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Schema, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_PROGRAM_NAME)
    }

    /// Validate the schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_scope(&self.args, &self.flags)?;

        let mut names = HashSet::new();
        for subcmd in &self.subcommands {
            if subcmd.name.is_empty() {
                return Err(ConfigError::EmptyName("subcommand"));
            }
            if !names.insert(&subcmd.name) {
                return Err(ConfigError::DuplicateSubcommand(subcmd.name.clone()));
            }
            Self::validate_scope(&subcmd.args, &subcmd.flags)?;
        }

        Ok(())
    }

    fn validate_scope(args: &[ArgConfig], flags: &[FlagConfig]) -> Result<(), ConfigError> {
        let mut arg_names = HashSet::new();
        for arg in args {
            if arg.name.is_empty() {
                return Err(ConfigError::EmptyName("argument"));
            }
            if !arg_names.insert(&arg.name) {
                return Err(ConfigError::DuplicateArg(arg.name.clone()));
            }
        }

        let mut flag_names = HashSet::new();
        let mut shorts = HashSet::new();
        for flag in flags {
            Self::validate_flag(flag)?;

            if !flag.name.is_empty() && !flag_names.insert(&flag.name) {
                return Err(ConfigError::DuplicateFlag(flag.name.clone()));
            }
            if let Some(short) = flag.short {
                if !shorts.insert(short) {
                    return Err(ConfigError::DuplicateShort(short));
                }
            }
        }

        Ok(())
    }

    /// Validate a single flag configuration.
    fn validate_flag(flag: &FlagConfig) -> Result<(), ConfigError> {
        if flag.name.is_empty() && flag.short.is_none() {
            return Err(ConfigError::EmptyName("flag"));
        }
        if flag.name == HELP_FLAG {
            return Err(ConfigError::ReservedName(flag.name.clone()));
        }

        if let Some(short) = flag.short {
            if short == HELP_SHORT {
                return Err(ConfigError::ReservedName(short.to_string()));
            }
            if !short.is_ascii_alphabetic() {
                return Err(ConfigError::InvalidShortOption(short));
            }
        }

        flag.default_value().map(|_| ())
    }

    /// Validate and register everything on a new parser.
    pub fn build(&self) -> Result<Parser, ConfigError> {
        self.validate()?;

        let settings = Settings {
            limits: self.limits,
            flag_lookup: self.flag_lookup,
        };
        let mut parser = Parser::with_settings(
            self.effective_name(),
            self.description.as_deref().unwrap_or_default(),
            settings,
        );

        register_scope(&mut parser, Scope::Global, &self.args, &self.flags)?;

        for subcmd in &self.subcommands {
            let id = parser.subcommand(&subcmd.name, subcmd.help.as_deref().unwrap_or_default())?;
            register_scope(&mut parser, id.into(), &subcmd.args, &subcmd.flags)?;
        }

        Ok(parser)
    }
}

fn register_scope(
    parser: &mut Parser,
    scope: Scope<'_>,
    args: &[ArgConfig],
    flags: &[FlagConfig],
) -> Result<(), ConfigError> {
    for arg in args {
        parser.positional(&arg.name, arg.help.as_deref().unwrap_or_default(), scope)?;
    }
    for flag in flags {
        parser.register_value(
            &flag.name,
            flag.short,
            flag.default_value()?,
            flag.help.as_deref().unwrap_or_default(),
            scope,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn args(s: &[&str]) -> Vec<String> {
        std::iter::once("prog")
            .chain(s.iter().copied())
            .map(|s| s.to_string())
            .collect()
    }

    const PDFUTILS: &str = r#"{
        "name": "pdfutils",
        "description": "PDF utilities",
        "subcommands": [
            {
                "name": "subpdf",
                "help": "Extract sub-PDF",
                "args": [
                    {"name": "IN_PATH", "help": "input document"},
                    {"name": "RANGE", "help": "page range"}
                ],
                "flags": [
                    {"name": "output", "short": "o", "type": "string",
                     "default": "output.pdf", "help": "output filename"},
                    {"name": "pages", "type": "u32", "list": true}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_schema() {
        let schema = Schema::from_json(PDFUTILS).unwrap();
        assert_eq!(schema.effective_name(), "pdfutils");
        assert_eq!(schema.description.as_deref(), Some("PDF utilities"));
        assert_eq!(schema.flag_lookup, FlagLookup::Indexed);
        assert_eq!(schema.limits, Limits::default());
        assert_eq!(schema.subcommands.len(), 1);

        let subpdf = &schema.subcommands[0];
        assert_eq!(subpdf.args.len(), 2);
        assert_eq!(subpdf.flags[0].short, Some('o'));
        assert_eq!(subpdf.flags[0].kind, Kind::String);
        assert!(subpdf.flags[1].list);

        schema.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_schema() {
        let schema = Schema::from_json("{}").unwrap();
        assert_eq!(schema.effective_name(), FALLBACK_PROGRAM_NAME);
        assert!(schema.flags.is_empty());
        schema.validate().unwrap();
    }

    #[test]
    fn test_parse_settings() {
        let schema = Schema::from_json(
            r#"{"flag_lookup": "forward_scan", "limits": {"max_flags": 3}}"#,
        )
        .unwrap();
        assert_eq!(schema.flag_lookup, FlagLookup::ForwardScan);
        assert_eq!(schema.limits.max_flags, 3);
        assert_eq!(schema.limits.max_positionals, 16);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = Schema::from_json(r#"{"flags": [{"name": "x", "type": "float"}]}"#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_error_on_duplicate_flag() {
        let schema = Schema::from_json(
            r#"{"flags": [
                {"name": "dup", "type": "bool"},
                {"name": "dup", "type": "i32"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::DuplicateFlag(n)) if n == "dup"));
    }

    #[test]
    fn test_error_on_duplicate_short() {
        let schema = Schema::from_json(
            r#"{"flags": [
                {"name": "a", "short": "x", "type": "bool"},
                {"name": "b", "short": "x", "type": "bool"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::DuplicateShort('x'))
        ));
    }

    #[test]
    fn test_same_names_in_different_scopes() {
        let schema = Schema::from_json(
            r#"{
                "flags": [{"name": "verbose", "short": "v", "type": "bool"}],
                "subcommands": [
                    {"name": "a", "flags": [{"name": "verbose", "short": "v", "type": "bool"}]},
                    {"name": "b", "flags": [{"name": "verbose", "short": "v", "type": "bool"}]}
                ]
            }"#,
        )
        .unwrap();
        schema.validate().unwrap();
    }

    #[test]
    fn test_error_on_duplicate_subcommand() {
        let schema =
            Schema::from_json(r#"{"subcommands": [{"name": "a"}, {"name": "a"}]}"#).unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::DuplicateSubcommand(_))
        ));
    }

    #[test]
    fn test_error_on_duplicate_arg() {
        let schema =
            Schema::from_json(r#"{"args": [{"name": "IN"}, {"name": "IN"}]}"#).unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::DuplicateArg(_))));
    }

    #[test]
    fn test_error_on_reserved_help() {
        let schema = Schema::from_json(r#"{"flags": [{"name": "help", "type": "bool"}]}"#).unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::ReservedName(_))));

        let schema = Schema::from_json(
            r#"{"flags": [{"name": "host", "short": "h", "type": "string"}]}"#,
        )
        .unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::ReservedName(_))));
    }

    #[test]
    fn test_error_on_invalid_short_option() {
        let schema =
            Schema::from_json(r#"{"flags": [{"name": "n", "short": "1", "type": "bool"}]}"#)
                .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::InvalidShortOption('1'))
        ));
    }

    #[test]
    fn test_error_on_unnamed_flag() {
        let schema = Schema::from_json(r#"{"flags": [{"type": "bool"}]}"#).unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::EmptyName("flag"))));
    }

    #[test]
    fn test_default_values_by_type() {
        let schema = Schema::from_json(
            r#"{"flags": [
                {"name": "a", "type": "bool", "default": true},
                {"name": "b", "type": "i8", "default": -5},
                {"name": "c", "type": "u16", "default": "0x10"},
                {"name": "d", "type": "u64", "default": 18446744073709551615},
                {"name": "e", "type": "string"}
            ]}"#,
        )
        .unwrap();

        let values: Vec<Value> = schema
            .flags
            .iter()
            .map(|f| f.default_value().unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Bool(true),
                Value::I8(-5),
                Value::U16(16),
                Value::U64(u64::MAX),
                Value::Str(String::new()),
            ]
        );
    }

    #[test]
    fn test_error_on_default_out_of_range() {
        let schema =
            Schema::from_json(r#"{"flags": [{"name": "n", "type": "u8", "default": 256}]}"#)
                .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::InvalidDefault(_, "u8"))
        ));
    }

    #[test]
    fn test_error_on_default_type_mismatch() {
        let schema =
            Schema::from_json(r#"{"flags": [{"name": "n", "type": "bool", "default": "yes"}]}"#)
                .unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::InvalidDefault(_, "bool"))
        ));
    }

    #[test]
    fn test_error_on_list_default() {
        let schema = Schema::from_json(
            r#"{"flags": [{"name": "n", "type": "u8", "list": true, "default": 1}]}"#,
        )
        .unwrap();
        assert!(matches!(schema.validate(), Err(ConfigError::DefaultOnList(_))));
    }

    #[test]
    fn test_build_and_parse() {
        let mut parser = Schema::from_json(PDFUTILS).unwrap().build().unwrap();

        parser
            .parse(args(&[
                "subpdf", "in.pdf", "1-3", "-o", "out.pdf", "--pages", "1", "2",
            ]))
            .unwrap();

        assert_eq!(parser.active_subcommand(), Some("subpdf"));
        assert_eq!(parser.positional_by_name("subpdf", "IN_PATH"), Some("in.pdf"));
        assert_eq!(parser.positional_by_name("subpdf", "RANGE"), Some("1-3"));
        assert_eq!(
            parser.flag_value("subpdf", "output"),
            Some(&Value::Str("out.pdf".to_string()))
        );
        assert_eq!(
            parser.flag_value("subpdf", "pages"),
            Some(&Value::List(ArrayList::U32(vec![1, 2])))
        );
    }

    #[test]
    fn test_build_keeps_defaults() {
        let mut parser = Schema::from_json(PDFUTILS).unwrap().build().unwrap();
        parser.parse(args(&["subpdf", "in.pdf", "1"])).unwrap();
        assert_eq!(
            parser.flag_value("subpdf", "output"),
            Some(&Value::Str("output.pdf".to_string()))
        );
    }

    #[test]
    fn test_build_respects_limits() {
        let schema = Schema::from_json(
            r#"{"limits": {"max_positionals": 1}, "args": [{"name": "A"}, {"name": "B"}]}"#,
        )
        .unwrap();
        match schema.build() {
            Err(ConfigError::Register(err)) => {
                assert_eq!(err.kind(), ErrorKind::CapacityExceeded)
            }
            other => panic!("Expected capacity error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_build_forward_scan() {
        let schema = Schema::from_json(
            r#"{"flag_lookup": "forward_scan", "flags": [
                {"name": "a", "type": "bool"},
                {"name": "b", "type": "bool"}
            ]}"#,
        )
        .unwrap();
        let mut parser = schema.build().unwrap();
        let err = parser.parse(args(&["--b", "--a"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FlagNotFound);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PDFUTILS.as_bytes()).unwrap();

        let schema = Schema::from_path(file.path()).unwrap();
        assert_eq!(schema.effective_name(), "pdfutils");
    }

    #[test]
    fn test_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = Schema::from_path(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
