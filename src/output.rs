//! Serializable snapshot of a parse result.

use crate::parser::Parser;
use crate::value::Value;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// What a parse produced, keyed by name for the scope the parse used.
///
/// Maps are ordered so the JSON output is deterministic.
#[derive(Debug, Serialize, PartialEq)]
pub struct ParsedValues<'a> {
    pub program: &'a str,
    pub subcommand: Option<&'a str>,
    pub help: bool,
    /// Unfilled slots are `null`.
    pub positionals: BTreeMap<&'a str, Option<&'a str>>,
    /// Short-only flags are keyed as `-x`.
    pub flags: BTreeMap<String, &'a Value>,
}

impl<'a> ParsedValues<'a> {
    pub fn collect(parser: &'a Parser) -> Self {
        let scope = parser.registry().scope(parser.active_scope());

        let positionals = scope
            .positionals
            .iter()
            .map(|arg| (arg.name.as_str(), arg.value.as_deref()))
            .collect();

        let flags = scope
            .flags
            .iter()
            .map(|flag| {
                let key = match flag.short {
                    Some(short) if flag.name.is_empty() => format!("-{}", short),
                    _ => flag.name.clone(),
                };
                (key, &flag.value)
            })
            .collect();

        Self {
            program: parser.program(),
            subcommand: parser.active_subcommand(),
            help: parser.is_help_requested(),
            positionals,
            flags,
        }
    }
}

/// Render the parse result as compact JSON.
pub fn to_json(parser: &Parser) -> serde_json::Result<String> {
    serde_json::to_string(&ParsedValues::collect(parser))
}

/// Render the parse result as indented JSON.
pub fn to_json_pretty(parser: &Parser) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ParsedValues::collect(parser))
}

/// Write the indented JSON rendering followed by a newline.
pub fn write_json<W: Write>(parser: &Parser, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &ParsedValues::collect(parser))?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Scope;

    fn args(s: &[&str]) -> Vec<String> {
        std::iter::once("prog")
            .chain(s.iter().copied())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_global_snapshot() {
        let mut p = Parser::new("prog", "");
        p.positional("INPUT", "", Scope::Global).unwrap();
        p.positional("EXTRA", "", Scope::Global).unwrap();
        p.flag("level", Some('l'), 2u8, "", Scope::Global).unwrap();
        p.parse(args(&["file", "-l", "5"])).unwrap();

        let json = to_json(&p).unwrap();

        assert_eq!(
            json,
            r#"{"program":"prog","subcommand":null,"help":false,"positionals":{"EXTRA":null,"INPUT":"file"},"flags":{"help":false,"level":5}}"#
        );
    }

    #[test]
    fn test_subcommand_snapshot_only_shows_its_scope() {
        let mut p = Parser::new("prog", "");
        let sub = p.subcommand("sub", "").unwrap();
        p.flag("global", None, false, "", Scope::Global).unwrap();
        p.list::<i32>("nums", Some('n'), "", sub).unwrap();
        p.flag("", Some('q'), false, "", sub).unwrap();
        p.parse(args(&["sub", "-n", "1", "-2", "-q"])).unwrap();

        let values = ParsedValues::collect(&p);

        assert_eq!(values.subcommand, Some("sub"));
        assert!(!values.flags.contains_key("global"));
        assert_eq!(
            serde_json::to_string(&values.flags).unwrap(),
            r#"{"-q":true,"help":false,"nums":[1,-2]}"#
        );
    }

    #[test]
    fn test_help_is_reported() {
        let mut p = Parser::new("prog", "");
        p.parse(args(&["-h"])).unwrap();
        assert!(ParsedValues::collect(&p).help);
    }

    #[test]
    fn test_write_json() {
        let mut p = Parser::new("prog", "");
        p.parse(args(&[])).unwrap();

        let mut buf = Vec::new();
        write_json(&p, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.ends_with("}\n"));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["program"], "prog");
        assert_eq!(to_json_pretty(&p).unwrap() + "\n", text);
    }
}
