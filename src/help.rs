//! Help text generation from the registered scopes.

use crate::parser::Parser;
use crate::registry::{Flag, MainArg, ScopeData, ScopeId};

/// Space between the name column and the descriptions.
const COLUMN_MARGIN: usize = 4;
const INDENT: &str = "    ";

/// Generate help for the scope selected by the last parse.
///
/// With an active subcommand only that subcommand is described. Otherwise
/// the global scope is described, followed by the list of subcommands.
pub fn generate_help(parser: &Parser) -> String {
    let registry = parser.registry();
    let mut help = String::new();

    if !parser.description().is_empty() {
        help.push_str(&format!("{}\n\n", parser.description()));
    }

    let scope = parser.active_scope();
    let usage = match scope {
        ScopeId::Sub(slot) => format!(
            "Usage: {} {} [ARGS] [FLAGS]",
            registry.program, registry.subcommands[slot].name
        ),
        ScopeId::Global if !registry.subcommands.is_empty() => {
            format!("Usage: {} [SUBCOMMANDS] [ARGS] [FLAGS]", registry.program)
        }
        ScopeId::Global => format!("Usage: {} [ARGS] [FLAGS]", registry.program),
    };
    help.push_str(&usage);
    help.push_str("\n\n");

    help.push_str(&scope_tables(registry.scope(scope)));

    if scope == ScopeId::Global && !registry.subcommands.is_empty() {
        let rows: Vec<(String, &str)> = registry
            .subcommands
            .iter()
            .map(|sub| (sub.name.clone(), sub.description.as_str()))
            .collect();
        help.push_str("\nSubcommands:\n");
        help.push_str(&table(&rows));
    }

    help
}

fn scope_tables(scope: &ScopeData) -> String {
    let mut out = String::new();

    if !scope.positionals.is_empty() {
        let rows: Vec<(String, &str)> = scope.positionals.iter().map(positional_row).collect();
        out.push_str("Args:\n");
        out.push_str(&table(&rows));
    }

    if !scope.flags.is_empty() {
        let rows: Vec<(String, &str)> = scope.flags.iter().map(flag_row).collect();
        out.push_str("Options:\n");
        out.push_str(&table(&rows));
    }

    out
}

fn positional_row(arg: &MainArg) -> (String, &str) {
    (arg.name.clone(), arg.description.as_str())
}

/// `-o, --output`, `    --output` or `-o` in a fixed-width short column.
fn flag_row(flag: &Flag) -> (String, &str) {
    let label = match (flag.short, flag.name.is_empty()) {
        (Some(short), false) => format!("-{}, --{}", short, flag.name),
        (Some(short), true) => format!("-{}", short),
        (None, _) => format!("    --{}", flag.name),
    };
    (label, flag.description.as_str())
}

/// Rows padded to the longest label of this table plus the margin.
fn table(rows: &[(String, &str)]) -> String {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        + COLUMN_MARGIN;

    rows.iter()
        .map(|(label, description)| {
            let line = format!("{}{:<width$}{}", INDENT, label, description, width = width);
            format!("{}\n", line.trim_end())
        })
        .collect()
}

impl Parser {
    /// Help text for the scope selected by the last parse.
    pub fn render_help(&self) -> String {
        generate_help(self)
    }

    /// Write the help text to stderr.
    pub fn print_help(&self) {
        eprint!("{}", self.render_help());
    }
}
