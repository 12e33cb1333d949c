//! clparse - typed command-line flags, positional arguments and subcommands.
//!
//! A [`Parser`] owns everything registered on it. Flags and positional
//! arguments live either in the global scope or in a subcommand's scope;
//! a parse activates at most one subcommand and reads only that scope.
//! Registrations can also come from a JSON [`Schema`].

pub mod config;
pub mod error;
pub mod help;
pub mod index;
pub mod output;
pub mod parser;
pub mod registry;
pub mod value;

pub use config::{ConfigError, Schema};
pub use error::{Error, ErrorKind};
pub use help::generate_help;
pub use output::{to_json, to_json_pretty, write_json, ParsedValues};
pub use parser::{FlagHandle, FlagLookup, ListHandle, Parser, PositionalHandle, Settings};
pub use registry::{Limits, Scope, SubcommandId, HELP_FLAG};
pub use value::{ArrayList, FlagValue, Kind, Value};
