//! Storage for scopes, flags, positional slots and subcommands.

use crate::error::Error;
use crate::index::SubcommandIndex;
use crate::value::{ArrayList, Value};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Name of the flag registered in every scope.
pub const HELP_FLAG: &str = "help";
/// Short form of the help flag.
pub const HELP_SHORT: char = 'h';
const HELP_DESCRIPTION: &str = "Print this help message";

/// Registration ceilings. Exceeding one is a recoverable `CapacityExceeded` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Flags per scope, including the built-in help flag.
    pub max_flags: usize,
    /// Positional slots per scope.
    pub max_positionals: usize,
    pub max_subcommands: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_flags: 256,
            max_positionals: 16,
            max_subcommands: 64,
        }
    }
}

/// Identifies a subcommand registered on a [`Parser`](crate::Parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubcommandId(pub(crate) usize);

/// Where a flag or positional argument is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Global,
    Subcommand(SubcommandId),
    /// A subcommand looked up by name.
    Named(&'a str),
}

impl From<SubcommandId> for Scope<'_> {
    fn from(id: SubcommandId) -> Self {
        Scope::Subcommand(id)
    }
}

impl<'a> From<&'a str> for Scope<'a> {
    fn from(name: &'a str) -> Self {
        Scope::Named(name)
    }
}

/// A resolved scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ScopeId {
    Global,
    Sub(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Flag {
    pub(crate) name: String,
    pub(crate) short: Option<char>,
    pub(crate) value: Value,
    pub(crate) default: Value,
    pub(crate) description: String,
}

#[derive(Debug, Clone)]
pub(crate) struct MainArg {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) value: Option<String>,
}

/// Flags and positional slots of one scope.
#[derive(Debug, Default)]
pub(crate) struct ScopeData {
    pub(crate) flags: Vec<Flag>,
    pub(crate) positionals: Vec<MainArg>,
    long_index: HashMap<String, usize>,
    short_index: HashMap<char, usize>,
    help_slot: usize,
}

impl ScopeData {
    /// Slot of the long flag `name`. The first registration wins.
    pub(crate) fn long_slot(&self, name: &str) -> Option<usize> {
        self.long_index.get(name).copied()
    }

    pub(crate) fn short_slot(&self, short: char) -> Option<usize> {
        self.short_index.get(&short).copied()
    }

    pub(crate) fn help_requested(&self) -> bool {
        matches!(
            self.flags.get(self.help_slot).map(|f| &f.value),
            Some(Value::Bool(true))
        )
    }

    fn push_flag(&mut self, flag: Flag) -> usize {
        let slot = self.flags.len();
        if !flag.name.is_empty() {
            self.long_index.entry(flag.name.clone()).or_insert(slot);
        }
        if let Some(short) = flag.short {
            self.short_index.entry(short).or_insert(slot);
        }
        self.flags.push(flag);
        slot
    }
}

#[derive(Debug)]
pub(crate) struct Subcmd {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) active: bool,
    pub(crate) scope: ScopeData,
}

/// Every registered scope plus the subcommand index.
#[derive(Debug)]
pub(crate) struct Registry {
    pub(crate) program: String,
    pub(crate) description: String,
    pub(crate) limits: Limits,
    pub(crate) global: ScopeData,
    pub(crate) subcommands: Vec<Subcmd>,
    index: SubcommandIndex,
}

impl Registry {
    pub(crate) fn new(program: &str, description: &str, limits: Limits) -> Self {
        let mut registry = Self {
            program: program.to_string(),
            description: description.to_string(),
            limits,
            global: ScopeData::default(),
            subcommands: Vec::new(),
            index: SubcommandIndex::new(),
        };
        // A zero flag limit leaves the global scope without a help flag.
        if let Ok(slot) = registry.add_flag(
            ScopeId::Global,
            HELP_FLAG,
            Some(HELP_SHORT),
            Value::Bool(false),
            HELP_DESCRIPTION,
        ) {
            registry.global.help_slot = slot;
        }
        registry
    }

    pub(crate) fn resolve(&self, scope: Scope<'_>) -> Result<ScopeId, Error> {
        match scope {
            Scope::Global => Ok(ScopeId::Global),
            Scope::Subcommand(SubcommandId(slot)) if slot < self.subcommands.len() => {
                Ok(ScopeId::Sub(slot))
            }
            Scope::Subcommand(SubcommandId(slot)) => {
                Err(Error::SubcommandNotFound(format!("#{}", slot)))
            }
            Scope::Named(name) => self
                .find_subcommand(name)
                .map(ScopeId::Sub)
                .ok_or_else(|| Error::SubcommandNotFound(name.to_string())),
        }
    }

    pub(crate) fn find_subcommand(&self, name: &str) -> Option<usize> {
        self.index.get(name)
    }

    pub(crate) fn scope(&self, id: ScopeId) -> &ScopeData {
        match id {
            ScopeId::Global => &self.global,
            ScopeId::Sub(slot) => &self.subcommands[slot].scope,
        }
    }

    pub(crate) fn try_scope(&self, id: ScopeId) -> Option<&ScopeData> {
        match id {
            ScopeId::Global => Some(&self.global),
            ScopeId::Sub(slot) => self.subcommands.get(slot).map(|sub| &sub.scope),
        }
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut ScopeData {
        match id {
            ScopeId::Global => &mut self.global,
            ScopeId::Sub(slot) => &mut self.subcommands[slot].scope,
        }
    }

    pub(crate) fn add_subcommand(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<SubcommandId, Error> {
        if self.subcommands.len() >= self.limits.max_subcommands {
            return Err(Error::CapacityExceeded {
                what: "subcommands",
                limit: self.limits.max_subcommands,
            });
        }

        let slot = self.subcommands.len();
        self.index.insert(name, slot);
        self.subcommands.push(Subcmd {
            name: name.to_string(),
            description: description.to_string(),
            active: false,
            scope: ScopeData::default(),
        });

        if let Ok(help_slot) = self.add_flag(
            ScopeId::Sub(slot),
            HELP_FLAG,
            Some(HELP_SHORT),
            Value::Bool(false),
            HELP_DESCRIPTION,
        ) {
            self.subcommands[slot].scope.help_slot = help_slot;
        }

        debug!(subcommand = name, slot, "registered subcommand");
        Ok(SubcommandId(slot))
    }

    pub(crate) fn add_positional(
        &mut self,
        scope: ScopeId,
        name: &str,
        description: &str,
    ) -> Result<usize, Error> {
        let limit = self.limits.max_positionals;
        let data = self.scope_mut(scope);
        if data.positionals.len() >= limit {
            return Err(Error::CapacityExceeded {
                what: "positional arguments",
                limit,
            });
        }

        data.positionals.push(MainArg {
            name: name.to_string(),
            description: description.to_string(),
            value: None,
        });
        Ok(data.positionals.len() - 1)
    }

    pub(crate) fn add_flag(
        &mut self,
        scope: ScopeId,
        name: &str,
        short: Option<char>,
        default: Value,
        description: &str,
    ) -> Result<usize, Error> {
        if name.is_empty() && short.is_none() {
            return Err(Error::Internal(
                "registration (flag without a long or short name)".to_string(),
            ));
        }

        let limit = self.limits.max_flags;
        let data = self.scope_mut(scope);
        if data.flags.len() >= limit {
            return Err(Error::CapacityExceeded {
                what: "flags",
                limit,
            });
        }

        Ok(data.push_flag(Flag {
            name: name.to_string(),
            short,
            value: default.clone(),
            default,
            description: description.to_string(),
        }))
    }

    pub(crate) fn any_help_requested(&self) -> bool {
        self.global.help_requested()
            || self.subcommands.iter().any(|sub| sub.scope.help_requested())
    }

    /// Release list storage and the index chains.
    pub(crate) fn release(&mut self) {
        let scopes = std::iter::once(&mut self.global)
            .chain(self.subcommands.iter_mut().map(|sub| &mut sub.scope));
        for scope in scopes {
            for flag in &mut scope.flags {
                if let Value::List(list) = &mut flag.value {
                    list.release();
                }
            }
        }
        self.index.clear();
    }
}

/// Empty list value for a list flag of this element kind.
pub(crate) fn empty_list(kind: crate::value::Kind) -> Value {
    Value::List(ArrayList::new(kind))
}
