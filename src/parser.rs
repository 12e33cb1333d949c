//! The parser context and its token state machine.

use crate::error::{Error, ErrorSlot};
use crate::registry::{empty_list, Limits, Registry, Scope, ScopeId, SubcommandId};
use crate::value::{FlagValue, Kind, Value};
use serde::Deserialize;
use std::ffi::OsString;
use std::marker::PhantomData;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Source of per-parser ids stamped into handles.
static NEXT_PARSER_ID: AtomicU64 = AtomicU64::new(0);

/// How flag tokens are matched against a scope's registered flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagLookup {
    /// Look flags up by name. Flags may appear in any order.
    #[default]
    Indexed,
    /// Scan forward from the last matched flag only. Flags must then be
    /// given in registration order; an earlier flag after a later one is
    /// reported as not found.
    ForwardScan,
}

/// Parser construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub limits: Limits,
    pub flag_lookup: FlagLookup,
}

/// Read-back handle for a scalar flag of type `T`.
#[derive(Debug)]
pub struct FlagHandle<T> {
    owner: u64,
    scope: ScopeId,
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for FlagHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FlagHandle<T> {}

/// Read-back handle for a list flag with elements of type `T`.
#[derive(Debug)]
pub struct ListHandle<T> {
    owner: u64,
    scope: ScopeId,
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ListHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListHandle<T> {}

/// Read-back handle for a positional argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionalHandle {
    owner: u64,
    scope: ScopeId,
    slot: usize,
}

/// A classified command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// A bare `--`.
    Separator,
    Positional,
    Long(&'a str),
    Short(char),
    /// A single dash followed by more than one character.
    LongWithShortPrefix,
}

fn classify(token: &str) -> Token<'_> {
    if token == "--" {
        return Token::Separator;
    }
    if let Some(name) = token.strip_prefix("--") {
        return Token::Long(name);
    }
    match token.strip_prefix('-') {
        Some(rest) => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                // a lone "-" conventionally names stdin
                (None, _) => Token::Positional,
                (Some(c), None) => Token::Short(c),
                _ => Token::LongWithShortPrefix,
            }
        }
        None => Token::Positional,
    }
}

/// Whether `token` terminates a run of list values of element `kind`.
fn ends_list(kind: Kind, token: &str) -> bool {
    match token.strip_prefix('-') {
        None => false,
        Some(rest) => !(kind.is_integer() && rest.starts_with(|c: char| c.is_ascii_digit())),
    }
}

/// Per-pass cursors.
#[derive(Debug, Default)]
struct Pass {
    /// Next positional slot to fill.
    positional: usize,
    /// Forward-scan cursor into the scope's flags.
    scan: usize,
}

/// A command-line parser: registered scopes, the subcommand index and the
/// last error.
///
/// Registration happens first, then a single [`Parser::parse`], then values
/// are read back through the handles returned at registration.
#[derive(Debug)]
pub struct Parser {
    id: u64,
    registry: Registry,
    flag_lookup: FlagLookup,
    errors: ErrorSlot,
    active: Option<usize>,
    parsed: bool,
}

impl Parser {
    /// Create a parser with default settings. A `help`/`-h` flag is
    /// registered in the global scope.
    pub fn new(program: &str, description: &str) -> Self {
        Self::with_settings(program, description, Settings::default())
    }

    pub fn with_settings(program: &str, description: &str, settings: Settings) -> Self {
        Self {
            id: NEXT_PARSER_ID.fetch_add(1, Ordering::Relaxed),
            registry: Registry::new(program, description, settings.limits),
            flag_lookup: settings.flag_lookup,
            errors: ErrorSlot::default(),
            active: None,
            parsed: false,
        }
    }

    pub fn program(&self) -> &str {
        &self.registry.program
    }

    /// Program description shown at the top of the help text.
    pub fn description(&self) -> &str {
        &self.registry.description
    }

    /// Register a subcommand. It gets its own `help`/`-h` flag.
    pub fn subcommand(&mut self, name: &str, description: &str) -> Result<SubcommandId, Error> {
        let result = self
            .ensure_registering()
            .and_then(|()| self.registry.add_subcommand(name, description));
        self.record(result)
    }

    /// Register a positional argument slot. Slots bind in registration order.
    pub fn positional<'a>(
        &mut self,
        name: &str,
        description: &str,
        scope: impl Into<Scope<'a>>,
    ) -> Result<PositionalHandle, Error> {
        let result = self.ensure_registering().and_then(|()| {
            let scope = self.registry.resolve(scope.into())?;
            let slot = self.registry.add_positional(scope, name, description)?;
            Ok(PositionalHandle {
                owner: self.id,
                scope,
                slot,
            })
        });
        self.record(result)
    }

    /// Register a scalar flag. `default` is the value read back when the
    /// flag does not appear on the command line.
    pub fn flag<'a, T: FlagValue>(
        &mut self,
        name: &str,
        short: Option<char>,
        default: T,
        description: &str,
        scope: impl Into<Scope<'a>>,
    ) -> Result<FlagHandle<T>, Error> {
        let result = self.ensure_registering().and_then(|()| {
            let scope = self.registry.resolve(scope.into())?;
            let slot =
                self.registry
                    .add_flag(scope, name, short, default.into_value(), description)?;
            Ok(FlagHandle {
                owner: self.id,
                scope,
                slot,
                _marker: PhantomData,
            })
        });
        self.record(result)
    }

    /// Register a list flag. Every occurrence appends to the list.
    pub fn list<'a, T: FlagValue>(
        &mut self,
        name: &str,
        short: Option<char>,
        description: &str,
        scope: impl Into<Scope<'a>>,
    ) -> Result<ListHandle<T>, Error> {
        let result = self.ensure_registering().and_then(|()| {
            let scope = self.registry.resolve(scope.into())?;
            let slot = self
                .registry
                .add_flag(scope, name, short, empty_list(T::KIND), description)?;
            Ok(ListHandle {
                owner: self.id,
                scope,
                slot,
                _marker: PhantomData,
            })
        });
        self.record(result)
    }

    /// Register a flag whose kind is only known at runtime. A
    /// [`Value::List`] default registers a list flag.
    ///
    /// Values are read back with [`Parser::flag_value`].
    pub fn register_value<'a>(
        &mut self,
        name: &str,
        short: Option<char>,
        default: Value,
        description: &str,
        scope: impl Into<Scope<'a>>,
    ) -> Result<(), Error> {
        let result = self.ensure_registering().and_then(|()| {
            let scope = self.registry.resolve(scope.into())?;
            self.registry
                .add_flag(scope, name, short, default, description)
                .map(|_| ())
        });
        self.record(result)
    }

    /// Parse `args`. The first element is the program name and is skipped.
    ///
    /// Stops at the first error, which is also kept as [`Parser::last_error`].
    /// Slots bound before the failure keep their values.
    pub fn parse<I, S>(&mut self, args: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.parsed {
            return Err(self
                .errors
                .set(Error::Internal("parse (already called)".to_string())));
        }
        self.parsed = true;

        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let tokens = args.get(1..).unwrap_or_default();

        match self.run(tokens) {
            Ok(()) => {
                debug!(
                    tokens = tokens.len(),
                    subcommand = self.active_subcommand().unwrap_or("-"),
                    "parsed command line"
                );
                Ok(())
            }
            Err(err) => Err(self.errors.set(err)),
        }
    }

    /// Parse OS-native arguments. Each one must be valid Unicode.
    pub fn parse_os<I>(&mut self, args: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut normalized = Vec::new();
        for arg in args {
            match arg.into_string() {
                Ok(arg) => normalized.push(arg),
                Err(raw) => {
                    return Err(self.errors.set(Error::Internal(format!(
                        "argument decoding ({:?} is not valid unicode)",
                        raw
                    ))))
                }
            }
        }
        self.parse(normalized)
    }

    /// Parse the arguments of the current process.
    pub fn parse_env(&mut self) -> Result<(), Error> {
        self.parse_os(std::env::args_os())
    }

    fn run(&mut self, tokens: &[String]) -> Result<(), Error> {
        let mut cursor = 0;

        let scope = match tokens.first() {
            Some(first) if !self.registry.subcommands.is_empty() && !first.starts_with('-') => {
                let slot = self
                    .registry
                    .find_subcommand(first)
                    .ok_or_else(|| Error::SubcommandNotFound(first.clone()))?;
                self.registry.subcommands[slot].active = true;
                self.active = Some(slot);
                cursor = 1;
                debug!(subcommand = %first, "activated subcommand");
                ScopeId::Sub(slot)
            }
            _ => ScopeId::Global,
        };

        let mut pass = Pass::default();
        while let Some(token) = tokens.get(cursor) {
            cursor += 1;
            let class = classify(token);
            trace!(token = %token, ?class, "classified token");

            match class {
                Token::Separator => {}
                Token::Positional => self.bind_positional(scope, &mut pass, token)?,
                Token::LongWithShortPrefix => {
                    return Err(Error::LongFlagWithShortPrefix(token.clone()))
                }
                Token::Long(_) | Token::Short(_) => {
                    let slot = self
                        .find_flag(scope, &mut pass, class)
                        .ok_or_else(|| Error::FlagNotFound(token.clone()))?;
                    cursor = self.extract(scope, slot, token, tokens, cursor)?;
                }
            }
        }

        Ok(())
    }

    fn bind_positional(&mut self, scope: ScopeId, pass: &mut Pass, token: &str) -> Result<(), Error> {
        let slot = self
            .registry
            .scope_mut(scope)
            .positionals
            .get_mut(pass.positional)
            .ok_or_else(|| Error::TooManyPositionals(token.to_string()))?;
        slot.value = Some(token.to_string());
        pass.positional += 1;
        Ok(())
    }

    fn find_flag(&self, scope: ScopeId, pass: &mut Pass, class: Token<'_>) -> Option<usize> {
        let data = self.registry.scope(scope);
        match self.flag_lookup {
            FlagLookup::Indexed => match class {
                Token::Long(name) => data.long_slot(name),
                Token::Short(c) => data.short_slot(c),
                _ => None,
            },
            FlagLookup::ForwardScan => {
                let start = pass.scan.min(data.flags.len());
                let found = data.flags[start..]
                    .iter()
                    .position(|flag| match class {
                        Token::Long(name) => flag.name == name,
                        Token::Short(c) => flag.short == Some(c),
                        _ => false,
                    })
                    .map(|offset| start + offset);
                pass.scan = found.unwrap_or(data.flags.len());
                found
            }
        }
    }

    /// Store the value for the flag at `slot`, consuming tokens from
    /// `cursor`. Returns the cursor past the consumed tokens.
    fn extract(
        &mut self,
        scope: ScopeId,
        slot: usize,
        flag_token: &str,
        tokens: &[String],
        cursor: usize,
    ) -> Result<usize, Error> {
        let flag = self
            .registry
            .scope_mut(scope)
            .flags
            .get_mut(slot)
            .ok_or_else(|| Error::Internal(format!("flag slot {} of {}", slot, flag_token)))?;

        match &mut flag.value {
            Value::Bool(set) => {
                *set = true;
                Ok(cursor)
            }
            Value::List(list) => {
                let kind = list.kind();
                let end = tokens[cursor..]
                    .iter()
                    .position(|token| ends_list(kind, token))
                    .map_or(tokens.len(), |offset| cursor + offset);
                list.extend_from_tokens(&tokens[cursor..end])
                    .map_err(|bad| Error::InvalidNumber {
                        flag: flag_token.to_string(),
                        value: bad.to_string(),
                    })?;
                Ok(end)
            }
            value => {
                let token = tokens
                    .get(cursor)
                    .ok_or_else(|| Error::MissingValue(flag_token.to_string()))?;
                *value = Value::parse(value.kind(), token).ok_or_else(|| Error::InvalidNumber {
                    flag: flag_token.to_string(),
                    value: token.clone(),
                })?;
                Ok(cursor + 1)
            }
        }
    }

    /// Current value of a scalar flag, or `None` for a handle from another parser.
    pub fn get<T: FlagValue>(&self, handle: FlagHandle<T>) -> Option<&T> {
        self.owns(handle.owner)?;
        let flag = self.registry.try_scope(handle.scope)?.flags.get(handle.slot)?;
        T::from_value(&flag.value)
    }

    /// Accumulated values of a list flag.
    pub fn values<T: FlagValue>(&self, handle: ListHandle<T>) -> Option<&[T]> {
        self.owns(handle.owner)?;
        let flag = self.registry.try_scope(handle.scope)?.flags.get(handle.slot)?;
        match &flag.value {
            Value::List(list) => T::from_list(list),
            _ => None,
        }
    }

    /// Bound value of a positional slot, `None` while unfilled.
    pub fn positional_value(&self, handle: PositionalHandle) -> Option<&str> {
        self.owns(handle.owner)?;
        self.registry
            .try_scope(handle.scope)?
            .positionals
            .get(handle.slot)?
            .value
            .as_deref()
    }

    /// Current value of the flag named `name` in `scope`.
    pub fn flag_value<'a>(&self, scope: impl Into<Scope<'a>>, name: &str) -> Option<&Value> {
        let data = self.registry.try_scope(self.registry.resolve(scope.into()).ok()?)?;
        data.flags.get(data.long_slot(name)?).map(|flag| &flag.value)
    }

    /// Registered default of the flag named `name` in `scope`.
    pub fn flag_default<'a>(&self, scope: impl Into<Scope<'a>>, name: &str) -> Option<&Value> {
        let data = self.registry.try_scope(self.registry.resolve(scope.into()).ok()?)?;
        data.flags.get(data.long_slot(name)?).map(|flag| &flag.default)
    }

    /// Bound value of the positional slot named `name` in `scope`.
    pub fn positional_by_name<'a>(&self, scope: impl Into<Scope<'a>>, name: &str) -> Option<&str> {
        let data = self.registry.try_scope(self.registry.resolve(scope.into()).ok()?)?;
        data.positionals
            .iter()
            .find(|arg| arg.name == name)?
            .value
            .as_deref()
    }

    /// Whether `id` was selected by the last parse.
    pub fn is_active(&self, id: SubcommandId) -> bool {
        self.registry
            .subcommands
            .get(id.0)
            .map_or(false, |sub| sub.active)
    }

    pub fn active_subcommand(&self) -> Option<&str> {
        self.active
            .and_then(|slot| self.registry.subcommands.get(slot))
            .map(|sub| sub.name.as_str())
    }

    /// True when `--help`/`-h` was given in any scope.
    pub fn is_help_requested(&self) -> bool {
        self.registry.any_help_requested()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.errors.get()
    }

    /// The last error rendered through the static message table.
    pub fn last_error_message(&self) -> Option<String> {
        self.errors.get().map(Error::report)
    }

    /// Release list storage and the subcommand index.
    ///
    /// Safe to call repeatedly. Dropping the parser releases everything too.
    pub fn teardown(&mut self) {
        self.registry.release();
        debug!(program = %self.registry.program, "released parser storage");
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scope the last pass resolved against.
    pub(crate) fn active_scope(&self) -> ScopeId {
        self.active.map_or(ScopeId::Global, ScopeId::Sub)
    }

    fn owns(&self, owner: u64) -> Option<()> {
        (owner == self.id).then_some(())
    }

    fn ensure_registering(&self) -> Result<(), Error> {
        if self.parsed {
            return Err(Error::Internal("registration (after parse)".to_string()));
        }
        Ok(())
    }

    fn record<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        result.map_err(|err| self.errors.set(err))
    }
}

impl<T: FlagValue> Index<FlagHandle<T>> for Parser {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the handle was issued by a different parser.
    fn index(&self, handle: FlagHandle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("flag handle does not belong to this parser"),
        }
    }
}

impl<T: FlagValue> Index<ListHandle<T>> for Parser {
    type Output = [T];

    /// # Panics
    ///
    /// Panics if the handle was issued by a different parser.
    fn index(&self, handle: ListHandle<T>) -> &[T] {
        match self.values(handle) {
            Some(values) => values,
            None => panic!("list handle does not belong to this parser"),
        }
    }
}
