//! Error taxonomy and the single last-error slot.

use thiserror::Error;

/// The fixed set of failure kinds a parser can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SubcommandNotFound,
    FlagNotFound,
    TooManyPositionals,
    InvalidNumber,
    LongFlagWithShortPrefix,
    MissingValue,
    CapacityExceeded,
    InternalError,
}

impl ErrorKind {
    /// Static human-readable message for this kind.
    ///
    /// `InternalError` has no useful static text; [`Error::report`] formats it
    /// from the detail recorded at the failure site instead.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::SubcommandNotFound => "Cannot find an appropriate subcommand",
            ErrorKind::FlagNotFound => "Cannot find an appropriate flag",
            ErrorKind::TooManyPositionals => "Too many main arguments are given",
            ErrorKind::InvalidNumber => "Invalid number or overflowed number is given",
            ErrorKind::LongFlagWithShortPrefix => "Long flags must start with `--`, not `-`",
            ErrorKind::MissingValue => "A flag that takes a value was given none",
            ErrorKind::CapacityExceeded => "Too many flags, arguments or subcommands registered",
            ErrorKind::InternalError => "Internal error",
        }
    }
}

/// Errors raised while registering or parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unknown subcommand: {0}")]
    SubcommandNotFound(String),

    #[error("unknown flag: {0}")]
    FlagNotFound(String),

    #[error("unexpected positional argument: {0}")]
    TooManyPositionals(String),

    #[error("invalid number for {flag}: {value}")]
    InvalidNumber { flag: String, value: String },

    #[error("long flag written with a single dash: {0}")]
    LongFlagWithShortPrefix(String),

    #[error("missing value for flag: {0}")]
    MissingValue(String),

    #[error("capacity exceeded: at most {limit} {what} per scope")]
    CapacityExceeded { what: &'static str, limit: usize },

    #[error("internal error at {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SubcommandNotFound(_) => ErrorKind::SubcommandNotFound,
            Error::FlagNotFound(_) => ErrorKind::FlagNotFound,
            Error::TooManyPositionals(_) => ErrorKind::TooManyPositionals,
            Error::InvalidNumber { .. } => ErrorKind::InvalidNumber,
            Error::LongFlagWithShortPrefix(_) => ErrorKind::LongFlagWithShortPrefix,
            Error::MissingValue(_) => ErrorKind::MissingValue,
            Error::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Error::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Render through the kind's message table.
    pub fn report(&self) -> String {
        match self {
            Error::Internal(detail) => format!("Internal error was found at {}", detail),
            other => other.kind().message().to_string(),
        }
    }
}

/// Holds at most one outstanding error. A later failure replaces the earlier one.
#[derive(Debug, Default)]
pub(crate) struct ErrorSlot {
    last: Option<Error>,
}

impl ErrorSlot {
    /// Store `err` and hand it back, so call sites can write `Err(slot.set(e))`.
    pub(crate) fn set(&mut self, err: Error) -> Error {
        self.last = Some(err.clone());
        err
    }

    pub(crate) fn get(&self) -> Option<&Error> {
        self.last.as_ref()
    }
}
