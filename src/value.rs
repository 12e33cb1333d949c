//! Value kinds, flag values and list storage.

use serde::{Deserialize, Serialize};

/// Scalar kinds a flag or list element can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    String,
}

impl Kind {
    pub fn is_integer(self) -> bool {
        !matches!(self, Kind::Bool | Kind::String)
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::String => "string",
        }
    }
}

/// The current (or default) value of a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Str(String),
    List(ArrayList),
}

impl Value {
    /// Kind of the value, or of its elements for a list.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::I8(_) => Kind::I8,
            Value::I16(_) => Kind::I16,
            Value::I32(_) => Kind::I32,
            Value::I64(_) => Kind::I64,
            Value::U8(_) => Kind::U8,
            Value::U16(_) => Kind::U16,
            Value::U32(_) => Kind::U32,
            Value::U64(_) => Kind::U64,
            Value::Str(_) => Kind::String,
            Value::List(list) => list.kind(),
        }
    }

    /// The zero value of a scalar kind: `false`, `0` or the empty string.
    pub fn zero(kind: Kind) -> Value {
        match kind {
            Kind::Bool => Value::Bool(false),
            Kind::I8 => Value::I8(0),
            Kind::I16 => Value::I16(0),
            Kind::I32 => Value::I32(0),
            Kind::I64 => Value::I64(0),
            Kind::U8 => Value::U8(0),
            Kind::U16 => Value::U16(0),
            Kind::U32 => Value::U32(0),
            Kind::U64 => Value::U64(0),
            Kind::String => Value::Str(String::new()),
        }
    }

    /// Parse a single token as a scalar of `kind`.
    pub fn parse(kind: Kind, token: &str) -> Option<Value> {
        Some(match kind {
            Kind::Bool => Value::Bool(is_truthy(token)),
            Kind::I8 => Value::I8(parse_integer(token)?),
            Kind::I16 => Value::I16(parse_integer(token)?),
            Kind::I32 => Value::I32(parse_integer(token)?),
            Kind::I64 => Value::I64(parse_integer(token)?),
            Kind::U8 => Value::U8(parse_integer(token)?),
            Kind::U16 => Value::U16(parse_integer(token)?),
            Kind::U32 => Value::U32(parse_integer(token)?),
            Kind::U64 => Value::U64(parse_integer(token)?),
            Kind::String => Value::Str(token.to_string()),
        })
    }
}

/// A homogeneous, growable list of flag values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArrayList {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Str(Vec<String>),
}

impl ArrayList {
    pub fn new(kind: Kind) -> Self {
        match kind {
            Kind::Bool => ArrayList::Bool(Vec::new()),
            Kind::I8 => ArrayList::I8(Vec::new()),
            Kind::I16 => ArrayList::I16(Vec::new()),
            Kind::I32 => ArrayList::I32(Vec::new()),
            Kind::I64 => ArrayList::I64(Vec::new()),
            Kind::U8 => ArrayList::U8(Vec::new()),
            Kind::U16 => ArrayList::U16(Vec::new()),
            Kind::U32 => ArrayList::U32(Vec::new()),
            Kind::U64 => ArrayList::U64(Vec::new()),
            Kind::String => ArrayList::Str(Vec::new()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            ArrayList::Bool(_) => Kind::Bool,
            ArrayList::I8(_) => Kind::I8,
            ArrayList::I16(_) => Kind::I16,
            ArrayList::I32(_) => Kind::I32,
            ArrayList::I64(_) => Kind::I64,
            ArrayList::U8(_) => Kind::U8,
            ArrayList::U16(_) => Kind::U16,
            ArrayList::U32(_) => Kind::U32,
            ArrayList::U64(_) => Kind::U64,
            ArrayList::Str(_) => Kind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayList::Bool(v) => v.len(),
            ArrayList::I8(v) => v.len(),
            ArrayList::I16(v) => v.len(),
            ArrayList::I32(v) => v.len(),
            ArrayList::I64(v) => v.len(),
            ArrayList::U8(v) => v.len(),
            ArrayList::U16(v) => v.len(),
            ArrayList::U32(v) => v.len(),
            ArrayList::U64(v) => v.len(),
            ArrayList::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse every token and append them all, or none.
    ///
    /// On failure the offending token is returned and the list is untouched.
    pub fn extend_from_tokens<'t>(&mut self, tokens: &'t [String]) -> Result<(), &'t str> {
        match self {
            ArrayList::Bool(v) => v.extend(parse_all::<bool>(tokens)?),
            ArrayList::I8(v) => v.extend(parse_all::<i8>(tokens)?),
            ArrayList::I16(v) => v.extend(parse_all::<i16>(tokens)?),
            ArrayList::I32(v) => v.extend(parse_all::<i32>(tokens)?),
            ArrayList::I64(v) => v.extend(parse_all::<i64>(tokens)?),
            ArrayList::U8(v) => v.extend(parse_all::<u8>(tokens)?),
            ArrayList::U16(v) => v.extend(parse_all::<u16>(tokens)?),
            ArrayList::U32(v) => v.extend(parse_all::<u32>(tokens)?),
            ArrayList::U64(v) => v.extend(parse_all::<u64>(tokens)?),
            ArrayList::Str(v) => v.extend(tokens.iter().cloned()),
        }
        Ok(())
    }

    /// Drop the backing storage, keeping the element kind.
    pub fn release(&mut self) {
        *self = ArrayList::new(self.kind());
    }
}

fn parse_all<T: FlagValue>(tokens: &[String]) -> Result<Vec<T>, &str> {
    tokens
        .iter()
        .map(|token| T::parse_token(token).ok_or(token.as_str()))
        .collect()
}

/// Rust types that can back a flag.
pub trait FlagValue: Sized + Clone + 'static {
    const KIND: Kind;

    fn parse_token(token: &str) -> Option<Self>;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<&Self>;

    fn from_list(list: &ArrayList) -> Option<&[Self]>;
}

impl FlagValue for bool {
    const KIND: Kind = Kind::Bool;

    fn parse_token(token: &str) -> Option<Self> {
        Some(is_truthy(token))
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn from_list(list: &ArrayList) -> Option<&[Self]> {
        match list {
            ArrayList::Bool(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl FlagValue for String {
    const KIND: Kind = Kind::String;

    fn parse_token(token: &str) -> Option<Self> {
        Some(token.to_string())
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn from_list(list: &ArrayList) -> Option<&[Self]> {
        match list {
            ArrayList::Str(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

macro_rules! integer_flag_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FlagValue for $ty {
                const KIND: Kind = Kind::$variant;

                fn parse_token(token: &str) -> Option<Self> {
                    parse_integer(token)
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<&Self> {
                    match value {
                        Value::$variant(n) => Some(n),
                        _ => None,
                    }
                }

                fn from_list(list: &ArrayList) -> Option<&[Self]> {
                    match list {
                        ArrayList::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_flag_value! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

/// `t`, `T`, `true` and `True` are true; everything else is false.
pub fn is_truthy(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some('t') | Some('T') => {
            let rest = chars.as_str();
            rest.is_empty() || rest == "rue"
        }
        _ => false,
    }
}

/// Parse an integer with C-style base detection.
///
/// Accepts leading whitespace, an optional sign, then `0x`/`0X` hex, a
/// leading `0` for octal, or decimal. Returns `None` for malformed input and
/// for values that do not fit `T`.
pub fn parse_integer<T: TryFrom<i128>>(token: &str) -> Option<T> {
    let s = token.trim_start();

    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, hex)
    } else if s.len() > 1 && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };

    // from_str_radix tolerates its own sign, which would allow "--5" or "0x-1"
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }

    let magnitude = i128::try_from(u128::from_str_radix(digits, radix).ok()?).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).ok()
}
