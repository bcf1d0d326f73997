//! Shared core types used across the registry, plan and chain layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of decimals used by every token amount in a deployment.
pub const TOKEN_DECIMALS: u32 = 18;

const ONE_TOKEN: u128 = 10u128.pow(TOKEN_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid address '{0}': expected 0x followed by 40 hex digits")]
    Address(String),
    #[error("invalid token amount '{0}'")]
    Amount(String),
    #[error("token amount '{0}' does not fit in 128 bits")]
    AmountOverflow(String),
}

/// A chain address.
///
/// Stored lowercase so that checksummed and plain spellings of the same
/// address compare equal in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ParseError::Address(raw.to_string()))?;
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::Address(raw.to_string()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Build an address from 20 raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for byte in bytes {
            out.push_str(&format!("{byte:02x}"));
        }
        Self(out)
    }

    pub fn zero() -> Self {
        Self::from_bytes([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Well-known constants compiled into the defaults; validated by tests.
    pub(crate) fn known(raw: &str) -> Self {
        Self(raw.to_ascii_lowercase())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the network a deployment runs against (`mainnet`, `test`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NetworkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of an 18-decimal token, held in base units.
///
/// Serialized as a decimal string in whole-token units, so `"0.1"` in a
/// config file is `10^17` base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Whole tokens, e.g. `TokenAmount::tokens(1_000_000)`.
    pub const fn tokens(whole: u128) -> Self {
        Self(whole * ONE_TOKEN)
    }

    pub const fn base_units(self) -> u128 {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim().replace('_', "");
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole.to_string(), fraction.to_string()),
            None => (trimmed.clone(), String::new()),
        };
        let valid = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !valid(&whole)
            || !valid(&fraction)
            || fraction.len() > TOKEN_DECIMALS as usize
        {
            return Err(ParseError::Amount(raw.to_string()));
        }

        let overflow = || ParseError::AmountOverflow(raw.to_string());
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let padded = format!("{fraction:0<width$}", width = TOKEN_DECIMALS as usize);
        let fraction: u128 = padded.parse().map_err(|_| overflow())?;

        whole
            .checked_mul(ONE_TOKEN)
            .and_then(|units| units.checked_add(fraction))
            .map(Self)
            .ok_or_else(overflow)
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// `self * mul / div` without intermediate overflow where the factors
    /// share divisors with `div` (the usual `amount * price / 1e18` case).
    pub fn mul_div(self, mul: u128, div: u128) -> Option<TokenAmount> {
        if div == 0 {
            return None;
        }
        let (mut a, mut b, mut d) = (self.0, mul, div);
        let g = gcd(a, d);
        a /= g;
        d /= g;
        let g = gcd(b, d);
        b /= g;
        d /= g;
        a.checked_mul(b).map(|product| Self(product / d))
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 { 1 } else { a }
}

impl FromStr for TokenAmount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TokenAmount> for String {
    fn from(value: TokenAmount) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_TOKEN;
        let fraction = self.0 % ONE_TOKEN;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{fraction:0width$}", width = TOKEN_DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// A constructor or call argument, or a value returned by a view call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Address(Address),
    /// Kept as a decimal string on the wire; JSON numbers lose precision past 2^53.
    Uint(#[serde(with = "uint_string")] u128),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Value::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Value::Address(value)
    }
}

impl From<&Address> for Value {
    fn from(value: &Address) -> Self {
        Value::Address(value.clone())
    }
}

impl From<TokenAmount> for Value {
    fn from(value: TokenAmount) -> Self {
        Value::Uint(value.base_units())
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::Uint(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(u128::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Address(address) => write!(f, "{address}"),
            Value::Uint(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value:?}"),
        }
    }
}

mod uint_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
