// src/bitstream/value.rs

//! The structured value model.
//!
//! A [`Structured`] is an ordered field-name to [`Value`] mapping holding one
//! syntactic element. Field order is traversal order. Names are unique: setting
//! an existing name replaces its value in place. Nested values are owned by
//! their parent, so two equal trees never share state.
//!
//! The bit offset at which each field was read is kept alongside the value but
//! does not take part in equality.

use std::fmt;

use bitvec::prelude::*;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::bitstream::io::Bits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(BigInt),
    Bool(bool),
    Bytes(Vec<u8>),
    Bits(Bits),
    Struct(Structured),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "an integer",
            Value::Bool(_) => "a boolean",
            Value::Bytes(_) => "a byte string",
            Value::Bits(_) => "a bit string",
            Value::Struct(_) => "a structure",
            Value::List(_) => "a list",
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(|n| n.to_u64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<&BitSlice<u8, Msb0>> {
        match self {
            Value::Bits(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Structured> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Bits> for Value {
    fn from(b: Bits) -> Self {
        Value::Bits(b)
    }
}

impl From<Structured> for Value {
    fn from(s: Structured) -> Self {
        Value::Struct(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    name: &'static str,
    value: Value,
    offset: Option<u64>,
}

/// An ordered mapping of unique field names to values.
#[derive(Debug, Clone, Default)]
pub struct Structured {
    entries: Vec<Entry>,
}

impl Structured {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Structured::set`].
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing any existing value of the same name in place.
    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry {
                name,
                value,
                offset: None,
            }),
        }
    }

    /// Sets a field and records the bit offset it was read from.
    pub fn set_at(&mut self, name: &'static str, value: impl Into<Value>, offset: u64) {
        self.set(name, value);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.offset = Some(offset);
        }
    }

    /// The value of a field, or `None` when the field is absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(idx).value)
    }

    /// The bit offset a field was read from, when known.
    pub fn offset_of(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.offset)
    }

    pub fn get_int(&self, name: &str) -> Option<&BigInt> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_struct(&self, name: &str) -> Option<&Structured> {
        self.get(name).and_then(Value::as_struct)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    /// Fields in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.entries.iter().map(|e| (e.name, &e.value))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{:indent$}{}:", "", name, indent = indent)?;
            fmt_value(value, f, indent)?;
        }
        Ok(())
    }
}

fn fmt_value(value: &Value, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    match value {
        Value::Int(n) => writeln!(f, " {}", n),
        Value::Bool(b) => writeln!(f, " {}", b),
        Value::Bytes(b) => {
            write!(f, " 0x")?;
            for byte in b {
                write!(f, "{:02X}", byte)?;
            }
            writeln!(f)
        }
        Value::Bits(b) => {
            write!(f, " 0b")?;
            for bit in b.iter().by_vals() {
                write!(f, "{}", u8::from(bit))?;
            }
            writeln!(f)
        }
        Value::Struct(s) => {
            writeln!(f)?;
            s.fmt_indented(f, indent + 2)
        }
        Value::List(items) => {
            if items.iter().all(|v| matches!(v, Value::Int(_))) {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_int)
                    .map(|n| n.to_string())
                    .collect();
                writeln!(f, " [{}]", parts.join(", "))
            } else {
                writeln!(f)?;
                for (i, item) in items.iter().enumerate() {
                    write!(f, "{:indent$}{}:", "", i, indent = indent + 2)?;
                    fmt_value(item, f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for Structured {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Structured {}

impl fmt::Display for Structured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
