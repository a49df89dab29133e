// src/bitstream/description.rs

//! Declarative structure descriptions.
//!
//! A [`Description`] is an ordered list of [`Field`]s. Each field names a
//! codec primitive ([`Kind`]), an optional presence predicate over fields
//! already traversed, an optional auto-fill rule and optional check/update
//! hooks. The serdes engine interprets one description in any of its three
//! modes, so the layout of every syntactic element is written down once.
//!
//! Descriptions are `static` items so that nested structures can refer to each
//! other by reference.

use std::fmt;

use num_bigint::BigInt;

use crate::bitstream::value::{Structured, Value};
use crate::decoder::error::ErrorKind;
use crate::decoder::state::State;

pub type WidthFn = fn(&Scope<'_>, &State) -> Result<u64, ErrorKind>;
pub type PresenceFn = fn(&Scope<'_>, &State) -> bool;
pub type DeriveFn = fn(&Scope<'_>, &State) -> Result<BigInt, ErrorKind>;
pub type StreamFillFn = fn(&Scope<'_>, &State) -> Option<BigInt>;
pub type CheckFn = fn(&Scope<'_>, &State, &Value) -> Result<(), ErrorKind>;
pub type UpdateFn = fn(&Scope<'_>, &mut State, &Value) -> Result<(), ErrorKind>;

/// A bit, byte or element count.
#[derive(Clone, Copy)]
pub enum Width {
    Fixed(u64),
    /// The integer value of an earlier sibling field.
    Field(&'static str),
    Computed(WidthFn),
}

/// Codec primitive of a field.
#[derive(Clone, Copy)]
pub enum Kind {
    Bool,
    /// Unsigned exp-Golomb.
    UInt,
    /// Signed exp-Golomb.
    SInt,
    /// Fixed-width unsigned integer.
    NBits(Width),
    /// Unsigned integer of a whole number of bytes.
    UIntLit(u64),
    Bytes(Width),
    /// Padding up to the next byte boundary, kept as a bit string.
    ByteAlign,
    /// Whatever is left of the enclosing bounded block, kept as a bit string.
    BlockPadding,
    Nested(&'static Description),
    List {
        count: Width,
        element: &'static Kind,
    },
    /// A nested structure read from a bounded block of `bits` bits.
    Bounded {
        bits: Width,
        body: &'static Description,
    },
}

impl Kind {
    /// True for fields that hold padding and are zero-filled when absent.
    pub fn is_padding(&self) -> bool {
        matches!(self, Kind::ByteAlign | Kind::BlockPadding)
    }
}

/// Condition for a field to be present. A referenced field that is itself
/// absent makes the condition false.
#[derive(Clone, Copy)]
pub enum Presence {
    IfTrue(&'static str),
    IfFalse(&'static str),
    IfIntEq(&'static str, u64),
    IfIntNe(&'static str, u64),
    IfState(fn(&State) -> bool),
    Custom {
        refs: &'static [&'static str],
        test: PresenceFn,
    },
}

impl Presence {
    pub fn evaluate(&self, scope: &Scope<'_>, state: &State) -> bool {
        match *self {
            Presence::IfTrue(name) => scope.value.get_bool(name) == Some(true),
            Presence::IfFalse(name) => scope.value.get_bool(name) == Some(false),
            Presence::IfIntEq(name, v) => scope.value.get_u64(name) == Some(v),
            Presence::IfIntNe(name, v) => scope.value.get_u64(name).is_some_and(|n| n != v),
            Presence::IfState(test) => test(state),
            Presence::Custom { test, .. } => test(scope, state),
        }
    }

    fn references(&self) -> &[&'static str] {
        match self {
            Presence::IfTrue(name)
            | Presence::IfFalse(name)
            | Presence::IfIntEq(name, _)
            | Presence::IfIntNe(name, _) => std::slice::from_ref(name),
            Presence::IfState(_) => &[],
            Presence::Custom { refs, .. } => *refs,
        }
    }
}

/// How a field's value is produced when it is absent from the input.
#[derive(Clone, Copy)]
pub enum AutoFill {
    /// A pure function of earlier fields, the input and the state. An
    /// explicitly supplied value must agree with it.
    Derived(DeriveFn),
    /// Used only when the field is absent; explicit values are never compared.
    Default(DeriveFn),
    /// Filled by the stream driver from measured data unit sizes. `fill`
    /// gives the value when it is already known from the state; with
    /// `verify` set, decoded values are compared against it too.
    Stream {
        fill: Option<StreamFillFn>,
        verify: bool,
    },
}

#[derive(Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub presence: Option<Presence>,
    pub autofill: Option<AutoFill>,
    pub check: Option<CheckFn>,
    pub update: Option<UpdateFn>,
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Field {
            name,
            kind,
            presence: None,
            autofill: None,
            check: None,
            update: None,
        }
    }

    pub const fn bool(name: &'static str) -> Self {
        Self::new(name, Kind::Bool)
    }

    pub const fn uint(name: &'static str) -> Self {
        Self::new(name, Kind::UInt)
    }

    pub const fn sint(name: &'static str) -> Self {
        Self::new(name, Kind::SInt)
    }

    pub const fn nbits(name: &'static str, bits: Width) -> Self {
        Self::new(name, Kind::NBits(bits))
    }

    pub const fn uint_lit(name: &'static str, num_bytes: u64) -> Self {
        Self::new(name, Kind::UIntLit(num_bytes))
    }

    pub const fn bytes(name: &'static str, count: Width) -> Self {
        Self::new(name, Kind::Bytes(count))
    }

    pub const fn byte_align(name: &'static str) -> Self {
        Self::new(name, Kind::ByteAlign)
    }

    pub const fn block_padding(name: &'static str) -> Self {
        Self::new(name, Kind::BlockPadding)
    }

    pub const fn nested(name: &'static str, description: &'static Description) -> Self {
        Self::new(name, Kind::Nested(description))
    }

    pub const fn list(name: &'static str, count: Width, element: &'static Kind) -> Self {
        Self::new(name, Kind::List { count, element })
    }

    pub const fn bounded(name: &'static str, bits: Width, body: &'static Description) -> Self {
        Self::new(name, Kind::Bounded { bits, body })
    }

    pub const fn when(self, presence: Presence) -> Self {
        Field {
            presence: Some(presence),
            ..self
        }
    }

    pub const fn autofill(self, autofill: AutoFill) -> Self {
        Field {
            autofill: Some(autofill),
            ..self
        }
    }

    pub const fn check(self, check: CheckFn) -> Self {
        Field {
            check: Some(check),
            ..self
        }
    }

    pub const fn update(self, update: UpdateFn) -> Self {
        Field {
            update: Some(update),
            ..self
        }
    }

    /// Names of sibling fields this field depends on.
    fn references(&self) -> Vec<&'static str> {
        let mut refs: Vec<&'static str> = self
            .presence
            .as_ref()
            .map(|p| p.references().to_vec())
            .unwrap_or_default();
        let width = match self.kind {
            Kind::NBits(w) | Kind::Bytes(w) => Some(w),
            Kind::List { count, .. } => Some(count),
            Kind::Bounded { bits, .. } => Some(bits),
            _ => None,
        };
        if let Some(Width::Field(name)) = width {
            refs.push(name);
        }
        refs
    }
}

/// The layout of one syntactic element. `name` is the pseudocode routine
/// that reads it, reported in error context.
pub struct Description {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Description {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Verifies that presence predicates and widths only refer to fields
    /// appearing earlier in the same description, recursively. Returns the
    /// offending `routine.field -> reference` on failure.
    pub fn check_references(&self) -> Result<(), String> {
        for (i, field) in self.fields.iter().enumerate() {
            for reference in field.references() {
                if !self.fields[..i].iter().any(|f| f.name == reference) {
                    return Err(format!("{}.{} -> {}", self.name, field.name, reference));
                }
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("{}.{} is declared twice", self.name, field.name));
            }
            check_kind(&field.kind)?;
        }
        Ok(())
    }
}

fn check_kind(kind: &Kind) -> Result<(), String> {
    match kind {
        Kind::Nested(d) | Kind::Bounded { body: d, .. } => d.check_references(),
        Kind::List { element, .. } => check_kind(element),
        _ => Ok(()),
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("name", &self.name)
            .field(
                "fields",
                &self.fields.iter().map(|f| f.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The view a hook gets of the traversal at the point of one field.
///
/// `value` holds the fields produced so far at this level. `input` is the
/// structured value being written (absent when reading). Enclosing levels are
/// reachable through `parent`.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub routine: &'static str,
    pub value: &'a Structured,
    pub input: Option<&'a Structured>,
    /// Position within an enclosing list.
    pub index: Option<usize>,
    /// Bit offset at which the current field starts.
    pub offset: u64,
    pub parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Index of the nearest enclosing list element.
    pub fn list_index(&self) -> Option<usize> {
        self.index
            .or_else(|| self.parent.and_then(|p| p.list_index()))
    }

    /// A field produced earlier at this level or an enclosing one.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.value
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }

    /// The integer value of an earlier field.
    pub fn require_u64(&self, name: &'static str) -> Result<u64, ErrorKind> {
        match self.lookup(name) {
            None => Err(ErrorKind::UnknownField {
                field: name,
                routine: self.routine,
            }),
            Some(Value::Int(n)) => n.try_into().map_err(|_| {
                crate::decoder::error::Violation::ValueTooLarge {
                    field: name,
                    value: n.clone(),
                }
                .into()
            }),
            Some(other) => Err(ErrorKind::InvalidValue {
                field: name,
                expected: "an integer",
                found: other.type_name(),
            }),
        }
    }

    /// A field of the value being written, at this level.
    pub fn input_value(&self, name: &str) -> Option<&'a Value> {
        self.input.and_then(|i| i.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static INNER: Description = Description {
        name: "inner",
        fields: &[Field::uint("count"), Field::bool("flag")],
    };

    static GOOD: Description = Description {
        name: "good",
        fields: &[
            Field::bool("has_value"),
            Field::uint("value").when(Presence::IfTrue("has_value")),
            Field::nested("inner", &INNER),
            Field::list("items", Width::Field("value"), &Kind::SInt),
        ],
    };

    static FORWARD: Description = Description {
        name: "forward",
        fields: &[
            Field::uint("value").when(Presence::IfTrue("has_value")),
            Field::bool("has_value"),
        ],
    };

    static OUTER: Description = Description {
        name: "outer",
        fields: &[Field::nested("forward", &FORWARD)],
    };

    #[test]
    fn test_check_references() {
        assert_eq!(GOOD.check_references(), Ok(()));
        assert_eq!(
            FORWARD.check_references(),
            Err("forward.value -> has_value".to_string())
        );
        // Nested descriptions are validated too
        assert!(OUTER.check_references().is_err());
    }

    #[test]
    fn test_presence() {
        let value = Structured::new().with("has_value", true).with("mode", 2u64);
        let scope = Scope {
            routine: "test",
            value: &value,
            input: None,
            index: None,
            offset: 0,
            parent: None,
        };
        let state = State::new();
        assert!(Presence::IfTrue("has_value").evaluate(&scope, &state));
        assert!(!Presence::IfFalse("has_value").evaluate(&scope, &state));
        assert!(Presence::IfIntEq("mode", 2).evaluate(&scope, &state));
        assert!(!Presence::IfIntNe("mode", 2).evaluate(&scope, &state));
        // Absent references are never satisfied
        assert!(!Presence::IfIntNe("missing", 2).evaluate(&scope, &state));
        assert!(!Presence::IfFalse("missing").evaluate(&scope, &state));
    }

    #[test]
    fn test_scope_lookup_walks_parents() {
        let outer = Structured::new().with("slices_x", 4u64);
        let inner = Structured::new().with("qindex", 3u64);
        let parent = Scope {
            routine: "outer",
            value: &outer,
            input: None,
            index: Some(5),
            offset: 0,
            parent: None,
        };
        let scope = Scope {
            routine: "inner",
            value: &inner,
            input: None,
            index: None,
            offset: 8,
            parent: Some(&parent),
        };
        assert_eq!(scope.require_u64("slices_x"), Ok(4));
        assert_eq!(scope.require_u64("qindex"), Ok(3));
        assert_eq!(scope.list_index(), Some(5));
        assert_eq!(
            scope.require_u64("missing"),
            Err(ErrorKind::UnknownField {
                field: "missing",
                routine: "inner"
            })
        );
    }
}
