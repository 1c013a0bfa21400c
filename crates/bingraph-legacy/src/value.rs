//! Value translators: convert one persisted field of a legacy record into
//! the binary form of a current member.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use bingraph_binary::{BinaryError, BinaryResult, ByteOrder, EntityRecord, Primitive, PrimitiveType};
use bingraph_handler::{HandlerResult, MemberKind, TypeMember};

/// The fixed-width value shapes a translator converts between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive(PrimitiveType),
    Reference,
}

impl ValueKind {
    /// The kind of a fixed-width member. `None` for list members.
    pub fn of(member: &TypeMember) -> Option<Self> {
        match &member.kind {
            MemberKind::Primitive { primitive } => Some(Self::Primitive(*primitive)),
            MemberKind::Reference => Some(Self::Reference),
            _ => None,
        }
    }

    pub fn byte_size(self) -> u64 {
        match self {
            Self::Primitive(primitive) => primitive.byte_size(),
            Self::Reference => bingraph_binary::OBJECT_ID_LENGTH,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => primitive.fmt(f),
            Self::Reference => f.write_str("reference"),
        }
    }
}

/// Intermediate form of a primitive during conversion. Chars travel as
/// their code point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn as_i64(self) -> i64 {
        match self {
            Self::Bool(value) => i64::from(value),
            Self::Int(value) => value,
            Self::Float(value) => value as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Bool(value) => f64::from(u8::from(value)),
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    fn as_bool(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Int(value) => value != 0,
            Self::Float(value) => value != 0.0,
        }
    }

    pub(crate) fn read(order: ByteOrder, kind: PrimitiveType, bytes: &[u8]) -> BinaryResult<Self> {
        Ok(match kind {
            PrimitiveType::Byte => Self::Int(i8::decode(order, bytes)?.into()),
            PrimitiveType::Boolean => Self::Bool(bool::decode(order, bytes)?),
            PrimitiveType::Short => Self::Int(i16::decode(order, bytes)?.into()),
            PrimitiveType::Char => Self::Int(u32::from(char::decode(order, bytes)?).into()),
            PrimitiveType::Int => Self::Int(i32::decode(order, bytes)?.into()),
            PrimitiveType::Float => Self::Float(f32::decode(order, bytes)?.into()),
            PrimitiveType::Long => Self::Int(i64::decode(order, bytes)?),
            PrimitiveType::Double => Self::Float(f64::decode(order, bytes)?),
        })
    }

    /// Encode as `kind`. Integral narrowing wraps, float to integral
    /// saturates, the same as an `as` cast.
    pub(crate) fn write(self, order: ByteOrder, kind: PrimitiveType, out: &mut [u8]) -> BinaryResult<()> {
        match kind {
            PrimitiveType::Byte => (self.as_i64() as i8).encode(order, out),
            PrimitiveType::Boolean => self.as_bool().encode(order, out),
            PrimitiveType::Short => (self.as_i64() as i16).encode(order, out),
            PrimitiveType::Char => {
                let code = self.as_i64() as u32;
                char::from_u32(code)
                    .ok_or(BinaryError::InvalidChar(code))?
                    .encode(order, out)
            }
            PrimitiveType::Int => (self.as_i64() as i32).encode(order, out),
            PrimitiveType::Float => (self.as_f64() as f32).encode(order, out),
            PrimitiveType::Long => self.as_i64().encode(order, out),
            PrimitiveType::Double => self.as_f64().encode(order, out),
        }
        Ok(())
    }
}

type TranslateFn = dyn Fn(&EntityRecord<'_>, u64, &mut [u8]) -> HandlerResult<()> + Send + Sync;

/// Reads one legacy field at a payload offset and writes it, converted,
/// into a slot of the current payload.
///
/// The slot is exactly as wide as the target kind and the record's byte
/// order applies to both sides.
#[derive(Clone)]
pub struct ValueTranslator {
    source: ValueKind,
    target: ValueKind,
    apply: Arc<TranslateFn>,
}

impl ValueTranslator {
    pub fn new<F>(source: ValueKind, target: ValueKind, apply: F) -> Self
    where
        F: Fn(&EntityRecord<'_>, u64, &mut [u8]) -> HandlerResult<()> + Send + Sync + 'static,
    {
        Self {
            source,
            target,
            apply: Arc::new(apply),
        }
    }

    /// Copy the bytes unchanged.
    pub fn copy(kind: ValueKind) -> Self {
        let width = kind.byte_size();
        Self::new(kind, kind, move |record, offset, slot| {
            slot.copy_from_slice(record.read_raw(offset, width)?);
            Ok(())
        })
    }

    /// Convert between two primitive kinds.
    pub fn convert(from: PrimitiveType, to: PrimitiveType) -> Self {
        Self::new(
            ValueKind::Primitive(from),
            ValueKind::Primitive(to),
            move |record, offset, slot| {
                let bytes = record.read_raw(offset, from.byte_size())?;
                Scalar::read(record.order(), from, bytes)?.write(record.order(), to, slot)?;
                Ok(())
            },
        )
    }

    pub fn source(&self) -> ValueKind {
        self.source
    }

    pub fn target(&self) -> ValueKind {
        self.target
    }

    pub fn translate(&self, record: &EntityRecord<'_>, offset: u64, slot: &mut [u8]) -> HandlerResult<()> {
        (self.apply)(record, offset, slot)
    }
}

impl fmt::Debug for ValueTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTranslator")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// Translators keyed by `(source kind, target kind)`.
#[derive(Clone, Debug, Default)]
pub struct ValueTranslatorTable {
    translators: HashMap<(ValueKind, ValueKind), ValueTranslator>,
}

impl ValueTranslatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared default table: copies for identical kinds, every
    /// primitive-to-primitive conversion and reference copies. Built on
    /// first use.
    pub fn defaults() -> &'static Self {
        static DEFAULTS: OnceLock<ValueTranslatorTable> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            let mut table = Self::new();
            for from in PrimitiveType::ALL {
                for to in PrimitiveType::ALL {
                    table.register(if from == to {
                        ValueTranslator::copy(ValueKind::Primitive(from))
                    } else {
                        ValueTranslator::convert(from, to)
                    });
                }
            }
            table.register(ValueTranslator::copy(ValueKind::Reference));
            table
        })
    }

    /// Add or replace the translator for its kind pair.
    pub fn register(&mut self, translator: ValueTranslator) {
        self.translators
            .insert((translator.source(), translator.target()), translator);
    }

    pub fn lookup(&self, source: ValueKind, target: ValueKind) -> Option<&ValueTranslator> {
        self.translators.get(&(source, target))
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}
