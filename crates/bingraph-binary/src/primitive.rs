use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BinaryError, BinaryResult};
use crate::order::ByteOrder;

/// The fixed-length value kinds a member can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Byte,
    Boolean,
    Short,
    Char,
    Int,
    Float,
    Long,
    Double,
}

impl PrimitiveType {
    /// Every primitive kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Byte,
        Self::Boolean,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Float,
        Self::Long,
        Self::Double,
    ];

    /// Persisted width in bytes.
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::Byte | Self::Boolean => 1,
            Self::Short => 2,
            Self::Char | Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }

    /// Stable name used in type definitions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Boolean => "boolean",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Float => "float",
            Self::Long => "long",
            Self::Double => "double",
        }
    }

    /// Returns `true` for the signed integer kinds.
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
    }

    /// Returns `true` for the floating point kinds.
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust value type with a fixed binary encoding.
pub trait Primitive: Copy + Send + Sync + 'static {
    /// The member kind this type is persisted as.
    const TYPE: PrimitiveType;

    /// Write exactly `TYPE.byte_size()` bytes into `out`.
    fn encode(self, order: ByteOrder, out: &mut [u8]);

    /// Read a value from exactly `TYPE.byte_size()` bytes.
    fn decode(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self>;
}

fn exact<const N: usize>(bytes: &[u8]) -> BinaryResult<[u8; N]> {
    bytes.try_into().map_err(|_| BinaryError::OutOfBounds {
        offset: 0,
        length: N as u64,
        available: bytes.len() as u64,
    })
}

macro_rules! numeric_primitive {
    ($ty:ty, $kind:ident) => {
        impl Primitive for $ty {
            const TYPE: PrimitiveType = PrimitiveType::$kind;

            fn encode(self, order: ByteOrder, out: &mut [u8]) {
                let bytes = match order {
                    ByteOrder::LittleEndian => self.to_le_bytes(),
                    ByteOrder::BigEndian => self.to_be_bytes(),
                };
                out.copy_from_slice(&bytes);
            }

            fn decode(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self> {
                let bytes = exact::<{ std::mem::size_of::<$ty>() }>(bytes)?;
                Ok(match order {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
                })
            }
        }
    };
}

numeric_primitive!(i8, Byte);
numeric_primitive!(i16, Short);
numeric_primitive!(i32, Int);
numeric_primitive!(f32, Float);
numeric_primitive!(i64, Long);
numeric_primitive!(f64, Double);

impl Primitive for bool {
    const TYPE: PrimitiveType = PrimitiveType::Boolean;

    fn encode(self, _order: ByteOrder, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn decode(_order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self> {
        let [byte] = exact::<1>(bytes)?;
        Ok(byte != 0)
    }
}

impl Primitive for char {
    const TYPE: PrimitiveType = PrimitiveType::Char;

    fn encode(self, order: ByteOrder, out: &mut [u8]) {
        u32::from(self).encode_as(order, out);
    }

    fn decode(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self> {
        let bytes = exact::<4>(bytes)?;
        let raw = match order {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        };
        char::from_u32(raw).ok_or(BinaryError::InvalidChar(raw))
    }
}

/// Raw unsigned 64-bit fields: header words, ids and list counts.
pub(crate) trait RawWord: Sized {
    fn encode_as(self, order: ByteOrder, out: &mut [u8]);
    fn decode_from(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self>;
}

impl RawWord for u32 {
    fn encode_as(self, order: ByteOrder, out: &mut [u8]) {
        let bytes = match order {
            ByteOrder::LittleEndian => self.to_le_bytes(),
            ByteOrder::BigEndian => self.to_be_bytes(),
        };
        out.copy_from_slice(&bytes);
    }

    fn decode_from(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self> {
        let bytes = exact::<4>(bytes)?;
        Ok(match order {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        })
    }
}

impl RawWord for u64 {
    fn encode_as(self, order: ByteOrder, out: &mut [u8]) {
        let bytes = match order {
            ByteOrder::LittleEndian => self.to_le_bytes(),
            ByteOrder::BigEndian => self.to_be_bytes(),
        };
        out.copy_from_slice(&bytes);
    }

    fn decode_from(order: ByteOrder, bytes: &[u8]) -> BinaryResult<Self> {
        let bytes = exact::<8>(bytes)?;
        Ok(match order {
            ByteOrder::LittleEndian => u64::from_le_bytes(bytes),
            ByteOrder::BigEndian => u64::from_be_bytes(bytes),
        })
    }
}
