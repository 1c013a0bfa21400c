use serde::{Deserialize, Serialize};

/// Byte order of every multi-byte value in a chunk, headers included.
///
/// Native order is little-endian. The byte-order reversing mode writes and
/// reads big-endian so chunks can be exchanged with peers of the opposite
/// architecture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// The order used when byte-order switching is off.
    pub const NATIVE: Self = Self::LittleEndian;

    /// Resolve the configured switch flag to an order.
    pub fn from_switch(switch_byte_order: bool) -> Self {
        if switch_byte_order {
            Self::NATIVE.switched()
        } else {
            Self::NATIVE
        }
    }

    /// The opposite order.
    pub fn switched(self) -> Self {
        match self {
            Self::LittleEndian => Self::BigEndian,
            Self::BigEndian => Self::LittleEndian,
        }
    }

    /// Returns `true` if this order differs from native.
    pub fn is_switched(self) -> bool {
        self != Self::NATIVE
    }
}
