//! Default values for current members a legacy record does not have.

use std::collections::HashMap;

use bingraph_binary::{BinaryResult, ByteOrder};
use bingraph_handler::TypeMember;
use serde::{Deserialize, Serialize};

use crate::error::{LegacyError, LegacyResult};
use crate::value::{Scalar, ValueKind};

/// A configured default. Converted to the member's kind the same way a
/// value translator converts legacy values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Zero bits; the null reference for reference members.
    Zero,
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl DefaultValue {
    /// Returns `true` if the value encodes as all-zero bytes.
    pub fn is_zero(self) -> bool {
        match self {
            Self::Zero | Self::Bool(false) | Self::Int(0) => true,
            Self::Float(value) => value.to_bits() == 0,
            _ => false,
        }
    }

    fn scalar(self) -> Scalar {
        match self {
            Self::Zero => Scalar::Int(0),
            Self::Bool(value) => Scalar::Bool(value),
            Self::Int(value) => Scalar::Int(value),
            Self::Float(value) => Scalar::Float(value),
        }
    }

    /// Encode for `kind` into `slot`.
    pub(crate) fn write(self, order: ByteOrder, kind: ValueKind, slot: &mut [u8]) -> BinaryResult<()> {
        match kind {
            ValueKind::Primitive(primitive) => self.scalar().write(order, primitive, slot),
            ValueKind::Reference => {
                slot.fill(0);
                Ok(())
            }
        }
    }

    /// Check that the value can be written as `kind`.
    pub(crate) fn validate(self, type_name: &str, member: &TypeMember, kind: ValueKind) -> LegacyResult<()> {
        let invalid = |reason: &str| LegacyError::InvalidDefault {
            type_name: type_name.to_string(),
            member: member.name.clone(),
            reason: reason.to_string(),
        };
        match kind {
            ValueKind::Reference if !self.is_zero() => {
                Err(invalid("reference members can only default to null"))
            }
            ValueKind::Reference => Ok(()),
            ValueKind::Primitive(primitive) => {
                let mut probe = vec![0u8; primitive.byte_size() as usize];
                self.scalar()
                    .write(ByteOrder::NATIVE, primitive, &mut probe)
                    .map_err(|e| invalid(&e.to_string()))
            }
        }
    }
}

/// Supplies values for members that exist only in the current type.
///
/// Returning `None` means no default exists, which makes building the
/// legacy handler fail.
pub trait DefaultValuePolicy: Send + Sync {
    fn default_value(&self, type_name: &str, member: &TypeMember) -> Option<DefaultValue>;
}

/// Zero for numbers, `false` for booleans, null for references.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroDefaults;

impl DefaultValuePolicy for ZeroDefaults {
    fn default_value(&self, _type_name: &str, _member: &TypeMember) -> Option<DefaultValue> {
        Some(DefaultValue::Zero)
    }
}

/// Per type name and member configured defaults.
///
/// Members without an entry fall back to zero, unless the policy is
/// strict.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguredDefaults {
    pub values: HashMap<String, HashMap<String, DefaultValue>>,
    pub strict: bool,
}

impl ConfiguredDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_value(
        mut self,
        type_name: impl Into<String>,
        member: impl Into<String>,
        value: DefaultValue,
    ) -> Self {
        self.values
            .entry(type_name.into())
            .or_default()
            .insert(member.into(), value);
        self
    }
}

impl DefaultValuePolicy for ConfiguredDefaults {
    fn default_value(&self, type_name: &str, member: &TypeMember) -> Option<DefaultValue> {
        let configured = self
            .values
            .get(type_name)
            .and_then(|members| members.get(&member.name))
            .copied();
        match configured {
            Some(value) => Some(value),
            None if self.strict => None,
            None => Some(DefaultValue::Zero),
        }
    }
}

#[cfg(test)]
mod tests {
    use bingraph_binary::{Primitive, PrimitiveType};

    use super::*;

    #[test]
    fn configured_values_win_over_zero() {
        let policy = ConfiguredDefaults::new().with_value("Point", "z", DefaultValue::Int(-1));
        let z = TypeMember::primitive("z", PrimitiveType::Int);
        let w = TypeMember::primitive("w", PrimitiveType::Int);
        assert_eq!(policy.default_value("Point", &z), Some(DefaultValue::Int(-1)));
        assert_eq!(policy.default_value("Point", &w), Some(DefaultValue::Zero));
        assert_eq!(ConfiguredDefaults::strict().default_value("Point", &w), None);
    }

    #[test]
    fn defaults_convert_to_the_member_kind() {
        let mut slot = [0u8; 8];
        DefaultValue::Int(3)
            .write(ByteOrder::NATIVE, ValueKind::Primitive(PrimitiveType::Double), &mut slot)
            .unwrap();
        assert_eq!(f64::decode(ByteOrder::NATIVE, &slot).unwrap(), 3.0);
    }

    #[test]
    fn references_only_default_to_null() {
        let next = TypeMember::reference("next", "Node");
        assert!(DefaultValue::Zero
            .validate("Node", &next, ValueKind::Reference)
            .is_ok());
        assert!(matches!(
            DefaultValue::Int(5).validate("Node", &next, ValueKind::Reference),
            Err(LegacyError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn out_of_range_char_default_is_invalid() {
        let c = TypeMember::primitive("c", PrimitiveType::Char);
        assert!(DefaultValue::Int(0xD800)
            .validate("T", &c, ValueKind::Primitive(PrimitiveType::Char))
            .is_err());
    }

    #[test]
    fn defaults_deserialize_untagged() {
        let policy: ConfiguredDefaults = serde_json::from_str(
            r#"{"values": {"Point": {"z": 7, "visible": true, "scale": 0.5}}, "strict": true}"#,
        )
        .unwrap();
        let members = &policy.values["Point"];
        assert_eq!(members["z"], DefaultValue::Int(7));
        assert_eq!(members["visible"], DefaultValue::Bool(true));
        assert_eq!(members["scale"], DefaultValue::Float(0.5));
        assert!(policy.strict);
    }
}
