use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdError;

/// Identity of one stored instance within a persistence context.
///
/// Two references to the same instance always resolve to the same
/// `ObjectId`; two distinct instances get distinct ids even when they are
/// equal by value. [`ObjectId::NULL`] encodes a null reference and
/// [`ObjectId::NOT_FOUND`] is the "not yet seen" sentinel, distinct from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The null reference.
    pub const NULL: Self = Self(0);

    /// Lookup sentinel for "no association exists".
    pub const NOT_FOUND: Self = Self(u64::MAX);

    /// First id handed out by a fresh transient id provider.
    pub const DEFAULT_START: Self = Self(1_000_000_000_000_000_000);

    /// Wrap a raw 64-bit value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw 64-bit value as written to the binary stream.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` for the null reference.
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    /// Returns `true` for the not-found sentinel.
    pub const fn is_not_found(self) -> bool {
        self.0 == Self::NOT_FOUND.0
    }

    /// Returns `true` if this id can denote a stored instance.
    pub const fn is_proper(self) -> bool {
        !self.is_null() && !self.is_not_found()
    }

    /// The id following this one, used by incremental providers.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectId(null)")
        } else if self.is_not_found() {
            write!(f, "ObjectId(not-found)")
        } else {
            write!(f, "ObjectId({})", self.0)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::InvalidLiteral(s.to_string()))
    }
}

impl From<ObjectId> for u64 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// Identity of a binary type shape (member layout), not of a runtime type.
///
/// Several `TypeId`s may map to the same runtime type over time as its
/// shape evolves, but a `TypeId` never changes meaning once persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u64);

impl TypeId {
    /// First id available to custom (non-built-in) handlers. Ids below it
    /// are reserved for the built-in handlers.
    pub const CUSTOM_START: Self = Self(1_000_000);

    /// Wrap a raw value. Zero is reserved and rejected.
    pub fn new(value: u64) -> Result<Self, IdError> {
        if value == 0 {
            return Err(IdError::Reserved(value));
        }
        Ok(Self(value))
    }

    /// Construct a built-in id at compile time.
    pub const fn native(value: u64) -> Self {
        Self(value)
    }

    /// The raw value as written to the binary stream.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` for ids in the built-in range.
    pub const fn is_native(self) -> bool {
        self.0 < Self::CUSTOM_START.0
    }

    /// The id following this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TypeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u64>()
            .map_err(|_| IdError::InvalidLiteral(s.to_string()))?;
        Self::new(value)
    }
}

impl From<TypeId> for u64 {
    fn from(id: TypeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_not_found_are_distinct() {
        assert_ne!(ObjectId::NULL, ObjectId::NOT_FOUND);
        assert!(ObjectId::NULL.is_null());
        assert!(!ObjectId::NULL.is_not_found());
        assert!(ObjectId::NOT_FOUND.is_not_found());
        assert!(!ObjectId::NULL.is_proper());
        assert!(!ObjectId::NOT_FOUND.is_proper());
        assert!(ObjectId::DEFAULT_START.is_proper());
    }

    #[test]
    fn next_increments() {
        let id = ObjectId::new(41);
        assert_eq!(id.next().value(), 42);
        assert_eq!(TypeId::native(7).next(), TypeId::native(8));
    }

    #[test]
    fn parse_object_id() {
        let id: ObjectId = "1000000000000000001".parse().unwrap();
        assert_eq!(id.value(), 1_000_000_000_000_000_001);
        assert!("abc".parse::<ObjectId>().is_err());
    }

    #[test]
    fn type_id_zero_is_reserved() {
        assert_eq!(TypeId::new(0), Err(IdError::Reserved(0)));
        assert!("0".parse::<TypeId>().is_err());
        assert_eq!("12".parse::<TypeId>().unwrap(), TypeId::native(12));
    }

    #[test]
    fn native_range() {
        assert!(TypeId::native(12).is_native());
        assert!(!TypeId::CUSTOM_START.is_native());
    }

    #[test]
    fn debug_names_sentinels() {
        assert_eq!(format!("{:?}", ObjectId::NULL), "ObjectId(null)");
        assert_eq!(format!("{:?}", ObjectId::NOT_FOUND), "ObjectId(not-found)");
        assert_eq!(format!("{:?}", ObjectId::new(5)), "ObjectId(5)");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&ObjectId::new(99)).unwrap();
        assert_eq!(json, "99");
        let parsed: TypeId = serde_json::from_str("1000001").unwrap();
        assert_eq!(parsed.value(), 1_000_001);
    }

    #[test]
    fn ordering_follows_value() {
        assert!(ObjectId::new(1) < ObjectId::new(2));
        assert!(TypeId::native(1) < TypeId::CUSTOM_START);
    }
}
