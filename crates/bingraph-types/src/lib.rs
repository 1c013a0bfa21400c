//! Foundation types for bingraph.
//!
//! Every other bingraph crate depends on `bingraph-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: 64-bit identity of one stored instance within a persistence context
//! - [`TypeId`]: 64-bit identity of a binary type shape
//! - [`ObjectRef`]: shared, lockable handle to a live instance; identity is the allocation
//! - [`RuntimeType`]: the Rust type bound behind an [`ObjectRef`]

pub mod error;
pub mod id;
pub mod instance;

pub use error::IdError;
pub use id::{ObjectId, TypeId};
pub use instance::{IdentityKey, ObjectRef, RuntimeType, WeakObjectRef};
