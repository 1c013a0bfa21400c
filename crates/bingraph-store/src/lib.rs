//! Object registry and persistence targets for bingraph.
//!
//! The [`ObjectRegistry`] is the global `instance ↔ ObjectId` map of a
//! persistence context. It outlives individual storers and loaders, and
//! holds instances weakly so that registering an instance never keeps it
//! alive.
//!
//! A [`PersistenceTarget`] receives one committed chunk per write; a
//! [`PersistenceSource`] hands back everything written so far.

pub mod error;
pub mod registry;
pub mod target;

pub use error::{StoreError, StoreResult};
pub use registry::{DefaultObjectRegistry, ObjectIdAssignment, ObjectRegistry};
pub use target::{FileTarget, InMemoryTarget, PersistenceSource, PersistenceTarget};
