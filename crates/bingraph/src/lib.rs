//! Binary object graph persistence.
//!
//! `bingraph` stores graphs of live, shared and possibly cyclic instances
//! as flat sequences of entity records and rebuilds them with identity and
//! cycles intact. A [`Persistence`] context wires the pieces together:
//!
//! - a [`TypeHandlerRegistry`] mapping runtime types to binary shapes,
//! - a [`DefaultObjectRegistry`] keeping every instance's [`ObjectId`],
//! - a backend ([`InMemoryTarget`] or [`FileTarget`]) receiving one chunk
//!   per commit.
//!
//! ```no_run
//! use bingraph::{Persistence, PersistenceConfig};
//!
//! let persistence = Persistence::in_memory(PersistenceConfig::default())?;
//! let root = bingraph::ObjectRef::new(String::from("hello"));
//! let id = persistence.store(&root)?;
//! let graph = persistence.load()?;
//! assert!(graph.get(id).is_some());
//! # Ok::<(), bingraph::PersistenceError>(())
//! ```
//!
//! Records written under an earlier shape of a type are read through
//! legacy handlers built from the saved type dictionary; see
//! [`LegacySettings`] for mapping renamed and removed members.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{LegacySettings, PersistenceConfig, StorerSettings};
pub use error::{PersistenceError, PersistenceResult};
pub use persistence::Persistence;

pub use bingraph_binary::{ByteOrder, ChunkWriter, EntityRecord, PrimitiveType};
pub use bingraph_handler::{
    CustomTypeHandler, HandlerError, HandlerResult, LazyReference, LoadHandler, ObjectList,
    ObjectMap, StoreHandler, TypeDefinition, TypeDictionary, TypeHandler, TypeHandlerRegistry,
    TypeMember,
};
pub use bingraph_legacy::{
    DefaultValue, LegacyMemberMapping, LegacyTypeHandlerCreator, LegacyTypeHandlingListener,
};
pub use bingraph_loader::{LoadedGraph, Loader, ReachabilityScan};
pub use bingraph_store::{
    DefaultObjectRegistry, FileTarget, InMemoryTarget, ObjectRegistry, PersistenceSource,
    PersistenceTarget,
};
pub use bingraph_storer::{CommitReport, Storer, StorerConfig, StorerMode};
pub use bingraph_types::{ObjectId, ObjectRef, TypeId};
