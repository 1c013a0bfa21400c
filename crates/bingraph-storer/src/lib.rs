//! Object graph storer for bingraph.
//!
//! A [`Storer`] walks the graph reachable from one or more roots, assigns
//! every instance an [`ObjectId`](bingraph_types::ObjectId) through the
//! shared [`ObjectRegistry`](bingraph_store::ObjectRegistry) and lets each
//! instance's type handler write one entity record. All records of one
//! commit form a single chunk, handed to the
//! [`PersistenceTarget`](bingraph_store::PersistenceTarget) in one write.

pub mod config;
pub mod error;
mod local;
pub mod storer;

pub use config::{StorerConfig, StorerMode};
pub use error::{StorerError, StorerResult};
pub use storer::{CommitReport, Storer};
