//! Chunk loader for bingraph.
//!
//! The [`Loader`] turns entity records back into live instances, wiring
//! references through the shared object registry so that instances loaded
//! earlier are reused rather than duplicated.

pub mod error;
pub mod loader;
pub mod scan;

pub use error::{LoaderError, LoaderResult};
pub use loader::{LoadedGraph, Loader};
pub use scan::{scan_reachable, ReachabilityScan};
