//! Binary layout primitives for bingraph.
//!
//! Every persisted instance becomes one self-framed entity record:
//!
//! ```text
//! [int64 totalLength][int64 typeId][int64 objectId][field payload...]
//! ```
//!
//! `totalLength` includes the 24 header bytes, so a reader can skip records
//! it does not understand. Fixed-length fields sit at handler-defined
//! offsets relative to the payload start. Variable-length fields are lists:
//!
//! ```text
//! [int64 elementCount][elements...]
//! ```
//!
//! where the element width follows from the member kind. Object references
//! are written as [`ObjectId`](bingraph_types::ObjectId)s and resolved by a
//! later load pass.
//!
//! # Architecture
//!
//! - [`ChunkWriter`]: appends entity records for one commit
//! - [`Chunk`]: the finished, immutable byte block handed to a target
//! - [`ChunkReader`]: iterates and validates the records of a byte block
//! - [`EntityRecord`]: bounds-checked typed view of one record's payload
//! - [`RecordIndex`]: ObjectId → record position lookups
//!
//! Every accessor honours the chunk's [`ByteOrder`]; encoding is
//! deterministic, so equal state always produces equal bytes.

pub mod error;
pub mod header;
pub mod index;
pub mod order;
pub mod primitive;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{BinaryError, BinaryResult};
pub use header::{
    list_length, EntityHeader, ENTITY_HEADER_LENGTH, LIST_HEADER_LENGTH, LIST_MAXIMUM_LENGTH,
    OBJECT_ID_LENGTH,
};
pub use index::RecordIndex;
pub use order::ByteOrder;
pub use primitive::{Primitive, PrimitiveType};
pub use reader::ChunkReader;
pub use record::EntityRecord;
pub use writer::{Chunk, ChunkWriter};
