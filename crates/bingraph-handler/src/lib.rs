//! Type handlers for bingraph.
//!
//! A [`TypeHandler`] binds one runtime type to one binary shape: it
//! declares the persisted members, writes instances as entity records and
//! rebuilds them in three passes (create, update state, complete). During
//! storing, every referential field is passed to a [`StoreHandler`], which
//! is how the graph storer discovers the rest of the graph.
//!
//! Applications implement the typed [`CustomTypeHandler`] and register it
//! with a [`TypeHandlerRegistry`], which wraps it in a [`CustomHandler`].

pub mod builtin;
pub mod custom;
pub mod definition;
pub mod dictionary;
pub mod error;
pub mod handler;
pub mod member;
pub mod registry;

pub use builtin::{LazyReference, ObjectList, ObjectMap};
pub use custom::{CustomHandler, CustomTypeHandler, TrivialHandler, UnpersistableHandler};
pub use definition::TypeDefinition;
pub use dictionary::TypeDictionary;
pub use error::{HandlerError, HandlerResult};
pub use handler::{
    validate_record_layout, validate_record_length, LoadHandler, StoreHandler, TypeHandler,
};
pub use member::{MemberKind, TypeMember};
pub use registry::{TypeHandlerLookup, TypeHandlerRegistry};
