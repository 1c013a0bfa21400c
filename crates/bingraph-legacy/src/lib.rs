//! Legacy type translation for bingraph.
//!
//! When a type's member layout changes, records written under the old
//! [`TypeId`](bingraph_types::TypeId) stay readable: a
//! [`LegacyTypeHandler`] rewrites each old record into the current layout
//! and hands it to the current handler. The mapping is built, and every gap
//! reported, when the handler is created, never while reading.

pub mod creator;
pub mod defaults;
pub mod error;
pub mod handler;
pub mod mapping;
pub mod value;

pub use creator::LegacyTypeHandlerCreator;
pub use defaults::{ConfiguredDefaults, DefaultValue, DefaultValuePolicy, ZeroDefaults};
pub use error::{LegacyError, LegacyResult};
pub use handler::{LegacyTypeHandler, LegacyTypeHandlingListener};
pub use mapping::{LegacyMemberMapping, MappedMember};
pub use value::{ValueKind, ValueTranslator, ValueTranslatorTable};
