use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bingraph_types::{RuntimeType, TypeId};
use tracing::debug;

use crate::builtin::{
    BytesHandler, ObjectListHandler, ObjectMapHandler, PrimitiveValueHandler, StringHandler,
    BOOLEAN_TYPE_ID, BYTES_TYPE_ID, BYTE_TYPE_ID, CHAR_TYPE_ID, DOUBLE_TYPE_ID, FLOAT_TYPE_ID,
    INT_TYPE_ID, LONG_TYPE_ID, OBJECT_LIST_TYPE_ID, OBJECT_MAP_TYPE_ID, SHORT_TYPE_ID,
    STRING_TYPE_ID,
};
use crate::custom::{CustomHandler, CustomTypeHandler, UnpersistableHandler};
use crate::definition::TypeDefinition;
use crate::dictionary::TypeDictionary;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::TypeHandler;

/// Resolves runtime types and persisted type ids to handlers.
///
/// Storers and loaders consume this trait rather than a concrete registry,
/// so several persistence contexts can coexist in one process.
pub trait TypeHandlerLookup: Send + Sync {
    fn lookup_type_handler(&self, runtime_type: RuntimeType) -> Option<Arc<dyn TypeHandler>>;

    /// Like [`lookup_type_handler`](Self::lookup_type_handler), failing if
    /// no handler is registered.
    fn ensure_type_handler(&self, runtime_type: RuntimeType) -> HandlerResult<Arc<dyn TypeHandler>> {
        self.lookup_type_handler(runtime_type)
            .ok_or_else(|| HandlerError::NoTypeHandler(runtime_type.name().to_string()))
    }

    fn lookup_type_handler_by_id(&self, type_id: TypeId) -> Option<Arc<dyn TypeHandler>>;
}

struct Inner {
    by_runtime: HashMap<RuntimeType, Arc<dyn TypeHandler>>,
    by_type_id: HashMap<TypeId, Arc<dyn TypeHandler>>,
    by_name: HashMap<String, Arc<dyn TypeHandler>>,
    dictionary: TypeDictionary,
    next_type_id: TypeId,
}

impl Inner {
    fn allocate_type_id(&mut self) -> TypeId {
        let id = self.next_type_id;
        self.next_type_id = id.next();
        id
    }

    fn check_free(&self, handler: &dyn TypeHandler) -> HandlerResult<()> {
        if self.by_type_id.contains_key(&handler.type_id()) {
            return Err(HandlerError::DuplicateTypeId(handler.type_id()));
        }
        if let Some(runtime_type) = handler.runtime_type() {
            if self.by_runtime.contains_key(&runtime_type) {
                return Err(HandlerError::DuplicateHandler(runtime_type.name().to_string()));
            }
        }
        if self.by_name.contains_key(handler.type_name()) {
            return Err(HandlerError::DuplicateHandler(handler.type_name().to_string()));
        }
        Ok(())
    }

    fn install(&mut self, handler: Arc<dyn TypeHandler>) {
        let type_id = handler.type_id();
        if type_id >= self.next_type_id {
            self.next_type_id = type_id.next();
        }
        if let Some(runtime_type) = handler.runtime_type() {
            self.by_runtime.insert(runtime_type, Arc::clone(&handler));
        }
        self.by_name
            .insert(handler.type_name().to_string(), Arc::clone(&handler));
        self.by_type_id.insert(type_id, handler);
    }
}

/// The handler table of one persistence context.
///
/// Built-in handlers are installed on construction under their fixed ids.
/// Custom handlers get ids from [`TypeId::CUSTOM_START`] upward; if the
/// seeded [`TypeDictionary`] already holds a definition with the same type
/// name and identical members, its id is reused so that existing data stays
/// readable without translation.
pub struct TypeHandlerRegistry {
    inner: RwLock<Inner>,
}

impl TypeHandlerRegistry {
    pub fn new() -> Self {
        let mut inner = Inner {
            by_runtime: HashMap::new(),
            by_type_id: HashMap::new(),
            by_name: HashMap::new(),
            dictionary: TypeDictionary::new(),
            next_type_id: TypeId::CUSTOM_START,
        };

        let builtins: Vec<Arc<dyn TypeHandler>> = vec![
            Arc::new(CustomHandler::new(
                BOOLEAN_TYPE_ID,
                PrimitiveValueHandler::<bool>::new(),
            )),
            Arc::new(CustomHandler::new(
                BYTE_TYPE_ID,
                PrimitiveValueHandler::<i8>::new(),
            )),
            Arc::new(CustomHandler::new(
                SHORT_TYPE_ID,
                PrimitiveValueHandler::<i16>::new(),
            )),
            Arc::new(CustomHandler::new(
                CHAR_TYPE_ID,
                PrimitiveValueHandler::<char>::new(),
            )),
            Arc::new(CustomHandler::new(
                INT_TYPE_ID,
                PrimitiveValueHandler::<i32>::new(),
            )),
            Arc::new(CustomHandler::new(
                FLOAT_TYPE_ID,
                PrimitiveValueHandler::<f32>::new(),
            )),
            Arc::new(CustomHandler::new(
                LONG_TYPE_ID,
                PrimitiveValueHandler::<i64>::new(),
            )),
            Arc::new(CustomHandler::new(
                DOUBLE_TYPE_ID,
                PrimitiveValueHandler::<f64>::new(),
            )),
            Arc::new(CustomHandler::new(STRING_TYPE_ID, StringHandler)),
            Arc::new(CustomHandler::new(BYTES_TYPE_ID, BytesHandler)),
            Arc::new(CustomHandler::new(OBJECT_LIST_TYPE_ID, ObjectListHandler)),
            Arc::new(CustomHandler::new(OBJECT_MAP_TYPE_ID, ObjectMapHandler)),
        ];
        for handler in builtins {
            inner.install(handler);
        }
        // Built-in ids never move the custom range.
        inner.next_type_id = TypeId::CUSTOM_START;

        Self {
            inner: RwLock::new(inner),
        }
    }

    /// A registry that knows the definitions of previously persisted data.
    ///
    /// Definitions in the built-in range are skipped: built-in shapes are
    /// fixed and always present.
    pub fn with_dictionary(dictionary: TypeDictionary) -> HandlerResult<Self> {
        let registry = Self::new();
        {
            let mut inner = registry.inner.write().expect("lock poisoned");
            for definition in dictionary.iter().filter(|d| !d.type_id.is_native()) {
                inner.dictionary.register(definition.clone())?;
                if definition.type_id >= inner.next_type_id {
                    inner.next_type_id = definition.type_id.next();
                }
            }
            debug!(
                definitions = inner.dictionary.len(),
                next_type_id = %inner.next_type_id,
                "registry seeded from type dictionary"
            );
        }
        Ok(registry)
    }

    /// Register a typed handler and return the id it was bound to.
    pub fn register<H: CustomTypeHandler>(&self, handler: H) -> HandlerResult<TypeId> {
        let members = handler.members();
        let mut inner = self.inner.write().expect("lock poisoned");

        let reusable = inner
            .dictionary
            .latest_for(handler.type_name())
            .filter(|definition| definition.same_layout(&members))
            .map(|definition| definition.type_id)
            .filter(|type_id| !inner.by_type_id.contains_key(type_id));

        let type_id = match reusable {
            Some(type_id) => type_id,
            None => inner.allocate_type_id(),
        };
        let handler: Arc<dyn TypeHandler> = Arc::new(CustomHandler::new(type_id, handler));
        Self::insert(&mut inner, handler)?;
        Ok(type_id)
    }

    /// Register a typed handler under a caller-chosen id.
    pub fn register_with_type_id<H: CustomTypeHandler>(
        &self,
        type_id: TypeId,
        handler: H,
    ) -> HandlerResult<()> {
        self.register_handler(Arc::new(CustomHandler::new(type_id, handler)))
    }

    /// Register a runtime type whose instances must never be persisted.
    pub fn register_unpersistable<T: Send + Sync + 'static>(
        &self,
        type_name: &str,
    ) -> HandlerResult<TypeId> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let type_id = inner.allocate_type_id();
        let handler: Arc<dyn TypeHandler> =
            Arc::new(UnpersistableHandler::<T>::new(type_id, type_name));
        Self::insert(&mut inner, handler)?;
        Ok(type_id)
    }

    /// Register a fully built handler.
    pub fn register_handler(&self, handler: Arc<dyn TypeHandler>) -> HandlerResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        Self::insert(&mut inner, handler)
    }

    fn insert(inner: &mut Inner, handler: Arc<dyn TypeHandler>) -> HandlerResult<()> {
        inner.check_free(handler.as_ref())?;
        if !handler.type_id().is_native() {
            inner.dictionary.register(handler.to_definition())?;
        }
        debug!(
            type_id = %handler.type_id(),
            type_name = handler.type_name(),
            "type handler registered"
        );
        inner.install(handler);
        Ok(())
    }

    /// Cache a handler for a legacy type id.
    ///
    /// Only the id index is updated: the runtime type and name keep
    /// resolving to the current handler.
    pub fn register_legacy_handler(&self, handler: Arc<dyn TypeHandler>) -> HandlerResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let type_id = handler.type_id();
        if inner.by_type_id.contains_key(&type_id) {
            return Err(HandlerError::DuplicateTypeId(type_id));
        }
        debug!(type_id = %type_id, type_name = handler.type_name(), "legacy handler cached");
        inner.by_type_id.insert(type_id, handler);
        Ok(())
    }

    /// The current handler for a type name.
    pub fn lookup_by_type_name(&self, type_name: &str) -> Option<Arc<dyn TypeHandler>> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.by_name.get(type_name).cloned()
    }

    /// The definition of `type_id`, from its handler or the dictionary.
    pub fn lookup_definition(&self, type_id: TypeId) -> Option<TypeDefinition> {
        let inner = self.inner.read().expect("lock poisoned");
        match inner.by_type_id.get(&type_id) {
            Some(handler) => Some(handler.to_definition()),
            None => inner.dictionary.get(type_id).cloned(),
        }
    }

    /// Snapshot of every custom definition, current and legacy.
    pub fn type_dictionary(&self) -> TypeDictionary {
        self.inner.read().expect("lock poisoned").dictionary.clone()
    }

    /// Number of handlers reachable by type id, legacy ones included.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").by_type_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHandlerLookup for TypeHandlerRegistry {
    fn lookup_type_handler(&self, runtime_type: RuntimeType) -> Option<Arc<dyn TypeHandler>> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.by_runtime.get(&runtime_type).cloned()
    }

    fn lookup_type_handler_by_id(&self, type_id: TypeId) -> Option<Arc<dyn TypeHandler>> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.by_type_id.get(&type_id).cloned()
    }
}
