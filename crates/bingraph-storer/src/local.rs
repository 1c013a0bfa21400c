use std::collections::HashMap;
use std::sync::Arc;

use bingraph_handler::{
    HandlerError, HandlerResult, LazyReference, StoreHandler, TypeHandler, TypeHandlerLookup,
};
use bingraph_store::ObjectRegistry;
use bingraph_types::{IdentityKey, ObjectId, ObjectRef};

use crate::config::StorerMode;

/// One instance the current storer run has assigned an id to.
pub(crate) struct Item {
    pub(crate) instance: ObjectRef,
    pub(crate) object_id: ObjectId,
    /// `None` for skipped instances, which are never written.
    pub(crate) handler: Option<Arc<dyn TypeHandler>>,
    /// The id was freshly provided and must be merged on commit.
    pub(crate) is_new: bool,
    pub(crate) queued: bool,
}

/// How hard a registration asks for the instance to be written.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Demand {
    /// Follow the storer mode.
    Mode,
    /// Always write.
    Force,
}

/// Identity map and work list of one storer run.
///
/// Items hold strong references, so an identity key can never be reused by
/// another allocation while the run lasts.
pub(crate) struct LocalRegistry {
    mode: StorerMode,
    types: Arc<dyn TypeHandlerLookup>,
    objects: Arc<dyn ObjectRegistry>,
    items: Vec<Item>,
    by_identity: HashMap<IdentityKey, usize>,
    queue: Vec<usize>,
    cursor: usize,
}

impl LocalRegistry {
    pub(crate) fn new(
        mode: StorerMode,
        types: Arc<dyn TypeHandlerLookup>,
        objects: Arc<dyn ObjectRegistry>,
        capacity: usize,
    ) -> Self {
        Self {
            mode,
            types,
            objects,
            items: Vec::with_capacity(capacity),
            by_identity: HashMap::with_capacity(capacity),
            queue: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn lookup(&self, instance: &ObjectRef) -> Option<ObjectId> {
        self.by_identity
            .get(&instance.identity())
            .map(|&index| self.items[index].object_id)
    }

    /// Register `instance` as a root: it is written even in lazy mode.
    pub(crate) fn register_root(&mut self, instance: &ObjectRef) -> HandlerResult<ObjectId> {
        self.register(instance, Demand::Force)
    }

    /// Associate `instance` with `object_id` without ever writing it.
    pub(crate) fn register_skipped(&mut self, instance: &ObjectRef, object_id: ObjectId, is_new: bool) {
        if self.by_identity.contains_key(&instance.identity()) {
            return;
        }
        self.push(Item {
            instance: instance.clone(),
            object_id,
            handler: None,
            is_new,
            queued: false,
        });
    }

    /// The next queued item, in discovery order.
    pub(crate) fn next_pending(&mut self) -> Option<(ObjectRef, ObjectId, Arc<dyn TypeHandler>)> {
        while let Some(&index) = self.queue.get(self.cursor) {
            self.cursor += 1;
            let item = &self.items[index];
            if let Some(handler) = &item.handler {
                return Some((item.instance.clone(), item.object_id, Arc::clone(handler)));
            }
        }
        None
    }

    pub(crate) fn objects(&self) -> &Arc<dyn ObjectRegistry> {
        &self.objects
    }

    /// Pairs whose ids were freshly provided, for merging after a write.
    pub(crate) fn new_entries(&self) -> Vec<(ObjectId, ObjectRef)> {
        self.items
            .iter()
            .filter(|item| item.is_new && item.object_id.is_proper())
            .map(|item| (item.object_id, item.instance.clone()))
            .collect()
    }

    pub(crate) fn ensure_capacity(&mut self, additional: usize) {
        self.items.reserve(additional);
        self.by_identity.reserve(additional);
        self.queue.reserve(additional);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.by_identity.clear();
        self.queue.clear();
        self.cursor = 0;
    }

    /// Clear and release all allocations beyond `capacity`.
    pub(crate) fn reset(&mut self, capacity: usize) {
        self.clear();
        self.items.shrink_to(capacity);
        self.by_identity.shrink_to(capacity);
        self.queue.shrink_to(capacity);
    }

    fn push(&mut self, item: Item) -> usize {
        let index = self.items.len();
        self.by_identity.insert(item.instance.identity(), index);
        self.items.push(item);
        index
    }

    fn enqueue(&mut self, index: usize) {
        let item = &mut self.items[index];
        if !item.queued && item.handler.is_some() {
            item.queued = true;
            self.queue.push(index);
        }
    }

    fn register(&mut self, instance: &ObjectRef, demand: Demand) -> HandlerResult<ObjectId> {
        if let Some(&index) = self.by_identity.get(&instance.identity()) {
            if demand == Demand::Force {
                self.enqueue(index);
            }
            return Ok(self.items[index].object_id);
        }

        if instance.is::<LazyReference>() {
            return Err(HandlerError::UnsupportedInstance {
                type_name: instance.runtime_type().name().to_string(),
                reason: "lazy references cannot be stored".into(),
            });
        }
        let handler = self.types.ensure_type_handler(instance.runtime_type())?;
        handler.guarantee_instance_viability()?;

        let assignment = self.objects.ensure_object_id_guaranteed_register(instance);
        let store = assignment.is_new()
            || demand == Demand::Force
            || self.mode == StorerMode::Eager;
        let index = self.push(Item {
            instance: instance.clone(),
            object_id: assignment.object_id(),
            handler: Some(handler),
            is_new: assignment.is_new(),
            queued: false,
        });
        if store {
            self.enqueue(index);
        }
        Ok(assignment.object_id())
    }
}

impl StoreHandler for LocalRegistry {
    fn apply(&mut self, instance: Option<&ObjectRef>) -> HandlerResult<ObjectId> {
        match instance {
            None => Ok(ObjectId::NULL),
            Some(instance) => self.register(instance, Demand::Mode),
        }
    }

    fn apply_eager(&mut self, instance: Option<&ObjectRef>) -> HandlerResult<ObjectId> {
        match instance {
            None => Ok(ObjectId::NULL),
            Some(instance) => self.register(instance, Demand::Force),
        }
    }
}
