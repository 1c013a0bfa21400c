use std::collections::HashMap;
use std::sync::RwLock;

use bingraph_types::{IdentityKey, ObjectId, ObjectRef, WeakObjectRef};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Outcome of [`ObjectRegistry::ensure_object_id_guaranteed_register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectIdAssignment {
    /// The instance was already registered under this id.
    Existing(ObjectId),
    /// A fresh id was provided. It is not registered until the caller
    /// merges it after a successful commit.
    New(ObjectId),
}

impl ObjectIdAssignment {
    pub fn object_id(self) -> ObjectId {
        match self {
            Self::Existing(id) | Self::New(id) => id,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// The global `instance ↔ ObjectId` association of one persistence context.
///
/// Implementations must be safe to share between independent storers and
/// loaders; each individual call is atomic.
pub trait ObjectRegistry: Send + Sync {
    /// The id of `instance`, or [`ObjectId::NOT_FOUND`].
    fn lookup_object_id(&self, instance: &ObjectRef) -> ObjectId;

    /// The live instance registered under `id`.
    fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef>;

    /// Hand out an id no instance has been given yet.
    fn provide_object_id(&self) -> ObjectId;

    /// Bind `id` to `instance`. Re-registering the same pair is a no-op.
    fn register_object(&self, id: ObjectId, instance: &ObjectRef) -> StoreResult<()>;

    /// The id of `instance`, providing a fresh one if it has none.
    fn ensure_object_id_guaranteed_register(&self, instance: &ObjectRef) -> ObjectIdAssignment {
        match self.lookup_object_id(instance) {
            id if id.is_not_found() => ObjectIdAssignment::New(self.provide_object_id()),
            id => ObjectIdAssignment::Existing(id),
        }
    }

    /// Bind every pair, stopping at the first conflict.
    fn merge(&self, entries: &[(ObjectId, ObjectRef)]) -> StoreResult<()> {
        for (id, instance) in entries {
            self.register_object(*id, instance)?;
        }
        Ok(())
    }
}

struct Entry {
    id: ObjectId,
    instance: WeakObjectRef,
}

struct Inner {
    by_identity: HashMap<IdentityKey, Entry>,
    by_id: HashMap<ObjectId, WeakObjectRef>,
    next_id: ObjectId,
}

/// In-memory registry with a transient incremental id provider.
///
/// Instances are held weakly. An entry whose instance has been dropped is
/// stale: it is ignored by lookups, replaced on re-registration and
/// removed by [`DefaultObjectRegistry::cleanup`].
pub struct DefaultObjectRegistry {
    inner: RwLock<Inner>,
}

impl DefaultObjectRegistry {
    /// A registry whose id provider starts at [`ObjectId::DEFAULT_START`].
    pub fn new() -> Self {
        Self::with_start(ObjectId::DEFAULT_START)
    }

    /// A registry whose id provider starts at `start`.
    pub fn with_start(start: ObjectId) -> Self {
        Self {
            inner: RwLock::new(Inner {
                by_identity: HashMap::new(),
                by_id: HashMap::new(),
                next_id: start,
            }),
        }
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The id the provider hands out next.
    pub fn peek_next_object_id(&self) -> ObjectId {
        self.inner.read().expect("lock poisoned").next_id
    }

    /// Drop entries whose instances no longer exist. Returns how many were
    /// removed.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.write().expect("lock poisoned");
        let before = inner.by_id.len();
        inner.by_identity.retain(|_, entry| !entry.instance.is_dead());
        inner.by_id.retain(|_, instance| !instance.is_dead());
        let removed = before - inner.by_id.len();
        if removed > 0 {
            debug!(removed, remaining = inner.by_id.len(), "stale registry entries removed");
        }
        removed
    }
}

impl Default for DefaultObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry for DefaultObjectRegistry {
    fn lookup_object_id(&self, instance: &ObjectRef) -> ObjectId {
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .by_identity
            .get(&instance.identity())
            .filter(|entry| {
                entry
                    .instance
                    .upgrade()
                    .is_some_and(|live| live.ptr_eq(instance))
            })
            .map_or(ObjectId::NOT_FOUND, |entry| entry.id)
    }

    fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.by_id.get(&id).and_then(WeakObjectRef::upgrade)
    }

    fn provide_object_id(&self) -> ObjectId {
        let mut inner = self.inner.write().expect("lock poisoned");
        let id = inner.next_id;
        inner.next_id = id.next();
        id
    }

    fn register_object(&self, id: ObjectId, instance: &ObjectRef) -> StoreResult<()> {
        if !id.is_proper() {
            return Err(StoreError::ReservedObjectId(id));
        }
        let mut inner = self.inner.write().expect("lock poisoned");

        if let Some(bound) = inner.by_id.get(&id).and_then(WeakObjectRef::upgrade) {
            if bound.ptr_eq(instance) {
                return Ok(());
            }
            return Err(StoreError::ObjectIdConflict {
                id,
                reason: "id is bound to a different instance".into(),
            });
        }

        let key = instance.identity();
        if let Some(entry) = inner.by_identity.get(&key) {
            let live = entry
                .instance
                .upgrade()
                .is_some_and(|live| live.ptr_eq(instance));
            if live && entry.id != id {
                return Err(StoreError::ObjectIdConflict {
                    id,
                    reason: format!("instance is already registered as {}", entry.id),
                });
            }
        }

        if let Some(stale) = inner.by_identity.insert(
            key,
            Entry {
                id,
                instance: instance.downgrade(),
            },
        ) {
            if stale.id != id {
                inner.by_id.remove(&stale.id);
            }
        }
        inner.by_id.insert(id, instance.downgrade());
        if id >= inner.next_id && id != ObjectId::NOT_FOUND {
            inner.next_id = id.next();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_counts_up_from_start() {
        let registry = DefaultObjectRegistry::new();
        assert_eq!(registry.provide_object_id(), ObjectId::DEFAULT_START);
        assert_eq!(registry.provide_object_id(), ObjectId::DEFAULT_START.next());
    }

    #[test]
    fn register_and_look_up_both_ways() {
        let registry = DefaultObjectRegistry::with_start(ObjectId::new(1));
        let a = ObjectRef::new(String::from("a"));
        assert!(registry.lookup_object_id(&a).is_not_found());

        let id = registry.provide_object_id();
        registry.register_object(id, &a).unwrap();
        assert_eq!(registry.lookup_object_id(&a), id);
        assert!(registry.lookup_object(id).unwrap().ptr_eq(&a));
        registry.register_object(id, &a).unwrap();
    }

    #[test]
    fn equal_values_get_distinct_ids() {
        let registry = DefaultObjectRegistry::new();
        let a = ObjectRef::new(1_i32);
        let b = ObjectRef::new(1_i32);
        let first = registry.ensure_object_id_guaranteed_register(&a);
        registry.register_object(first.object_id(), &a).unwrap();
        let second = registry.ensure_object_id_guaranteed_register(&b);
        assert!(first.is_new() && second.is_new());
        assert_ne!(first.object_id(), second.object_id());
        assert_eq!(
            registry.ensure_object_id_guaranteed_register(&a),
            ObjectIdAssignment::Existing(first.object_id())
        );
    }

    #[test]
    fn conflicting_bindings_are_rejected() {
        let registry = DefaultObjectRegistry::new();
        let a = ObjectRef::new(1_i32);
        let b = ObjectRef::new(2_i32);
        registry.register_object(ObjectId::new(5), &a).unwrap();
        assert!(matches!(
            registry.register_object(ObjectId::new(5), &b),
            Err(StoreError::ObjectIdConflict { .. })
        ));
        assert!(matches!(
            registry.register_object(ObjectId::new(6), &a),
            Err(StoreError::ObjectIdConflict { .. })
        ));
        assert!(matches!(
            registry.register_object(ObjectId::NULL, &b),
            Err(StoreError::ReservedObjectId(_))
        ));
    }

    #[test]
    fn loaded_ids_advance_the_provider() {
        let registry = DefaultObjectRegistry::with_start(ObjectId::new(1));
        registry
            .register_object(ObjectId::new(50), &ObjectRef::new(0_i64))
            .unwrap();
        assert_eq!(registry.peek_next_object_id(), ObjectId::new(51));
    }

    #[test]
    fn dropped_instances_become_stale() {
        let registry = DefaultObjectRegistry::new();
        let a = ObjectRef::new(String::from("gone"));
        let id = registry.provide_object_id();
        registry.register_object(id, &a).unwrap();
        drop(a);

        assert!(registry.lookup_object(id).is_none());
        let b = ObjectRef::new(String::from("new"));
        assert!(registry.lookup_object_id(&b).is_not_found());
        registry.register_object(id, &b).unwrap();
        assert!(registry.lookup_object(id).unwrap().ptr_eq(&b));
    }

    #[test]
    fn cleanup_removes_stale_entries() {
        let registry = DefaultObjectRegistry::new();
        let keep = ObjectRef::new(1_i32);
        registry.register_object(ObjectId::new(10), &keep).unwrap();
        registry
            .register_object(ObjectId::new(11), &ObjectRef::new(2_i32))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.cleanup(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_object_id(&keep), ObjectId::new(10));
    }

    #[test]
    fn merge_binds_every_pair() {
        let registry = DefaultObjectRegistry::new();
        let a = ObjectRef::new(1_i32);
        let b = ObjectRef::new(2_i32);
        registry
            .merge(&[(ObjectId::new(1), a.clone()), (ObjectId::new(2), b.clone())])
            .unwrap();
        assert_eq!(registry.lookup_object_id(&b), ObjectId::new(2));
    }
}
