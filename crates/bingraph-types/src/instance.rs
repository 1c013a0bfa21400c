use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, Weak};

/// The Rust type bound behind an [`ObjectRef`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeType {
    id: std::any::TypeId,
    name: &'static str,
}

impl RuntimeType {
    /// The runtime type of `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: std::any::TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The compiler-assigned type identity.
    pub fn id(&self) -> std::any::TypeId {
        self.id
    }

    /// Diagnostic type name. Not stable across compiler versions, so it is
    /// never written to the binary stream.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this is the runtime type of `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.id == std::any::TypeId::of::<T>()
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Reference-identity key of an instance: its allocation address.
///
/// Only meaningful while the instance is alive. Holders that outlive the
/// instance must keep a [`WeakObjectRef`] next to the key and confirm it
/// still upgrades to the same allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(usize);

struct Slot {
    runtime_type: RuntimeType,
    value: RwLock<Box<dyn Any + Send + Sync>>,
}

/// Shared handle to one live instance of an object graph.
///
/// Cloning the handle never clones the instance. Equality and hashing use
/// reference identity, so two instances holding equal values are still
/// distinct. Interior state is reached through [`ObjectRef::with`] and
/// [`ObjectRef::with_mut`], which downcast to the concrete type.
#[derive(Clone)]
pub struct ObjectRef(Arc<Slot>);

impl ObjectRef {
    /// Move `value` into a new shared instance.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(Slot {
            runtime_type: RuntimeType::of::<T>(),
            value: RwLock::new(Box::new(value)),
        }))
    }

    /// The runtime type of the held value. Does not lock.
    pub fn runtime_type(&self) -> RuntimeType {
        self.0.runtime_type
    }

    /// Returns `true` if the held value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.0.runtime_type.is::<T>()
    }

    /// The reference-identity key of this instance.
    pub fn identity(&self) -> IdentityKey {
        IdentityKey(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Returns `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` against a shared borrow of the value.
    ///
    /// Returns `None` if the value is not a `T`.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.0.value.read().expect("lock poisoned");
        (**guard).downcast_ref::<T>().map(f)
    }

    /// Run `f` against an exclusive borrow of the value.
    ///
    /// Returns `None` if the value is not a `T`.
    pub fn with_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.0.value.write().expect("lock poisoned");
        (**guard).downcast_mut::<T>().map(f)
    }

    /// Clone the value out of the instance.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.with(|value: &T| value.clone())
    }

    /// Replace the value in place, keeping the instance identity.
    ///
    /// Returns `false` without touching the instance if `T` is not its type.
    pub fn set<T: 'static>(&self, value: T) -> bool {
        self.with_mut(|slot: &mut T| *slot = value).is_some()
    }

    /// A non-owning handle to this instance.
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectRef({} @ {:#x})",
            self.0.runtime_type.name,
            self.identity().0
        )
    }
}

/// Non-owning counterpart of [`ObjectRef`].
#[derive(Clone)]
pub struct WeakObjectRef(Weak<Slot>);

impl WeakObjectRef {
    /// Recover the instance if it is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    /// The identity key the instance had (or still has).
    pub fn identity(&self) -> IdentityKey {
        IdentityKey(Weak::as_ptr(&self.0) as *const () as usize)
    }

    /// Returns `true` once the instance has been dropped.
    pub fn is_dead(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObjectRef({:#x})", self.identity().0)
    }
}
