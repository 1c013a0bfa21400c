use std::marker::PhantomData;
use std::sync::OnceLock;

use bingraph_binary::{ChunkWriter, EntityRecord};
use bingraph_types::{ObjectId, ObjectRef, RuntimeType, TypeId};

use crate::definition::{members_length_maximum, members_length_minimum};
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{LoadHandler, StoreHandler, TypeHandler};
use crate::member::TypeMember;

/// Typed codec for one runtime type.
///
/// This is the trait applications implement. The entity header, length
/// validation and instance downcasting are done by [`CustomHandler`];
/// implementations only read and write their fields at payload offsets.
pub trait CustomTypeHandler: Send + Sync + 'static {
    type Instance: Send + Sync + 'static;

    /// Stable name identifying the type across processes and versions.
    fn type_name(&self) -> &str;

    /// Persisted members in binary order. Called once, on first use.
    fn members(&self) -> Vec<TypeMember>;

    /// Payload bytes `instance` needs beyond the members' minimum length,
    /// i.e. the list elements of its variable-length members.
    fn variable_length(&self, _instance: &Self::Instance) -> u64 {
        0
    }

    /// Write the fields. The header has already been written.
    fn store(
        &self,
        out: &mut ChunkWriter,
        instance: &Self::Instance,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()>;

    /// Build a shallow instance. References must not be resolved here.
    fn create(
        &self,
        record: &EntityRecord<'_>,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<Self::Instance>;

    fn update_state(
        &self,
        _record: &EntityRecord<'_>,
        _instance: &mut Self::Instance,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn complete(
        &self,
        _record: &EntityRecord<'_>,
        _instance: &mut Self::Instance,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn iterate_references(&self, _instance: &Self::Instance, _visit: &mut dyn FnMut(&ObjectRef)) {}
}

#[derive(Debug)]
struct MemberLayout {
    members: Vec<TypeMember>,
    minimum: u64,
    maximum: u64,
}

/// Adapts a [`CustomTypeHandler`] to the object-safe [`TypeHandler`].
///
/// The member layout is derived lazily on first use, so constructing the
/// adapter never calls into the wrapped handler.
pub struct CustomHandler<H: CustomTypeHandler> {
    type_id: TypeId,
    inner: H,
    layout: OnceLock<MemberLayout>,
}

impl<H: CustomTypeHandler> CustomHandler<H> {
    pub fn new(type_id: TypeId, inner: H) -> Self {
        Self {
            type_id,
            inner,
            layout: OnceLock::new(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn layout(&self) -> &MemberLayout {
        self.layout.get_or_init(|| {
            let members = self.inner.members();
            MemberLayout {
                minimum: members_length_minimum(&members),
                maximum: members_length_maximum(&members),
                members,
            }
        })
    }

    fn mismatch(&self, instance: &ObjectRef) -> HandlerError {
        HandlerError::InstanceTypeMismatch {
            expected: self.inner.type_name().to_string(),
            actual: instance.runtime_type().name().to_string(),
        }
    }
}

impl<H: CustomTypeHandler> TypeHandler for CustomHandler<H> {
    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn runtime_type(&self) -> Option<RuntimeType> {
        Some(RuntimeType::of::<H::Instance>())
    }

    fn instance_members(&self) -> &[TypeMember] {
        &self.layout().members
    }

    fn members_persisted_length_minimum(&self) -> u64 {
        self.layout().minimum
    }

    fn members_persisted_length_maximum(&self) -> u64 {
        self.layout().maximum
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        instance: &ObjectRef,
        object_id: ObjectId,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        let minimum = self.layout().minimum;
        instance
            .with(|value: &H::Instance| {
                let length = minimum + self.inner.variable_length(value);
                out.store_entity_header(length, self.type_id, object_id)?;
                self.inner.store(out, value, handler)
            })
            .ok_or_else(|| self.mismatch(instance))?
    }

    fn create(
        &self,
        record: &EntityRecord<'_>,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectRef> {
        self.validate_record(record)?;
        Ok(ObjectRef::new(self.inner.create(record, handler)?))
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        instance: &ObjectRef,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        self.validate_record(record)?;
        instance
            .with_mut(|value: &mut H::Instance| self.inner.update_state(record, value, handler))
            .ok_or_else(|| self.mismatch(instance))?
    }

    fn complete(
        &self,
        record: &EntityRecord<'_>,
        instance: &ObjectRef,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        instance
            .with_mut(|value: &mut H::Instance| self.inner.complete(record, value, handler))
            .ok_or_else(|| self.mismatch(instance))?
    }

    fn iterate_instance_references(
        &self,
        instance: &ObjectRef,
        visit: &mut dyn FnMut(&ObjectRef),
    ) -> HandlerResult<()> {
        instance
            .with(|value: &H::Instance| self.inner.iterate_references(value, visit))
            .ok_or_else(|| self.mismatch(instance))
    }
}

/// Handler for stateless marker types: no members, no references.
///
/// Only the entity header is written; loading yields `T::default()`.
pub struct TrivialHandler<T> {
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TrivialHandler<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Default + Send + Sync + 'static> CustomTypeHandler for TrivialHandler<T> {
    type Instance = T;

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn members(&self) -> Vec<TypeMember> {
        Vec::new()
    }

    fn store(
        &self,
        _out: &mut ChunkWriter,
        _instance: &T,
        _handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn create(&self, _record: &EntityRecord<'_>, _handler: &dyn LoadHandler) -> HandlerResult<T> {
        Ok(T::default())
    }
}

/// Handler for types that must never be persisted.
///
/// Registering it makes the exclusion explicit: storing or loading an
/// instance fails with [`HandlerError::TypeNotPersistable`] instead of a
/// missing-handler error.
pub struct UnpersistableHandler<T> {
    type_id: TypeId,
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> UnpersistableHandler<T> {
    pub fn new(type_id: TypeId, type_name: impl Into<String>) -> Self {
        Self {
            type_id,
            type_name: type_name.into(),
            _marker: PhantomData,
        }
    }

    fn not_persistable(&self) -> HandlerError {
        HandlerError::TypeNotPersistable {
            type_name: self.type_name.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> TypeHandler for UnpersistableHandler<T> {
    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn runtime_type(&self) -> Option<RuntimeType> {
        Some(RuntimeType::of::<T>())
    }

    fn instance_members(&self) -> &[TypeMember] {
        &[]
    }

    fn guarantee_instance_viability(&self) -> HandlerResult<()> {
        Err(self.not_persistable())
    }

    fn store(
        &self,
        _out: &mut ChunkWriter,
        _instance: &ObjectRef,
        _object_id: ObjectId,
        _handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        Err(self.not_persistable())
    }

    fn create(
        &self,
        _record: &EntityRecord<'_>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectRef> {
        Err(self.not_persistable())
    }

    fn update_state(
        &self,
        _record: &EntityRecord<'_>,
        _instance: &ObjectRef,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        Err(self.not_persistable())
    }

    fn iterate_instance_references(
        &self,
        _instance: &ObjectRef,
        _visit: &mut dyn FnMut(&ObjectRef),
    ) -> HandlerResult<()> {
        Ok(())
    }
}
