use bingraph_binary::{BinaryError, ChunkWriter, EntityRecord};
use bingraph_types::{ObjectId, ObjectRef, RuntimeType, TypeId};

use crate::definition::{
    iterate_member_references, members_length_maximum, members_length_minimum, walked_length,
    TypeDefinition,
};
use crate::error::{HandlerError, HandlerResult};
use crate::member::TypeMember;

/// Callback handed to [`TypeHandler::store`] for every referential field.
///
/// Implemented by the graph storer: `apply` returns the id the referenced
/// instance has (or is given), registering it for storing if it has not
/// been seen yet. This is what drives graph discovery.
pub trait StoreHandler {
    /// Id for a referenced instance. `None` maps to [`ObjectId::NULL`].
    fn apply(&mut self, instance: Option<&ObjectRef>) -> HandlerResult<ObjectId>;

    /// Like [`StoreHandler::apply`], but stores the instance even if a
    /// lazy storer would otherwise only reference it.
    fn apply_eager(&mut self, instance: Option<&ObjectRef>) -> HandlerResult<ObjectId> {
        self.apply(instance)
    }
}

/// Reference resolution during loading.
pub trait LoadHandler {
    /// The instance registered under `id`, if any. It may not be fully
    /// populated yet.
    fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef>;

    /// Resolve a persisted reference. Null stays `None`; an id nobody knows
    /// is an error.
    fn resolve(&self, id: ObjectId) -> HandlerResult<Option<ObjectRef>> {
        if id.is_null() {
            return Ok(None);
        }
        self.lookup_object(id)
            .map(Some)
            .ok_or(HandlerError::UnresolvedReference(id))
    }
}

/// Reject a record whose payload length lies outside `minimum..=maximum`.
pub fn validate_record_length(
    record: &EntityRecord<'_>,
    minimum: u64,
    maximum: u64,
) -> HandlerResult<()> {
    let length = record.content_length();
    if length < minimum || length > maximum {
        return Err(HandlerError::InvalidRecordLength {
            type_id: record.type_id(),
            object_id: record.object_id(),
            length,
            minimum,
            maximum,
        });
    }
    Ok(())
}

/// Reject a record whose variable-length sections do not fit its payload.
pub fn validate_record_layout(record: &EntityRecord<'_>, members: &[TypeMember]) -> HandlerResult<()> {
    let malformed = |source: BinaryError| HandlerError::MalformedRecord {
        type_id: record.type_id(),
        object_id: record.object_id(),
        source,
    };
    let end = walked_length(members, record).map_err(malformed)?;
    let available = record.content_length();
    if end > available {
        return Err(malformed(BinaryError::OutOfBounds {
            offset: 0,
            length: end,
            available,
        }));
    }
    Ok(())
}

/// Codec and lifecycle contract bound to one type shape.
///
/// Loading is split in three passes so that reference cycles can be
/// rebuilt: [`create`](TypeHandler::create) allocates a shallow instance
/// from non-referential data, [`update_state`](TypeHandler::update_state)
/// wires references once every instance of the chunk exists, and
/// [`complete`](TypeHandler::complete) establishes invariants that need all
/// elements present.
pub trait TypeHandler: Send + Sync + 'static {
    /// Identity of the binary shape.
    fn type_id(&self) -> TypeId;

    fn type_name(&self) -> &str;

    /// The bound runtime type. `None` for handlers that only read.
    fn runtime_type(&self) -> Option<RuntimeType>;

    /// Persisted members in binary order.
    fn instance_members(&self) -> &[TypeMember];

    /// Instance members plus any pseudo-members. Defaults to the instance
    /// members.
    fn all_members(&self) -> Vec<TypeMember> {
        self.instance_members().to_vec()
    }

    fn members_in_declared_order(&self) -> &[TypeMember] {
        self.instance_members()
    }

    fn storing_members(&self) -> &[TypeMember] {
        self.instance_members()
    }

    fn setting_members(&self) -> &[TypeMember] {
        self.instance_members()
    }

    fn members_persisted_length_minimum(&self) -> u64 {
        members_length_minimum(self.instance_members())
    }

    fn members_persisted_length_maximum(&self) -> u64 {
        members_length_maximum(self.instance_members())
    }

    fn has_persisted_references(&self) -> bool {
        self.instance_members().iter().any(TypeMember::has_references)
    }

    /// Returns `true` if instances can differ in persisted length.
    fn has_variable_length(&self) -> bool {
        self.instance_members()
            .iter()
            .any(TypeMember::is_variable_length)
    }

    /// Fail if instances of this type can never be created.
    fn guarantee_instance_viability(&self) -> HandlerResult<()> {
        Ok(())
    }

    /// Check a record's payload length against the member bounds and, for
    /// variable-length shapes, every list header against the payload.
    fn validate_record(&self, record: &EntityRecord<'_>) -> HandlerResult<()> {
        validate_record_length(
            record,
            self.members_persisted_length_minimum(),
            self.members_persisted_length_maximum(),
        )?;
        if self.has_variable_length() {
            validate_record_layout(record, self.instance_members())?;
        }
        Ok(())
    }

    /// Write the entity header and all fields of `instance`. Referential
    /// fields go through `handler`.
    fn store(
        &self,
        out: &mut ChunkWriter,
        instance: &ObjectRef,
        object_id: ObjectId,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()>;

    /// Allocate a shallow instance from `record`.
    fn create(&self, record: &EntityRecord<'_>, handler: &dyn LoadHandler)
        -> HandlerResult<ObjectRef>;

    /// Populate `instance` from `record`, resolving references.
    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        instance: &ObjectRef,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()>;

    fn complete(
        &self,
        _record: &EntityRecord<'_>,
        _instance: &ObjectRef,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        Ok(())
    }

    /// Visit every instance `instance` references.
    fn iterate_instance_references(
        &self,
        instance: &ObjectRef,
        visit: &mut dyn FnMut(&ObjectRef),
    ) -> HandlerResult<()>;

    /// Visit every id `record` references.
    fn iterate_loadable_references(
        &self,
        record: &EntityRecord<'_>,
        visit: &mut dyn FnMut(ObjectId),
    ) -> HandlerResult<()> {
        Ok(iterate_member_references(
            self.instance_members(),
            record,
            visit,
        )?)
    }

    /// The persisted shape this handler reads and writes.
    fn to_definition(&self) -> TypeDefinition {
        TypeDefinition::new(
            self.type_id(),
            self.type_name(),
            self.instance_members().to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use bingraph_binary::{ByteOrder, ChunkReader, ChunkWriter, PrimitiveType};

    use super::*;

    fn members() -> Vec<TypeMember> {
        vec![
            TypeMember::chars("name"),
            TypeMember::primitive("age", PrimitiveType::Int),
        ]
    }

    fn validate(write: impl FnOnce(&mut ChunkWriter)) -> HandlerResult<()> {
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        write(&mut w);
        let bytes = w.finish().into_bytes();
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        validate_record_layout(&records[0], &members())
    }

    #[test]
    fn well_formed_record_passes() {
        validate(|w| {
            w.store_entity_header(8 + 2 + 4, TypeId::native(1_000_000), ObjectId::new(1))
                .unwrap();
            let next = w.store_chars(0, "Al").unwrap();
            w.store_int(next, 40).unwrap();
        })
        .unwrap();
    }

    #[test]
    fn list_count_past_the_payload_is_malformed() {
        let result = validate(|w| {
            w.store_entity_header(8 + 2 + 4, TypeId::native(1_000_000), ObjectId::new(1))
                .unwrap();
            w.store_list_header(0, 30).unwrap();
        });
        assert!(matches!(result, Err(HandlerError::MalformedRecord { .. })));
    }

    #[test]
    fn fixed_member_after_a_list_must_fit() {
        // The list fills the payload, leaving no room for `age`.
        let result = validate(|w| {
            w.store_entity_header(8 + 6, TypeId::native(1_000_000), ObjectId::new(1))
                .unwrap();
            w.store_chars(0, "Albert").unwrap();
        });
        assert!(matches!(
            result,
            Err(HandlerError::MalformedRecord {
                source: BinaryError::OutOfBounds { length: 18, available: 14, .. },
                ..
            })
        ));
    }
}
