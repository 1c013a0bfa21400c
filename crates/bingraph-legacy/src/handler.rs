use std::sync::Arc;

use bingraph_binary::{ChunkWriter, EntityHeader, EntityRecord};
use bingraph_handler::definition::{visit_member_references, walk_offsets};
use bingraph_handler::{
    HandlerResult, LoadHandler, StoreHandler, TypeDefinition, TypeHandler, TypeMember,
};
use bingraph_types::{ObjectId, ObjectRef, RuntimeType, TypeId};

use crate::defaults::DefaultValue;
use crate::value::{ValueKind, ValueTranslator};

/// Notified whenever a legacy record is turned into a current instance.
pub trait LegacyTypeHandlingListener: Send + Sync {
    fn on_legacy_instance(&self, object_id: ObjectId, legacy: &TypeDefinition, current_type_id: TypeId);
}

/// What happens to one legacy member.
#[derive(Clone, Debug)]
pub(crate) enum Translation {
    Discard,
    Translate {
        translator: ValueTranslator,
        target_offset: u64,
        width: u64,
    },
}

/// A current member the legacy record lacks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DefaultFill {
    pub(crate) value: DefaultValue,
    pub(crate) kind: ValueKind,
    pub(crate) target_offset: u64,
    pub(crate) width: u64,
}

type CreateFn =
    fn(&LegacyTypeHandler, &EntityRecord<'_>, &dyn LoadHandler) -> HandlerResult<ObjectRef>;

/// Reads records of an old type shape into instances of the current one.
///
/// The legacy record is rewritten into a payload in the current layout,
/// one value translator per legacy member plus defaults for the members
/// it lacks. Loading then delegates to the current handler, which never
/// sees the legacy layout. Everything else delegates to the current handler
/// too, except reference discovery on records, which walks the legacy
/// members.
pub struct LegacyTypeHandler {
    legacy: TypeDefinition,
    current: Arc<dyn TypeHandler>,
    translations: Vec<Translation>,
    defaults: Vec<DefaultFill>,
    reference_members: Vec<usize>,
    current_length: u64,
    listener: Option<Arc<dyn LegacyTypeHandlingListener>>,
    create_fn: CreateFn,
}

impl LegacyTypeHandler {
    pub(crate) fn new(
        legacy: TypeDefinition,
        current: Arc<dyn TypeHandler>,
        translations: Vec<Translation>,
        defaults: Vec<DefaultFill>,
        listener: Option<Arc<dyn LegacyTypeHandlingListener>>,
    ) -> Self {
        let reference_members = legacy
            .members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.has_references())
            .map(|(index, _)| index)
            .collect();
        let current_length = current.members_persisted_length_minimum();
        let create_fn: CreateFn = if listener.is_some() {
            Self::create_notifying
        } else {
            Self::create_translated
        };
        Self {
            legacy,
            current,
            translations,
            defaults,
            reference_members,
            current_length,
            listener,
            create_fn,
        }
    }

    pub fn legacy_definition(&self) -> &TypeDefinition {
        &self.legacy
    }

    pub fn current_handler(&self) -> &Arc<dyn TypeHandler> {
        &self.current
    }

    /// Names of legacy members whose values are dropped.
    pub fn discarded_members(&self) -> Vec<&str> {
        self.legacy
            .members
            .iter()
            .zip(&self.translations)
            .filter(|(_, translation)| matches!(translation, Translation::Discard))
            .map(|(member, _)| member.name.as_str())
            .collect()
    }

    /// Rewrite `record`'s payload into the current layout.
    fn translate(&self, record: &EntityRecord<'_>) -> HandlerResult<Vec<u8>> {
        let offsets = walk_offsets(&self.legacy.members, record)?;
        let mut payload = vec![0u8; self.current_length as usize];

        for (translation, offset) in self.translations.iter().zip(offsets) {
            if let Translation::Translate {
                translator,
                target_offset,
                width,
            } = translation
            {
                let slot = &mut payload[*target_offset as usize..(*target_offset + *width) as usize];
                translator.translate(record, offset, slot)?;
            }
        }
        for fill in self.defaults.iter().filter(|fill| !fill.value.is_zero()) {
            let slot =
                &mut payload[fill.target_offset as usize..(fill.target_offset + fill.width) as usize];
            fill.value.write(record.order(), fill.kind, slot)?;
        }
        Ok(payload)
    }

    fn with_translated<R>(
        &self,
        record: &EntityRecord<'_>,
        f: impl FnOnce(&EntityRecord<'_>) -> HandlerResult<R>,
    ) -> HandlerResult<R> {
        self.validate_record(record)?;
        let payload = self.translate(record)?;
        let header = EntityHeader::new(self.current_length, self.current.type_id(), record.object_id())?;
        let translated = EntityRecord::new(record.position(), header, &payload, record.order())?;
        f(&translated)
    }

    fn create_translated(
        &self,
        record: &EntityRecord<'_>,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectRef> {
        self.with_translated(record, |translated| self.current.create(translated, handler))
    }

    fn create_notifying(
        &self,
        record: &EntityRecord<'_>,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectRef> {
        let instance = self.create_translated(record, handler)?;
        if let Some(listener) = &self.listener {
            listener.on_legacy_instance(record.object_id(), &self.legacy, self.current.type_id());
        }
        Ok(instance)
    }
}

impl TypeHandler for LegacyTypeHandler {
    fn type_id(&self) -> TypeId {
        self.legacy.type_id
    }

    fn type_name(&self) -> &str {
        &self.legacy.type_name
    }

    fn runtime_type(&self) -> Option<RuntimeType> {
        self.current.runtime_type()
    }

    /// The legacy layout, which is what records of this type id carry.
    fn instance_members(&self) -> &[TypeMember] {
        &self.legacy.members
    }

    fn members_in_declared_order(&self) -> &[TypeMember] {
        self.current.members_in_declared_order()
    }

    fn storing_members(&self) -> &[TypeMember] {
        self.current.storing_members()
    }

    fn setting_members(&self) -> &[TypeMember] {
        self.current.setting_members()
    }

    fn guarantee_instance_viability(&self) -> HandlerResult<()> {
        self.current.guarantee_instance_viability()
    }

    /// Instances are always written in the current shape.
    fn store(
        &self,
        out: &mut ChunkWriter,
        instance: &ObjectRef,
        object_id: ObjectId,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        self.current.store(out, instance, object_id, handler)
    }

    fn create(&self, record: &EntityRecord<'_>, handler: &dyn LoadHandler) -> HandlerResult<ObjectRef> {
        (self.create_fn)(self, record, handler)
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        instance: &ObjectRef,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        self.with_translated(record, |translated| {
            self.current.update_state(translated, instance, handler)
        })
    }

    fn complete(
        &self,
        record: &EntityRecord<'_>,
        instance: &ObjectRef,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        self.with_translated(record, |translated| {
            self.current.complete(translated, instance, handler)
        })
    }

    fn iterate_instance_references(
        &self,
        instance: &ObjectRef,
        visit: &mut dyn FnMut(&ObjectRef),
    ) -> HandlerResult<()> {
        self.current.iterate_instance_references(instance, visit)
    }

    fn iterate_loadable_references(
        &self,
        record: &EntityRecord<'_>,
        visit: &mut dyn FnMut(ObjectId),
    ) -> HandlerResult<()> {
        if self.reference_members.is_empty() {
            return Ok(());
        }
        let offsets = walk_offsets(&self.legacy.members, record)?;
        for &index in &self.reference_members {
            visit_member_references(&self.legacy.members[index], offsets[index], record, visit)?;
        }
        Ok(())
    }

    fn to_definition(&self) -> TypeDefinition {
        self.legacy.clone()
    }
}

impl std::fmt::Debug for LegacyTypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyTypeHandler")
            .field("legacy_type_id", &self.legacy.type_id)
            .field("current_type_id", &self.current.type_id())
            .field("type_name", &self.legacy.type_name)
            .field("translations", &self.translations.len())
            .field("defaults", &self.defaults.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
