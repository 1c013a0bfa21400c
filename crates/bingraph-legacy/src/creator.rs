use std::collections::HashMap;
use std::sync::Arc;

use bingraph_handler::{TypeDefinition, TypeHandler, TypeMember};
use tracing::debug;

use crate::defaults::{DefaultValuePolicy, ZeroDefaults};
use crate::error::{LegacyError, LegacyResult};
use crate::handler::{DefaultFill, LegacyTypeHandler, LegacyTypeHandlingListener, Translation};
use crate::mapping::{LegacyMemberMapping, MappedMember};
use crate::value::{ValueKind, ValueTranslatorTable};

/// Builds [`LegacyTypeHandler`]s from a legacy definition and the current
/// handler of the same type name.
pub struct LegacyTypeHandlerCreator {
    translators: ValueTranslatorTable,
    defaults: Arc<dyn DefaultValuePolicy>,
    mappings: HashMap<String, LegacyMemberMapping>,
    listener: Option<Arc<dyn LegacyTypeHandlingListener>>,
}

impl LegacyTypeHandlerCreator {
    /// Default translators, zero defaults, name matching only.
    pub fn new() -> Self {
        Self {
            translators: ValueTranslatorTable::defaults().clone(),
            defaults: Arc::new(ZeroDefaults),
            mappings: HashMap::new(),
            listener: None,
        }
    }

    pub fn with_translators(mut self, translators: ValueTranslatorTable) -> Self {
        self.translators = translators;
        self
    }

    pub fn with_default_policy(mut self, policy: Arc<dyn DefaultValuePolicy>) -> Self {
        self.defaults = policy;
        self
    }

    pub fn with_mapping(mut self, type_name: impl Into<String>, mapping: LegacyMemberMapping) -> Self {
        self.mappings.insert(type_name.into(), mapping);
        self
    }

    pub fn with_mappings(mut self, mappings: HashMap<String, LegacyMemberMapping>) -> Self {
        self.mappings.extend(mappings);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn LegacyTypeHandlingListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Map every legacy member onto `current`.
    ///
    /// Fails if any legacy member that maps to a current member has no
    /// translator, or any current member left unmapped has no default.
    pub fn create(
        &self,
        legacy: &TypeDefinition,
        current: Arc<dyn TypeHandler>,
    ) -> LegacyResult<LegacyTypeHandler> {
        let current_definition = current.to_definition();
        let type_name = current_definition.type_name.as_str();
        let offsets = current_definition.fixed_offsets().ok_or_else(|| {
            LegacyError::UnsupportedVariableLength {
                type_name: type_name.to_string(),
            }
        })?;
        let current_members = &current_definition.members;
        let no_mapping = LegacyMemberMapping::default();
        let mapping = self.mappings.get(&legacy.type_name).unwrap_or(&no_mapping);

        let unmapped = |member: &TypeMember, reason: String| LegacyError::UnmappedLegacyMember {
            type_name: legacy.type_name.clone(),
            member: member.name.clone(),
            reason,
        };

        let mut targeted = vec![false; current_members.len()];
        let mut translations = Vec::with_capacity(legacy.members.len());
        for member in &legacy.members {
            let target = match mapping.resolve(&member.name) {
                MappedMember::Discarded => None,
                MappedMember::Renamed(name) => match current_definition.member(name) {
                    Some((index, _)) => Some(index),
                    None => {
                        return Err(unmapped(
                            member,
                            format!("renamed to {name}, which the current type lacks"),
                        ))
                    }
                },
                MappedMember::SameName(name) => current_definition.member(name).map(|(index, _)| index),
            };
            let Some(index) = target else {
                translations.push(Translation::Discard);
                continue;
            };

            let target_member = &current_members[index];
            if std::mem::replace(&mut targeted[index], true) {
                return Err(LegacyError::DuplicateTarget {
                    type_name: legacy.type_name.clone(),
                    member: target_member.name.clone(),
                });
            }
            let (Some(source), Some(target_kind)) =
                (ValueKind::of(member), ValueKind::of(target_member))
            else {
                return Err(unmapped(
                    member,
                    format!("list member cannot map to {}", target_member.name),
                ));
            };
            let translator = self
                .translators
                .lookup(source, target_kind)
                .ok_or_else(|| {
                    unmapped(member, format!("no translator from {source} to {target_kind}"))
                })?;
            translations.push(Translation::Translate {
                translator: translator.clone(),
                target_offset: offsets[index],
                width: target_kind.byte_size(),
            });
        }

        let mut defaults = Vec::new();
        for (index, member) in current_members.iter().enumerate() {
            if targeted[index] {
                continue;
            }
            let kind = ValueKind::of(member)
                .ok_or_else(|| unmapped(member, "list member has no default".into()))?;
            let value = self
                .defaults
                .default_value(type_name, member)
                .ok_or_else(|| unmapped(member, "new member has no default value".into()))?;
            value.validate(type_name, member, kind)?;
            defaults.push(DefaultFill {
                value,
                kind,
                target_offset: offsets[index],
                width: kind.byte_size(),
            });
        }

        debug!(
            legacy_type_id = %legacy.type_id,
            current_type_id = %current.type_id(),
            type_name,
            members = legacy.members.len(),
            defaults = defaults.len(),
            "legacy type handler created"
        );
        Ok(LegacyTypeHandler::new(
            legacy.clone(),
            current,
            translations,
            defaults,
            self.listener.clone(),
        ))
    }
}

impl Default for LegacyTypeHandlerCreator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LegacyTypeHandlerCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyTypeHandlerCreator")
            .field("translators", &self.translators.len())
            .field("mappings", &self.mappings.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use bingraph_binary::{ByteOrder, ChunkReader, ChunkWriter, EntityRecord, PrimitiveType};
    use bingraph_handler::{
        CustomHandler, CustomTypeHandler, HandlerResult, LoadHandler, StoreHandler,
    };
    use bingraph_types::{ObjectId, ObjectRef, TypeId};

    use super::*;
    use crate::defaults::{ConfiguredDefaults, DefaultValue};

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i64,
        z: i32,
        next: Option<ObjectRef>,
    }

    struct PointHandler;

    impl CustomTypeHandler for PointHandler {
        type Instance = Point;

        fn type_name(&self) -> &str {
            "Point"
        }

        fn members(&self) -> Vec<TypeMember> {
            vec![
                TypeMember::primitive("x", PrimitiveType::Long),
                TypeMember::primitive("z", PrimitiveType::Int),
                TypeMember::reference("next", "Point"),
            ]
        }

        fn store(
            &self,
            out: &mut ChunkWriter,
            p: &Point,
            handler: &mut dyn StoreHandler,
        ) -> HandlerResult<()> {
            out.store_long(0, p.x)?;
            out.store_int(8, p.z)?;
            let next = handler.apply(p.next.as_ref())?;
            out.store_object_id(12, next)?;
            Ok(())
        }

        fn create(&self, record: &EntityRecord<'_>, _: &dyn LoadHandler) -> HandlerResult<Point> {
            Ok(Point {
                x: record.read_long(0)?,
                z: record.read_int(8)?,
                next: None,
            })
        }

        fn update_state(
            &self,
            record: &EntityRecord<'_>,
            p: &mut Point,
            handler: &dyn LoadHandler,
        ) -> HandlerResult<()> {
            p.next = handler.resolve(record.read_object_id(12)?)?;
            Ok(())
        }
    }

    struct Objects(HashMap<ObjectId, ObjectRef>);

    impl LoadHandler for Objects {
        fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef> {
            self.0.get(&id).cloned()
        }
    }

    fn current() -> Arc<dyn TypeHandler> {
        Arc::new(CustomHandler::new(TypeId::new(1_000_001).unwrap(), PointHandler))
    }

    /// `{int x; int y; ref next}` under the old id.
    fn legacy() -> TypeDefinition {
        TypeDefinition::new(
            TypeId::new(1_000_000).unwrap(),
            "Point",
            vec![
                TypeMember::primitive("x", PrimitiveType::Int),
                TypeMember::primitive("y", PrimitiveType::Int),
                TypeMember::reference("next", "Point"),
            ],
        )
    }

    fn legacy_bytes(x: i32, y: i32, next: ObjectId) -> Vec<u8> {
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(16, TypeId::new(1_000_000).unwrap(), ObjectId::new(7))
            .unwrap();
        w.store_int(0, x).unwrap();
        w.store_int(4, y).unwrap();
        w.store_object_id(8, next).unwrap();
        w.finish().into_bytes()
    }

    fn load(handler: &LegacyTypeHandler, bytes: &[u8], objects: &Objects) -> ObjectRef {
        let records = ChunkReader::read_all(bytes, ByteOrder::NATIVE).unwrap();
        let instance = handler.create(&records[0], objects).unwrap();
        handler.update_state(&records[0], &instance, objects).unwrap();
        instance
    }

    #[test]
    fn discarded_member_and_zero_default() {
        let creator = LegacyTypeHandlerCreator::new()
            .with_mapping("Point", LegacyMemberMapping::new().discard("y"));
        let handler = creator.create(&legacy(), current()).unwrap();
        assert_eq!(handler.discarded_members(), vec!["y"]);
        assert_eq!(handler.type_id(), TypeId::new(1_000_000).unwrap());

        let instance = load(&handler, &legacy_bytes(5, 9, ObjectId::NULL), &Objects(HashMap::new()));
        let point = instance.with(|p: &Point| (p.x, p.z)).unwrap();
        assert_eq!(point, (5, 0));
    }

    #[test]
    fn rename_carries_the_value_over() {
        let creator = LegacyTypeHandlerCreator::new()
            .with_mapping("Point", LegacyMemberMapping::new().rename("y", "z"));
        let handler = creator.create(&legacy(), current()).unwrap();
        let instance = load(&handler, &legacy_bytes(5, 9, ObjectId::NULL), &Objects(HashMap::new()));
        assert_eq!(instance.with(|p: &Point| p.z).unwrap(), 9);
    }

    #[test]
    fn configured_default_is_written() {
        let policy = ConfiguredDefaults::new().with_value("Point", "z", DefaultValue::Int(-3));
        let creator = LegacyTypeHandlerCreator::new().with_default_policy(Arc::new(policy));
        let handler = creator.create(&legacy(), current()).unwrap();
        let instance = load(&handler, &legacy_bytes(1, 2, ObjectId::NULL), &Objects(HashMap::new()));
        assert_eq!(instance.with(|p: &Point| p.z).unwrap(), -3);
    }

    #[test]
    fn strict_policy_without_default_fails_construction() {
        let creator = LegacyTypeHandlerCreator::new()
            .with_default_policy(Arc::new(ConfiguredDefaults::strict()));
        assert!(matches!(
            creator.create(&legacy(), current()),
            Err(LegacyError::UnmappedLegacyMember { member, .. }) if member == "z"
        ));
    }

    #[test]
    fn references_are_translated_and_discoverable() {
        let handler = LegacyTypeHandlerCreator::new()
            .create(&legacy(), current())
            .unwrap();
        let target = ObjectRef::new(Point::default());
        let objects = Objects(HashMap::from([(ObjectId::new(8), target.clone())]));
        let bytes = legacy_bytes(1, 2, ObjectId::new(8));

        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        let mut seen = Vec::new();
        handler
            .iterate_loadable_references(&records[0], &mut |id| seen.push(id))
            .unwrap();
        assert_eq!(seen, vec![ObjectId::new(8)]);

        let instance = load(&handler, &bytes, &objects);
        let next = instance.with(|p: &Point| p.next.clone()).unwrap().unwrap();
        assert!(next.ptr_eq(&target));
    }

    #[test]
    fn incompatible_kinds_fail_construction() {
        let legacy = TypeDefinition::new(
            TypeId::new(1_000_000).unwrap(),
            "Point",
            vec![TypeMember::reference("x", "Other")],
        );
        assert!(matches!(
            LegacyTypeHandlerCreator::new().create(&legacy, current()),
            Err(LegacyError::UnmappedLegacyMember { member, .. }) if member == "x"
        ));
    }

    #[test]
    fn two_members_cannot_share_a_target() {
        let creator = LegacyTypeHandlerCreator::new()
            .with_mapping("Point", LegacyMemberMapping::new().rename("y", "x"));
        assert!(matches!(
            creator.create(&legacy(), current()),
            Err(LegacyError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn rename_to_missing_member_fails() {
        let creator = LegacyTypeHandlerCreator::new()
            .with_mapping("Point", LegacyMemberMapping::new().rename("y", "w"));
        assert!(matches!(
            creator.create(&legacy(), current()),
            Err(LegacyError::UnmappedLegacyMember { .. })
        ));
    }

    #[test]
    fn variable_length_current_type_is_unsupported() {
        struct Named;
        struct NamedHandler;
        impl CustomTypeHandler for NamedHandler {
            type Instance = Named;
            fn type_name(&self) -> &str {
                "Named"
            }
            fn members(&self) -> Vec<TypeMember> {
                vec![TypeMember::chars("name")]
            }
            fn store(&self, _: &mut ChunkWriter, _: &Named, _: &mut dyn StoreHandler) -> HandlerResult<()> {
                Ok(())
            }
            fn create(&self, _: &EntityRecord<'_>, _: &dyn LoadHandler) -> HandlerResult<Named> {
                Ok(Named)
            }
        }
        let current: Arc<dyn TypeHandler> =
            Arc::new(CustomHandler::new(TypeId::new(1_000_005).unwrap(), NamedHandler));
        let legacy = TypeDefinition::new(TypeId::new(1_000_004).unwrap(), "Named", Vec::new());
        assert!(matches!(
            LegacyTypeHandlerCreator::new().create(&legacy, current),
            Err(LegacyError::UnsupportedVariableLength { .. })
        ));
    }

    #[test]
    fn dropped_list_member_is_skipped_while_reading() {
        let legacy = TypeDefinition::new(
            TypeId::new(1_000_000).unwrap(),
            "Point",
            vec![
                TypeMember::chars("label"),
                TypeMember::primitive("x", PrimitiveType::Long),
            ],
        );
        let handler = LegacyTypeHandlerCreator::new().create(&legacy, current()).unwrap();

        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(8 + 3 + 8, legacy.type_id, ObjectId::new(1))
            .unwrap();
        let next = w.store_chars(0, "abc").unwrap();
        w.store_long(next, 42).unwrap();
        let bytes = w.finish().into_bytes();

        let instance = load(&handler, &bytes, &Objects(HashMap::new()));
        assert_eq!(instance.with(|p: &Point| p.x).unwrap(), 42);
    }

    #[test]
    fn listener_sees_every_legacy_instance() {
        #[derive(Default)]
        struct Audit(Mutex<Vec<(ObjectId, TypeId, TypeId)>>);
        impl LegacyTypeHandlingListener for Audit {
            fn on_legacy_instance(&self, object_id: ObjectId, legacy: &TypeDefinition, current: TypeId) {
                self.0.lock().unwrap().push((object_id, legacy.type_id, current));
            }
        }

        let audit = Arc::new(Audit::default());
        let handler = LegacyTypeHandlerCreator::new()
            .with_listener(audit.clone())
            .create(&legacy(), current())
            .unwrap();
        load(&handler, &legacy_bytes(1, 2, ObjectId::NULL), &Objects(HashMap::new()));
        assert_eq!(
            *audit.0.lock().unwrap(),
            vec![(
                ObjectId::new(7),
                TypeId::new(1_000_000).unwrap(),
                TypeId::new(1_000_001).unwrap()
            )]
        );
    }
}
