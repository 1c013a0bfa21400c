use std::collections::HashMap;
use std::sync::Arc;

use bingraph_binary::{ByteOrder, EntityRecord, RecordIndex};
use bingraph_handler::{HandlerError, LoadHandler, TypeHandler, TypeHandlerLookup, TypeHandlerRegistry};
use bingraph_legacy::LegacyTypeHandlerCreator;
use bingraph_store::{ObjectRegistry, PersistenceSource};
use bingraph_types::{ObjectId, ObjectRef, TypeId};
use tracing::{debug, info};

use crate::error::{LoaderError, LoaderResult};
use crate::scan::{scan_reachable, ReachabilityScan};

/// The instances rebuilt from one load, in record order.
#[derive(Debug, Default)]
pub struct LoadedGraph {
    entries: Vec<(ObjectId, ObjectRef)>,
    by_id: HashMap<ObjectId, usize>,
    created: usize,
    superseded: usize,
}

impl LoadedGraph {
    pub fn get(&self, id: ObjectId) -> Option<&ObjectRef> {
        self.by_id.get(&id).map(|&index| &self.entries[index].1)
    }

    /// The instance of the first record, which is the first root of the
    /// first commit.
    pub fn first(&self) -> Option<&ObjectRef> {
        self.entries.first().map(|(_, instance)| instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectRef)> {
        self.entries.iter().map(|(id, instance)| (*id, instance))
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instances allocated by this load.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Instances that were already registered and got their state updated.
    pub fn reused(&self) -> usize {
        self.entries.len() - self.created
    }

    /// Records ignored because a later record has the same object id.
    pub fn superseded(&self) -> usize {
        self.superseded
    }
}

/// Resolves ids against the instances of the current load first, then
/// against the object registry.
struct LoadContext<'a> {
    local: &'a HashMap<ObjectId, ObjectRef>,
    objects: &'a dyn ObjectRegistry,
}

impl LoadHandler for LoadContext<'_> {
    fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef> {
        self.local
            .get(&id)
            .cloned()
            .or_else(|| self.objects.lookup_object(id))
    }
}

/// Rebuilds object graphs from chunks.
///
/// A load runs three passes over every current record: `create` (or reuse
/// of the instance already registered under the object id), then
/// `update_state`, then `complete`. All records are length-validated before
/// the first instance is touched, and the new instances are registered with
/// the object registry only after every pass succeeded.
///
/// Records whose type id has no handler but a known definition are read
/// through a legacy handler built on first use and cached in the registry.
pub struct Loader {
    types: Arc<TypeHandlerRegistry>,
    objects: Arc<dyn ObjectRegistry>,
    legacy: LegacyTypeHandlerCreator,
    byte_order: ByteOrder,
}

impl Loader {
    pub fn new(
        types: Arc<TypeHandlerRegistry>,
        objects: Arc<dyn ObjectRegistry>,
        byte_order: ByteOrder,
    ) -> Self {
        Self {
            types,
            objects,
            legacy: LegacyTypeHandlerCreator::new(),
            byte_order,
        }
    }

    pub fn with_legacy_creator(mut self, legacy: LegacyTypeHandlerCreator) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Load everything `source` holds.
    pub fn load_from(&self, source: &dyn PersistenceSource) -> LoaderResult<LoadedGraph> {
        let bytes = source.read()?;
        self.load(&bytes)
    }

    /// Load the records of `bytes`. Later records supersede earlier ones
    /// with the same object id.
    pub fn load(&self, bytes: &[u8]) -> LoaderResult<LoadedGraph> {
        let index = RecordIndex::read(bytes, self.byte_order)?;
        let records = index.current_records();
        let handlers = self.resolve_handlers(&records)?;
        debug!(records = records.len(), "records validated");

        let mut local = HashMap::with_capacity(records.len());
        let mut entries = Vec::with_capacity(records.len());
        let mut created = 0;
        for (record, handler) in records.iter().zip(&handlers) {
            let object_id = record.object_id();
            let instance = match self.objects.lookup_object(object_id) {
                Some(existing) => {
                    check_instance_type(object_id, handler.as_ref(), &existing)?;
                    existing
                }
                None => {
                    let context = LoadContext {
                        local: &local,
                        objects: self.objects.as_ref(),
                    };
                    created += 1;
                    handler.create(record, &context)?
                }
            };
            local.insert(object_id, instance.clone());
            entries.push((object_id, instance));
        }

        let context = LoadContext {
            local: &local,
            objects: self.objects.as_ref(),
        };
        for ((record, handler), (_, instance)) in records.iter().zip(&handlers).zip(&entries) {
            handler.update_state(record, instance, &context)?;
        }
        for ((record, handler), (_, instance)) in records.iter().zip(&handlers).zip(&entries) {
            handler.complete(record, instance, &context)?;
        }

        self.objects.merge(&entries)?;

        let by_id = entries
            .iter()
            .enumerate()
            .map(|(index, (id, _))| (*id, index))
            .collect();
        let graph = LoadedGraph {
            entries,
            by_id,
            created,
            superseded: index.superseded(),
        };
        info!(
            records = graph.len(),
            created = graph.created(),
            reused = graph.reused(),
            superseded = graph.superseded(),
            "chunk loaded"
        );
        Ok(graph)
    }

    /// Ids reachable from `roots` through the records of `bytes`, without
    /// creating any instance.
    pub fn scan_reachable(&self, bytes: &[u8], roots: &[ObjectId]) -> LoaderResult<ReachabilityScan> {
        let index = RecordIndex::read(bytes, self.byte_order)?;
        scan_reachable(&index, roots, |type_id| self.handler_for(type_id))
    }

    /// The handler for records of `type_id`, building and caching a legacy
    /// handler if only the definition is known.
    pub fn handler_for(&self, type_id: TypeId) -> LoaderResult<Arc<dyn TypeHandler>> {
        if let Some(handler) = self.types.lookup_type_handler_by_id(type_id) {
            return Ok(handler);
        }
        let definition = self
            .types
            .lookup_definition(type_id)
            .ok_or(HandlerError::UnknownTypeId(type_id))?;
        let current = self
            .types
            .lookup_by_type_name(&definition.type_name)
            .ok_or_else(|| HandlerError::NoTypeHandler(definition.type_name.clone()))?;

        let handler: Arc<dyn TypeHandler> = Arc::new(self.legacy.create(&definition, current)?);
        match self.types.register_legacy_handler(Arc::clone(&handler)) {
            Ok(()) => Ok(handler),
            // Another loader cached one first.
            Err(HandlerError::DuplicateTypeId(_)) => self
                .types
                .lookup_type_handler_by_id(type_id)
                .ok_or_else(|| HandlerError::UnknownTypeId(type_id).into()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_handlers(
        &self,
        records: &[&EntityRecord<'_>],
    ) -> LoaderResult<Vec<Arc<dyn TypeHandler>>> {
        let mut cache: HashMap<TypeId, Arc<dyn TypeHandler>> = HashMap::new();
        let mut handlers = Vec::with_capacity(records.len());
        for record in records {
            let handler = match cache.get(&record.type_id()) {
                Some(handler) => Arc::clone(handler),
                None => {
                    let handler = self.handler_for(record.type_id())?;
                    cache.insert(record.type_id(), Arc::clone(&handler));
                    handler
                }
            };
            handler.validate_record(record)?;
            handlers.push(handler);
        }
        Ok(handlers)
    }
}

fn check_instance_type(
    object_id: ObjectId,
    handler: &dyn TypeHandler,
    existing: &ObjectRef,
) -> LoaderResult<()> {
    match handler.runtime_type() {
        Some(expected) if expected != existing.runtime_type() => Err(LoaderError::InstanceTypeConflict {
            object_id,
            expected: expected.name().to_string(),
            actual: existing.runtime_type().name().to_string(),
        }),
        _ => Ok(()),
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("byte_order", &self.byte_order)
            .field("handlers", &self.types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bingraph_binary::{ChunkWriter, PrimitiveType};
    use bingraph_handler::{
        CustomTypeHandler, HandlerResult, ObjectList, ObjectMap, StoreHandler, TypeDefinition,
        TypeDictionary, TypeMember,
    };
    use bingraph_store::{DefaultObjectRegistry, InMemoryTarget};
    use bingraph_storer::{Storer, StorerConfig};

    use super::*;

    #[derive(Default)]
    struct Node {
        label: i32,
        next: Option<ObjectRef>,
    }

    struct NodeHandler;

    impl CustomTypeHandler for NodeHandler {
        type Instance = Node;

        fn type_name(&self) -> &str {
            "test.Node"
        }

        fn members(&self) -> Vec<TypeMember> {
            vec![
                TypeMember::primitive("label", PrimitiveType::Int),
                TypeMember::reference("next", "test.Node"),
            ]
        }

        fn store(
            &self,
            out: &mut ChunkWriter,
            node: &Node,
            handler: &mut dyn StoreHandler,
        ) -> HandlerResult<()> {
            out.store_int(0, node.label)?;
            let next = handler.apply(node.next.as_ref())?;
            out.store_object_id(4, next)?;
            Ok(())
        }

        fn create(&self, record: &EntityRecord<'_>, _: &dyn LoadHandler) -> HandlerResult<Node> {
            Ok(Node {
                label: record.read_int(0)?,
                next: None,
            })
        }

        fn update_state(
            &self,
            record: &EntityRecord<'_>,
            node: &mut Node,
            handler: &dyn LoadHandler,
        ) -> HandlerResult<()> {
            node.label = record.read_int(0)?;
            node.next = handler.resolve(record.read_object_id(4)?)?;
            Ok(())
        }

        fn iterate_references(&self, node: &Node, visit: &mut dyn FnMut(&ObjectRef)) {
            node.next.iter().for_each(visit);
        }
    }

    fn types() -> Arc<TypeHandlerRegistry> {
        let types = TypeHandlerRegistry::new();
        types.register(NodeHandler).unwrap();
        Arc::new(types)
    }

    /// Store `roots` with a throwaway object registry and return the bytes.
    fn stored(types: &Arc<TypeHandlerRegistry>, roots: &[ObjectRef]) -> Vec<u8> {
        let target = Arc::new(InMemoryTarget::new());
        let mut storer = Storer::new(
            types.clone(),
            Arc::new(DefaultObjectRegistry::new()),
            target.clone(),
            StorerConfig::default(),
        );
        storer.store_all(roots).unwrap();
        storer.commit().unwrap();
        target.read().unwrap()
    }

    fn loader(types: &Arc<TypeHandlerRegistry>) -> (Loader, Arc<DefaultObjectRegistry>) {
        let objects = Arc::new(DefaultObjectRegistry::new());
        (
            Loader::new(types.clone(), objects.clone(), ByteOrder::NATIVE),
            objects,
        )
    }

    fn next_of(node: &ObjectRef) -> ObjectRef {
        node.with(|n: &Node| n.next.clone()).unwrap().unwrap()
    }

    #[test]
    fn two_node_cycle_reloads_as_a_cycle() {
        let types = types();
        let a = ObjectRef::new(Node { label: 1, next: None });
        let b = ObjectRef::new(Node {
            label: 2,
            next: Some(a.clone()),
        });
        a.with_mut(|n: &mut Node| n.next = Some(b.clone())).unwrap();
        let bytes = stored(&types, &[a]);

        let (loader, objects) = loader(&types);
        let graph = loader.load(&bytes).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.created(), 2);

        let a2 = graph.first().unwrap().clone();
        let b2 = next_of(&a2);
        assert!(next_of(&b2).ptr_eq(&a2));
        assert_eq!(b2.with(|n: &Node| n.label).unwrap(), 2);
        assert!(!objects.lookup_object_id(&b2).is_not_found());
    }

    #[test]
    fn shared_string_reloads_as_one_instance() {
        let types = types();
        let s = ObjectRef::new(String::from("shared"));
        let list: ObjectList = [Some(s.clone()), Some(s)].into_iter().collect();
        let bytes = stored(&types, &[ObjectRef::new(list)]);

        let (loader, _) = loader(&types);
        let graph = loader.load(&bytes).unwrap();
        let list = graph.first().unwrap();
        let (first, second) = list
            .with(|l: &ObjectList| (l.get(0).cloned().unwrap(), l.get(1).cloned().unwrap()))
            .unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.get::<String>().unwrap(), "shared");
    }

    #[test]
    fn map_entries_are_rebuilt() {
        let types = types();
        let mut map = ObjectMap::new();
        map.insert("one", Some(ObjectRef::new(1_i64)));
        map.insert("none", None);
        let bytes = stored(&types, &[ObjectRef::new(map)]);

        let (loader, _) = loader(&types);
        let graph = loader.load(&bytes).unwrap();
        let map = graph.first().unwrap();
        let (len, one) = map
            .with(|m: &ObjectMap| (m.len(), m.get("one").and_then(|v| v.get::<i64>())))
            .unwrap();
        assert_eq!(len, 2);
        assert_eq!(one, Some(1));
    }

    #[test]
    fn primitive_values_round_trip() {
        let types = types();
        let list: ObjectList = [
            Some(ObjectRef::new(true)),
            Some(ObjectRef::new(-3_i8)),
            Some(ObjectRef::new('λ')),
            Some(ObjectRef::new(2.5_f32)),
            Some(ObjectRef::new(vec![1_u8, 2, 3])),
        ]
        .into_iter()
        .collect();
        let bytes = stored(&types, &[ObjectRef::new(list)]);

        let (loader, _) = loader(&types);
        let graph = loader.load(&bytes).unwrap();
        let elements: Vec<ObjectRef> = graph
            .first()
            .unwrap()
            .with(|l: &ObjectList| l.iter().flatten().cloned().collect())
            .unwrap();
        assert_eq!(elements[0].get::<bool>(), Some(true));
        assert_eq!(elements[1].get::<i8>(), Some(-3));
        assert_eq!(elements[2].get::<char>(), Some('λ'));
        assert_eq!(elements[3].get::<f32>(), Some(2.5));
        assert_eq!(elements[4].get::<Vec<u8>>(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn reload_reuses_registered_instances() {
        let types = types();
        let bytes = stored(&types, &[ObjectRef::new(Node { label: 4, next: None })]);
        let (loader, _) = loader(&types);
        let first = loader.load(&bytes).unwrap();
        let second = loader.load(&bytes).unwrap();
        assert_eq!(second.created(), 0);
        assert_eq!(second.reused(), 1);
        assert!(first.first().unwrap().ptr_eq(second.first().unwrap()));
    }

    #[test]
    fn changed_value_instance_is_inconsistent() {
        let types = types();
        let bytes = stored(&types, &[ObjectRef::new(String::from("persisted"))]);
        let (loader, objects) = loader(&types);
        let id = ObjectId::DEFAULT_START;
        objects
            .register_object(id, &ObjectRef::new(String::from("edited")))
            .unwrap();
        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::InconsistentState { .. }))
        ));
    }

    #[test]
    fn type_conflict_with_registered_instance() {
        let types = types();
        let bytes = stored(&types, &[ObjectRef::new(String::from("text"))]);
        let (loader, objects) = loader(&types);
        let keep = ObjectRef::new(5_i32);
        objects.register_object(ObjectId::DEFAULT_START, &keep).unwrap();
        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::InstanceTypeConflict { .. })
        ));
    }

    #[test]
    fn short_record_is_rejected_before_any_instance_exists() {
        let types = types();
        let node_type = types
            .lookup_type_handler(bingraph_types::RuntimeType::of::<Node>())
            .unwrap()
            .type_id();
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(8, TypeId::native(7), ObjectId::new(1)).unwrap();
        w.store_long(0, 1).unwrap();
        w.store_entity_header(4, node_type, ObjectId::new(2)).unwrap();
        w.store_int(0, 1).unwrap();
        let bytes = w.finish().into_bytes();

        let (loader, objects) = loader(&types);
        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::InvalidRecordLength { .. }))
        ));
        assert!(objects.is_empty());
    }

    #[test]
    fn oversized_list_count_leaves_registered_instances_untouched() {
        let types = types();
        let (loader, objects) = loader(&types);
        let existing = ObjectRef::new(vec![1u8, 2, 3]);
        objects.register_object(ObjectId::new(1), &existing).unwrap();

        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(8 + 2, TypeId::native(11), ObjectId::new(1)).unwrap();
        w.store_bytes(0, &[9, 9]).unwrap();
        // Announces five references, carries one.
        w.store_entity_header(16, TypeId::native(20), ObjectId::new(2)).unwrap();
        w.store_list_header(0, 5).unwrap();
        w.store_object_id(8, ObjectId::new(1)).unwrap();
        let bytes = w.finish().into_bytes();

        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::MalformedRecord { .. }))
        ));
        assert_eq!(existing.get::<Vec<u8>>(), Some(vec![1, 2, 3]));
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn map_keyed_by_itself_fails_instead_of_blocking() {
        let types = types();
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(8 + 16, TypeId::native(21), ObjectId::new(1)).unwrap();
        w.store_key_value_references(0, &[(ObjectId::new(1), ObjectId::NULL)])
            .unwrap();
        let bytes = w.finish().into_bytes();

        let (loader, objects) = loader(&types);
        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::UnsupportedKey(_)))
        ));
        assert!(objects.is_empty());
    }

    #[test]
    fn later_commit_supersedes_earlier_record() {
        let types = types();
        let node = ObjectRef::new(Node { label: 1, next: None });
        let objects = Arc::new(DefaultObjectRegistry::new());
        let target = Arc::new(InMemoryTarget::new());
        let mut storer = Storer::new(
            types.clone(),
            objects.clone(),
            target.clone(),
            StorerConfig::default(),
        );
        storer.store(&node).unwrap();
        storer.commit().unwrap();
        node.with_mut(|n: &mut Node| n.label = 2).unwrap();
        storer.store(&node).unwrap();
        storer.commit().unwrap();

        let (loader, _) = loader(&types);
        let graph = loader.load(&target.read().unwrap()).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.superseded(), 1);
        assert_eq!(graph.first().unwrap().with(|n: &Node| n.label), Some(2));
    }

    #[test]
    fn unknown_type_id_fails() {
        let types = types();
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(0, TypeId::new(5_000_000).unwrap(), ObjectId::new(1))
            .unwrap();
        let bytes = w.finish().into_bytes();
        let (loader, _) = loader(&types);
        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::UnknownTypeId(_)))
        ));
    }

    /// `{int label; ref next; int weight}`, the shape before `weight` was
    /// dropped.
    struct OldNodeHandler;

    impl CustomTypeHandler for OldNodeHandler {
        type Instance = Node;

        fn type_name(&self) -> &str {
            "test.Node"
        }

        fn members(&self) -> Vec<TypeMember> {
            vec![
                TypeMember::primitive("label", PrimitiveType::Short),
                TypeMember::reference("next", "test.Node"),
                TypeMember::primitive("weight", PrimitiveType::Int),
            ]
        }

        fn store(
            &self,
            out: &mut ChunkWriter,
            node: &Node,
            handler: &mut dyn StoreHandler,
        ) -> HandlerResult<()> {
            out.store_short(0, node.label as i16)?;
            let next = handler.apply(node.next.as_ref())?;
            out.store_object_id(2, next)?;
            out.store_int(10, 99)?;
            Ok(())
        }

        fn create(&self, _: &EntityRecord<'_>, _: &dyn LoadHandler) -> HandlerResult<Node> {
            Ok(Node::default())
        }
    }

    #[test]
    fn legacy_records_load_through_a_cached_legacy_handler() {
        let old_types = TypeHandlerRegistry::new();
        let old_id = old_types.register(OldNodeHandler).unwrap();
        let old_types = Arc::new(old_types);
        let a = ObjectRef::new(Node { label: 7, next: None });
        let b = ObjectRef::new(Node {
            label: 8,
            next: Some(a.clone()),
        });
        let bytes = stored(&old_types, &[b]);

        let dictionary = TypeDictionary::from_json(&old_types.type_dictionary().to_json().unwrap()).unwrap();
        let types = TypeHandlerRegistry::with_dictionary(dictionary).unwrap();
        let new_id = types.register(NodeHandler).unwrap();
        assert_ne!(new_id, old_id);
        let types = Arc::new(types);

        let (loader, _) = loader(&types);
        let scan = loader.scan_reachable(&bytes, &[ObjectId::DEFAULT_START]).unwrap();
        assert_eq!(scan.reachable.len(), 2);
        assert!(scan.missing.is_empty());

        let graph = loader.load(&bytes).unwrap();
        let b2 = graph.first().unwrap();
        assert_eq!(b2.with(|n: &Node| n.label), Some(8));
        assert_eq!(next_of(b2).with(|n: &Node| n.label), Some(7));
        assert_eq!(
            types.lookup_type_handler_by_id(old_id).unwrap().type_id(),
            old_id
        );
    }

    #[test]
    fn legacy_record_with_a_broken_discarded_list_is_rejected_up_front() {
        let legacy_id = TypeId::new(2_000_000).unwrap();
        let mut dictionary = TypeDictionary::new();
        dictionary
            .register(TypeDefinition::new(
                legacy_id,
                "test.Node",
                vec![
                    TypeMember::primitive("label", PrimitiveType::Int),
                    TypeMember::reference("next", "test.Node"),
                    TypeMember::chars("notes"),
                ],
            ))
            .unwrap();
        let types = TypeHandlerRegistry::with_dictionary(dictionary).unwrap();
        let node_type = types.register(NodeHandler).unwrap();
        let types = Arc::new(types);

        let (loader, objects) = loader(&types);
        let existing = ObjectRef::new(Node { label: 5, next: None });
        objects.register_object(ObjectId::new(1), &existing).unwrap();

        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(12, node_type, ObjectId::new(1)).unwrap();
        w.store_int(0, 42).unwrap();
        w.store_object_id(4, ObjectId::NULL).unwrap();
        // `notes` announces 100 bytes, two follow.
        w.store_entity_header(4 + 8 + 8 + 2, legacy_id, ObjectId::new(2)).unwrap();
        w.store_int(0, 7).unwrap();
        w.store_object_id(4, ObjectId::NULL).unwrap();
        w.store_list_header(12, 100).unwrap();
        w.store_raw(20, b"ab").unwrap();
        let bytes = w.finish().into_bytes();

        assert!(matches!(
            loader.load(&bytes),
            Err(LoaderError::Handler(HandlerError::MalformedRecord { .. }))
        ));
        assert_eq!(existing.with(|n: &Node| n.label), Some(5));
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn scan_reports_missing_references() {
        let types = types();
        let node_type = types.lookup_by_type_name("test.Node").unwrap().type_id();
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(12, node_type, ObjectId::new(1)).unwrap();
        w.store_int(0, 1).unwrap();
        w.store_object_id(4, ObjectId::new(2)).unwrap();
        let bytes = w.finish().into_bytes();

        let (loader, _) = loader(&types);
        let scan = loader.scan_reachable(&bytes, &[ObjectId::new(1)]).unwrap();
        assert_eq!(scan.reachable.into_iter().collect::<Vec<_>>(), vec![ObjectId::new(1)]);
        assert_eq!(scan.missing.into_iter().collect::<Vec<_>>(), vec![ObjectId::new(2)]);
    }
}
