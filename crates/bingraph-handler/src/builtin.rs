//! Handlers for the value and collection types every context knows.
//!
//! Built-in handlers use fixed ids below [`TypeId::CUSTOM_START`], so their
//! records are readable by any process regardless of registration order.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use bingraph_binary::{ChunkWriter, EntityRecord, Primitive, OBJECT_ID_LENGTH};
use bingraph_types::{ObjectId, ObjectRef, TypeId};

use crate::custom::CustomTypeHandler;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{LoadHandler, StoreHandler};
use crate::member::TypeMember;

pub const BOOLEAN_TYPE_ID: TypeId = TypeId::native(1);
pub const BYTE_TYPE_ID: TypeId = TypeId::native(2);
pub const SHORT_TYPE_ID: TypeId = TypeId::native(3);
pub const CHAR_TYPE_ID: TypeId = TypeId::native(4);
pub const INT_TYPE_ID: TypeId = TypeId::native(5);
pub const FLOAT_TYPE_ID: TypeId = TypeId::native(6);
pub const LONG_TYPE_ID: TypeId = TypeId::native(7);
pub const DOUBLE_TYPE_ID: TypeId = TypeId::native(8);
pub const STRING_TYPE_ID: TypeId = TypeId::native(10);
pub const BYTES_TYPE_ID: TypeId = TypeId::native(11);
pub const OBJECT_LIST_TYPE_ID: TypeId = TypeId::native(20);
pub const OBJECT_MAP_TYPE_ID: TypeId = TypeId::native(21);

fn inconsistent(type_name: &str, record: &EntityRecord<'_>, reason: String) -> HandlerError {
    HandlerError::InconsistentState {
        type_name: type_name.to_string(),
        object_id: record.object_id(),
        reason,
    }
}

/// Boxed fixed-length value (`i32`, `f64`, `bool`, ...).
///
/// Values are immutable once persisted: loading into an instance that
/// already holds a different value is an inconsistent-state error.
pub struct PrimitiveValueHandler<P> {
    _marker: PhantomData<fn() -> P>,
}

impl<P> PrimitiveValueHandler<P> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P> Default for PrimitiveValueHandler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Primitive> CustomTypeHandler for PrimitiveValueHandler<P> {
    type Instance = P;

    fn type_name(&self) -> &str {
        P::TYPE.name()
    }

    fn members(&self) -> Vec<TypeMember> {
        vec![TypeMember::primitive("value", P::TYPE)]
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        value: &P,
        _handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        out.store(0, *value)?;
        Ok(())
    }

    fn create(&self, record: &EntityRecord<'_>, _handler: &dyn LoadHandler) -> HandlerResult<P> {
        Ok(record.read(0)?)
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        value: &mut P,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        // Compare encodings so that NaN payloads compare by bits.
        let width = P::TYPE.byte_size() as usize;
        let mut current = [0u8; 8];
        value.encode(record.order(), &mut current[..width]);
        if record.read_raw(0, width as u64)? != &current[..width] {
            return Err(inconsistent(
                P::TYPE.name(),
                record,
                "instance value differs from persisted value".into(),
            ));
        }
        Ok(())
    }
}

/// `String` as a character list.
#[derive(Debug, Default)]
pub struct StringHandler;

impl CustomTypeHandler for StringHandler {
    type Instance = String;

    fn type_name(&self) -> &str {
        "String"
    }

    fn members(&self) -> Vec<TypeMember> {
        vec![TypeMember::chars("value")]
    }

    fn variable_length(&self, value: &String) -> u64 {
        value.len() as u64
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        value: &String,
        _handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        out.store_chars(0, value)?;
        Ok(())
    }

    fn create(
        &self,
        record: &EntityRecord<'_>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<String> {
        Ok(record.read_chars(0)?.to_owned())
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        value: &mut String,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        let persisted = record.read_chars(0)?;
        if persisted != value.as_str() {
            return Err(inconsistent(
                "String",
                record,
                format!("instance holds {value:?}, record holds {persisted:?}"),
            ));
        }
        Ok(())
    }
}

/// `Vec<u8>` as a byte list. Byte buffers are mutable, so loading
/// overwrites the instance content.
#[derive(Debug, Default)]
pub struct BytesHandler;

impl CustomTypeHandler for BytesHandler {
    type Instance = Vec<u8>;

    fn type_name(&self) -> &str {
        "bytes"
    }

    fn members(&self) -> Vec<TypeMember> {
        vec![TypeMember::bytes("value")]
    }

    fn variable_length(&self, value: &Vec<u8>) -> u64 {
        value.len() as u64
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        value: &Vec<u8>,
        _handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        out.store_bytes(0, value)?;
        Ok(())
    }

    fn create(
        &self,
        record: &EntityRecord<'_>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<Vec<u8>> {
        Ok(record.read_bytes(0)?.to_vec())
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        value: &mut Vec<u8>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        let persisted = record.read_bytes(0)?;
        if persisted != value.as_slice() {
            value.clear();
            value.extend_from_slice(persisted);
        }
        Ok(())
    }
}

/// Ordered list of nullable references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectList {
    elements: Vec<Option<ObjectRef>>,
}

impl ObjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Option<ObjectRef>) {
        self.elements.push(element);
    }

    pub fn get(&self, index: usize) -> Option<&ObjectRef> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&ObjectRef>> {
        self.elements.iter().map(Option::as_ref)
    }
}

impl FromIterator<Option<ObjectRef>> for ObjectList {
    fn from_iter<I: IntoIterator<Item = Option<ObjectRef>>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectListHandler;

impl CustomTypeHandler for ObjectListHandler {
    type Instance = ObjectList;

    fn type_name(&self) -> &str {
        "ObjectList"
    }

    fn members(&self) -> Vec<TypeMember> {
        vec![TypeMember::references("elements")]
    }

    fn variable_length(&self, list: &ObjectList) -> u64 {
        list.len() as u64 * OBJECT_ID_LENGTH
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        list: &ObjectList,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        let ids = list
            .iter()
            .map(|element| handler.apply(element))
            .collect::<HandlerResult<Vec<_>>>()?;
        out.store_references(0, &ids)?;
        Ok(())
    }

    fn create(
        &self,
        record: &EntityRecord<'_>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectList> {
        let count = record.list_element_count(0)?;
        Ok(ObjectList {
            elements: Vec::with_capacity(count.min(1 << 16) as usize),
        })
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        list: &mut ObjectList,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        list.elements = record
            .read_references(0)?
            .into_iter()
            .map(|id| handler.resolve(id))
            .collect::<HandlerResult<_>>()?;
        Ok(())
    }

    fn iterate_references(&self, list: &ObjectList, visit: &mut dyn FnMut(&ObjectRef)) {
        list.iter().flatten().for_each(visit);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MapEntry {
    key: ObjectRef,
    value: Option<ObjectRef>,
}

/// Map from string keys to nullable references.
///
/// Keys are persisted as references to `String` instances. While loading,
/// a key instance may not be populated yet, so entries are collected
/// unkeyed in `update_state` and only placed into the table in `complete`.
#[derive(Clone, Debug, Default)]
pub struct ObjectMap {
    table: BTreeMap<String, MapEntry>,
    pending: Vec<(Option<ObjectRef>, Option<ObjectRef>)>,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with a fresh key instance.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<ObjectRef>) {
        let key = key.into();
        let key_ref = ObjectRef::new(key.clone());
        self.table.insert(
            key,
            MapEntry {
                key: key_ref,
                value,
            },
        );
    }

    /// Insert with a shared `String` key instance.
    pub fn insert_shared(&mut self, key: ObjectRef, value: Option<ObjectRef>) -> HandlerResult<()> {
        let text = key_text(&key)?;
        self.table.insert(text, MapEntry { key, value });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ObjectRef> {
        self.table.get(key).and_then(|entry| entry.value.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// The key instance stored for `key`.
    pub fn key_instance(&self, key: &str) -> Option<&ObjectRef> {
        self.table.get(key).map(|entry| &entry.key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Returns `true` while loaded entries still await `complete`.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn key_text(key: &ObjectRef) -> HandlerResult<String> {
    // Checked without locking: the key may be the map being completed.
    let text = key.is::<String>().then(|| key.get::<String>()).flatten();
    text.ok_or_else(|| {
        HandlerError::UnsupportedKey(format!(
            "map keys must be String instances, got {}",
            key.runtime_type()
        ))
    })
}

#[derive(Debug, Default)]
pub struct ObjectMapHandler;

impl CustomTypeHandler for ObjectMapHandler {
    type Instance = ObjectMap;

    fn type_name(&self) -> &str {
        "ObjectMap"
    }

    fn members(&self) -> Vec<TypeMember> {
        vec![TypeMember::complex(
            "entries",
            vec![
                TypeMember::reference("key", "String"),
                TypeMember::reference("value", "Object"),
            ],
        )]
    }

    fn variable_length(&self, map: &ObjectMap) -> u64 {
        map.len() as u64 * 2 * OBJECT_ID_LENGTH
    }

    fn store(
        &self,
        out: &mut ChunkWriter,
        map: &ObjectMap,
        handler: &mut dyn StoreHandler,
    ) -> HandlerResult<()> {
        let mut pairs = Vec::with_capacity(map.len());
        for entry in map.table.values() {
            let key = handler.apply(Some(&entry.key))?;
            let value = handler.apply(entry.value.as_ref())?;
            pairs.push((key, value));
        }
        out.store_key_value_references(0, &pairs)?;
        Ok(())
    }

    fn create(
        &self,
        _record: &EntityRecord<'_>,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<ObjectMap> {
        Ok(ObjectMap::new())
    }

    fn update_state(
        &self,
        record: &EntityRecord<'_>,
        map: &mut ObjectMap,
        handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        map.table.clear();
        map.pending = record
            .read_key_value_references(0)?
            .into_iter()
            .map(|(key, value)| Ok::<_, HandlerError>((handler.resolve(key)?, handler.resolve(value)?)))
            .collect::<HandlerResult<_>>()?;
        Ok(())
    }

    fn complete(
        &self,
        record: &EntityRecord<'_>,
        map: &mut ObjectMap,
        _handler: &dyn LoadHandler,
    ) -> HandlerResult<()> {
        for (key, value) in std::mem::take(&mut map.pending) {
            let key = key.ok_or_else(|| {
                HandlerError::UnsupportedKey(format!("null key in map {}", record.object_id()))
            })?;
            map.insert_shared(key, value)?;
        }
        Ok(())
    }

    fn iterate_references(&self, map: &ObjectMap, visit: &mut dyn FnMut(&ObjectRef)) {
        for entry in map.table.values() {
            visit(&entry.key);
            if let Some(value) = &entry.value {
                visit(value);
            }
        }
    }
}

/// Placeholder for a reference that is loaded on demand.
///
/// Lazy loading is not supported: a storer rejects any instance of this
/// type at registration.
#[derive(Clone, Debug)]
pub struct LazyReference {
    pub object_id: ObjectId,
    pub target: Option<ObjectRef>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bingraph_binary::{ByteOrder, ChunkReader};

    use super::*;
    use crate::custom::CustomHandler;
    use crate::handler::TypeHandler;

    struct Ids(HashMap<ObjectRef, ObjectId>);

    impl StoreHandler for Ids {
        fn apply(&mut self, instance: Option<&ObjectRef>) -> HandlerResult<ObjectId> {
            let Some(instance) = instance else {
                return Ok(ObjectId::NULL);
            };
            let next = ObjectId::new(100 + self.0.len() as u64);
            Ok(*self.0.entry(instance.clone()).or_insert(next))
        }
    }

    struct Lookup(HashMap<ObjectId, ObjectRef>);

    impl LoadHandler for Lookup {
        fn lookup_object(&self, id: ObjectId) -> Option<ObjectRef> {
            self.0.get(&id).cloned()
        }
    }

    fn stored(handler: &dyn TypeHandler, instance: &ObjectRef, ids: &mut Ids) -> Vec<u8> {
        let mut out = ChunkWriter::new(ByteOrder::NATIVE);
        handler
            .store(&mut out, instance, ObjectId::new(1), ids)
            .unwrap();
        out.finish().into_bytes()
    }

    #[test]
    fn primitive_value_loads_back() {
        let h = CustomHandler::new(DOUBLE_TYPE_ID, PrimitiveValueHandler::<f64>::new());
        let bytes = stored(&h, &ObjectRef::new(2.5_f64), &mut Ids(HashMap::new()));
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        let loaded = h.create(&records[0], &Lookup(HashMap::new())).unwrap();
        assert_eq!(loaded.get::<f64>(), Some(2.5));
        assert_eq!(h.type_name(), "double");
    }

    #[test]
    fn value_state_mismatch_is_inconsistent() {
        let h = CustomHandler::new(INT_TYPE_ID, PrimitiveValueHandler::<i32>::new());
        let bytes = stored(&h, &ObjectRef::new(7_i32), &mut Ids(HashMap::new()));
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        let lookup = Lookup(HashMap::new());

        h.update_state(&records[0], &ObjectRef::new(7_i32), &lookup)
            .unwrap();
        let err = h
            .update_state(&records[0], &ObjectRef::new(8_i32), &lookup)
            .unwrap_err();
        assert!(matches!(err, HandlerError::InconsistentState { .. }));
    }

    #[test]
    fn string_mismatch_is_inconsistent() {
        let h = CustomHandler::new(STRING_TYPE_ID, StringHandler);
        let bytes = stored(&h, &ObjectRef::new(String::from("abc")), &mut Ids(HashMap::new()));
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        assert_eq!(records[0].content_length(), 11);
        let lookup = Lookup(HashMap::new());
        let loaded = h.create(&records[0], &lookup).unwrap();
        assert_eq!(loaded.get::<String>().as_deref(), Some("abc"));

        let other = ObjectRef::new(String::from("abd"));
        assert!(matches!(
            h.update_state(&records[0], &other, &lookup),
            Err(HandlerError::InconsistentState { .. })
        ));
    }

    #[test]
    fn bytes_are_overwritten_on_load() {
        let h = CustomHandler::new(BYTES_TYPE_ID, BytesHandler);
        let bytes = stored(&h, &ObjectRef::new(vec![1u8, 2, 3]), &mut Ids(HashMap::new()));
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        let target = ObjectRef::new(vec![9u8]);
        h.update_state(&records[0], &target, &Lookup(HashMap::new()))
            .unwrap();
        assert_eq!(target.get::<Vec<u8>>(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn list_shares_one_id_for_one_instance() {
        let h = CustomHandler::new(OBJECT_LIST_TYPE_ID, ObjectListHandler);
        let shared = ObjectRef::new(String::from("s"));
        let list: ObjectList = [Some(shared.clone()), None, Some(shared.clone())]
            .into_iter()
            .collect();
        let mut ids = Ids(HashMap::new());
        let bytes = stored(&h, &ObjectRef::new(list), &mut ids);
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        assert_eq!(
            records[0].read_references(0).unwrap(),
            vec![ObjectId::new(100), ObjectId::NULL, ObjectId::new(100)]
        );

        let lookup = Lookup(HashMap::from([(ObjectId::new(100), shared.clone())]));
        let loaded = h.create(&records[0], &lookup).unwrap();
        h.update_state(&records[0], &loaded, &lookup).unwrap();
        loaded
            .with(|l: &ObjectList| {
                assert_eq!(l.len(), 3);
                assert!(l.get(0).unwrap().ptr_eq(&shared));
                assert!(l.get(1).is_none());
            })
            .unwrap();
    }

    #[test]
    fn map_is_rebuilt_in_complete() {
        let h = CustomHandler::new(OBJECT_MAP_TYPE_ID, ObjectMapHandler);
        let value = ObjectRef::new(3_i64);
        let mut map = ObjectMap::new();
        map.insert("b", Some(value.clone()));
        map.insert("a", None);
        let key_a = map.key_instance("a").unwrap().clone();
        let key_b = map.key_instance("b").unwrap().clone();

        let mut ids = Ids(HashMap::new());
        let bytes = stored(&h, &ObjectRef::new(map), &mut ids);
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();

        let lookup = Lookup(
            ids.0
                .iter()
                .map(|(instance, id)| (*id, instance.clone()))
                .collect(),
        );
        assert_eq!(lookup.0.len(), 3);
        let loaded = h.create(&records[0], &lookup).unwrap();
        h.update_state(&records[0], &loaded, &lookup).unwrap();
        assert!(loaded.with(|m: &ObjectMap| m.is_pending() && m.is_empty()).unwrap());

        h.complete(&records[0], &loaded, &lookup).unwrap();
        loaded
            .with(|m: &ObjectMap| {
                assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b"]);
                assert!(m.get("b").unwrap().ptr_eq(&value));
                assert!(m.get("a").is_none());
                assert!(m.contains_key("a"));
                assert!(m.key_instance("a").unwrap().ptr_eq(&key_a));
                assert!(m.key_instance("b").unwrap().ptr_eq(&key_b));
            })
            .unwrap();
    }

    #[test]
    fn non_string_key_is_rejected() {
        let mut map = ObjectMap::new();
        let err = map
            .insert_shared(ObjectRef::new(1_i32), None)
            .unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedKey(_)));
    }
}
