use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bingraph_types::TypeId;

use crate::definition::TypeDefinition;
use crate::error::{HandlerError, HandlerResult};

/// Every type definition known to a persistence context, current and
/// historical, keyed by [`TypeId`].
///
/// Persisted as JSON next to the data so a later process can interpret
/// records written under shapes it no longer has handlers for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDictionary {
    definitions: BTreeMap<TypeId, TypeDefinition>,
}

impl TypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Re-registering an identical definition is a no-op;
    /// binding an id to a different shape is an error.
    pub fn register(&mut self, definition: TypeDefinition) -> HandlerResult<()> {
        match self.definitions.get(&definition.type_id) {
            Some(existing) if *existing == definition => Ok(()),
            Some(_) => Err(HandlerError::DuplicateTypeId(definition.type_id)),
            None => {
                self.definitions.insert(definition.type_id, definition);
                Ok(())
            }
        }
    }

    pub fn get(&self, type_id: TypeId) -> Option<&TypeDefinition> {
        self.definitions.get(&type_id)
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.definitions.contains_key(&type_id)
    }

    /// The most recent definition with the given type name.
    pub fn latest_for(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.definitions
            .values()
            .rev()
            .find(|definition| definition.type_name == type_name)
    }

    /// All definitions with the given type name, oldest first.
    pub fn definitions_for<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a TypeDefinition> + 'a {
        self.definitions
            .values()
            .filter(move |definition| definition.type_name == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Highest id in use, if any.
    pub fn highest_type_id(&self) -> Option<TypeId> {
        self.definitions.keys().next_back().copied()
    }

    pub fn to_json(&self) -> HandlerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> HandlerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a dictionary file. Returns `None` if the file does not exist.
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(std::io::Error::other),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use bingraph_binary::PrimitiveType;

    use super::*;
    use crate::member::TypeMember;

    fn point(id: u64, second: &str) -> TypeDefinition {
        TypeDefinition::new(
            TypeId::native(id),
            "Point",
            vec![
                TypeMember::primitive("x", PrimitiveType::Int),
                TypeMember::primitive(second, PrimitiveType::Int),
            ],
        )
    }

    #[test]
    fn latest_definition_wins() {
        let mut dict = TypeDictionary::new();
        dict.register(point(1_000_000, "y")).unwrap();
        dict.register(point(1_000_003, "z")).unwrap();
        assert_eq!(dict.latest_for("Point").unwrap().members[1].name, "z");
        assert_eq!(dict.definitions_for("Point").count(), 2);
        assert_eq!(dict.highest_type_id(), Some(TypeId::native(1_000_003)));
        assert!(dict.latest_for("Line").is_none());
    }

    #[test]
    fn rebinding_an_id_is_rejected() {
        let mut dict = TypeDictionary::new();
        dict.register(point(1_000_000, "y")).unwrap();
        dict.register(point(1_000_000, "y")).unwrap();
        assert!(matches!(
            dict.register(point(1_000_000, "z")),
            Err(HandlerError::DuplicateTypeId(_))
        ));
    }

    #[test]
    fn json_keeps_every_definition() {
        let mut dict = TypeDictionary::new();
        dict.register(point(1_000_000, "y")).unwrap();
        dict.register(point(1_000_001, "z")).unwrap();
        let back = TypeDictionary::from_json(&dict.to_json().unwrap()).unwrap();
        assert_eq!(back, dict);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.json");
        assert!(TypeDictionary::load(&path).unwrap().is_none());

        let mut dict = TypeDictionary::new();
        dict.register(point(1_000_000, "y")).unwrap();
        dict.save(&path).unwrap();
        assert_eq!(TypeDictionary::load(&path).unwrap(), Some(dict));
    }
}
