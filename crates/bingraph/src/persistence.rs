use std::path::{Path, PathBuf};
use std::sync::Arc;

use bingraph_handler::{CustomTypeHandler, TypeDictionary, TypeHandlerRegistry};
use bingraph_legacy::LegacyTypeHandlingListener;
use bingraph_loader::{LoadedGraph, Loader};
use bingraph_store::{
    DefaultObjectRegistry, FileTarget, InMemoryTarget, ObjectRegistry, PersistenceSource,
    PersistenceTarget,
};
use bingraph_storer::{CommitReport, Storer, StorerConfig};
use bingraph_types::{ObjectId, ObjectRef, TypeId};
use tracing::info;

use crate::config::PersistenceConfig;
use crate::error::PersistenceResult;

/// One persistence context: a type handler registry, an object registry
/// and a backend, wired together.
///
/// Storers and loaders created from the same context share both
/// registries, so instances keep their ids across commits and loads.
pub struct Persistence {
    config: PersistenceConfig,
    types: Arc<TypeHandlerRegistry>,
    objects: Arc<DefaultObjectRegistry>,
    target: Arc<dyn PersistenceTarget>,
    source: Arc<dyn PersistenceSource>,
    dictionary_path: Option<PathBuf>,
    listener: Option<Arc<dyn LegacyTypeHandlingListener>>,
}

impl Persistence {
    /// A context that keeps everything in memory.
    pub fn in_memory(config: PersistenceConfig) -> PersistenceResult<Self> {
        Self::with_backend(
            config,
            TypeHandlerRegistry::new(),
            Arc::new(InMemoryTarget::new()),
        )
    }

    /// A context backed by the data file at `path`.
    ///
    /// The type dictionary lives next to it, with the extension replaced by
    /// `types.json`. If it exists, its definitions seed the type registry so that records of
    /// earlier type shapes stay readable.
    pub fn file(path: &Path, config: PersistenceConfig) -> PersistenceResult<Self> {
        let dictionary_path = path.with_extension("types.json");
        let types = match TypeDictionary::load(&dictionary_path)? {
            Some(dictionary) => TypeHandlerRegistry::with_dictionary(dictionary)?,
            None => TypeHandlerRegistry::new(),
        };
        let target = Arc::new(FileTarget::open(path)?);
        let mut persistence = Self::with_backend(config, types, target)?;
        persistence.dictionary_path = Some(dictionary_path);
        info!(path = %path.display(), "file persistence opened");
        Ok(persistence)
    }

    /// Wire a context from caller-supplied parts.
    pub fn with_backend<B>(
        config: PersistenceConfig,
        types: TypeHandlerRegistry,
        backend: Arc<B>,
    ) -> PersistenceResult<Self>
    where
        B: PersistenceTarget + PersistenceSource + 'static,
    {
        config.validate()?;
        let objects = DefaultObjectRegistry::with_start(config.object_id_start());
        Ok(Self {
            config,
            types: Arc::new(types),
            objects: Arc::new(objects),
            target: backend.clone(),
            source: backend,
            dictionary_path: None,
            listener: None,
        })
    }

    /// Notify `listener` of every instance loaded from a legacy record.
    pub fn with_legacy_listener(mut self, listener: Arc<dyn LegacyTypeHandlingListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn types(&self) -> &Arc<TypeHandlerRegistry> {
        &self.types
    }

    pub fn objects(&self) -> &Arc<DefaultObjectRegistry> {
        &self.objects
    }

    pub fn register<H: CustomTypeHandler>(&self, handler: H) -> PersistenceResult<TypeId> {
        Ok(self.types.register(handler)?)
    }

    pub fn register_unpersistable<T: Send + Sync + 'static>(
        &self,
        type_name: &str,
    ) -> PersistenceResult<TypeId> {
        Ok(self.types.register_unpersistable::<T>(type_name)?)
    }

    /// A storer in the configured mode.
    pub fn storer(&self) -> Storer {
        self.storer_with(self.config.storer_config())
    }

    pub fn storer_with(&self, config: StorerConfig) -> Storer {
        Storer::new(
            self.types.clone(),
            self.objects.clone(),
            self.target.clone(),
            config,
        )
    }

    /// Store `root` and commit.
    pub fn store(&self, root: &ObjectRef) -> PersistenceResult<ObjectId> {
        let mut storer = self.storer();
        let id = storer.store(root)?;
        self.commit(&mut storer)?;
        Ok(id)
    }

    /// Store every root in one commit.
    pub fn store_all(&self, roots: &[ObjectRef]) -> PersistenceResult<Vec<ObjectId>> {
        let mut storer = self.storer();
        let ids = storer.store_all(roots)?;
        self.commit(&mut storer)?;
        Ok(ids)
    }

    /// Save the type dictionary, then commit `storer`. The dictionary goes
    /// first so that the data file never holds an undefined type id.
    pub fn commit(&self, storer: &mut Storer) -> PersistenceResult<CommitReport> {
        self.save_type_dictionary()?;
        Ok(storer.commit()?)
    }

    pub fn loader(&self) -> Loader {
        let mut legacy = self.config.legacy_creator();
        if let Some(listener) = &self.listener {
            legacy = legacy.with_listener(listener.clone());
        }
        Loader::new(self.types.clone(), self.objects.clone(), self.config.byte_order())
            .with_legacy_creator(legacy)
    }

    /// Load everything the backend holds.
    pub fn load(&self) -> PersistenceResult<LoadedGraph> {
        Ok(self.loader().load_from(self.source.as_ref())?)
    }

    /// The instance registered under `id`, loaded or stored.
    pub fn lookup(&self, id: ObjectId) -> Option<ObjectRef> {
        self.objects.lookup_object(id)
    }

    pub fn type_dictionary(&self) -> TypeDictionary {
        self.types.type_dictionary()
    }

    /// Write the type dictionary next to the data file. A no-op for
    /// contexts without one.
    pub fn save_type_dictionary(&self) -> PersistenceResult<()> {
        if let Some(path) = &self.dictionary_path {
            self.type_dictionary().save(path)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("config", &self.config)
            .field("types", &self.types.len())
            .field("objects", &self.objects.len())
            .field("dictionary_path", &self.dictionary_path)
            .finish()
    }
}
