use std::sync::Arc;

use bingraph_binary::ChunkWriter;
use bingraph_handler::TypeHandlerLookup;
use bingraph_store::{ObjectRegistry, PersistenceTarget};
use bingraph_types::{ObjectId, ObjectRef};
use tracing::{debug, info};

use crate::config::StorerConfig;
use crate::error::{StorerError, StorerResult};
use crate::local::LocalRegistry;

/// Summary of one successful commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Entity records written.
    pub records: usize,
    /// Bytes handed to the target.
    pub bytes: usize,
    /// Instances that received their id during this run.
    pub new_objects: usize,
}

/// Converts object graphs reachable from roots into one chunk per commit.
///
/// Traversal is iterative: every newly discovered instance is appended to a
/// work list that is drained until empty, so graph depth never grows the
/// call stack. Each instance is written at most once per run, and cycles
/// terminate because an instance gets its id before its fields are stored.
///
/// Nothing reaches the target before [`Storer::commit`]. A failed
/// [`store`](Storer::store) or commit aborts the run: every later call fails
/// with [`StorerError::Aborted`] until [`clear`](Storer::clear) is called.
pub struct Storer {
    config: StorerConfig,
    target: Arc<dyn PersistenceTarget>,
    chunk: ChunkWriter,
    local: LocalRegistry,
    aborted: bool,
}

impl Storer {
    pub fn new(
        types: Arc<dyn TypeHandlerLookup>,
        objects: Arc<dyn ObjectRegistry>,
        target: Arc<dyn PersistenceTarget>,
        config: StorerConfig,
    ) -> Self {
        let local = LocalRegistry::new(config.mode, types, objects, config.initial_capacity);
        Self {
            chunk: ChunkWriter::new(config.byte_order),
            config,
            target,
            local,
            aborted: false,
        }
    }

    pub fn config(&self) -> &StorerConfig {
        &self.config
    }

    /// Store the graph reachable from `root` and return the root's id.
    ///
    /// Storing an instance this run already knows only returns its id.
    pub fn store(&mut self, root: &ObjectRef) -> StorerResult<ObjectId> {
        self.check_not_aborted()?;
        let result = self.store_graph(root);
        if result.is_err() {
            self.aborted = true;
        }
        result
    }

    /// Store several roots; ids are returned in order.
    pub fn store_all(&mut self, roots: &[ObjectRef]) -> StorerResult<Vec<ObjectId>> {
        roots.iter().map(|root| self.store(root)).collect()
    }

    fn store_graph(&mut self, root: &ObjectRef) -> StorerResult<ObjectId> {
        let before = self.chunk.record_count();
        let root_id = self.local.register_root(root)?;

        while let Some((instance, object_id, handler)) = self.local.next_pending() {
            handler.store(&mut self.chunk, &instance, object_id, &mut self.local)?;
        }

        debug!(
            root = %root_id,
            records = self.chunk.record_count() - before,
            known = self.local.len(),
            "graph stored"
        );
        Ok(root_id)
    }

    /// Write everything stored since the last commit as one chunk, then
    /// publish the new id associations to the object registry.
    ///
    /// Committing an empty run writes nothing. On success the storer is
    /// cleared and can be reused.
    pub fn commit(&mut self) -> StorerResult<CommitReport> {
        self.check_not_aborted()?;
        let result = self.write_chunk();
        match &result {
            Ok(_) => self.clear(),
            Err(_) => self.aborted = true,
        }
        result
    }

    fn write_chunk(&mut self) -> StorerResult<CommitReport> {
        let entries = self.local.new_entries();
        let mut report = CommitReport {
            new_objects: entries.len(),
            ..CommitReport::default()
        };

        if !self.chunk.is_empty() {
            self.target.validate_is_storing_enabled()?;
            let chunk = self.chunk.finish();
            report.records = chunk.record_count();
            report.bytes = chunk.len();
            self.target.write(chunk)?;
        }
        self.local.objects().merge(&entries)?;

        info!(
            records = report.records,
            bytes = report.bytes,
            new_objects = report.new_objects,
            "commit complete"
        );
        Ok(report)
    }

    /// Discard everything since the last commit and lift an abort.
    pub fn clear(&mut self) {
        self.chunk.clear();
        self.local.clear();
        self.aborted = false;
    }

    /// Clear and release buffers grown beyond the configured capacity.
    pub fn reinitialize(&mut self) {
        self.local.reset(self.config.initial_capacity);
        self.chunk = ChunkWriter::new(self.config.byte_order);
        self.aborted = false;
    }

    /// Reserve room for `additional` more instances in this run.
    pub fn ensure_capacity(&mut self, additional: usize) {
        self.local.ensure_capacity(additional);
    }

    /// Never write `instance` in this run; references to it use its
    /// registered id, or a fresh one that is merged on commit.
    pub fn skip(&mut self, instance: &ObjectRef) -> StorerResult<ObjectId> {
        self.check_not_aborted()?;
        if let Some(id) = self.local.lookup(instance) {
            return Ok(id);
        }
        let assignment = self
            .local
            .objects()
            .ensure_object_id_guaranteed_register(instance);
        self.local
            .register_skipped(instance, assignment.object_id(), assignment.is_new());
        Ok(assignment.object_id())
    }

    /// Never write `instance` in this run; references to it use
    /// `object_id`, whose record is supplied elsewhere.
    pub fn skip_mapped(&mut self, instance: &ObjectRef, object_id: ObjectId) -> StorerResult<()> {
        self.check_not_aborted()?;
        let known = self.local.objects().lookup_object_id(instance);
        self.local
            .register_skipped(instance, object_id, known != object_id);
        Ok(())
    }

    /// Never write `instance` in this run; references to it become null.
    pub fn skip_nulled(&mut self, instance: &ObjectRef) -> StorerResult<()> {
        self.check_not_aborted()?;
        self.local.register_skipped(instance, ObjectId::NULL, false);
        Ok(())
    }

    /// The id this run assigned to `instance`, or [`ObjectId::NOT_FOUND`].
    pub fn lookup_object_id(&self, instance: &ObjectRef) -> ObjectId {
        self.local.lookup(instance).unwrap_or(ObjectId::NOT_FOUND)
    }

    /// Number of instances this run has assigned ids to.
    pub fn size(&self) -> usize {
        self.local.len()
    }

    /// Returns `true` if nothing has been stored or skipped since the last
    /// commit.
    pub fn is_empty(&self) -> bool {
        self.local.len() == 0
    }

    /// Entity records written but not committed yet.
    pub fn pending_records(&self) -> usize {
        self.chunk.record_count()
    }

    /// Instances this run will write, in discovery order.
    pub fn stored_instances(&self) -> Vec<(ObjectId, ObjectRef)> {
        self.local
            .items()
            .iter()
            .filter(|item| item.queued)
            .map(|item| (item.object_id, item.instance.clone()))
            .collect()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn check_not_aborted(&self) -> StorerResult<()> {
        if self.aborted {
            Err(StorerError::Aborted)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Storer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storer")
            .field("config", &self.config)
            .field("size", &self.size())
            .field("pending_records", &self.pending_records())
            .field("aborted", &self.aborted)
            .finish()
    }
}
