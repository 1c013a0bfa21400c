use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use bingraph_binary::Chunk;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Sink for committed chunks.
///
/// Each [`write`](PersistenceTarget::write) receives exactly one chunk and
/// is the only I/O a commit performs. There is no durability guarantee
/// beyond that single call.
pub trait PersistenceTarget: Send + Sync {
    fn write(&self, chunk: Chunk) -> StoreResult<()>;

    fn is_writable(&self) -> bool;

    /// Fail with [`StoreError::ReadOnly`] unless the target accepts writes.
    fn validate_is_storing_enabled(&self) -> StoreResult<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }
}

/// Source of previously committed bytes, oldest chunk first.
pub trait PersistenceSource: Send + Sync {
    fn read(&self) -> StoreResult<Vec<u8>>;
}

/// Keeps every committed chunk in memory.
///
/// Intended for tests and embedding.
#[derive(Default)]
pub struct InMemoryTarget {
    chunks: RwLock<Vec<Vec<u8>>>,
    read_only: AtomicBool,
}

impl InMemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the target between read-only and writable.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// The committed chunks, one entry per write.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.read().expect("lock poisoned").clone()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks
            .read()
            .expect("lock poisoned")
            .iter()
            .map(Vec::len)
            .sum()
    }

    pub fn clear(&self) {
        self.chunks.write().expect("lock poisoned").clear();
    }
}

impl PersistenceTarget for InMemoryTarget {
    fn write(&self, chunk: Chunk) -> StoreResult<()> {
        self.validate_is_storing_enabled()?;
        self.chunks
            .write()
            .expect("lock poisoned")
            .push(chunk.into_bytes());
        Ok(())
    }

    fn is_writable(&self) -> bool {
        !self.read_only.load(Ordering::SeqCst)
    }
}

impl PersistenceSource for InMemoryTarget {
    fn read(&self) -> StoreResult<Vec<u8>> {
        Ok(self.chunks.read().expect("lock poisoned").concat())
    }
}

impl std::fmt::Debug for InMemoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTarget")
            .field("chunk_count", &self.chunk_count())
            .field("read_only", &!self.is_writable())
            .finish()
    }
}

/// Appends each committed chunk to a single file.
///
/// Reading returns the whole file; records of later commits follow those
/// of earlier ones.
#[derive(Debug)]
pub struct FileTarget {
    path: PathBuf,
    read_only: AtomicBool,
    write_lock: Mutex<()>,
}

impl FileTarget {
    /// Target the file at `path`, creating its parent directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            read_only: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl PersistenceTarget for FileTarget {
    fn write(&self, chunk: Chunk) -> StoreResult<()> {
        self.validate_is_storing_enabled()?;
        let _guard = self.write_lock.lock().expect("lock poisoned");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(chunk.bytes())?;
        file.flush()?;

        debug!(
            path = %self.path.display(),
            bytes = chunk.len(),
            records = chunk.record_count(),
            "chunk appended"
        );
        Ok(())
    }

    fn is_writable(&self) -> bool {
        !self.read_only.load(Ordering::SeqCst)
    }
}

impl PersistenceSource for FileTarget {
    fn read(&self) -> StoreResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use bingraph_binary::{ByteOrder, ChunkWriter};
    use bingraph_types::{ObjectId, TypeId};

    use super::*;

    fn chunk(value: i64) -> Chunk {
        let mut w = ChunkWriter::new(ByteOrder::NATIVE);
        w.store_entity_header(8, TypeId::native(7), ObjectId::new(1))
            .unwrap();
        w.store_long(0, value).unwrap();
        w.finish()
    }

    #[test]
    fn memory_target_keeps_chunks_in_order() {
        let target = InMemoryTarget::new();
        target.write(chunk(1)).unwrap();
        target.write(chunk(2)).unwrap();
        assert_eq!(target.chunk_count(), 2);
        assert_eq!(target.total_bytes(), 64);
        let all = target.read().unwrap();
        assert_eq!(&all[24..32], &1i64.to_le_bytes());
        assert_eq!(&all[56..64], &2i64.to_le_bytes());
    }

    #[test]
    fn read_only_target_refuses_writes() {
        let target = InMemoryTarget::new();
        target.set_read_only(true);
        assert!(!target.is_writable());
        assert!(matches!(
            target.validate_is_storing_enabled(),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(target.write(chunk(1)), Err(StoreError::ReadOnly)));
        assert_eq!(target.chunk_count(), 0);
    }

    #[test]
    fn file_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileTarget::open(&dir.path().join("data").join("graph.bin")).unwrap();
        assert!(target.read().unwrap().is_empty());

        target.write(chunk(1)).unwrap();
        target.write(chunk(2)).unwrap();
        let bytes = target.read().unwrap();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[56..64], &2i64.to_le_bytes());
    }

    #[test]
    fn read_only_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileTarget::open(&dir.path().join("graph.bin")).unwrap();
        target.set_read_only(true);
        assert!(matches!(target.write(chunk(1)), Err(StoreError::ReadOnly)));
        assert!(!target.path().exists());
    }
}
