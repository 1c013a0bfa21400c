use bingraph_types::ObjectId;
use tracing::debug;

use crate::error::BinaryResult;
use crate::order::ByteOrder;
use crate::reader::ChunkReader;
use crate::record::EntityRecord;

/// ObjectId → record lookups over a block of records.
///
/// Entries are kept sorted by id for binary search. A block may hold several
/// records for one id when chunks from successive commits are concatenated;
/// the later record supersedes the earlier one.
#[derive(Clone, Debug)]
pub struct RecordIndex<'a> {
    entries: Vec<(ObjectId, usize)>,
    records: Vec<EntityRecord<'a>>,
    superseded: usize,
}

impl<'a> RecordIndex<'a> {
    /// Index already decoded records, keeping stream order in `records`.
    pub fn build(records: Vec<EntityRecord<'a>>) -> Self {
        let mut entries: Vec<(ObjectId, usize)> = records
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.object_id(), slot))
            .collect();

        // Stable sort keeps stream order among equal ids; keep the last.
        entries.sort_by_key(|(id, _)| *id);
        let before = entries.len();
        entries.reverse();
        entries.dedup_by_key(|(id, _)| *id);
        entries.reverse();
        let superseded = before - entries.len();

        if superseded > 0 {
            debug!(superseded, "records superseded by later commits");
        }

        Self {
            entries,
            records,
            superseded,
        }
    }

    /// Decode and index every record of `bytes`.
    pub fn read(bytes: &'a [u8], order: ByteOrder) -> BinaryResult<Self> {
        Ok(Self::build(ChunkReader::read_all(bytes, order)?))
    }

    fn slot(&self, id: ObjectId) -> Option<usize> {
        self.entries
            .binary_search_by_key(&id, |(entry, _)| *entry)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Stream position of the current record for `id`.
    pub fn lookup(&self, id: ObjectId) -> Option<u64> {
        self.slot(id).map(|slot| self.records[slot].position())
    }

    /// The current record for `id`.
    pub fn record(&self, id: ObjectId) -> Option<&EntityRecord<'a>> {
        self.slot(id).map(|slot| &self.records[slot])
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records hidden by a later record with the same id.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Distinct ids in ascending order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Current records in stream order, superseded ones skipped.
    pub fn current_records(&self) -> Vec<&EntityRecord<'a>> {
        let mut slots: Vec<usize> = self.entries.iter().map(|(_, slot)| *slot).collect();
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.records[slot]).collect()
    }
}
