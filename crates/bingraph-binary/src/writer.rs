use std::ops::Range;

use bingraph_types::{ObjectId, TypeId};
use tracing::debug;

use crate::error::{BinaryError, BinaryResult};
use crate::header::{
    list_length, EntityHeader, ENTITY_HEADER_LENGTH, LIST_HEADER_LENGTH, OBJECT_ID_LENGTH,
};
use crate::order::ByteOrder;
use crate::primitive::{Primitive, RawWord};
use crate::reader::ChunkReader;

fn to_usize(value: u64) -> BinaryResult<usize> {
    usize::try_from(value).map_err(|_| BinaryError::LengthOverflow(value))
}

/// A finished block of entity records, ready to be handed to a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    bytes: Vec<u8>,
    record_count: usize,
    order: ByteOrder,
}

impl Chunk {
    /// Wrap raw bytes read back from a target.
    ///
    /// The record count is not known until the bytes are iterated.
    pub fn from_bytes(bytes: Vec<u8>, order: ByteOrder) -> Self {
        Self {
            bytes,
            record_count: 0,
            order,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of records written into this chunk.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Iterate and validate the records of this chunk.
    pub fn records(&self) -> ChunkReader<'_> {
        ChunkReader::new(&self.bytes, self.order)
    }
}

/// Appends entity records for one commit.
///
/// Each record starts with [`ChunkWriter::store_entity_header`], which
/// reserves a zeroed payload of the announced length. Field writes address
/// that payload by offset and are rejected if they fall outside it, so a
/// handler that miscomputes its content length fails instead of corrupting
/// the neighbouring record.
#[derive(Debug)]
pub struct ChunkWriter {
    order: ByteOrder,
    buffer: Vec<u8>,
    entity: Option<Range<usize>>,
    record_count: usize,
}

impl ChunkWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self::with_capacity(order, 0)
    }

    pub fn with_capacity(order: ByteOrder, capacity: usize) -> Self {
        Self {
            order,
            buffer: Vec::with_capacity(capacity),
            entity: None,
            record_count: 0,
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Make room for at least `additional` more bytes.
    pub fn ensure_capacity(&mut self, additional: usize) {
        self.buffer.reserve(additional);
    }

    /// Start a new record. `content_length` excludes the header itself.
    pub fn store_entity_header(
        &mut self,
        content_length: u64,
        type_id: TypeId,
        object_id: ObjectId,
    ) -> BinaryResult<()> {
        let header = EntityHeader::new(content_length, type_id, object_id)?;
        let total = to_usize(header.total_length)?;

        let start = self.buffer.len();
        let content_start = start + ENTITY_HEADER_LENGTH as usize;
        let end = start
            .checked_add(total)
            .ok_or(BinaryError::LengthOverflow(header.total_length))?;

        self.buffer.resize(end, 0);
        header.encode(self.order, &mut self.buffer[start..content_start]);
        self.entity = Some(content_start..end);
        self.record_count += 1;
        Ok(())
    }

    fn field(&mut self, offset: u64, length: u64) -> BinaryResult<&mut [u8]> {
        let range = self.entity.clone().ok_or(BinaryError::NoCurrentEntity)?;
        let available = (range.end - range.start) as u64;
        let end = offset.checked_add(length).filter(|end| *end <= available);
        match end {
            Some(end) => {
                let from = range.start + offset as usize;
                let to = range.start + end as usize;
                Ok(&mut self.buffer[from..to])
            }
            None => Err(BinaryError::OutOfBounds {
                offset,
                length,
                available,
            }),
        }
    }

    /// Store a fixed-length value at `offset` within the current payload.
    pub fn store<P: Primitive>(&mut self, offset: u64, value: P) -> BinaryResult<()> {
        let order = self.order;
        let out = self.field(offset, P::TYPE.byte_size())?;
        value.encode(order, out);
        Ok(())
    }

    pub fn store_byte(&mut self, offset: u64, value: i8) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_boolean(&mut self, offset: u64, value: bool) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_short(&mut self, offset: u64, value: i16) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_char(&mut self, offset: u64, value: char) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_int(&mut self, offset: u64, value: i32) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_float(&mut self, offset: u64, value: f32) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_long(&mut self, offset: u64, value: i64) -> BinaryResult<()> {
        self.store(offset, value)
    }

    pub fn store_double(&mut self, offset: u64, value: f64) -> BinaryResult<()> {
        self.store(offset, value)
    }

    /// Store a single reference field.
    pub fn store_object_id(&mut self, offset: u64, id: ObjectId) -> BinaryResult<()> {
        let order = self.order;
        let out = self.field(offset, OBJECT_ID_LENGTH)?;
        id.value().encode_as(order, out);
        Ok(())
    }

    /// Write a list's element count. Returns the offset of its first element.
    pub fn store_list_header(&mut self, offset: u64, count: u64) -> BinaryResult<u64> {
        let order = self.order;
        let out = self.field(offset, LIST_HEADER_LENGTH)?;
        count.encode_as(order, out);
        Ok(offset + LIST_HEADER_LENGTH)
    }

    /// Store a byte list. Returns the offset just past the list.
    pub fn store_bytes(&mut self, offset: u64, bytes: &[u8]) -> BinaryResult<u64> {
        let count = bytes.len() as u64;
        list_length(count, 1)?;
        let first = self.store_list_header(offset, count)?;
        self.field(first, count)?.copy_from_slice(bytes);
        Ok(first + count)
    }

    /// Store a character sequence as a list of its UTF-8 bytes.
    pub fn store_chars(&mut self, offset: u64, chars: &str) -> BinaryResult<u64> {
        self.store_bytes(offset, chars.as_bytes())
    }

    /// Store a list of fixed-length values.
    pub fn store_primitive_list<P: Primitive>(
        &mut self,
        offset: u64,
        values: &[P],
    ) -> BinaryResult<u64> {
        let width = P::TYPE.byte_size();
        let count = values.len() as u64;
        let total = list_length(count, width)?;
        let order = self.order;
        let first = self.store_list_header(offset, count)?;
        let out = self.field(first, total - LIST_HEADER_LENGTH)?;
        for (value, slot) in values.iter().zip(out.chunks_exact_mut(width as usize)) {
            value.encode(order, slot);
        }
        Ok(offset + total)
    }

    /// Store a list of references.
    pub fn store_references(&mut self, offset: u64, ids: &[ObjectId]) -> BinaryResult<u64> {
        let count = ids.len() as u64;
        let total = list_length(count, OBJECT_ID_LENGTH)?;
        let order = self.order;
        let first = self.store_list_header(offset, count)?;
        let out = self.field(first, total - LIST_HEADER_LENGTH)?;
        for (id, slot) in ids.iter().zip(out.chunks_exact_mut(OBJECT_ID_LENGTH as usize)) {
            id.value().encode_as(order, slot);
        }
        Ok(offset + total)
    }

    /// Store a list of key/value reference pairs, 16 bytes per element.
    pub fn store_key_value_references(
        &mut self,
        offset: u64,
        pairs: &[(ObjectId, ObjectId)],
    ) -> BinaryResult<u64> {
        let width = 2 * OBJECT_ID_LENGTH;
        let count = pairs.len() as u64;
        let total = list_length(count, width)?;
        let order = self.order;
        let first = self.store_list_header(offset, count)?;
        let out = self.field(first, total - LIST_HEADER_LENGTH)?;
        for ((key, value), slot) in pairs.iter().zip(out.chunks_exact_mut(width as usize)) {
            key.value().encode_as(order, &mut slot[..8]);
            value.value().encode_as(order, &mut slot[8..]);
        }
        Ok(offset + total)
    }

    /// Copy the payload of another record verbatim into the current one.
    pub fn store_raw(&mut self, offset: u64, bytes: &[u8]) -> BinaryResult<()> {
        self.field(offset, bytes.len() as u64)?.copy_from_slice(bytes);
        Ok(())
    }

    /// Hand out everything written so far and reset for the next commit.
    pub fn finish(&mut self) -> Chunk {
        let chunk = Chunk {
            bytes: std::mem::take(&mut self.buffer),
            record_count: self.record_count,
            order: self.order,
        };
        debug!(
            records = chunk.record_count,
            bytes = chunk.bytes.len(),
            "chunk finished"
        );
        self.entity = None;
        self.record_count = 0;
        chunk
    }

    /// Drop all written records, keeping the allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.entity = None;
        self.record_count = 0;
    }
}
