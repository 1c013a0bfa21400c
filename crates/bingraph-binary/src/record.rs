use bingraph_types::{ObjectId, TypeId};

use crate::error::{BinaryError, BinaryResult};
use crate::header::{list_length, EntityHeader, LIST_HEADER_LENGTH, OBJECT_ID_LENGTH};
use crate::order::ByteOrder;
use crate::primitive::{Primitive, RawWord};

/// Bounds-checked, typed view of one entity record.
///
/// Offsets are relative to the payload start. Every read checks the
/// payload bounds first, so a truncated or corrupt record surfaces as an
/// error before any instance state is touched.
#[derive(Clone, Copy, Debug)]
pub struct EntityRecord<'a> {
    position: u64,
    header: EntityHeader,
    content: &'a [u8],
    order: ByteOrder,
}

impl<'a> EntityRecord<'a> {
    /// View a record whose header has already been decoded.
    ///
    /// `content` must be exactly the announced payload.
    pub fn new(
        position: u64,
        header: EntityHeader,
        content: &'a [u8],
        order: ByteOrder,
    ) -> BinaryResult<Self> {
        if content.len() as u64 != header.content_length() {
            return Err(BinaryError::TruncatedRecord {
                offset: position,
                reason: format!(
                    "header announces {} payload bytes, {} present",
                    header.content_length(),
                    content.len()
                ),
            });
        }
        Ok(Self {
            position,
            header,
            content,
            order,
        })
    }

    /// Byte position of the record within its chunk.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn header(&self) -> EntityHeader {
        self.header
    }

    pub fn type_id(&self) -> TypeId {
        self.header.type_id
    }

    pub fn object_id(&self) -> ObjectId {
        self.header.object_id
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// The raw payload bytes.
    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    pub fn content_length(&self) -> u64 {
        self.content.len() as u64
    }

    fn slice(&self, offset: u64, length: u64) -> BinaryResult<&'a [u8]> {
        let available = self.content_length();
        match offset.checked_add(length).filter(|end| *end <= available) {
            Some(end) => Ok(&self.content[offset as usize..end as usize]),
            None => Err(BinaryError::OutOfBounds {
                offset,
                length,
                available,
            }),
        }
    }

    /// Read a fixed-length value at `offset`.
    pub fn read<P: Primitive>(&self, offset: u64) -> BinaryResult<P> {
        P::decode(self.order, self.slice(offset, P::TYPE.byte_size())?)
    }

    pub fn read_byte(&self, offset: u64) -> BinaryResult<i8> {
        self.read(offset)
    }

    pub fn read_boolean(&self, offset: u64) -> BinaryResult<bool> {
        self.read(offset)
    }

    pub fn read_short(&self, offset: u64) -> BinaryResult<i16> {
        self.read(offset)
    }

    pub fn read_char(&self, offset: u64) -> BinaryResult<char> {
        self.read(offset)
    }

    pub fn read_int(&self, offset: u64) -> BinaryResult<i32> {
        self.read(offset)
    }

    pub fn read_float(&self, offset: u64) -> BinaryResult<f32> {
        self.read(offset)
    }

    pub fn read_long(&self, offset: u64) -> BinaryResult<i64> {
        self.read(offset)
    }

    pub fn read_double(&self, offset: u64) -> BinaryResult<f64> {
        self.read(offset)
    }

    pub fn read_object_id(&self, offset: u64) -> BinaryResult<ObjectId> {
        let raw = u64::decode_from(self.order, self.slice(offset, OBJECT_ID_LENGTH)?)?;
        Ok(ObjectId::new(raw))
    }

    /// Element count of the list at `offset`.
    pub fn list_element_count(&self, offset: u64) -> BinaryResult<u64> {
        u64::decode_from(self.order, self.slice(offset, LIST_HEADER_LENGTH)?)
    }

    /// Total persisted length of the list at `offset` with elements of
    /// `width` bytes, checked against the payload.
    pub fn list_length(&self, offset: u64, width: u64) -> BinaryResult<u64> {
        let count = self.list_element_count(offset)?;
        let total = list_length(count, width).map_err(|_| BinaryError::InvalidList {
            offset,
            reason: format!("{count} elements of {width} bytes overflow"),
        })?;
        self.slice(offset, total)?;
        Ok(total)
    }

    fn list_body(&self, offset: u64, width: u64) -> BinaryResult<(u64, &'a [u8])> {
        let total = self.list_length(offset, width)?;
        let body = self.slice(offset + LIST_HEADER_LENGTH, total - LIST_HEADER_LENGTH)?;
        Ok((total, body))
    }

    /// The bytes of the byte list at `offset`.
    pub fn read_bytes(&self, offset: u64) -> BinaryResult<&'a [u8]> {
        Ok(self.list_body(offset, 1)?.1)
    }

    /// The character list at `offset` as a string slice.
    pub fn read_chars(&self, offset: u64) -> BinaryResult<&'a str> {
        let bytes = self.read_bytes(offset)?;
        std::str::from_utf8(bytes).map_err(|_| BinaryError::InvalidUtf8 { offset })
    }

    /// Decode the list of fixed-length values at `offset`.
    pub fn read_primitive_list<P: Primitive>(&self, offset: u64) -> BinaryResult<Vec<P>> {
        let width = P::TYPE.byte_size();
        let (_, body) = self.list_body(offset, width)?;
        body.chunks_exact(width as usize)
            .map(|slot| P::decode(self.order, slot))
            .collect()
    }

    /// Decode the reference list at `offset`.
    pub fn read_references(&self, offset: u64) -> BinaryResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        self.iterate_references(offset, &mut |id| ids.push(id))?;
        Ok(ids)
    }

    /// Visit every id of the reference list at `offset`. Returns the list's
    /// total persisted length.
    pub fn iterate_references(
        &self,
        offset: u64,
        visit: &mut dyn FnMut(ObjectId),
    ) -> BinaryResult<u64> {
        let (total, body) = self.list_body(offset, OBJECT_ID_LENGTH)?;
        for slot in body.chunks_exact(OBJECT_ID_LENGTH as usize) {
            visit(ObjectId::new(u64::decode_from(self.order, slot)?));
        }
        Ok(total)
    }

    /// Decode the key/value reference list at `offset`.
    pub fn read_key_value_references(
        &self,
        offset: u64,
    ) -> BinaryResult<Vec<(ObjectId, ObjectId)>> {
        let width = 2 * OBJECT_ID_LENGTH;
        let (_, body) = self.list_body(offset, width)?;
        body.chunks_exact(width as usize)
            .map(|slot| {
                let key = u64::decode_from(self.order, &slot[..8])?;
                let value = u64::decode_from(self.order, &slot[8..])?;
                Ok((ObjectId::new(key), ObjectId::new(value)))
            })
            .collect()
    }

    /// Raw bytes of a fixed-length field, for verbatim copies.
    pub fn read_raw(&self, offset: u64, length: u64) -> BinaryResult<&'a [u8]> {
        self.slice(offset, length)
    }
}
