use bingraph_types::{ObjectId, TypeId};

use crate::error::{BinaryError, BinaryResult};
use crate::order::ByteOrder;
use crate::primitive::RawWord;

/// Length of the `[totalLength][typeId][objectId]` record prefix.
pub const ENTITY_HEADER_LENGTH: u64 = 24;

/// Width of a persisted object reference.
pub const OBJECT_ID_LENGTH: u64 = 8;

/// Width of the element count preceding every list.
pub const LIST_HEADER_LENGTH: u64 = 8;

/// Largest total length a list may have.
pub const LIST_MAXIMUM_LENGTH: u64 = i64::MAX as u64;

/// Total persisted length of a list of `count` elements of `width` bytes.
pub fn list_length(count: u64, width: u64) -> BinaryResult<u64> {
    count
        .checked_mul(width)
        .and_then(|body| body.checked_add(LIST_HEADER_LENGTH))
        .filter(|total| *total <= LIST_MAXIMUM_LENGTH)
        .ok_or(BinaryError::LengthOverflow(count))
}

/// The fixed prefix of every entity record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHeader {
    /// Record length including these 24 bytes.
    pub total_length: u64,
    pub type_id: TypeId,
    pub object_id: ObjectId,
}

impl EntityHeader {
    /// Header for a record with `content_length` payload bytes.
    pub fn new(content_length: u64, type_id: TypeId, object_id: ObjectId) -> BinaryResult<Self> {
        let total_length = content_length
            .checked_add(ENTITY_HEADER_LENGTH)
            .ok_or(BinaryError::LengthOverflow(content_length))?;
        Ok(Self {
            total_length,
            type_id,
            object_id,
        })
    }

    /// Payload length, excluding the header.
    pub fn content_length(&self) -> u64 {
        self.total_length - ENTITY_HEADER_LENGTH
    }

    /// Write the 24 header bytes into `out`.
    pub fn encode(&self, order: ByteOrder, out: &mut [u8]) {
        self.total_length.encode_as(order, &mut out[0..8]);
        self.type_id.value().encode_as(order, &mut out[8..16]);
        self.object_id.value().encode_as(order, &mut out[16..24]);
    }

    /// Read a header from the start of `bytes`. `offset` is the position of
    /// `bytes` within the enclosing chunk and only feeds error messages.
    pub fn decode(order: ByteOrder, bytes: &[u8], offset: u64) -> BinaryResult<Self> {
        if (bytes.len() as u64) < ENTITY_HEADER_LENGTH {
            return Err(BinaryError::TruncatedRecord {
                offset,
                reason: format!(
                    "{} bytes left, header needs {ENTITY_HEADER_LENGTH}",
                    bytes.len()
                ),
            });
        }

        let total_length = u64::decode_from(order, &bytes[0..8])?;
        if total_length < ENTITY_HEADER_LENGTH {
            return Err(BinaryError::InvalidHeader {
                offset,
                reason: format!("total length {total_length} is shorter than the header"),
            });
        }

        let raw_type = u64::decode_from(order, &bytes[8..16])?;
        let type_id = TypeId::new(raw_type).map_err(|_| BinaryError::InvalidHeader {
            offset,
            reason: "type id 0 is reserved".into(),
        })?;
        let object_id = ObjectId::new(u64::decode_from(order, &bytes[16..24])?);

        Ok(Self {
            total_length,
            type_id,
            object_id,
        })
    }
}
