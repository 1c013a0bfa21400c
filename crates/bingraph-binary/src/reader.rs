use crate::error::{BinaryError, BinaryResult};
use crate::header::{EntityHeader, ENTITY_HEADER_LENGTH};
use crate::order::ByteOrder;
use crate::record::EntityRecord;

/// Iterates the entity records of a byte block in stream order.
///
/// Each record's header is validated before it is yielded. After the first
/// error the iterator is exhausted: framing past a corrupt length cannot be
/// trusted.
#[derive(Clone, Debug)]
pub struct ChunkReader<'a> {
    bytes: &'a [u8],
    position: usize,
    order: ByteOrder,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(bytes: &'a [u8], order: ByteOrder) -> Self {
        Self {
            bytes,
            position: 0,
            order,
            failed: false,
        }
    }

    /// Collect every record, failing on the first invalid one.
    pub fn read_all(bytes: &'a [u8], order: ByteOrder) -> BinaryResult<Vec<EntityRecord<'a>>> {
        Self::new(bytes, order).collect()
    }

    fn next_record(&mut self) -> BinaryResult<EntityRecord<'a>> {
        let offset = self.position as u64;
        let rest = &self.bytes[self.position..];
        let header = EntityHeader::decode(self.order, rest, offset)?;

        if header.total_length > rest.len() as u64 {
            return Err(BinaryError::TruncatedRecord {
                offset,
                reason: format!(
                    "record announces {} bytes, {} left",
                    header.total_length,
                    rest.len()
                ),
            });
        }

        let total = header.total_length as usize;
        let content = &rest[ENTITY_HEADER_LENGTH as usize..total];
        let record = EntityRecord::new(offset, header, content, self.order)?;
        self.position += total;
        Ok(record)
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = BinaryResult<EntityRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.bytes.len() {
            return None;
        }
        let result = self.next_record();
        self.failed = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use bingraph_types::{ObjectId, TypeId};

    use super::*;
    use crate::writer::ChunkWriter;

    fn two_records(order: ByteOrder) -> Vec<u8> {
        let mut w = ChunkWriter::new(order);
        w.store_entity_header(4, TypeId::native(10), ObjectId::new(1))
            .unwrap();
        w.store_int(0, 11).unwrap();
        w.store_entity_header(8, TypeId::native(11), ObjectId::new(2))
            .unwrap();
        w.store_long(0, 22).unwrap();
        w.finish().into_bytes()
    }

    #[test]
    fn yields_records_in_order() {
        let bytes = two_records(ByteOrder::NATIVE);
        let records = ChunkReader::read_all(&bytes, ByteOrder::NATIVE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].object_id(), ObjectId::new(1));
        assert_eq!(records[0].read_int(0).unwrap(), 11);
        assert_eq!(records[1].position(), 28);
        assert_eq!(records[1].read_long(0).unwrap(), 22);
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(ChunkReader::read_all(&[], ByteOrder::NATIVE)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn truncated_tail_is_reported_once() {
        let bytes = two_records(ByteOrder::NATIVE);
        let cut = &bytes[..bytes.len() - 3];
        let mut reader = ChunkReader::new(cut, ByteOrder::NATIVE);
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(
            reader.next().unwrap(),
            Err(BinaryError::TruncatedRecord { offset: 28, .. })
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn wrong_byte_order_is_detected() {
        let bytes = two_records(ByteOrder::BigEndian);
        assert!(ChunkReader::read_all(&bytes, ByteOrder::LittleEndian).is_err());
        assert_eq!(
            ChunkReader::read_all(&bytes, ByteOrder::BigEndian)
                .unwrap()
                .len(),
            2
        );
    }
}
