use std::io::SeekFrom;

use indexmap::IndexMap;

use crate::{
    cursor::BinCursor,
    error::{DecodeError, DecodeResult},
};

pub const STREAM_DESCRIPTOR_FIELDS: usize = 32;

/// A raw fixed-stride record array registered by a stream section.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    descriptor: [i32; STREAM_DESCRIPTOR_FIELDS],
    data_offset: u64,
}

impl StreamEntry {
    /// Reads the descriptor at the cursor. The record data starts right after it.
    pub fn from_cursor(cur: &mut BinCursor) -> DecodeResult<StreamEntry> {
        let descriptor = cur.i32_array::<STREAM_DESCRIPTOR_FIELDS>()?;

        Ok(StreamEntry {
            descriptor,
            data_offset: cur.tell(),
        })
    }

    pub fn descriptor(&self) -> &[i32; STREAM_DESCRIPTOR_FIELDS] {
        &self.descriptor
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Byte distance between consecutive records.
    pub fn stride(&self) -> i32 {
        self.descriptor[3]
    }

    pub fn record_count(&self) -> i32 {
        self.descriptor[4]
    }

    fn layout_error(&self) -> DecodeError {
        DecodeError::UnsupportedVertexLayout {
            stride: self.stride(),
            count: self.record_count(),
        }
    }

    fn checked_count(&self) -> DecodeResult<usize> {
        usize::try_from(self.record_count()).map_err(|_| self.layout_error())
    }

    /// Reads the stream as a packed array of u16 indices, ignoring the stride.
    pub fn read_indices(&self, bytes: &[u8]) -> DecodeResult<Vec<u16>> {
        let count = self.checked_count()?;
        let mut cur = BinCursor::at(bytes, self.data_offset)?;
        cur.u16s(count)
    }

    /// Runs `read` once per record, with the cursor placed at the start of the record.
    ///
    /// `record_len` is how many bytes `read` consumes; the whole extent is checked before
    /// anything is decoded. Records closer together than `record_len` would overlap, so
    /// such a stride is rejected as an unsupported layout.
    pub fn read_records<T>(
        &self,
        bytes: &[u8],
        record_len: usize,
        mut read: impl FnMut(&mut BinCursor) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let count = self.checked_count()?;
        let stride = u64::try_from(self.stride()).map_err(|_| self.layout_error())?;

        if count == 0 {
            return Ok(Vec::new());
        }

        if count > 1 && stride < record_len as u64 {
            return Err(self.layout_error());
        }

        let last = self.data_offset + (count as u64 - 1) * stride;
        if last + record_len as u64 > bytes.len() as u64 {
            return Err(DecodeError::Truncated {
                offset: last,
                wanted: record_len as u64,
                size: bytes.len() as u64,
            });
        }

        let mut cur = BinCursor::new(bytes);
        // The extent check above bounds `count` by the buffer length.
        let mut records = Vec::with_capacity(count);

        for n in 0..count as u64 {
            cur.seek(SeekFrom::Start(self.data_offset + n * stride))?;
            records.push(read(&mut cur)?);
        }

        Ok(records)
    }
}

/// Stream descriptors keyed by the ID of the section that declared them.
#[derive(Debug, Default)]
pub struct StreamTable {
    streams: IndexMap<i32, StreamEntry>,
}

impl StreamTable {
    /// Registers a stream. A second stream under the same ID is rejected and the first one
    /// stays in place.
    pub fn insert(&mut self, id: i32, entry: StreamEntry) -> DecodeResult<()> {
        if self.streams.contains_key(&id) {
            return Err(DecodeError::DuplicateStreamId(id));
        }

        self.streams.insert(id, entry);

        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&StreamEntry> {
        self.streams.get(&id)
    }

    pub fn resolve(&self, id: i32) -> DecodeResult<&StreamEntry> {
        self.get(id)
            .ok_or(DecodeError::UnresolvedStreamReference(id))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_bytes(stride: i32, count: i32, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..STREAM_DESCRIPTOR_FIELDS as i32 {
            let value = match i {
                3 => stride,
                4 => count,
                _ => 0,
            };
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn entry_remembers_data_offset() {
        let bytes = stream_bytes(2, 3, &[1, 0, 2, 0, 3, 0]);
        let mut cur = BinCursor::new(&bytes);

        let entry = StreamEntry::from_cursor(&mut cur).unwrap();

        assert_eq!(entry.stride(), 2);
        assert_eq!(entry.record_count(), 3);
        assert_eq!(entry.data_offset(), 128);
        assert_eq!(entry.read_indices(&bytes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn records_are_read_at_stride_steps() {
        // Two interleaved records of 6 bytes, only the first 2 of each are wanted.
        let data = [7, 0, 0xFF, 0xFF, 0xFF, 0xFF, 9, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        let bytes = stream_bytes(6, 2, &data);
        let mut cur = BinCursor::new(&bytes);
        let entry = StreamEntry::from_cursor(&mut cur).unwrap();

        let values = entry.read_records(&bytes, 2, |cur| cur.u16()).unwrap();

        assert_eq!(values, vec![7, 9]);
    }

    #[test]
    fn records_past_the_buffer_are_truncated() {
        let bytes = stream_bytes(12, 2, &[0; 12]);
        let mut cur = BinCursor::new(&bytes);
        let entry = StreamEntry::from_cursor(&mut cur).unwrap();

        assert!(matches!(
            entry.read_records(&bytes, 12, |cur| cur.f32s::<3>()),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn negative_count_is_rejected() {
        let bytes = stream_bytes(2, -1, &[]);
        let mut cur = BinCursor::new(&bytes);
        let entry = StreamEntry::from_cursor(&mut cur).unwrap();

        assert!(matches!(
            entry.read_indices(&bytes),
            Err(DecodeError::UnsupportedVertexLayout { count: -1, .. })
        ));
        assert!(matches!(
            entry.read_records(&bytes, 2, |cur| cur.u16()),
            Err(DecodeError::UnsupportedVertexLayout { .. })
        ));
    }

    #[test]
    fn overlapping_records_are_rejected_before_allocating() {
        let bytes = stream_bytes(0, i32::MAX, &[0; 4]);
        let mut cur = BinCursor::new(&bytes);
        let entry = StreamEntry::from_cursor(&mut cur).unwrap();

        assert!(matches!(
            entry.read_records(&bytes, 4, |cur| cur.halfs::<2>()),
            Err(DecodeError::UnsupportedVertexLayout {
                stride: 0,
                count: i32::MAX
            })
        ));

        let bytes = stream_bytes(2, 3, &[0; 12]);
        let entry = StreamEntry::from_cursor(&mut BinCursor::new(&bytes)).unwrap();

        assert!(matches!(
            entry.read_records(&bytes, 4, |cur| cur.halfs::<2>()),
            Err(DecodeError::UnsupportedVertexLayout { stride: 2, .. })
        ));
    }

    #[test]
    fn single_record_ignores_stride() {
        let bytes = stream_bytes(0, 1, &[5, 0]);
        let entry = StreamEntry::from_cursor(&mut BinCursor::new(&bytes)).unwrap();

        assert_eq!(entry.read_records(&bytes, 2, |cur| cur.u16()).unwrap(), vec![5]);
    }

    #[test]
    fn duplicate_id_keeps_first() {
        let first = stream_bytes(2, 1, &[1, 0]);
        let second = stream_bytes(4, 9, &[]);

        let mut table = StreamTable::default();
        table
            .insert(5, StreamEntry::from_cursor(&mut BinCursor::new(&first)).unwrap())
            .unwrap();

        let result = table.insert(
            5,
            StreamEntry::from_cursor(&mut BinCursor::new(&second)).unwrap(),
        );

        assert!(matches!(result, Err(DecodeError::DuplicateStreamId(5))));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(5).unwrap().stride(), 2);
        assert!(matches!(
            table.resolve(6),
            Err(DecodeError::UnresolvedStreamReference(6))
        ));
    }
}
