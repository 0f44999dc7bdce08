//! Append-only record log for a single flash page
//!
//! Every write appends one 8 byte record:
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 0..4  | key, little endian                        |
//! | 4     | value: 0 = false, 1 = true, 2 = deleted   |
//! | 5     | bitwise inverse of the value byte         |
//! | 6..8  | marker `b"WF"`                            |
//!
//! Erased flash reads as `0xFF`, so the first all-`0xFF` slot ends the log.
//! When the page is full it is erased and the current state is written back
//! with [`compact`].

use super::{MemoryStorage, Storage};
use crate::Error;

pub const RECORD_LEN: usize = 8;
/// Erase unit of the nRF52832 internal flash
pub const PAGE_SIZE: usize = 4096;

const MARKER: [u8; 2] = *b"WF";
const ERASED: u8 = 0xFF;

const VALUE_FALSE: u8 = 0;
const VALUE_TRUE: u8 = 1;
const VALUE_DELETED: u8 = 2;

/// One change to the key/value state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub key: u32,
    /// New value, `None` when the key was deleted
    pub value: Option<bool>,
}

/// Content of one record slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Erased,
    Valid(Record),
    Corrupt,
}

impl Record {
    pub const fn write(key: u32, value: bool) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub const fn delete(key: u32) -> Self {
        Self { key, value: None }
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let value = match self.value {
            Some(false) => VALUE_FALSE,
            Some(true) => VALUE_TRUE,
            None => VALUE_DELETED,
        };
        let key = self.key.to_le_bytes();
        [
            key[0], key[1], key[2], key[3], value, !value, MARKER[0], MARKER[1],
        ]
    }

    pub fn decode(bytes: &[u8; RECORD_LEN]) -> Slot {
        if bytes.iter().all(|b| *b == ERASED) {
            return Slot::Erased;
        }
        if bytes[6..8] != MARKER || bytes[4] != !bytes[5] {
            return Slot::Corrupt;
        }
        let value = match bytes[4] {
            VALUE_FALSE => Some(false),
            VALUE_TRUE => Some(true),
            VALUE_DELETED => None,
            _ => return Slot::Corrupt,
        };
        let key = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Slot::Valid(Self { key, value })
    }

    /// Apply the change to `storage`
    pub fn apply<S: Storage>(&self, storage: &mut S) -> Result<(), Error> {
        match self.value {
            Some(value) => storage.write_bool(self.key, value),
            None => storage.delete(self.key),
        }
    }
}

/// Rebuilds the key/value state from a page read in chunks.
#[derive(Debug, Default)]
pub struct Replay {
    storage: MemoryStorage,
    used: usize,
    done: bool,
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next bytes of the page.
    ///
    /// `chunk` must hold whole records. Returns `false` once the end of the
    /// log was reached and no more input is needed.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        for slot in chunk.chunks_exact(RECORD_LEN) {
            if self.done {
                break;
            }
            let mut bytes = [0; RECORD_LEN];
            bytes.copy_from_slice(slot);
            match Record::decode(&bytes) {
                Slot::Erased => self.done = true,
                Slot::Valid(record) => {
                    if record.apply(&mut self.storage).is_err() {
                        warn!("Dropping record for key {}: storage full", record.key);
                    }
                    self.used += RECORD_LEN;
                }
                Slot::Corrupt => {
                    warn!("Skipping corrupt record at offset {}", self.used);
                    self.used += RECORD_LEN;
                }
            }
        }
        !self.done
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Restored state and the number of bytes already used on the page
    pub fn finish(self) -> (MemoryStorage, usize) {
        (self.storage, self.used)
    }
}

/// Records that recreate `storage` on a freshly erased page
pub fn compact(storage: &MemoryStorage) -> impl Iterator<Item = [u8; RECORD_LEN]> + '_ {
    storage
        .iter()
        .map(|(key, value)| Record::write(key, value).encode())
}

/// Offset of the next record, `None` when the page is full
pub fn next_offset(used: usize, page_size: usize) -> Option<usize> {
    (used + RECORD_LEN <= page_size).then_some(used)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(records: &[Record]) -> Vec<u8> {
        let mut page = vec![ERASED; 64];
        for (i, record) in records.iter().enumerate() {
            page[i * RECORD_LEN..(i + 1) * RECORD_LEN].copy_from_slice(&record.encode());
        }
        page
    }

    #[test]
    fn erased_slot() {
        assert_eq!(Record::decode(&[ERASED; RECORD_LEN]), Slot::Erased);
    }

    #[test]
    fn records_decode_to_themselves() {
        for record in [Record::write(0, false), Record::write(1, true), Record::delete(7)] {
            assert_eq!(Record::decode(&record.encode()), Slot::Valid(record));
        }
    }

    #[test]
    fn damaged_records_are_corrupt() {
        let mut bytes = Record::write(1, true).encode();
        bytes[5] = 0;
        assert_eq!(Record::decode(&bytes), Slot::Corrupt);

        let mut bytes = Record::write(1, true).encode();
        bytes[7] = b'X';
        assert_eq!(Record::decode(&bytes), Slot::Corrupt);
    }

    #[test]
    fn replay_keeps_latest_value() {
        let page = page(&[
            Record::write(0, true),
            Record::write(1, true),
            Record::write(0, false),
            Record::delete(1),
        ]);
        let mut replay = Replay::new();
        assert!(!replay.feed(&page));
        let (storage, used) = replay.finish();
        assert_eq!(used, 4 * RECORD_LEN);
        assert_eq!(storage.read_bool(0), Ok(Some(false)));
        assert!(!storage.exists(1));
    }

    #[test]
    fn replay_in_chunks_skips_corrupt_slots() {
        let mut page = page(&[Record::write(0, true), Record::write(1, true)]);
        page[4] = 0x55;

        let mut replay = Replay::new();
        assert!(replay.feed(&page[..RECORD_LEN]));
        assert!(!replay.is_done());
        assert!(!replay.feed(&page[RECORD_LEN..]));
        assert!(replay.is_done());

        let (storage, used) = replay.finish();
        assert_eq!(used, 2 * RECORD_LEN);
        assert!(!storage.exists(0));
        assert_eq!(storage.read_bool(1), Ok(Some(true)));
    }

    #[test]
    fn compacted_page_restores_state() {
        let mut storage = MemoryStorage::new();
        storage.write_bool(0, true).unwrap();
        storage.write_bool(1, false).unwrap();

        let page: Vec<u8> = compact(&storage).flatten().collect();
        let mut replay = Replay::new();
        replay.feed(&page);
        let (restored, used) = replay.finish();
        assert_eq!(used, 2 * RECORD_LEN);
        assert_eq!(restored.read_bool(0), Ok(Some(true)));
        assert_eq!(restored.read_bool(1), Ok(Some(false)));
    }

    #[test]
    fn page_fills_up() {
        assert_eq!(next_offset(0, PAGE_SIZE), Some(0));
        assert_eq!(next_offset(PAGE_SIZE - RECORD_LEN, PAGE_SIZE), Some(PAGE_SIZE - RECORD_LEN));
        assert_eq!(next_offset(PAGE_SIZE, PAGE_SIZE), None);
    }
}
