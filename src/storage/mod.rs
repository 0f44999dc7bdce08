//! Persistent key/value storage
//!
//! Keys are plain `u32` numbers, values are booleans. The firmware keeps a
//! [`MemoryStorage`] in RAM and appends every change to a flash page in the
//! [`record`] format.

pub mod record;

use heapless::LinearMap;

use self::record::Record;
use crate::Error;

/// Maximum number of keys held by [`MemoryStorage`]
pub const CAPACITY: usize = 8;

/// Durable key/value storage
pub trait Storage {
    /// Whether a value was ever written for `key`
    fn exists(&self, key: u32) -> bool;

    /// Stored value of `key`, `None` when absent
    fn read_bool(&self, key: u32) -> Result<Option<bool>, Error>;

    fn write_bool(&mut self, key: u32, value: bool) -> Result<(), Error>;

    fn delete(&mut self, key: u32) -> Result<(), Error>;
}

impl<T> Storage for &mut T
where
    T: Storage + ?Sized,
{
    fn exists(&self, key: u32) -> bool {
        (**self).exists(key)
    }

    fn read_bool(&self, key: u32) -> Result<Option<bool>, Error> {
        (**self).read_bool(key)
    }

    fn write_bool(&mut self, key: u32, value: bool) -> Result<(), Error> {
        (**self).write_bool(key, value)
    }

    fn delete(&mut self, key: u32) -> Result<(), Error> {
        (**self).delete(key)
    }
}

/// Fixed capacity storage in RAM
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    entries: LinearMap<u32, bool, CAPACITY>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub const fn new() -> Self {
        Self {
            entries: LinearMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All stored entries
    pub fn iter(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, *value))
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, key: u32) -> bool {
        self.entries.contains_key(&key)
    }

    fn read_bool(&self, key: u32) -> Result<Option<bool>, Error> {
        Ok(self.entries.get(&key).copied())
    }

    fn write_bool(&mut self, key: u32, value: bool) -> Result<(), Error> {
        self.entries
            .insert(key, value)
            .map(|_| ())
            .map_err(|_| Error::StorageFull)
    }

    fn delete(&mut self, key: u32) -> Result<(), Error> {
        self.entries.remove(&key);
        Ok(())
    }
}

/// Receiver of the records produced by [`WriteBehind`]
pub trait RecordSink {
    /// Hand `record` over without waiting, failing when it cannot be taken
    fn push(&mut self, record: Record) -> Result<(), Error>;
}

/// RAM copy of the stored values that forwards every change to a
/// [`RecordSink`].
///
/// The copy only changes once the sink took the record, so it never holds a
/// value that will not reach durable storage.
#[derive(Debug)]
pub struct WriteBehind<Q> {
    cache: MemoryStorage,
    sink: Q,
}

impl<Q> WriteBehind<Q>
where
    Q: RecordSink,
{
    pub fn new(restored: MemoryStorage, sink: Q) -> Self {
        Self {
            cache: restored,
            sink,
        }
    }

    pub fn sink(&self) -> &Q {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut Q {
        &mut self.sink
    }
}

impl<Q> Storage for WriteBehind<Q>
where
    Q: RecordSink,
{
    fn exists(&self, key: u32) -> bool {
        self.cache.exists(key)
    }

    fn read_bool(&self, key: u32) -> Result<Option<bool>, Error> {
        self.cache.read_bool(key)
    }

    fn write_bool(&mut self, key: u32, value: bool) -> Result<(), Error> {
        // Unchanged values cost no flash wear
        if self.cache.read_bool(key)? == Some(value) {
            return Ok(());
        }
        // A queued record must always fit the cache as well
        if !self.cache.exists(key) && self.cache.len() == CAPACITY {
            return Err(Error::StorageFull);
        }
        self.sink.push(Record::write(key, value))?;
        self.cache.write_bool(key, value)
    }

    fn delete(&mut self, key: u32) -> Result<(), Error> {
        if !self.cache.exists(key) {
            return Ok(());
        }
        self.sink.push(Record::delete(key))?;
        self.cache.delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordQueue;

    #[test]
    fn absent_keys() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists(0));
        assert_eq!(storage.read_bool(0), Ok(None));
    }

    #[test]
    fn overwrite_and_delete() {
        let mut storage = MemoryStorage::new();
        storage.write_bool(1, true).unwrap();
        storage.write_bool(1, false).unwrap();
        assert_eq!(storage.read_bool(1), Ok(Some(false)));
        assert_eq!(storage.len(), 1);

        storage.delete(1).unwrap();
        assert!(!storage.exists(1));
        assert!(storage.is_empty());
    }

    #[test]
    fn full_storage_rejects_new_keys() {
        let mut storage = MemoryStorage::new();
        for key in 0..CAPACITY as u32 {
            storage.write_bool(key, true).unwrap();
        }
        assert_eq!(storage.write_bool(100, true), Err(Error::StorageFull));
        // Existing keys can still be updated
        assert_eq!(storage.write_bool(0, false), Ok(()));
    }

    #[test]
    fn write_behind_queues_changes_only() {
        let mut storage = WriteBehind::new(MemoryStorage::new(), RecordQueue::new(4));
        storage.write_bool(0, false).unwrap();
        storage.write_bool(0, false).unwrap();
        storage.write_bool(0, true).unwrap();
        storage.delete(0).unwrap();
        storage.delete(0).unwrap();
        assert_eq!(
            storage.sink().records,
            [Record::write(0, false), Record::write(0, true), Record::delete(0)]
        );
    }

    #[test]
    fn rejected_record_leaves_cache_untouched() {
        let mut restored = MemoryStorage::new();
        restored.write_bool(0, false).unwrap();
        restored.write_bool(1, true).unwrap();
        let mut storage = WriteBehind::new(restored, RecordQueue::new(0));

        assert_eq!(storage.write_bool(0, true), Err(Error::StorageWrite));
        assert_eq!(storage.read_bool(0), Ok(Some(false)));
        assert_eq!(storage.write_bool(5, true), Err(Error::StorageWrite));
        assert!(!storage.exists(5));
        assert_eq!(storage.delete(1), Err(Error::StorageWrite));
        assert_eq!(storage.read_bool(1), Ok(Some(true)));

        // Retrying once there is room queues the record after all
        storage.sink_mut().capacity = 1;
        storage.write_bool(0, true).unwrap();
        assert_eq!(storage.read_bool(0), Ok(Some(true)));
        assert_eq!(storage.sink().records, [Record::write(0, true)]);
    }

    #[test]
    fn write_behind_checks_capacity_before_queuing() {
        let mut restored = MemoryStorage::new();
        for key in 0..CAPACITY as u32 {
            restored.write_bool(key, false).unwrap();
        }
        let mut storage = WriteBehind::new(restored, RecordQueue::new(4));
        assert_eq!(storage.write_bool(100, true), Err(Error::StorageFull));
        assert!(storage.sink().records.is_empty());
    }
}
