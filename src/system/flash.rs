//! Settings persistence in the internal flash
//!
//! The last flash page holds an append-only log of setting records. The
//! watchface works on a RAM copy; changes are queued here and written by a
//! background task.

use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel};
use embedded_storage_async::nor_flash::{NorFlash, ReadNorFlash};
use nrf_softdevice::Flash;
use pinetime_watchface::{
    storage::record::{self, Record, Replay, PAGE_SIZE, RECORD_LEN},
    Error, MemoryStorage, RecordSink, WriteBehind,
};

/// Start of the settings page, excluded from the application in `memory.x`
const SETTINGS_PAGE: u32 = 0x7F000;
/// Bytes read per step while replaying the log
const READ_CHUNK: usize = 64;

/// Records waiting to be written
static PERSIST: Channel<ThreadModeRawMutex, Record, 4> = Channel::new();

/// The SoftDevice only accepts word aligned source buffers
#[repr(align(4))]
struct Aligned([u8; RECORD_LEN]);

/// Writer side of the settings log
pub struct SettingsLog {
    flash: Flash,
    /// State the log currently describes
    mirror: MemoryStorage,
    /// Bytes in use on the page
    used: usize,
}

impl SettingsLog {
    /// Replay the settings page, returning the log and the restored settings
    pub async fn load(mut flash: Flash) -> (Self, MemoryStorage) {
        let mut replay = Replay::new();
        let mut buf = [0u8; READ_CHUNK];
        for offset in (0..PAGE_SIZE).step_by(READ_CHUNK) {
            if let Err(e) = flash.read(SETTINGS_PAGE + offset as u32, &mut buf).await {
                defmt::error!("Reading settings failed: {:?}", e);
                break;
            }
            if !replay.feed(&buf) {
                break;
            }
        }

        let (restored, used) = replay.finish();
        defmt::info!("Restored {} settings, {} bytes of log", restored.len(), used);
        let log = Self {
            flash,
            mirror: restored.clone(),
            used,
        };
        (log, restored)
    }

    /// Append one record, compacting the page once it is full.
    ///
    /// `mirror` follows the RAM copy of the watchface even when programming
    /// fails; the page is then rewritten from it with the next record.
    pub async fn append(&mut self, record: Record) -> Result<(), Error> {
        record.apply(&mut self.mirror)?;
        match record::next_offset(self.used, PAGE_SIZE) {
            Some(offset) => {
                // A failed write may leave the slot half programmed, never reuse it
                self.used += RECORD_LEN;
                if let Err(e) = write_record(&mut self.flash, offset, record.encode()).await {
                    self.used = PAGE_SIZE;
                    return Err(e);
                }
                Ok(())
            }
            None => self.compact().await,
        }
    }

    /// Erase the page and write the current state back
    async fn compact(&mut self) -> Result<(), Error> {
        defmt::info!("Compacting settings log");
        self.flash
            .erase(SETTINGS_PAGE, SETTINGS_PAGE + PAGE_SIZE as u32)
            .await
            .map_err(|_| Error::StorageWrite)?;
        self.used = 0;
        for bytes in record::compact(&self.mirror) {
            let offset = self.used;
            self.used += RECORD_LEN;
            if let Err(e) = write_record(&mut self.flash, offset, bytes).await {
                // Compact again with the next record
                self.used = PAGE_SIZE;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Write queued records until the end of time
    pub async fn run(&mut self) -> ! {
        loop {
            let record = PERSIST.receive().await;
            if let Err(e) = self.append(record).await {
                defmt::error!("Persisting {} failed: {}", record, e);
            }
        }
    }
}

async fn write_record(flash: &mut Flash, offset: usize, bytes: [u8; RECORD_LEN]) -> Result<(), Error> {
    let buf = Aligned(bytes);
    flash
        .write(SETTINGS_PAGE + offset as u32, &buf.0)
        .await
        .map_err(|_| Error::StorageWrite)
}

/// Hands records to the persistence task
pub struct PersistQueue;

impl RecordSink for PersistQueue {
    fn push(&mut self, record: Record) -> Result<(), Error> {
        PERSIST.try_send(record).map_err(|_| Error::StorageWrite)
    }
}

/// Storage handed to the watchface: RAM copy plus write-behind to flash
pub type FlashStorage = WriteBehind<PersistQueue>;
