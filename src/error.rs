//! Error type shared by the watchface modules

/// Watchface errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A font or bitmap could not be loaded
    ResourceLoad,
    /// The settings channel could not be opened
    ChannelOpen,
    /// A message could not be sent over the settings channel
    ChannelSend,
    /// Reading from persistent storage failed
    StorageRead,
    /// Writing to persistent storage failed
    StorageWrite,
    /// Persistent storage has no room for another key
    StorageFull,
    /// A settings message did not follow the dictionary format
    Malformed,
    /// An output buffer was too small for the encoded data
    BufferTooSmall,
    /// An ADC sample was outside of the 12 bit range
    InvalidMeasurement,
}
