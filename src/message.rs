//! Settings channel and its dictionary message format
//!
//! A message is a small dictionary:
//!
//! ```text
//! count: u8
//! count × { key: u32 LE, type: u8, length: u16 LE, value: [u8; length] }
//! ```
//!
//! Types are 0 = byte array, 1 = C string (NUL terminated UTF-8),
//! 2 = unsigned and 3 = signed integer of 1, 2 or 4 bytes, little endian.

use heapless::Vec;

use crate::{
    settings::{DisplaySettings, SettingKey, Visibility},
    Error,
};

/// Largest message accepted or sent over the settings channel
pub const MAX_MESSAGE_LEN: usize = 64;

/// Owned message bytes
pub type Payload = Vec<u8, MAX_MESSAGE_LEN>;

const HEADER_LEN: usize = 7;

/// Bidirectional link to the companion configuration app
pub trait SettingsChannel {
    /// Start accepting messages with the given buffer sizes
    fn open(&mut self, inbox_size: usize, outbox_size: usize) -> Result<(), Error>;

    /// Send an encoded dictionary to the companion app
    fn send(&mut self, payload: &[u8]) -> Result<(), Error>;

    fn close(&mut self);
}

/// Why an inbound message never reached the watchface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    /// The event queue was full
    InboxFull,
    /// The payload is not a valid dictionary
    Malformed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TupleType {
    ByteArray = 0,
    CString = 1,
    Uint = 2,
    Int = 3,
}

impl TryFrom<u8> for TupleType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::ByteArray),
            1 => Ok(Self::CString),
            2 => Ok(Self::Uint),
            3 => Ok(Self::Int),
            _ => Err(Error::Malformed),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value<'a> {
    Bytes(&'a [u8]),
    CString(&'a str),
    Uint(u32),
    Int(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tuple<'a> {
    pub key: u32,
    pub value: Value<'a>,
}

/// Decode one tuple from the front of `bytes`
fn decode_tuple(bytes: &[u8]) -> Result<(Tuple<'_>, &[u8]), Error> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Malformed);
    }
    let key = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let kind = TupleType::try_from(bytes[4])?;
    let length = u16::from_le_bytes([bytes[5], bytes[6]]) as usize;
    let rest = &bytes[HEADER_LEN..];
    if rest.len() < length {
        return Err(Error::Malformed);
    }
    let (data, rest) = rest.split_at(length);

    let value = match kind {
        TupleType::ByteArray => Value::Bytes(data),
        TupleType::CString => {
            let text = match data.iter().position(|b| *b == 0) {
                Some(end) => &data[..end],
                None => data,
            };
            Value::CString(core::str::from_utf8(text).map_err(|_| Error::Malformed)?)
        }
        TupleType::Uint => Value::Uint(match *data {
            [a] => a as u32,
            [a, b] => u16::from_le_bytes([a, b]) as u32,
            [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
            _ => return Err(Error::Malformed),
        }),
        TupleType::Int => Value::Int(match *data {
            [a] => a as i8 as i32,
            [a, b] => i16::from_le_bytes([a, b]) as i32,
            [a, b, c, d] => i32::from_le_bytes([a, b, c, d]),
            _ => return Err(Error::Malformed),
        }),
    };

    Ok((Tuple { key, value }, rest))
}

/// Validated view of an encoded dictionary
#[derive(Clone, Copy, Debug)]
pub struct Dictionary<'a> {
    count: u8,
    body: &'a [u8],
}

impl<'a> Dictionary<'a> {
    /// Check the framing of every tuple. Trailing bytes are rejected.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        let (&count, body) = bytes.split_first().ok_or(Error::Malformed)?;
        let mut rest = body;
        for _ in 0..count {
            rest = decode_tuple(rest)?.1;
        }
        if !rest.is_empty() {
            return Err(Error::Malformed);
        }
        Ok(Self { count, body })
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> Tuples<'a> {
        Tuples {
            rest: self.body,
            remaining: self.count,
        }
    }

    /// First tuple with `key`
    pub fn find(&self, key: u32) -> Option<Tuple<'a>> {
        self.iter().find(|tuple| tuple.key == key)
    }
}

/// Iterator over the tuples of a [`Dictionary`]
pub struct Tuples<'a> {
    rest: &'a [u8],
    remaining: u8,
}

impl<'a> Iterator for Tuples<'a> {
    type Item = Tuple<'a>;

    fn next(&mut self) -> Option<Tuple<'a>> {
        if self.remaining == 0 {
            return None;
        }
        // Framing was checked by `Dictionary::parse`
        let (tuple, rest) = decode_tuple(self.rest).ok()?;
        self.rest = rest;
        self.remaining -= 1;
        Some(tuple)
    }
}

/// Encodes tuples into a caller provided buffer
pub struct DictionaryWriter<'b> {
    buf: &'b mut [u8],
    len: usize,
    count: u8,
}

impl<'b> DictionaryWriter<'b> {
    pub fn new(buf: &'b mut [u8]) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(Error::BufferTooSmall);
        }
        Ok(Self {
            buf,
            len: 1,
            count: 0,
        })
    }

    fn push(&mut self, key: u32, kind: TupleType, parts: &[&[u8]]) -> Result<(), Error> {
        let length: usize = parts.iter().map(|p| p.len()).sum();
        let end = self.len + HEADER_LEN + length;
        if end > self.buf.len() || length > u16::MAX as usize || self.count == u8::MAX {
            return Err(Error::BufferTooSmall);
        }

        let out = &mut self.buf[self.len..end];
        out[..4].copy_from_slice(&key.to_le_bytes());
        out[4] = kind as u8;
        out[5..7].copy_from_slice(&(length as u16).to_le_bytes());
        let mut at = HEADER_LEN;
        for part in parts {
            out[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }

        self.len = end;
        self.count += 1;
        Ok(())
    }

    pub fn write_bytes(&mut self, key: u32, value: &[u8]) -> Result<(), Error> {
        self.push(key, TupleType::ByteArray, &[value])
    }

    /// Write a string, including its NUL terminator
    pub fn write_cstring(&mut self, key: u32, value: &str) -> Result<(), Error> {
        self.push(key, TupleType::CString, &[value.as_bytes(), &[0]])
    }

    pub fn write_uint(&mut self, key: u32, value: u32) -> Result<(), Error> {
        self.push(key, TupleType::Uint, &[&value.to_le_bytes()])
    }

    pub fn write_int(&mut self, key: u32, value: i32) -> Result<(), Error> {
        self.push(key, TupleType::Int, &[&value.to_le_bytes()])
    }

    /// Finalize the count byte and return the encoded dictionary
    pub fn finish(self) -> &'b [u8] {
        let Self { buf, len, count } = self;
        buf[0] = count;
        &buf[..len]
    }
}

/// Visibility changes carried by an inbound message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsMessage {
    pub battery: Option<Visibility>,
    pub bluetooth: Option<Visibility>,
}

impl SettingsMessage {
    /// Pick the recognized settings out of `dict`.
    ///
    /// Entries that are missing or not strings are ignored, as are unknown
    /// keys.
    pub fn from_dictionary(dict: &Dictionary<'_>) -> Self {
        let toggle = |key: SettingKey| match dict.find(key.key())?.value {
            Value::CString(value) => Some(Visibility::from_toggle(value)),
            _ => None,
        };
        Self {
            battery: toggle(SettingKey::Battery),
            bluetooth: toggle(SettingKey::Bluetooth),
        }
    }

    pub fn get(&self, key: SettingKey) -> Option<Visibility> {
        match key {
            SettingKey::Battery => self.battery,
            SettingKey::Bluetooth => self.bluetooth,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.battery.is_none() && self.bluetooth.is_none()
    }
}

/// Encode the current settings as an outbound message
pub fn encode_settings(settings: &DisplaySettings) -> Result<Payload, Error> {
    let mut buf = [0; MAX_MESSAGE_LEN];
    let mut writer = DictionaryWriter::new(&mut buf)?;
    for (key, shown) in [
        (SettingKey::Battery, settings.show_battery),
        (SettingKey::Bluetooth, settings.show_bluetooth),
    ] {
        let visibility = if shown {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        writer.write_cstring(key.key(), visibility.as_toggle())?;
    }
    Payload::from_slice(writer.finish()).map_err(|_| Error::BufferTooSmall)
}
