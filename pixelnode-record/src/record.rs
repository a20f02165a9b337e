//! Single record encoding and decoding.
//!
//! Record format:
//! - NAME_LEN (1 byte): parameter name length (0-32)
//! - TYPE_TAG (1 byte): 1 = int, 2 = string, 3 = bool, 4 = null
//! - CHECKSUM (1 byte): (NAME_LEN + TYPE_TAG) mod 256
//! - NAME (NAME_LEN bytes): UTF-8, no terminator
//! - VALUE: sized by TYPE_TAG

/// Record header size (NAME_LEN + TYPE_TAG + CHECKSUM)
pub const HEADER_LEN: usize = 3;

/// Maximum parameter name length in bytes
pub const MAX_NAME_LEN: usize = 32;

/// Maximum string value length in bytes (1-byte length field)
pub const MAX_VALUE_LEN: usize = 255;

/// End-of-list marker, found where the next header would begin
pub const TERMINATOR: [u8; TERMINATOR_LEN] = [0xFF; TERMINATOR_LEN];

/// Terminator size in bytes
pub const TERMINATOR_LEN: usize = 3;

/// Errors that can occur during record encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Name exceeds [`MAX_NAME_LEN`]
    NameTooLong,
    /// String value exceeds [`MAX_VALUE_LEN`]
    ValueTooLong,
    /// Output buffer too small for the encoded record
    BufferTooSmall,
    /// Record (plus terminator) would exceed the region budget
    RegionFull,
    /// Header checksum mismatch, oversized name, or invalid UTF-8
    Corrupt,
    /// Checksum matched but the type tag is not a known type
    UnknownType,
    /// Input ended in the middle of a record or before the terminator
    Truncated,
}

/// Value type tag as stored on flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TypeTag {
    /// Signed 32-bit integer
    Int = 1,
    /// UTF-8 string
    Str = 2,
    /// Boolean
    Bool = 3,
    /// Null
    Null = 4,
}

impl TypeTag {
    /// Get the tag as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a tag from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(TypeTag::Int),
            2 => Some(TypeTag::Str),
            3 => Some(TypeTag::Bool),
            4 => Some(TypeTag::Null),
            _ => None,
        }
    }
}

/// Borrowed record value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordValue<'a> {
    Int(i32),
    Str(&'a str),
    Bool(bool),
    Null,
}

impl RecordValue<'_> {
    /// Type tag for this value
    pub fn type_tag(&self) -> TypeTag {
        match self {
            RecordValue::Int(_) => TypeTag::Int,
            RecordValue::Str(_) => TypeTag::Str,
            RecordValue::Bool(_) => TypeTag::Bool,
            RecordValue::Null => TypeTag::Null,
        }
    }

    /// Encoded payload size in bytes
    fn payload_len(&self) -> usize {
        match self {
            RecordValue::Int(_) => 4,
            RecordValue::Str(s) => 1 + s.len(),
            RecordValue::Bool(_) => 1,
            RecordValue::Null => 0,
        }
    }
}

/// A decoded record, borrowing from the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Parameter name
    pub name: &'a str,
    /// Parameter value
    pub value: RecordValue<'a>,
}

/// Result of decoding at a cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// A record and the number of bytes it occupied
    Record(Record<'a>, usize),
    /// The terminator was found
    EndOfList,
}

/// Header checksum: `(name_len + type_tag) mod 256`
#[inline]
pub fn checksum(name_len: u8, type_tag: u8) -> u8 {
    name_len.wrapping_add(type_tag)
}

/// Size of the encoded record for `name` and `value`
pub fn encoded_len(name: &str, value: &RecordValue<'_>) -> usize {
    HEADER_LEN + name.len() + value.payload_len()
}

/// Check name and string value against the field size limits
pub fn check_lengths(name: &str, value: &RecordValue<'_>) -> Result<(), RecordError> {
    if name.len() > MAX_NAME_LEN {
        return Err(RecordError::NameTooLong);
    }
    match value {
        RecordValue::Str(s) if s.len() > MAX_VALUE_LEN => Err(RecordError::ValueTooLong),
        _ => Ok(()),
    }
}

/// Encode one record into `buffer`
///
/// Returns the number of bytes written.
pub fn encode(name: &str, value: RecordValue<'_>, buffer: &mut [u8]) -> Result<usize, RecordError> {
    check_lengths(name, &value)?;

    let len = encoded_len(name, &value);
    if buffer.len() < len {
        return Err(RecordError::BufferTooSmall);
    }

    let name_len = name.len() as u8;
    let tag = value.type_tag().as_u8();

    buffer[0] = name_len;
    buffer[1] = tag;
    buffer[2] = checksum(name_len, tag);

    let mut pos = HEADER_LEN;
    buffer[pos..pos + name.len()].copy_from_slice(name.as_bytes());
    pos += name.len();

    match value {
        RecordValue::Int(v) => {
            // Stored as the raw unsigned bit pattern
            buffer[pos..pos + 4].copy_from_slice(&(v as u32).to_be_bytes());
        }
        RecordValue::Str(s) => {
            buffer[pos] = s.len() as u8;
            buffer[pos + 1..pos + 1 + s.len()].copy_from_slice(s.as_bytes());
        }
        RecordValue::Bool(b) => {
            buffer[pos] = b as u8;
        }
        RecordValue::Null => {}
    }

    Ok(len)
}

/// Decode the record starting at the beginning of `buffer`
///
/// Returns [`Decoded::EndOfList`] on the terminator pattern and
/// [`RecordError::Corrupt`] on a header checksum mismatch. Callers should
/// abort the whole load on any error rather than try to resynchronize.
pub fn decode(buffer: &[u8]) -> Result<Decoded<'_>, RecordError> {
    if buffer.len() < HEADER_LEN {
        return Err(RecordError::Truncated);
    }
    if buffer[..TERMINATOR_LEN] == TERMINATOR {
        return Ok(Decoded::EndOfList);
    }

    let name_len = buffer[0];
    let tag = buffer[1];
    if checksum(name_len, tag) != buffer[2] {
        return Err(RecordError::Corrupt);
    }
    if name_len as usize > MAX_NAME_LEN {
        return Err(RecordError::Corrupt);
    }
    let tag = TypeTag::from_u8(tag).ok_or(RecordError::UnknownType)?;

    let mut pos = HEADER_LEN;
    let name_bytes = take(buffer, pos, name_len as usize)?;
    let name = core::str::from_utf8(name_bytes).map_err(|_| RecordError::Corrupt)?;
    pos += name_bytes.len();

    let value = match tag {
        TypeTag::Int => {
            let raw = take(buffer, pos, 4)?;
            pos += 4;
            let unsigned = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
            // Values above 0x7FFF_FFFF are negative in two's complement
            RecordValue::Int(unsigned as i32)
        }
        TypeTag::Str => {
            let len = take(buffer, pos, 1)?[0] as usize;
            pos += 1;
            let raw = take(buffer, pos, len)?;
            pos += len;
            RecordValue::Str(core::str::from_utf8(raw).map_err(|_| RecordError::Corrupt)?)
        }
        TypeTag::Bool => {
            let raw = take(buffer, pos, 1)?;
            pos += 1;
            RecordValue::Bool(raw[0] != 0)
        }
        TypeTag::Null => RecordValue::Null,
    };

    Ok(Decoded::Record(Record { name, value }, pos))
}

/// Borrow `len` bytes at `pos`, or fail with `Truncated`
#[inline]
fn take(buffer: &[u8], pos: usize, len: usize) -> Result<&[u8], RecordError> {
    buffer.get(pos..pos + len).ok_or(RecordError::Truncated)
}
