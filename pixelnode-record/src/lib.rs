//! Flash parameter record codec
//!
//! This crate defines the on-flash layout used to persist named, typed
//! configuration parameters in a single reserved erase block. The format is
//! a flat sequence of self-describing records closed by a terminator:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬────────────┬───────────────┐
//! │ NAME_LEN │ TYPE_TAG │ CHECKSUM │ NAME       │ VALUE         │
//! │ 1B       │ 1B       │ 1B       │ 0–32B      │ per type      │
//! └──────────┴──────────┴──────────┴────────────┴───────────────┘
//!        ... repeated ...  then  0xFF 0xFF 0xFF
//! ```
//!
//! Value payloads: int = 4 bytes big-endian two's complement, string =
//! 1 length byte + UTF-8 bytes, bool = 1 byte, null = nothing.
//!
//! The checksum is `(NAME_LEN + TYPE_TAG) mod 256`. It is a coarse guard
//! against reading erased or half-written flash, not an integrity check.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod cursor;
pub mod record;

pub use cursor::{RecordIter, RecordWriter, REGION_BUDGET};
pub use record::{
    check_lengths, checksum, decode, encode, encoded_len, Decoded, Record, RecordError,
    RecordValue, TypeTag, HEADER_LEN, MAX_NAME_LEN, MAX_VALUE_LEN, TERMINATOR, TERMINATOR_LEN,
};
