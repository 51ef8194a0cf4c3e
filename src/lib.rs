//! sstblock implements the block layer of a sorted-string table.
//!
//! A block is a contiguous, immutable byte buffer holding a sorted run of
//! key-value pairs.  Keys are prefix-compressed against their predecessor
//! within a restart group; the offsets of the groups' first entries form a
//! binary-searchable restart array at the tail of the block.  This crate
//! provides the builder that produces blocks and the bidirectional cursor
//! that navigates them.

extern crate prototk;
#[macro_use]
extern crate prototk_derive;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use biometrics::{Collector, Counter};
use tatl::{HeyListen, Stationary};
use zerror_core::ErrorCore;

pub mod block;

pub use block::{Block, BlockBuilder, BlockBuilderOptions, BlockCursor};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static CORRUPTION: Counter = Counter::new("sstblock.corruption");
static CORRUPTION_MONITOR: Stationary = Stationary::new("sstblock.corruption", &CORRUPTION);

static KEY_TOO_LARGE: Counter = Counter::new("sstblock.error.key_too_large");
static KEY_TOO_LARGE_MONITOR: Stationary =
    Stationary::new("sstblock.error.key_too_large", &KEY_TOO_LARGE);

static VALUE_TOO_LARGE: Counter = Counter::new("sstblock.error.value_too_large");
static VALUE_TOO_LARGE_MONITOR: Stationary =
    Stationary::new("sstblock.error.value_too_large", &VALUE_TOO_LARGE);

static BLOCK_FULL: Counter = Counter::new("sstblock.error.block_full");
static BLOCK_FULL_MONITOR: Stationary = Stationary::new("sstblock.error.block_full", &BLOCK_FULL);

static BLOCK_TOO_SMALL: Counter = Counter::new("sstblock.error.block_too_small");
static BLOCK_TOO_SMALL_MONITOR: Stationary =
    Stationary::new("sstblock.error.block_too_small", &BLOCK_TOO_SMALL);

/// Register this crate's biometrics.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&CORRUPTION);
    collector.register_counter(&KEY_TOO_LARGE);
    collector.register_counter(&VALUE_TOO_LARGE);
    collector.register_counter(&BLOCK_FULL);
    collector.register_counter(&BLOCK_TOO_SMALL);
}

/// Register this crate's monitors.
pub fn register_monitors(hey_listen: &mut HeyListen) {
    hey_listen.register_stationary(&CORRUPTION_MONITOR);
    hey_listen.register_stationary(&KEY_TOO_LARGE_MONITOR);
    hey_listen.register_stationary(&VALUE_TOO_LARGE_MONITOR);
    hey_listen.register_stationary(&BLOCK_FULL_MONITOR);
    hey_listen.register_stationary(&BLOCK_TOO_SMALL_MONITOR);
}

///////////////////////////////////////////// Constants ////////////////////////////////////////////

/// The maximum length of a key.
pub const MAX_KEY_LEN: usize = 1usize << 14; /* 16KiB */
/// The maximum length of a value.
pub const MAX_VALUE_LEN: usize = 1usize << 15; /* 32KiB */
/// The maximum size of a block.  Restart offsets are fixed32, so every entry must start at an
/// offset representable in a u32.
pub const MAX_BLOCK_LEN: usize = 1usize << 30; /* 1GiB */

/// The maximum sequence number.  Sequence numbers occupy the high 56 bits of a key trailer.
pub const MAX_SEQNUM: u64 = (1u64 << 56) - 1;

/// Check that the key is of valid length, or return a descriptive error.
pub fn check_key_len(key: &[u8]) -> Result<(), Error> {
    if key.len() > MAX_KEY_LEN {
        KEY_TOO_LARGE.click();
        let err = Error::KeyTooLarge {
            core: ErrorCore::default(),
            length: key.len(),
            limit: MAX_KEY_LEN,
        };
        Err(err)
    } else {
        Ok(())
    }
}

/// Check that the value is of valid length, or return a descriptive error.
pub fn check_value_len(value: &[u8]) -> Result<(), Error> {
    if value.len() > MAX_VALUE_LEN {
        VALUE_TOO_LARGE.click();
        let err = Error::ValueTooLarge {
            core: ErrorCore::default(),
            length: value.len(),
            limit: MAX_VALUE_LEN,
        };
        Err(err)
    } else {
        Ok(())
    }
}

/// Check that the block size is allowable, or return a descriptive error.
pub fn check_block_size(size: usize) -> Result<(), Error> {
    if size >= MAX_BLOCK_LEN {
        BLOCK_FULL.click();
        let err = Error::BlockFull {
            core: ErrorCore::default(),
            size,
            limit: MAX_BLOCK_LEN,
        };
        Err(err)
    } else {
        Ok(())
    }
}

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// The sstblock Error type.
#[derive(Clone, Message, zerror_derive::Z)]
pub enum Error {
    /// Success.  Used for Message default.  Should not be constructed otherwise.
    #[prototk(445440, message)]
    Success {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
    },
    /// Indicates the key length is too big for a block.
    #[prototk(445441, message)]
    KeyTooLarge {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// The length of the key.
        #[prototk(2, uint64)]
        length: usize,
        /// The limit on length of the key.
        #[prototk(3, uint64)]
        limit: usize,
    },
    /// Indicates the value length is too big for a block.
    #[prototk(445442, message)]
    ValueTooLarge {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// The length of the value.
        #[prototk(2, uint64)]
        length: usize,
        /// The limit on length of the value.
        #[prototk(3, uint64)]
        limit: usize,
    },
    /// The block is full.
    #[prototk(445443, message)]
    BlockFull {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// The attempted size of the block.
        #[prototk(2, uint64)]
        size: usize,
        /// The limit on size of the block.
        #[prototk(3, uint64)]
        limit: usize,
    },
    /// The block was too small to be considered valid.
    #[prototk(445444, message)]
    BlockTooSmall {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// The length observed.
        #[prototk(2, uint64)]
        length: usize,
        /// The length required.
        #[prototk(3, uint64)]
        required: usize,
    },
    /// An entry could not be decoded.
    #[prototk(445445, message)]
    MalformedEntry {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// The offset of the entry.
        #[prototk(2, uint64)]
        offset: usize,
        /// A description of what was malformed.
        #[prototk(3, string)]
        what: String,
    },
    /// The restart array does not describe the block.
    #[prototk(445446, message)]
    MalformedRestartArray {
        /// The error core.
        #[prototk(1, message)]
        core: ErrorCore,
        /// A description of what was malformed.
        #[prototk(2, string)]
        what: String,
    },
}

impl Default for Error {
    fn default() -> Self {
        Error::Success {
            core: ErrorCore::default(),
        }
    }
}

//////////////////////////////////////////// Comparator ////////////////////////////////////////////

/// A Comparator establishes the total order of keys within a block.  Cursors take one at
/// construction; there is no global registry.
pub type Comparator = fn(&[u8], &[u8]) -> Ordering;

/// Compare the bytes lexicographically.  The default [Comparator].
pub fn compare_bytes(lhs: &[u8], rhs: &[u8]) -> Ordering {
    for (l, r) in lhs.iter().zip(rhs.iter()) {
        match l.cmp(r) {
            Ordering::Equal => {}
            ord => {
                return ord;
            }
        }
    }
    lhs.len().cmp(&rhs.len())
}

////////////////////////////////////////////// KeyKind /////////////////////////////////////////////

/// The kind of operation a key records.  Stored in the low byte of the key trailer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum KeyKind {
    /// A tombstone for the user key.
    Del = 0,
    /// A regular value for the user key.
    #[default]
    Put = 1,
    /// A merge operand for the user key.
    Merge = 2,
    /// A key that could not be decoded.  Never written.
    Invalid = 255,
}

impl From<u8> for KeyKind {
    fn from(kind: u8) -> Self {
        match kind {
            0 => KeyKind::Del,
            1 => KeyKind::Put,
            2 => KeyKind::Merge,
            _ => KeyKind::Invalid,
        }
    }
}

/// Pack a sequence number and kind into a key trailer.
pub fn pack_trailer(seqnum: u64, kind: KeyKind) -> u64 {
    (seqnum << 8) | kind as u64
}

////////////////////////////////////////////// KeyRef //////////////////////////////////////////////

/// A shallow, easy-to-copy reference to a decoded key.
///
/// Keys in data blocks carry an eight-byte trailer packing (seqnum, kind); keys in index and meta
/// blocks do not.  A raw cursor reports the entire stored key as `user_key` with a zero trailer.
/// A `user_key` of None indicates a stored key too short to hold a trailer; such keys decode with
/// kind [KeyKind::Invalid] and do not interrupt iteration.
#[derive(Copy, Clone, Debug)]
pub struct KeyRef<'a> {
    /// The user-visible portion of the key, or None if the key could not be decoded.
    pub user_key: Option<&'a [u8]>,
    /// The trailer packing (seqnum, kind).
    pub trailer: u64,
}

impl<'a> KeyRef<'a> {
    /// Create a new KeyRef from its parts.
    pub fn new(user_key: &'a [u8], seqnum: u64, kind: KeyKind) -> Self {
        Self {
            user_key: Some(user_key),
            trailer: pack_trailer(seqnum, kind),
        }
    }

    /// Decode a stored key from a data block.  Keys shorter than the eight-byte trailer decode
    /// with a None user key and kind [KeyKind::Invalid].
    pub fn decode_internal(bytes: &'a [u8]) -> Self {
        if bytes.len() >= 8 {
            let mut trailer: [u8; 8] = <[u8; 8]>::default();
            trailer.copy_from_slice(&bytes[bytes.len() - 8..]);
            Self {
                user_key: Some(&bytes[..bytes.len() - 8]),
                trailer: u64::from_le_bytes(trailer),
            }
        } else {
            Self {
                user_key: None,
                trailer: KeyKind::Invalid as u64,
            }
        }
    }

    /// The sequence number packed in the trailer.
    pub fn seqnum(&self) -> u64 {
        self.trailer >> 8
    }

    /// The kind packed in the trailer.
    pub fn kind(&self) -> KeyKind {
        KeyKind::from(self.trailer as u8)
    }
}

impl Display for KeyRef<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self.user_key {
            Some(user_key) => {
                let user_key = String::from_utf8(
                    user_key
                        .iter()
                        .flat_map(|b| std::ascii::escape_default(*b))
                        .collect::<Vec<u8>>(),
                )
                .expect("escaped bytes should always be utf8");
                write!(fmt, "\"{}\" @ {} {:?}", user_key, self.seqnum(), self.kind())
            }
            None => write!(fmt, "<invalid> {:?}", self.kind()),
        }
    }
}

impl Eq for KeyRef<'_> {}

impl PartialEq for KeyRef<'_> {
    fn eq(&self, rhs: &KeyRef) -> bool {
        self.cmp(rhs) == Ordering::Equal
    }
}

impl Ord for KeyRef<'_> {
    fn cmp(&self, rhs: &KeyRef) -> Ordering {
        // Within a user key, higher sequence numbers sort first.
        self.user_key
            .cmp(&rhs.user_key)
            .then(self.trailer.cmp(&rhs.trailer).reverse())
    }
}

impl PartialOrd for KeyRef<'_> {
    fn partial_cmp(&self, rhs: &KeyRef) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

////////////////////////////////////////////// Cursor //////////////////////////////////////////////

/// A Cursor allows for bidirectional iteration through a block.
pub trait Cursor {
    /// Position on the first entry of the block, or become invalid if the block is empty.
    fn seek_to_first(&mut self) -> Result<(), Error>;

    /// Position on the last entry of the block, or become invalid if the block is empty.
    fn seek_to_last(&mut self) -> Result<(), Error>;

    /// Position on the first entry whose key is greater than or equal to `key`, or become invalid
    /// if there is no such entry.
    fn seek(&mut self, key: &[u8]) -> Result<(), Error>;

    /// Position on the last entry whose key is less than `key`, or become invalid if there is no
    /// such entry.
    fn seek_lt(&mut self, key: &[u8]) -> Result<(), Error>;

    /// Advance the cursor to the next entry.
    fn next(&mut self) -> Result<(), Error>;

    /// Retreat the cursor to the previous entry.
    fn prev(&mut self) -> Result<(), Error>;

    /// The key where this cursor is positioned, or None if the cursor is not positioned on an
    /// entry.
    fn key(&self) -> Option<KeyRef>;

    /// The value where this cursor is positioned, or None if the cursor is not positioned on an
    /// entry.
    fn value(&self) -> Option<&'_ [u8]>;

    /// True if and only if the cursor is positioned on an entry.
    fn valid(&self) -> bool {
        self.key().is_some()
    }

    /// Return the key and value corresponding to the current position of the cursor.
    fn key_value(&self) -> Option<(KeyRef, &'_ [u8])> {
        match (self.key(), self.value()) {
            (Some(key), Some(value)) => Some((key, value)),
            _ => None,
        }
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
