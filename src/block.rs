//! A block is the base unit of a sorted-string table.  This module provides implementations of
//! builders and cursors for blocks.
//!
//! Entries are laid out as `varint(shared) varint(unshared) varint(value_len)` followed by the
//! unshared key bytes and the value bytes.  Every `restart_interval` entries the builder stores a
//! complete key and records the entry's offset in the restart array at the tail of the block; the
//! final four bytes hold the restart count.  Cursors binary search the restart array and scan
//! forward within a restart group, reconstructing prefix-compressed keys as they go.

use std::cmp;
use std::cmp::Ordering;
use std::sync::Arc;

use buffertk::{length_free, stack_pack, v64, Unpacker};
use zerror::Z;
use zerror_core::ErrorCore;

use super::{
    check_block_size, check_key_len, check_value_len, pack_trailer, Comparator, Cursor, Error,
    KeyKind, KeyRef, BLOCK_TOO_SMALL, CORRUPTION, MAX_SEQNUM,
};

//////////////////////////////////////// BlockBuilderOptions ///////////////////////////////////////

/// Options for building blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockBuilderOptions {
    /// Store a complete key every restart_interval keys.
    restart_interval: u64,
}

impl BlockBuilderOptions {
    /// Set the restart_interval.
    pub fn restart_interval(mut self, restart_interval: u32) -> Self {
        self.restart_interval = restart_interval as u64;
        self
    }
}

impl Default for BlockBuilderOptions {
    fn default() -> Self {
        Self {
            restart_interval: 16,
        }
    }
}

/////////////////////////////////////////// BlockBuilder ///////////////////////////////////////////

/// Build a block.  Keys must be added in non-decreasing order under the comparator that will be
/// used to read the block; the builder does not verify ordering.
#[derive(Clone, Debug)]
pub struct BlockBuilder {
    options: BlockBuilderOptions,
    buffer: Vec<u8>,
    last_key: Vec<u8>,
    // Restart metadata.
    restarts: Vec<u32>,
    entries_since_restart: u64,
    // Scratch for encoding keys with trailers.
    key_scratch: Vec<u8>,
}

impl BlockBuilder {
    /// Create a new block builder.
    pub fn new(mut options: BlockBuilderOptions) -> Self {
        options.restart_interval = cmp::max(1, options.restart_interval);
        let restarts = vec![0];
        BlockBuilder {
            options,
            buffer: Vec::default(),
            last_key: Vec::default(),
            restarts,
            entries_since_restart: 0,
            key_scratch: Vec::default(),
        }
    }

    /// Append one entry.  The key is treated as an opaque byte string; whether it carries a
    /// trailer is a concern of whoever reads the block.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        check_key_len(key)?;
        check_value_len(value)?;
        check_block_size(self.approximate_size())?;
        let (shared, key_frag) = self.compute_key_frag(key);
        stack_pack(v64::from(shared))
            .pack(v64::from(key_frag.len()))
            .pack(v64::from(value.len()))
            .append_to_vec(&mut self.buffer);
        self.buffer.extend_from_slice(key_frag);
        self.buffer.extend_from_slice(value);
        self.last_key.truncate(shared);
        self.last_key.extend_from_slice(key_frag);
        self.entries_since_restart += 1;
        Ok(())
    }

    /// Append one entry whose stored key is `user_key` followed by the eight-byte trailer packing
    /// (seqnum, kind).  Sequence numbers are truncated to 56 bits.
    pub fn add_internal(
        &mut self,
        user_key: &[u8],
        seqnum: u64,
        kind: KeyKind,
        value: &[u8],
    ) -> Result<(), Error> {
        let trailer = pack_trailer(seqnum & MAX_SEQNUM, kind);
        let mut key = std::mem::take(&mut self.key_scratch);
        key.clear();
        key.extend_from_slice(user_key);
        key.extend_from_slice(&trailer.to_le_bytes());
        let ret = self.add(&key, value);
        self.key_scratch = key;
        ret
    }

    /// The size of the block that seal would return if called now.
    pub fn approximate_size(&self) -> usize {
        self.buffer.len() + 4 * self.restarts.len() + 4
    }

    /// Append the restart array and restart count and return the finished block.  A builder that
    /// saw no keys seals to the degenerate single-restart block
    /// `\x00\x00\x00\x00\x01\x00\x00\x00`.
    pub fn seal(self) -> Result<Block, Error> {
        // NOTE:  If this changes, change approximate_size above.
        let restarts = length_free(&self.restarts);
        let pa = stack_pack(restarts);
        let pa = pa.pack(self.restarts.len() as u32);
        let mut contents = self.buffer;
        pa.append_to_vec(&mut contents);
        Block::new(contents)
    }

    fn should_restart(&self) -> bool {
        self.options.restart_interval <= self.entries_since_restart
    }

    fn compute_key_frag<'a>(&mut self, key: &'a [u8]) -> (usize, &'a [u8]) {
        let shared = if !self.should_restart() {
            let max_shared: usize = cmp::min(self.last_key.len(), key.len());
            let mut shared = 0;
            while shared < max_shared && key[shared] == self.last_key[shared] {
                shared += 1;
            }
            shared
        } else {
            // do a restart
            self.entries_since_restart = 0;
            self.restarts.push(self.buffer.len() as u32);
            0
        };
        (shared, &key[shared..])
    }
}

/////////////////////////////////////////////// Block //////////////////////////////////////////////

/// A Block captures an immutable, sorted sequence of key-value pairs.  Blocks are cheap to clone;
/// every clone shares one buffer.
#[derive(Clone, Debug)]
pub struct Block {
    // The raw bytes built by a builder or loaded off disk.
    bytes: Arc<Vec<u8>>,

    // restarts_offset points at the first byte of the restart array; the data region of the block
    // is [0, restarts_offset).
    restarts_offset: usize,
    num_restarts: usize,
}

impl Block {
    /// Create a new block from the provided bytes, checking that the restart array describes the
    /// buffer.
    pub fn new(bytes: Vec<u8>) -> Result<Self, Error> {
        let bytes = Arc::new(bytes);
        // Load num_restarts.
        if bytes.len() < 4 {
            // A block must end in a u32 that indicates how many restarts there are.
            BLOCK_TOO_SMALL.click();
            return Err(Error::BlockTooSmall {
                core: ErrorCore::default(),
                length: bytes.len(),
                required: 4,
            });
        }
        let mut up = Unpacker::new(&bytes[bytes.len() - 4..]);
        let num_restarts: u32 = up.unpack().map_err(|e: buffertk::Error| {
            CORRUPTION.click();
            Error::MalformedRestartArray {
                core: ErrorCore::default(),
                what: format!("could not read last four bytes of block: {}", e),
            }
        })?;
        let num_restarts: usize = num_restarts as usize;
        if num_restarts == 0 {
            CORRUPTION.click();
            return Err(Error::MalformedRestartArray {
                core: ErrorCore::default(),
                what: "block has no restart points".to_string(),
            });
        }
        let footer_sz: u64 = 4 + 4 * num_restarts as u64;
        if (bytes.len() as u64) < footer_sz {
            CORRUPTION.click();
            let err = Error::MalformedRestartArray {
                core: ErrorCore::default(),
                what: "restart array overruns the block".to_string(),
            }
            .with_info("num_restarts", num_restarts)
            .with_info("length", bytes.len());
            return Err(err);
        }
        let restarts_offset = bytes.len() - footer_sz as usize;
        let block = Block {
            bytes,
            restarts_offset,
            num_restarts,
        };
        // Restart offsets must begin at zero, strictly increase, and stay within the data region.
        let mut prev = 0usize;
        for restart_idx in 0..num_restarts {
            let offset = block.restart_point(restart_idx);
            if restart_idx == 0 && offset != 0 {
                CORRUPTION.click();
                let err = Error::MalformedRestartArray {
                    core: ErrorCore::default(),
                    what: "first restart offset is not zero".to_string(),
                }
                .with_info("offset", offset);
                return Err(err);
            }
            if restart_idx > 0 && offset <= prev {
                CORRUPTION.click();
                let err = Error::MalformedRestartArray {
                    core: ErrorCore::default(),
                    what: "restart offsets are not strictly increasing".to_string(),
                }
                .with_info("restart_idx", restart_idx)
                .with_info("offset", offset);
                return Err(err);
            }
            // The empty block carries one restart slot at offset zero and no data region; every
            // other restart offset must land inside the data region.
            if offset >= block.restarts_offset && !(restart_idx == 0 && block.restarts_offset == 0)
            {
                CORRUPTION.click();
                let err = Error::MalformedRestartArray {
                    core: ErrorCore::default(),
                    what: "restart offset points past the data region".to_string(),
                }
                .with_info("restart_idx", restart_idx)
                .with_info("offset", offset);
                return Err(err);
            }
            prev = offset;
        }
        Ok(block)
    }

    /// Approximate size of the block, not including the struct itself.
    pub fn approximate_size(&self) -> usize {
        self.bytes.len()
    }

    /// Return a reference to the block's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return a cursor over the block, decoding keys as user keys with eight-byte trailers.
    pub fn cursor(&self, cmp: Comparator) -> BlockCursor {
        BlockCursor::new(self.clone(), cmp)
    }

    /// Return a cursor over the block, treating keys as raw byte strings.  For index and meta
    /// blocks.
    pub fn raw_cursor(&self, cmp: Comparator) -> BlockCursor {
        BlockCursor::raw(self.clone(), cmp)
    }

    fn restart_point(&self, restart_idx: usize) -> usize {
        assert!(restart_idx < self.num_restarts);
        let start = self.restarts_offset + restart_idx * 4;
        let mut restart: [u8; 4] = <[u8; 4]>::default();
        restart.copy_from_slice(&self.bytes[start..start + 4]);
        u32::from_le_bytes(restart) as usize
    }
}

////////////////////////////////////////////// KeyShape ////////////////////////////////////////////

// Blocks serialize raw keys and trailered keys identically; only the decode differs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum KeyShape {
    // The stored key is the entire comparison key (index and meta blocks).
    Raw,
    // The stored key is a user key followed by an eight-byte trailer (data blocks).
    Internal,
}

////////////////////////////////////////////// KeySlot /////////////////////////////////////////////

// Where the current key's bytes live.
#[derive(Clone, Copy, Debug)]
enum KeySlot {
    // The key aliases the block's data region; possible whenever shared == 0.
    Data { start: usize, end: usize },
    // The key was reconstructed in full_key.
    Full,
    // The key was decoded during a reverse scan and lives in cached_buf.
    Cached { start: usize, end: usize },
}

///////////////////////////////////////////// Position /////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Position {
    BeforeFirst,
    OnEntry,
    AfterLast,
}

//////////////////////////////////////////// CachedEntry ///////////////////////////////////////////

// One entry decoded during a reverse scan: its offset, the span of its key in cached_buf, and the
// span of its value in the block.
#[derive(Clone, Copy, Debug)]
struct CachedEntry {
    offset: usize,
    key_start: usize,
    key_end: usize,
    val_start: usize,
    val_end: usize,
}

//////////////////////////////////////////// BlockCursor ///////////////////////////////////////////

/// A cursor over a block.
///
/// Key slices returned by the cursor remain valid until the next movement.  When the current
/// entry opened a restart group its key aliases the block buffer and outlives the cursor; keys
/// that required prefix reconstruction alias the cursor's scratch buffers instead, and callers
/// needing longer-lived keys must copy.
#[derive(Clone, Debug)]
pub struct BlockCursor {
    block: Block,
    cmp: Comparator,
    shape: KeyShape,
    // When non-zero, every decoded trailer reports this sequence number.
    global_seqnum: u64,

    position: Position,
    // Byte offsets of the current entry and its successor; meaningful when position == OnEntry.
    offset: usize,
    next_offset: usize,
    // The current key, reconstructed from the shared prefix of its predecessor.
    full_key: Vec<u8>,
    key_slot: KeySlot,
    val_start: usize,
    val_end: usize,
    // The decoded trailer of the current key; decodable is false when the stored key was too
    // short to carry one.
    trailer: u64,
    decodable: bool,

    // Entries of the current restart group decoded while scanning backwards.  The top of cached
    // is the current entry, so repeated prev amortizes to a pop.
    cached: Vec<CachedEntry>,
    cached_buf: Vec<u8>,

    err: Option<Error>,
}

impl BlockCursor {
    /// Create a cursor whose keys decode as user keys with eight-byte trailers.
    pub fn new(block: Block, cmp: Comparator) -> Self {
        BlockCursor::with_shape(block, cmp, KeyShape::Internal)
    }

    /// Create a cursor whose keys are raw byte strings.
    pub fn raw(block: Block, cmp: Comparator) -> Self {
        BlockCursor::with_shape(block, cmp, KeyShape::Raw)
    }

    /// Report every key at this sequence number, preserving stored kinds.  Zero disables the
    /// override.  Supports ingested tables whose keys were written at sequence number zero.
    pub fn set_global_seqnum(&mut self, global_seqnum: u64) {
        self.global_seqnum = global_seqnum;
        if self.position == Position::OnEntry {
            self.decode_key();
        }
    }

    /// The sticky error, if the cursor has encountered corruption since the last seek.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn with_shape(block: Block, cmp: Comparator, shape: KeyShape) -> Self {
        BlockCursor {
            block,
            cmp,
            shape,
            global_seqnum: 0,
            position: Position::BeforeFirst,
            offset: 0,
            next_offset: 0,
            full_key: Vec::default(),
            key_slot: KeySlot::Full,
            val_start: 0,
            val_end: 0,
            trailer: 0,
            decodable: false,
            cached: Vec::default(),
            cached_buf: Vec::default(),
            err: None,
        }
    }

    // The stored bytes of the current key.  Only meaningful when position == OnEntry.
    fn stored_key(&self) -> &[u8] {
        match self.key_slot {
            KeySlot::Data { start, end } => &self.block.bytes[start..end],
            KeySlot::Full => &self.full_key,
            KeySlot::Cached { start, end } => &self.cached_buf[start..end],
        }
    }

    // The portion of the current key that participates in comparisons.
    fn compare_key(&self) -> &[u8] {
        let stored = self.stored_key();
        match self.shape {
            KeyShape::Raw => stored,
            KeyShape::Internal => {
                if stored.len() >= 8 {
                    &stored[..stored.len() - 8]
                } else {
                    &[]
                }
            }
        }
    }

    // Decode the current key's trailer according to the cursor's shape.
    fn decode_key(&mut self) {
        match self.shape {
            KeyShape::Raw => {
                self.trailer = 0;
                self.decodable = true;
            }
            KeyShape::Internal => {
                let stored = self.stored_key();
                let decoded = if stored.len() >= 8 {
                    let mut trailer: [u8; 8] = <[u8; 8]>::default();
                    trailer.copy_from_slice(&stored[stored.len() - 8..]);
                    Some(u64::from_le_bytes(trailer))
                } else {
                    None
                };
                match decoded {
                    Some(mut trailer) => {
                        if self.global_seqnum != 0 {
                            // Overlay the sequence number; the kind byte stays as stored.
                            trailer = (self.global_seqnum << 8) | (trailer & 0xff);
                        }
                        self.trailer = trailer;
                        self.decodable = true;
                    }
                    None => {
                        self.trailer = KeyKind::Invalid as u64;
                        self.decodable = false;
                    }
                }
            }
        }
    }

    // Decode the entry at `offset`.  Requires full_key to hold the previous entry's key, or to be
    // empty when `offset` is a restart point.
    fn read_entry(&mut self, offset: usize) -> Result<(), Error> {
        let data_sz = self.block.restarts_offset;
        let parsed = parse_entry_header(&self.block.bytes[offset..data_sz]);
        let (header_sz, shared, unshared, value_sz) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                CORRUPTION.click();
                let err = Error::MalformedEntry {
                    core: ErrorCore::default(),
                    offset,
                    what: format!("could not unpack entry header: {}", e),
                };
                self.err = Some(err.clone());
                return Err(err);
            }
        };
        if shared > self.full_key.len() as u64 {
            CORRUPTION.click();
            let err = Error::MalformedEntry {
                core: ErrorCore::default(),
                offset,
                what: "shared prefix exceeds previous key".to_string(),
            }
            .with_info("shared", shared)
            .with_info("previous", self.full_key.len());
            self.err = Some(err.clone());
            return Err(err);
        }
        let avail = (data_sz - offset - header_sz) as u64;
        match unshared.checked_add(value_sz) {
            Some(claimed) if claimed <= avail => {}
            _ => {
                CORRUPTION.click();
                let err = Error::MalformedEntry {
                    core: ErrorCore::default(),
                    offset,
                    what: "entry overruns the data region".to_string(),
                }
                .with_info("unshared", unshared)
                .with_info("value_sz", value_sz);
                self.err = Some(err.clone());
                return Err(err);
            }
        }
        let shared = shared as usize;
        let unshared = unshared as usize;
        let value_sz = value_sz as usize;
        let key_start = offset + header_sz;
        let key_end = key_start + unshared;
        self.full_key.truncate(shared);
        self.full_key.extend_from_slice(&self.block.bytes[key_start..key_end]);
        self.key_slot = if shared == 0 {
            KeySlot::Data {
                start: key_start,
                end: key_end,
            }
        } else {
            KeySlot::Full
        };
        self.val_start = key_end;
        self.val_end = key_end + value_sz;
        self.offset = offset;
        self.next_offset = self.val_end;
        self.position = Position::OnEntry;
        self.decode_key();
        Ok(())
    }

    // Position on the first entry of the restart group at `restart_idx`.
    fn seek_restart(&mut self, restart_idx: usize) -> Result<(), Error> {
        let offset = self.block.restart_point(restart_idx);
        if self.block.restarts_offset == 0 {
            // A sealed block with zero entries still carries one restart slot.
            self.position = Position::AfterLast;
            return Ok(());
        }
        if offset >= self.block.restarts_offset {
            CORRUPTION.click();
            let err = Error::MalformedRestartArray {
                core: ErrorCore::default(),
                what: "restart offset points past the data region".to_string(),
            }
            .with_info("restart_idx", restart_idx)
            .with_info("offset", offset);
            self.err = Some(err.clone());
            return Err(err);
        }
        self.full_key.clear();
        self.read_entry(offset)
    }

    // The largest restart index whose offset is strictly less than `offset`.  The caller
    // guarantees offset > 0; restart 0 lives at offset 0.
    fn restart_before(&self, offset: usize) -> usize {
        let mut left: usize = 0usize;
        let mut right: usize = self.block.num_restarts - 1;
        while left < right {
            // Pick a mid such that when left and right are adjacent, mid equals right.
            let mid = left + (right - left + 1) / 2;
            if self.block.restart_point(mid) < offset {
                left = mid;
            } else {
                right = mid - 1;
            }
        }
        left
    }

    fn cache_entry(&mut self) {
        let key_start = self.cached_buf.len();
        match self.key_slot {
            KeySlot::Data { start, end } => {
                self.cached_buf.extend_from_slice(&self.block.bytes[start..end]);
            }
            KeySlot::Full => {
                self.cached_buf.extend_from_slice(&self.full_key);
            }
            KeySlot::Cached { .. } => {
                unreachable!("only freshly decoded entries are cached");
            }
        }
        let key_end = self.cached_buf.len();
        self.cached.push(CachedEntry {
            offset: self.offset,
            key_start,
            key_end,
            val_start: self.val_start,
            val_end: self.val_end,
        });
    }

    fn clear_cache(&mut self) {
        self.cached.clear();
        self.cached_buf.clear();
    }
}

impl Cursor for BlockCursor {
    fn seek_to_first(&mut self) -> Result<(), Error> {
        self.err = None;
        self.clear_cache();
        self.seek_restart(0)
    }

    fn seek_to_last(&mut self) -> Result<(), Error> {
        self.err = None;
        self.clear_cache();
        self.seek_restart(self.block.num_restarts - 1)?;
        if self.position != Position::OnEntry {
            return Ok(());
        }
        // Scan forward to the end of the data region, caching entries so that a following prev
        // stays within the cache.
        self.cache_entry();
        while self.next_offset < self.block.restarts_offset {
            let next_offset = self.next_offset;
            self.read_entry(next_offset)?;
            self.cache_entry();
        }
        Ok(())
    }

    fn seek(&mut self, key: &[u8]) -> Result<(), Error> {
        self.err = None;
        self.clear_cache();

        // Binary search to the restart point with the largest anchor key at most `key`.
        let mut left: usize = 0usize;
        let mut right: usize = self.block.num_restarts - 1;
        while left < right {
            // When left and right are adjacent, it will seek to the right.
            let mid = left + (right - left + 1) / 2;
            self.seek_restart(mid)?;
            match (self.cmp)(key, self.compare_key()) {
                Ordering::Less => {
                    // left     mid     right
                    // |--------|-------|
                    //       |
                    right = mid - 1;
                }
                Ordering::Equal => {
                    // The first entry at least `key` may precede an equal anchor, so resolve
                    // equality to the left.
                    right = mid - 1;
                }
                Ordering::Greater => {
                    // left     mid     right
                    // |--------|-------|
                    //           |
                    left = mid;
                }
            };
        }

        // We position at the left restart point and scan forward to the first key at least `key`.
        self.seek_restart(left)?;
        while self.position == Position::OnEntry
            && (self.cmp)(self.compare_key(), key) == Ordering::Less
        {
            self.next()?;
        }
        Ok(())
    }

    fn seek_lt(&mut self, key: &[u8]) -> Result<(), Error> {
        self.seek(key)?;
        self.prev()
    }

    fn next(&mut self) -> Result<(), Error> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        match self.position {
            Position::BeforeFirst => {
                self.clear_cache();
                return self.seek_restart(0);
            }
            Position::AfterLast => {
                return Ok(());
            }
            Position::OnEntry => {}
        }
        if !self.cached.is_empty() {
            // Switching from reverse to forward iteration.  Keys decoded during reverse scans
            // live in the cache, which is about to be dropped; move the current key into
            // full_key so prefix decompression can continue from it.
            if let KeySlot::Cached { start, end } = self.key_slot {
                self.full_key.clear();
                self.full_key.extend_from_slice(&self.cached_buf[start..end]);
                self.key_slot = KeySlot::Full;
            }
            self.clear_cache();
        }
        if self.next_offset >= self.block.restarts_offset {
            self.position = Position::AfterLast;
            return Ok(());
        }
        let next_offset = self.next_offset;
        self.read_entry(next_offset)
    }

    fn prev(&mut self) -> Result<(), Error> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        // Fast path: the cache holds the current entry and its predecessor.
        if self.position == Position::OnEntry && self.cached.len() >= 2 {
            let top = self.cached[self.cached.len() - 1];
            if top.offset == self.offset {
                self.cached.pop();
                let entry = self.cached[self.cached.len() - 1];
                self.next_offset = self.offset;
                self.offset = entry.offset;
                self.key_slot = KeySlot::Cached {
                    start: entry.key_start,
                    end: entry.key_end,
                };
                self.val_start = entry.val_start;
                self.val_end = entry.val_end;
                self.decode_key();
                return Ok(());
            }
        }
        let target = match self.position {
            Position::BeforeFirst => {
                return Ok(());
            }
            Position::AfterLast => self.block.restarts_offset,
            Position::OnEntry => self.offset,
        };
        self.clear_cache();
        if target == 0 {
            self.position = Position::BeforeFirst;
            self.next_offset = 0;
            return Ok(());
        }
        // Scan forward from the nearest restart point before the target, caching each entry so
        // that further calls to prev stay within the cache.
        let restart_idx = self.restart_before(target);
        self.seek_restart(restart_idx)?;
        self.cache_entry();
        while self.next_offset < target {
            let next_offset = self.next_offset;
            self.read_entry(next_offset)?;
            self.cache_entry();
        }
        Ok(())
    }

    fn key(&self) -> Option<KeyRef> {
        if self.err.is_some() || self.position != Position::OnEntry {
            return None;
        }
        let stored = self.stored_key();
        match self.shape {
            KeyShape::Raw => Some(KeyRef {
                user_key: Some(stored),
                trailer: 0,
            }),
            KeyShape::Internal => {
                if self.decodable {
                    Some(KeyRef {
                        user_key: Some(&stored[..stored.len() - 8]),
                        trailer: self.trailer,
                    })
                } else {
                    Some(KeyRef {
                        user_key: None,
                        trailer: self.trailer,
                    })
                }
            }
        }
    }

    fn value(&self) -> Option<&'_ [u8]> {
        if self.err.is_some() || self.position != Position::OnEntry {
            return None;
        }
        Some(&self.block.bytes[self.val_start..self.val_end])
    }
}

impl From<Block> for BlockCursor {
    fn from(block: Block) -> Self {
        Self::new(block, crate::compare_bytes)
    }
}

///////////////////////////////////////// parse_entry_header ///////////////////////////////////////

// Parse the three varints heading an entry.  Returns the header size and the decoded
// (shared, unshared, value_sz) lengths.
fn parse_entry_header(buf: &[u8]) -> Result<(usize, u64, u64, u64), buffertk::Error> {
    let mut up = Unpacker::new(buf);
    let shared: v64 = up.unpack()?;
    let unshared: v64 = up.unpack()?;
    let value_sz: v64 = up.unpack()?;
    let header_sz = buf.len() - up.remain().len();
    Ok((header_sz, shared.into(), unshared.into(), value_sz.into()))
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
