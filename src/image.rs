//! Read-only access to a built SLOPFS1 image.
//!
//! [`Image`] borrows an immutable byte buffer and never mutates or copies it,
//! so any number of lookups may run concurrently over the same loaded (or
//! memory-mapped) image. Malformed input is reported as
//! [`LookupError::CorruptImage`]; every offset and length is bounds-checked
//! against the buffer before slicing.

use std::ops::Range;
use thiserror::Error;

use crate::layout::{
    BootHeader, DirEntry, Superblock, BOOT_HEADER_SIZE, ENTRY_SIZE, MAGIC, SUPERBLOCK_USED,
    VERSION,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("corrupt image: {0}")]
    CorruptImage(&'static str),

    #[error("no such file in image: {0}")]
    NotFound(String),
}

use LookupError::CorruptImage;

/// A parsed view over an immutable image buffer.
#[derive(Debug, Clone)]
pub struct Image<'a> {
    bytes: &'a [u8],
    boot_len: usize,
    /// Directory region, absolute bounds within `bytes`.
    dir: Range<usize>,
}

impl<'a> Image<'a> {
    /// Validate the boot header and superblock and locate the directory.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, LookupError> {
        let header_bytes: &[u8; BOOT_HEADER_SIZE] = bytes
            .get(..BOOT_HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(CorruptImage("truncated boot header"))?;
        let header = BootHeader::decode(header_bytes);

        let boot_len = header.boot_len as usize;
        if BOOT_HEADER_SIZE
            .checked_add(boot_len)
            .map_or(true, |end| end > bytes.len())
        {
            return Err(CorruptImage("boot payload out of bounds"));
        }

        let fs_offset = header.fs_offset as usize;
        let sb_end = fs_offset
            .checked_add(SUPERBLOCK_USED)
            .ok_or(CorruptImage("superblock offset overflows"))?;
        let sb_bytes: &[u8; SUPERBLOCK_USED] = bytes
            .get(fs_offset..sb_end)
            .and_then(|b| b.try_into().ok())
            .ok_or(CorruptImage("superblock out of bounds"))?;
        let superblock = Superblock::decode(sb_bytes);

        if superblock.magic != MAGIC {
            return Err(CorruptImage("bad magic"));
        }
        if superblock.version != VERSION {
            return Err(CorruptImage("unsupported version"));
        }

        let dir_len = superblock.dir_len as usize;
        if dir_len % ENTRY_SIZE != 0 {
            return Err(CorruptImage("directory length not a multiple of entry size"));
        }
        let dir_start = fs_offset
            .checked_add(superblock.dir_off as usize)
            .ok_or(CorruptImage("directory offset overflows"))?;
        let dir_end = dir_start
            .checked_add(dir_len)
            .ok_or(CorruptImage("directory length overflows"))?;
        if dir_end > bytes.len() {
            return Err(CorruptImage("directory out of bounds"));
        }

        Ok(Image {
            bytes,
            boot_len,
            dir: dir_start..dir_end,
        })
    }

    /// Find `name` in the directory and return the absolute byte range of its
    /// data. Names match exactly, with NUL padding trimmed; the first match
    /// in stored order wins.
    pub fn resolve(&self, name: &str) -> Result<Range<usize>, LookupError> {
        for entry in self.dir_entries() {
            if entry.name_bytes() != name.as_bytes() {
                continue;
            }
            let start = entry.offset as usize;
            let end = start
                .checked_add(entry.length as usize)
                .ok_or(CorruptImage("entry length overflows"))?;
            if end > self.bytes.len() {
                return Err(CorruptImage("entry data out of bounds"));
            }
            return Ok(start..end);
        }
        Err(LookupError::NotFound(name.to_string()))
    }

    /// The stored bytes of `name`.
    pub fn read(&self, name: &str) -> Result<&'a [u8], LookupError> {
        let range = self.resolve(name)?;
        Ok(&self.bytes[range])
    }

    /// `(name, length)` for every directory entry, in stored order (the
    /// builder's lexicographic order, boot payload excluded).
    pub fn entries(&self) -> impl Iterator<Item = (String, u32)> + 'a {
        self.dir_entries()
            .map(|entry| {
                (
                    String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                    entry.length,
                )
            })
    }

    /// The raw boot payload stored ahead of the filesystem.
    pub fn boot_payload(&self) -> &'a [u8] {
        &self.bytes[BOOT_HEADER_SIZE..BOOT_HEADER_SIZE + self.boot_len]
    }

    fn dir_entries(&self) -> impl Iterator<Item = DirEntry> + 'a {
        let bytes: &'a [u8] = self.bytes;
        bytes[self.dir.clone()].chunks_exact(ENTRY_SIZE).map(|raw| {
            let raw: &[u8; ENTRY_SIZE] = raw.try_into().unwrap();
            DirEntry::decode(raw)
        })
    }
}
