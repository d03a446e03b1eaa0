//! On-disk layout for SLOPFS1 images.
//!
//! An image is a single flat byte buffer with four regions, each starting on
//! a 512-byte sector boundary:
//!
//! ```text
//! offset 0        8            fs_offset    fs_offset+512      data_offset
//! ├─ BootHeader ──┼─ payload ──┼─ superblock ┼─── directory ────┼─ file data ─┤
//! ```
//!
//! The boot header and payload frame the filesystem: the payload is loaded
//! before the filesystem is ever mounted, so the header carries only its
//! length and the absolute offset where the superblock begins. All integers
//! are little-endian.
//!
//! Offset frames of reference:
//! - `Superblock::dir_off` and `Superblock::data_off` are relative to
//!   `fs_offset`.
//! - `DirEntry::offset` is absolute from the start of the image.

/// Superblock signature.
pub const MAGIC: [u8; 8] = *b"SLOPFS1\0";

/// Current format version.
pub const VERSION: u32 = 1;

/// Alignment unit for every region boundary, matching block-device sectors.
pub const SECTOR_SIZE: u64 = 512;

/// Encoded size of [`BootHeader`].
pub const BOOT_HEADER_SIZE: usize = 8;

/// Bytes reserved for the superblock region. Only [`SUPERBLOCK_USED`] are
/// meaningful; the rest stay zero.
pub const SUPERBLOCK_SIZE: usize = 512;

/// Encoded size of [`Superblock`].
pub const SUPERBLOCK_USED: usize = 24;

/// Maximum directory entry name length, in ASCII bytes.
pub const ENTRY_NAME_LEN: usize = 64;

/// Encoded size of [`DirEntry`]: name + offset + length + reserved.
pub const ENTRY_SIZE: usize = ENTRY_NAME_LEN + 4 + 4 + 4;

/// Round `value` up to the next multiple of `multiple`.
pub fn align_up(value: u64, multiple: u64) -> u64 {
    (value + multiple - 1) / multiple * multiple
}

/// Fixed 8-byte header at image offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootHeader {
    /// Byte length of the boot payload stored at offset 8.
    pub boot_len: u32,
    /// Absolute byte offset of the superblock. Always
    /// `align_up(8 + boot_len, 512)`.
    pub fs_offset: u32,
}

impl BootHeader {
    pub fn encode(&self) -> [u8; BOOT_HEADER_SIZE] {
        let mut buf = [0u8; BOOT_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.boot_len.to_le_bytes());
        buf[4..8].copy_from_slice(&self.fs_offset.to_le_bytes());
        buf
    }

    /// Decode from the first [`BOOT_HEADER_SIZE`] bytes of an image. The
    /// caller is responsible for bounds-checking the slice.
    pub fn decode(bytes: &[u8; BOOT_HEADER_SIZE]) -> Self {
        BootHeader {
            boot_len: read_u32(&bytes[0..4]),
            fs_offset: read_u32(&bytes[4..8]),
        }
    }
}

/// Filesystem metadata at `fs_offset`, inside a reserved 512-byte region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic: [u8; 8],
    pub version: u32,
    /// Directory offset relative to `fs_offset`. Always [`SUPERBLOCK_SIZE`];
    /// the directory begins right after the reserved region.
    pub dir_off: u32,
    /// Total byte length of all directory entries.
    pub dir_len: u32,
    /// Data region offset relative to `fs_offset`.
    pub data_off: u32,
}

impl Superblock {
    pub fn encode(&self) -> [u8; SUPERBLOCK_USED] {
        let mut buf = [0u8; SUPERBLOCK_USED];
        buf[0..8].copy_from_slice(&self.magic);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.dir_off.to_le_bytes());
        buf[16..20].copy_from_slice(&self.dir_len.to_le_bytes());
        buf[20..24].copy_from_slice(&self.data_off.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8; SUPERBLOCK_USED]) -> Self {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);
        Superblock {
            magic,
            version: read_u32(&bytes[8..12]),
            dir_off: read_u32(&bytes[12..16]),
            dir_len: read_u32(&bytes[16..20]),
            data_off: read_u32(&bytes[20..24]),
        }
    }
}

/// One fixed-size directory record mapping a file name to its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// ASCII name, NUL-padded to [`ENTRY_NAME_LEN`] bytes.
    pub name: [u8; ENTRY_NAME_LEN],
    /// Absolute byte offset of the file data from the start of the image.
    pub offset: u32,
    /// Byte length of the file data.
    pub length: u32,
    /// Written as zero; ignored by readers.
    pub reserved: u32,
}

impl DirEntry {
    /// Build an entry for a validated name. The name must already be ASCII
    /// and at most [`ENTRY_NAME_LEN`] bytes; the builder enforces both
    /// before any entry is created.
    pub fn new(name: &str, offset: u32, length: u32) -> Self {
        let mut padded = [0u8; ENTRY_NAME_LEN];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        DirEntry {
            name: padded,
            offset,
            length,
            reserved: 0,
        }
    }

    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[..ENTRY_NAME_LEN].copy_from_slice(&self.name);
        buf[64..68].copy_from_slice(&self.offset.to_le_bytes());
        buf[68..72].copy_from_slice(&self.length.to_le_bytes());
        buf[72..76].copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    /// Decode from an exactly [`ENTRY_SIZE`]-byte slice.
    pub fn decode(bytes: &[u8; ENTRY_SIZE]) -> Self {
        let mut name = [0u8; ENTRY_NAME_LEN];
        name.copy_from_slice(&bytes[..ENTRY_NAME_LEN]);
        DirEntry {
            name,
            offset: read_u32(&bytes[64..68]),
            length: read_u32(&bytes[68..72]),
            reserved: read_u32(&bytes[72..76]),
        }
    }

    /// The stored name with NUL padding trimmed.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(ENTRY_NAME_LEN);
        &self.name[..end]
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 512), 0);
        assert_eq!(align_up(1, 512), 512);
        assert_eq!(align_up(512, 512), 512);
        assert_eq!(align_up(513, 512), 1024);
    }

    #[test]
    fn test_entry_size() {
        assert_eq!(ENTRY_SIZE, 76);
        assert_eq!(DirEntry::new("a", 0, 0).encode().len(), 76);
    }

    #[test]
    fn test_boot_header_round_trip() {
        let header = BootHeader {
            boot_len: 1234,
            fs_offset: 1536,
        };
        assert_eq!(BootHeader::decode(&header.encode()), header);
    }

    #[test]
    fn test_superblock_round_trip() {
        let sb = Superblock {
            magic: MAGIC,
            version: VERSION,
            dir_off: 512,
            dir_len: 152,
            data_off: 1024,
        };
        assert_eq!(Superblock::decode(&sb.encode()), sb);
    }

    #[test]
    fn test_dir_entry_name_trimming() {
        let entry = DirEntry::new("hello.txt", 2048, 17);
        let decoded = DirEntry::decode(&entry.encode());
        assert_eq!(decoded.name_bytes(), b"hello.txt");
        assert_eq!(decoded.offset, 2048);
        assert_eq!(decoded.length, 17);
        assert_eq!(decoded.reserved, 0);
    }

    #[test]
    fn test_dir_entry_full_width_name() {
        let name = "n".repeat(ENTRY_NAME_LEN);
        let entry = DirEntry::new(&name, 0, 0);
        assert_eq!(entry.name_bytes(), name.as_bytes());
    }
}
