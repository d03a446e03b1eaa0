//! Image builder: lay out a SLOPFS1 image from a directory of input files.
//!
//! The build is one pass and all-or-nothing: inputs are read, the whole image
//! is assembled in memory, then written to a temporary file and renamed into
//! place. A failed build never leaves a partial or stale-overwritten output.
//!
//! Builds are deterministic. Non-boot files are laid out in lexicographic
//! name order and packed back-to-back, so two builds from identical inputs
//! produce byte-identical images.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::layout::{
    align_up, BootHeader, DirEntry, Superblock, BOOT_HEADER_SIZE, ENTRY_NAME_LEN, ENTRY_SIZE,
    MAGIC, SECTOR_SIZE, SUPERBLOCK_SIZE, SUPERBLOCK_USED, VERSION,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("boot payload '{name}' not found in input directory")]
    MissingBootPayload { name: String },

    #[error("file name exceeds {} bytes: {name}", ENTRY_NAME_LEN)]
    NameTooLong { name: String },

    #[error("file name is not ASCII: {name}")]
    NameNotAscii { name: String },

    #[error("image exceeds the u32 addressable range ({size} bytes)")]
    ImageTooLarge { size: u64 },

    #[error("{msg}: {source}")]
    Io {
        msg: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    fn io(msg: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            msg: msg.into(),
            source,
        }
    }
}

/// What a successful build produced.
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    /// Number of files stored in the directory (boot payload excluded).
    pub file_count: usize,
    /// Total image length in bytes.
    pub image_len: u64,
}

/// A non-boot input file, name-validated, in directory order.
struct InputFile {
    name: String,
    path: PathBuf,
}

/// Computed region offsets for one build, all absolute from image start.
struct Layout {
    fs_offset: u64,
    dir_offset: u64,
    data_offset: u64,
    /// Per-file absolute data offsets, in directory order.
    placements: Vec<u64>,
    total_size: u64,
}

/// Compute every region boundary from the boot payload length and the
/// (ordered) input file sizes. Pure layout math, kept separate from I/O.
fn plan_layout(boot_len: u64, file_sizes: &[u64]) -> Layout {
    let fs_offset = align_up(BOOT_HEADER_SIZE as u64 + boot_len, SECTOR_SIZE);
    let dir_offset = fs_offset + SUPERBLOCK_SIZE as u64;
    let dir_len = file_sizes.len() as u64 * ENTRY_SIZE as u64;
    let data_offset = align_up(dir_offset + dir_len, SECTOR_SIZE);

    let mut placements = Vec::with_capacity(file_sizes.len());
    let mut cursor = data_offset;
    for &size in file_sizes {
        placements.push(cursor);
        cursor += size;
    }

    Layout {
        fs_offset,
        dir_offset,
        data_offset,
        placements,
        total_size: align_up(cursor, SECTOR_SIZE),
    }
}

/// List the regular files in `dir` other than the boot payload, sorted
/// lexicographically by name. Subdirectories and non-regular entries are
/// skipped.
fn enumerate_inputs(config: &BuildConfig) -> Result<Vec<InputFile>, BuildError> {
    let mut inputs = Vec::new();

    let walker = WalkDir::new(&config.input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            BuildError::io(
                format!("reading input directory '{}'", config.input_dir.display()),
                e.into(),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = match entry.file_name().to_str() {
            Some(name) if name.is_ascii() => name.to_string(),
            _ => {
                return Err(BuildError::NameNotAscii {
                    name: entry.file_name().to_string_lossy().into_owned(),
                })
            }
        };
        if name == config.boot_payload_name {
            continue;
        }
        if name.len() > ENTRY_NAME_LEN {
            return Err(BuildError::NameTooLong { name });
        }

        inputs.push(InputFile {
            name,
            path: entry.into_path(),
        });
    }

    Ok(inputs)
}

fn assemble(config: &BuildConfig) -> Result<(Vec<u8>, BuildSummary), BuildError> {
    let boot_path = config.input_dir.join(&config.boot_payload_name);
    if !boot_path.is_file() {
        return Err(BuildError::MissingBootPayload {
            name: config.boot_payload_name.clone(),
        });
    }
    let boot_data = fs::read(&boot_path)
        .map_err(|e| BuildError::io(format!("reading '{}'", boot_path.display()), e))?;

    let inputs = enumerate_inputs(config)?;
    let mut file_data = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let data = fs::read(&input.path)
            .map_err(|e| BuildError::io(format!("reading '{}'", input.path.display()), e))?;
        file_data.push(data);
    }

    let sizes: Vec<u64> = file_data.iter().map(|d| d.len() as u64).collect();
    let layout = plan_layout(boot_data.len() as u64, &sizes);
    if layout.total_size > u64::from(u32::MAX) {
        return Err(BuildError::ImageTooLarge {
            size: layout.total_size,
        });
    }

    debug!(
        "layout: fs_offset={:#x} dir_offset={:#x} data_offset={:#x} total={:#x}",
        layout.fs_offset, layout.dir_offset, layout.data_offset, layout.total_size
    );

    let mut image = vec![0u8; layout.total_size as usize];

    let header = BootHeader {
        boot_len: boot_data.len() as u32,
        fs_offset: layout.fs_offset as u32,
    };
    image[..BOOT_HEADER_SIZE].copy_from_slice(&header.encode());
    image[BOOT_HEADER_SIZE..BOOT_HEADER_SIZE + boot_data.len()].copy_from_slice(&boot_data);

    let superblock = Superblock {
        magic: MAGIC,
        version: VERSION,
        dir_off: (layout.dir_offset - layout.fs_offset) as u32,
        dir_len: (inputs.len() * ENTRY_SIZE) as u32,
        data_off: (layout.data_offset - layout.fs_offset) as u32,
    };
    let fs_offset = layout.fs_offset as usize;
    image[fs_offset..fs_offset + SUPERBLOCK_USED].copy_from_slice(&superblock.encode());

    let mut entry_pos = layout.dir_offset as usize;
    for (i, (input, data)) in inputs.iter().zip(&file_data).enumerate() {
        let data_off = layout.placements[i];
        let entry = DirEntry::new(&input.name, data_off as u32, data.len() as u32);
        image[entry_pos..entry_pos + ENTRY_SIZE].copy_from_slice(&entry.encode());
        entry_pos += ENTRY_SIZE;

        let start = data_off as usize;
        image[start..start + data.len()].copy_from_slice(data);
        debug!("placed '{}' at {:#x} ({} bytes)", input.name, data_off, data.len());
    }

    let summary = BuildSummary {
        file_count: inputs.len(),
        image_len: layout.total_size,
    };
    Ok((image, summary))
}

/// Lay out the whole image in memory without touching the output path.
pub fn build_image(config: &BuildConfig) -> Result<Vec<u8>, BuildError> {
    Ok(assemble(config)?.0)
}

/// Build the image and persist it to `config.output_path`.
///
/// The buffer is written to a sibling `.tmp` file and renamed over the
/// output, so the output either appears complete or is left untouched.
pub fn build(config: &BuildConfig) -> Result<BuildSummary, BuildError> {
    let (image, summary) = assemble(config)?;

    let mut tmp_name = config.output_path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, &image)
        .map_err(|e| BuildError::io(format!("writing '{}'", tmp_path.display()), e))?;
    if let Err(e) = fs::rename(&tmp_path, &config.output_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(BuildError::io(
            format!("renaming '{}' into place", tmp_path.display()),
            e,
        ));
    }

    info!(
        "wrote '{}': {} files, {} bytes",
        config.output_path.display(),
        summary.file_count,
        summary.image_len
    );
    Ok(summary)
}
