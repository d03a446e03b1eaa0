//! Build and inspect SLOPFS1 bootable disk images.
//!
//! A SLOPFS1 image is a single flat binary: a boot payload framed by an
//! 8-byte header, followed by a minimal write-once filesystem holding the
//! remaining input files. The format has no subdirectories, no deletion and
//! no in-place updates; rebuilding the image is the only way to change it.
//!
//! - [`layout`] - the on-disk contract shared by builder and reader
//! - [`builder`] - lay out an image from a directory of input files
//! - [`image`] - resolve names to stored bytes in a built image
//! - [`config`] - explicit build configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use slopfs_image::{build_image, BuildConfig, Image};
//! use std::path::PathBuf;
//!
//! let config = BuildConfig::new(PathBuf::from("inputs"), PathBuf::from("disk.img"));
//! let bytes = build_image(&config)?;
//! let image = Image::parse(&bytes)?;
//! let data = image.read("init.scm")?;
//! ```

pub mod builder;
pub mod config;
pub mod image;
pub mod layout;

pub use builder::{build, build_image, BuildError, BuildSummary};
pub use config::BuildConfig;
pub use image::{Image, LookupError};
