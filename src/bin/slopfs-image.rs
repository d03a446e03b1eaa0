use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use slopfs_image::{build, BuildConfig};

fn usage() -> &'static str {
    "Usage:\n  slopfs-image <input-dir> <output-img>"
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [input_dir, output_img] => run(input_dir, output_img),
        _ => bail!(usage()),
    }
}

fn run(input_dir: &str, output_img: &str) -> Result<()> {
    let config = BuildConfig::new(PathBuf::from(input_dir), PathBuf::from(output_img));
    let summary = build(&config)
        .with_context(|| format!("building image from '{input_dir}' to '{output_img}'"))?;

    println!(
        "wrote {output_img}: {} files, {} bytes",
        summary.file_count, summary.image_len
    );
    Ok(())
}
