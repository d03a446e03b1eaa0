//! Build configuration.
//!
//! The builder takes an explicit [`BuildConfig`] instead of reading ambient
//! process state (working directory, environment toggles). The CLI constructs
//! one from its two positional arguments; embedding tools can load the same
//! structure from a TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved name of the boot payload file inside the input directory.
pub const DEFAULT_BOOT_PAYLOAD: &str = "boot.scm";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory of input files, one of which is the boot payload.
    pub input_dir: PathBuf,
    /// Where the finished image is written.
    pub output_path: PathBuf,
    /// Name of the distinguished boot payload file.
    #[serde(default = "default_boot_payload_name")]
    pub boot_payload_name: String,
}

fn default_boot_payload_name() -> String {
    DEFAULT_BOOT_PAYLOAD.to_string()
}

impl BuildConfig {
    pub fn new(input_dir: PathBuf, output_path: PathBuf) -> Self {
        BuildConfig {
            input_dir,
            output_path,
            boot_payload_name: default_boot_payload_name(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading build config '{}'", path.display()))?;
        let config: BuildConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing build config '{}'", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.toml");
        fs::write(
            &path,
            "input_dir = \"/tmp/in\"\noutput_path = \"/tmp/out.img\"\n",
        )
        .unwrap();

        let config = BuildConfig::from_toml_path(&path).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/tmp/in"));
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.img"));
        assert_eq!(config.boot_payload_name, DEFAULT_BOOT_PAYLOAD);
    }

    #[test]
    fn test_from_toml_overrides_boot_payload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.toml");
        fs::write(
            &path,
            "input_dir = \"in\"\noutput_path = \"out.img\"\nboot_payload_name = \"stage1.bin\"\n",
        )
        .unwrap();

        let config = BuildConfig::from_toml_path(&path).unwrap();
        assert_eq!(config.boot_payload_name, "stage1.bin");
    }

    #[test]
    fn test_from_toml_rejects_unknown_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.toml");
        fs::write(
            &path,
            "input_dir = \"in\"\noutput_path = \"out.img\"\ncompression = 9\n",
        )
        .unwrap();

        assert!(BuildConfig::from_toml_path(&path).is_err());
    }
}
