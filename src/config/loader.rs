// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{NetFile, RawNetFile};
use crate::errors::Result;

/// Load a chain file from a given path and return the raw `RawNetFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawNetFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawNetFile> {
    let raw: RawNetFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a chain file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - empty nets and empty chains,
///   - unknown `after` references and cycles,
///   - executor limits that make no sense.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<NetFile> {
    let raw = load_from_path(&path)?;
    NetFile::try_from(raw)
}

/// `Chaindag.toml` in the current working directory.
pub fn default_net_path() -> PathBuf {
    PathBuf::from("Chaindag.toml")
}
