//! Persistence seam: the session treats a document as path-addressable
//! text and leaves file handles, permissions, and atomicity to the
//! implementor.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

pub trait Storage {
    fn load(&self, path: &Path) -> Result<String>;
    fn save(&self, path: &Path, text: &str) -> Result<()>;
    /// Last modification time, when the path exists and the platform
    /// reports one.
    fn mod_time(&self, path: &Path) -> Option<SystemTime>;
}

/// Plain filesystem storage.
pub struct FsStorage;

impl Storage for FsStorage {
    fn load(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn save(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }

    fn mod_time(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok().and_then(|m| m.modified().ok())
    }
}
