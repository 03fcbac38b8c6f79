//! Writing build artifacts.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write `content` to `path`, creating parent directories, and sync it to disk
/// before returning so dependent tasks observe the complete file.
pub fn write_output(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}
