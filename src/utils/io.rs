//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents with standardized error handling.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("{} {}", operation, path.display())),
        )
    })
}

/// Write content to file with standardized error handling.
pub fn write_file(path: &Path, content: &str, operation: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("{} {}", operation, path.display())),
        )
    })
}

/// Recursively copy `src` into `dest`, creating `dest` if needed.
///
/// Returns the number of files copied.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", dest.display())))
    })?;

    let entries = fs::read_dir(src).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read dir {}", src.display())))
    })?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read dir {}", src.display())))
        })?;
        let path = entry.path();
        let target = dest.join(entry.file_name());

        if path.is_dir() {
            copied += copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(|e| {
                Error::internal_io(
                    e.to_string(),
                    Some(format!("copy {} -> {}", path.display(), target.display())),
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}
