//! Input and output path validation.
//!
//! Required inputs are checked before any processing starts, so a missing
//! file is reported immediately rather than after a partial run.

use std::path::Path;

use crate::errors::{JuncfiltError, Result};

/// Validates that a file exists.
///
/// # Errors
/// Returns an error if the file does not exist.
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(JuncfiltError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Prepares the directory an output file will be written into, creating it
/// if absent.
///
/// # Errors
/// Returns an error if the directory cannot be created or a non-directory
/// file occupies its path.
pub fn prepare_output_dir<P: AsRef<Path>>(output: P) -> Result<()> {
    let output_ref = output.as_ref();
    let dir = match output_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };

    if dir.exists() {
        if !dir.is_dir() {
            return Err(JuncfiltError::InvalidFileFormat {
                file_type: "Output directory".to_string(),
                path: dir.display().to_string(),
                reason: "A file exists with the name of the output directory".to_string(),
            });
        }
        return Ok(());
    }

    std::fs::create_dir_all(dir).map_err(|e| JuncfiltError::InvalidFileFormat {
        file_type: "Output directory".to_string(),
        path: dir.display().to_string(),
        reason: e.to_string(),
    })
}
