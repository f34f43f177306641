/*!
 * Post-download archive extraction.
 *
 * Every product gets an extraction routine applied to each downloaded file. Both routines here are
 * idempotent, calling them again on an already extracted file is a no-op.
 */

use crate::error::LowResResult;
use std::path::{Path, PathBuf};

/// Signature of the extraction routines.
pub type UnzipFn = fn(&Path) -> LowResResult<PathBuf>;

/// For products delivered as plain files.
pub fn identity(path: &Path) -> LowResResult<PathBuf> {
    Ok(path.to_path_buf())
}

/**
 * Extract a Sentinel-3 SYN zip archive.
 *
 * The archives hold a single `<name>.SEN3` directory, which is extracted next to the archive. The
 * path to that directory is returned. If the directory already exists nothing is extracted.
 */
pub fn unzip_sen3_syn(zip_file: &Path) -> LowResResult<PathBuf> {
    let out_dir = zip_file.with_extension("SEN3");
    if out_dir.exists() {
        log::debug!("{} already extracted", out_dir.display());
        return Ok(out_dir);
    }

    let parent = zip_file.parent().unwrap_or_else(|| Path::new("."));

    let file = std::fs::File::open(zip_file)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(parent)?;

    if !out_dir.is_dir() {
        return Err(format!(
            "{} did not contain {}",
            zip_file.display(),
            out_dir
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default()
        )
        .into());
    }

    log::debug!("extracted {}", out_dir.display());
    Ok(out_dir)
}
