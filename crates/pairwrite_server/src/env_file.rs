//! Optional `.env` file support.
//!
//! Variables already present in the process environment win over the file.

use std::path::{Path, PathBuf};

/// Loads `.env` from the working directory or one of its parents.
///
/// Returns the loaded file, or `None` when no file exists. A file that exists
/// but cannot be read or parsed is an error.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    absent_is_none(dotenvy::dotenv())
}

/// Loads variables from the file at `path`, with the same rules as
/// [`load_env_file`].
pub fn load_env_file_from(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    absent_is_none(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn absent_is_none(
    result: dotenvy::Result<PathBuf>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
