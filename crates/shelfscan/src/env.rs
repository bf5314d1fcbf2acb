//! `.env` loading, so `OPENAI_API_KEY` and `PORT` can live in a file.

use std::path::{Path, PathBuf};

/// Load variables from `path`, or from the first `.env` found in the current
/// directory or its parents.
///
/// Variables already set in the process are left alone. A missing file is
/// not an error and returns `Ok(None)`.
pub fn load(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
