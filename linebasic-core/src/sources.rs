use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::CoreError;

/// Extension of BASIC program files picked up by [`load_programs`].
pub const PROGRAM_EXTENSION: &str = "bas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Loads every `.bas` file under `root`, sorted by path.
///
/// Paths are relative to `root`. When `root` is a single file it is loaded
/// whatever its extension, under its file name.
pub fn load_programs(root: impl AsRef<Path>) -> Result<Vec<SourceFile>, CoreError> {
    let root = root.as_ref();
    if root.is_file() {
        let contents = fs::read_to_string(root)?;
        let name = root.file_name().map_or_else(|| root.to_path_buf(), PathBuf::from);
        return Ok(vec![SourceFile {
            path: name,
            contents,
        }]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == PROGRAM_EXTENSION)
        {
            let contents = fs::read_to_string(path)?;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            debug!("loaded {}", relative.display());
            files.push(SourceFile {
                path: relative,
                contents,
            });
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
