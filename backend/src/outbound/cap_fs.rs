//! Capability-scoped file access.
//!
//! The backend never calls `std::fs` directly: each read or write opens the
//! parent directory through `cap_std` and touches a single entry inside it.

use std::ffi::OsString;
use std::io;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};

fn parent_and_file_name(path: &Path) -> io::Result<(&Path, OsString)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        )
    })?;
    Ok((parent, file_name.to_os_string()))
}

/// Read a whole file.
pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let (parent, file_name) = parent_and_file_name(path)?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.read(Path::new(&file_name))
}

/// Create or replace a file.
pub fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let (parent, file_name) = parent_and_file_name(path)?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.write(Path::new(&file_name), contents)
}
