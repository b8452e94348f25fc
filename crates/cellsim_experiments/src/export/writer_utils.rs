use std::fs::{File, OpenOptions};
use std::path::Path;

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<(), Box<dyn std::error::Error>> {
    if items.is_empty() {
        return Err("No results to export".into());
    }

    Ok(())
}

pub(crate) fn create_output_file(
    path: impl AsRef<Path>,
) -> Result<File, Box<dyn std::error::Error>> {
    Ok(File::create(path)?)
}

/// Opens `path` for appending, creating it when missing. The flag is true
/// when the file holds no bytes yet.
pub(crate) fn open_append(path: &Path) -> std::io::Result<(File, bool)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;
    Ok((file, is_new))
}
