//! Write output files via a temporary sibling path that is renamed
//! into place once complete, so that readers never see half-written
//! tables.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::debug;

#[derive(Debug, thiserror::Error)]
pub enum TempfileError {
    #[error("path is missing parent directory part")]
    MissingParent,
    #[error("path is missing file name part")]
    MissingFileName,
}

/// Append a suffix `.tmp~<pid>` to the file name part of
/// `target_path`.
pub fn temp_path(target_path: impl AsRef<Path>) -> Result<PathBuf, TempfileError> {
    let target_path = target_path.as_ref();
    let dir = target_path.parent().ok_or(TempfileError::MissingParent)?;
    let file_name = target_path
        .file_name()
        .ok_or(TempfileError::MissingFileName)?;
    let pid = std::process::id();
    Ok(dir.join(format!("{}.tmp~{pid}", file_name.to_string_lossy())))
}

/// Deletes the path on drop unless `keep` was called.
struct TemporaryFile {
    path: PathBuf,
    keep: bool,
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        if !self.keep {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!("deleted temporary file {:?}", self.path),
                Err(e) => debug!("error deleting temporary file {:?}: {e:#}", self.path),
            }
        }
    }
}

/// Call `write` with a buffered writer to a temporary file, then
/// flush it and rename it to `target_path`. On errors the temporary
/// file is removed and `target_path` is left untouched.
pub fn write_atomically<T>(
    target_path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let path = temp_path(target_path)
        .with_context(|| anyhow!("invalid output path {target_path:?}"))?;
    let mut tmp = TemporaryFile {
        path: path.clone(),
        keep: false,
    };
    let file = File::create(&path).with_context(|| anyhow!("creating file {path:?}"))?;
    let mut out = BufWriter::new(file);
    let value = write(&mut out)?;
    out.flush()
        .with_context(|| anyhow!("writing to file {path:?}"))?;
    std::fs::rename(&path, target_path)
        .with_context(|| anyhow!("renaming {path:?} to {target_path:?}"))?;
    tmp.keep = true;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_temp_path() -> Result<()> {
        let p = temp_path("/some/dir/table.csv")?;
        assert_eq!(p.parent(), Some(Path::new("/some/dir")));
        let name = p.file_name().expect("has name").to_string_lossy().to_string();
        assert!(name.starts_with("table.csv.tmp~"));
        Ok(())
    }

    #[test]
    fn t_write_atomically() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("mobench-atomic-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let target = dir.join("out.txt");
        write_atomically(&target, |out| {
            out.write_all(b"hello\n")?;
            Ok(())
        })?;
        assert_eq!(std::fs::read_to_string(&target)?, "hello\n");

        let res: Result<()> = write_atomically(&dir.join("failing.txt"), |out| {
            out.write_all(b"partial")?;
            anyhow::bail!("giving up")
        });
        assert!(res.is_err());
        assert!(!dir.join("failing.txt").exists());
        assert!(!temp_path(dir.join("failing.txt"))?.exists());

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
