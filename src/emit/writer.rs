use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, TopologyError};

/// One self-contained file of the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUnit {
    pub file_name: String,
    pub contents: String,
}

impl ConfigUnit {
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        ConfigUnit { file_name: file_name.into(), contents: contents.into() }
    }
}

/// Writes `units` into `dir`, creating it if needed, and returns the paths
/// written in order.
///
/// Each unit goes to a temporary file inside `dir` first and is renamed into
/// place once fully written, so a reader never sees a half-written config.
pub fn write_units(dir: &Path, units: &[ConfigUnit]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| TopologyError::io(dir, e))?;

    let mut written = Vec::with_capacity(units.len());
    for unit in units {
        let path = dir.join(&unit.file_name);
        write_atomically(dir, &path, unit.contents.as_bytes())?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TopologyError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| TopologyError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| TopologyError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| TopologyError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directory_and_writes_every_unit() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("configs");
        let units = vec![ConfigUnit::new("vars", "left_context=1\n"), ConfigUnit::new("a.config", "x\n")];

        let written = write_units(&dir, &units).unwrap();

        assert_eq!(written, vec![dir.join("vars"), dir.join("a.config")]);
        assert_eq!(fs::read_to_string(dir.join("vars")).unwrap(), "left_context=1\n");
        assert_eq!(fs::read_to_string(dir.join("a.config")).unwrap(), "x\n");
        // No temporary files are left behind.
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn overwrites_existing_units() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("vars"), "stale").unwrap();

        write_units(root.path(), &[ConfigUnit::new("vars", "fresh")]).unwrap();

        assert_eq!(fs::read_to_string(root.path().join("vars")).unwrap(), "fresh");
    }

    #[test]
    fn reports_the_offending_path() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let err = write_units(&blocker, &[ConfigUnit::new("vars", "")]).unwrap_err();
        match err {
            TopologyError::Io { path, .. } => assert_eq!(path, blocker),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
