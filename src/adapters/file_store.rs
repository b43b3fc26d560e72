//! JSON file storage adapter.
//!
//! Implements [`StoragePort`] over two plain files, one per
//! [`Document`].  Writes go to `<path>.tmp` and are renamed over the
//! target, so a crash mid-write leaves the previous document intact.
//! A quarantined document is renamed to `<path>.corrupt`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::ports::{Document, StoragePort};
use crate::error::{Error, Result};

pub struct FileStore {
    snapshot_path: PathBuf,
    history_path: PathBuf,
}

impl FileStore {
    pub fn new(snapshot_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            history_path: history_path.into(),
        }
    }

    pub fn path(&self, document: Document) -> &Path {
        match document {
            Document::Snapshot => &self.snapshot_path,
            Document::History => &self.history_path,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn corrupt_path(path: &Path) -> PathBuf {
    with_suffix(path, ".corrupt")
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = tmp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

impl StoragePort for FileStore {
    fn load(&self, document: Document) -> Result<Option<String>> {
        let path = self.path(document);
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{document}: {} does not exist", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn store(&mut self, document: Document, contents: &str) -> Result<()> {
        let path = self.path(document);
        write_atomic(path, contents).map_err(|e| Error::io(path, e))?;
        debug!("{document}: wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }

    fn quarantine(&mut self, document: Document) -> Result<()> {
        let path = self.path(document);
        let aside = corrupt_path(path);
        fs::rename(path, &aside).map_err(|e| Error::io(path, e))?;
        warn!("{document}: moved {} to {}", path.display(), aside.display());
        Ok(())
    }
}
