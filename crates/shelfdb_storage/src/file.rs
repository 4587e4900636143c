//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// How [`FileBackend::write_all`] replaces the image on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate the file and write the new image in place.
    ///
    /// A crash or I/O error in the middle of the write can leave a
    /// truncated image behind. The next load will not decode it and
    /// ShelfDB substitutes an empty image.
    #[default]
    Overwrite,

    /// Write a sibling `<file>.tmp`, sync it, then rename it over the image.
    ///
    /// Readers observe either the old or the new image, never a mix.
    AtomicReplace,
}

/// A single-file storage backend.
///
/// The file is opened anew for every read and write; the backend keeps no
/// file handle to the image between calls. Data survives process restarts.
///
/// # Locking
///
/// [`FileBackend::lock_exclusive`] takes an advisory lock on a sibling
/// `<file>.lock` that is held until the backend is dropped. Other handles
/// (in this or another process) that try to lock the same image fail with
/// [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use shelfdb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("shelf.json")).unwrap();
/// backend.write_all(br#"{"items":{}}"#).unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_mode: WriteMode,
    lock_file: Option<File>,
}

impl FileBackend {
    /// Creates a backend for the image file at `path`.
    ///
    /// The file itself is not created; it appears on the first
    /// [`StorageBackend::write_all`].
    ///
    /// # Errors
    ///
    /// Returns an error if `path` exists but is not a regular file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.is_dir() {
            return Err(StorageError::open(
                path,
                io::Error::new(ErrorKind::InvalidInput, "path is a directory"),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_mode: WriteMode::default(),
            lock_file: None,
        })
    }

    /// Creates a backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or `path` is a directory.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Sets how images are written.
    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Returns the current write mode.
    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Returns the path to the image file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.path, ".lock")
    }

    /// Returns whether this backend holds the exclusive lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_file.is_some()
    }

    /// Acquires the exclusive advisory lock for this image.
    ///
    /// The lock is released when the backend is dropped. Calling this on a
    /// backend that already holds the lock is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock.
    pub fn lock_exclusive(&mut self) -> StorageResult<()> {
        if self.lock_file.is_some() {
            return Ok(());
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(lock_path));
        }

        self.lock_file = Some(lock_file);
        Ok(())
    }

    fn overwrite(&self, data: &[u8]) -> StorageResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| StorageError::write(&self.path, e))?;
        file.write_all(data)
            .and_then(|()| file.flush())
            .map_err(|e| StorageError::write(&self.path, e))
    }

    fn atomic_replace(&self, data: &[u8]) -> StorageResult<()> {
        let tmp_path = sibling(&self.path, ".tmp");

        let written = (|| -> io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(data)?;
            file.flush()?;
            file.sync_all()
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::write(&tmp_path, e));
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StorageError::write(&self.path, e)
        })
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::Missing(self.path.clone()),
            _ => StorageError::open(&self.path, e),
        })
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        match self.write_mode {
            WriteMode::Overwrite => self.overwrite(data),
            WriteMode::AtomicReplace => self.atomic_replace(data),
        }
    }

    fn sync(&mut self) -> StorageResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| StorageError::write(&self.path, e))?;
        file.sync_all()
            .map_err(|e| StorageError::write(&self.path, e))
    }

    fn exists(&self) -> StorageResult<bool> {
        Ok(self.path.is_file())
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::open(&self.path, e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// `<dir>/<name><suffix>` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("shelf"));
    name.push(suffix);
    path.with_file_name(name)
}
