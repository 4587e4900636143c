//! Database configuration.

use shelfdb_storage::WriteMode;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to write an empty image if the backing file doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the image to disk after every write (safer but slower).
    pub sync_on_write: bool,

    /// How the image file is replaced on write.
    pub write_mode: WriteMode,

    /// Whether to pretty-print the JSON image.
    pub pretty: bool,

    /// Whether to hold an exclusive advisory lock on the image for the
    /// lifetime of the handle.
    pub exclusive_lock: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            write_mode: WriteMode::Overwrite,
            pretty: false,
            exclusive_lock: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the image if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the image write mode.
    #[must_use]
    pub const fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Sets whether to pretty-print the image.
    #[must_use]
    pub const fn pretty(mut self, value: bool) -> Self {
        self.pretty = value;
        self
    }

    /// Sets whether to take the exclusive advisory lock.
    #[must_use]
    pub const fn exclusive_lock(mut self, value: bool) -> Self {
        self.exclusive_lock = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
        assert!(config.exclusive_lock);
        assert!(!config.pretty);
        assert_eq!(config.write_mode, WriteMode::Overwrite);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_write(false)
            .write_mode(WriteMode::AtomicReplace)
            .pretty(true);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
        assert!(config.pretty);
        assert_eq!(config.write_mode, WriteMode::AtomicReplace);
    }
}
