use slog::Logger;

use crate::fs::TarFs;
use crate::{MAX_FDS, MAX_INODE};

#[derive(Debug, Clone)]
pub struct Config {
    /// Entries past this many are ignored when loading an archive
    pub max_inodes: usize,
    /// Number of descriptor slots, i.e. how many files may be open at once
    pub max_fds: usize,

    logger: Option<Logger>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_inodes: MAX_INODE,
            max_fds: MAX_FDS,
            logger: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_max_inodes(&mut self, max_inodes: usize) -> &mut Self {
        self.max_inodes = max_inodes;
        self
    }

    pub fn set_max_fds(&mut self, max_fds: usize) -> &mut Self {
        self.max_fds = max_fds;
        self
    }

    pub fn set_logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    /// Build an empty filesystem; load an archive into it with one of the `init_*` methods
    pub fn build<'a>(self) -> TarFs<'a> {
        let logger = self.logger.unwrap_or_else(crate::default_logger);
        TarFs::with_config(self.max_inodes, self.max_fds, logger)
    }
}
