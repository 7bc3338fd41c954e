//! POSIX style file access to the entries of a USTAR archive
//!
//! A [`TarFs`] indexes an archive once, then serves `open`/`read`/`write`/`seek`/`close`
//! against it through a small table of file descriptors. Archives can be used in
//! place from memory (entry data is borrowed, and writes land in the caller's
//! buffer) or loaded from a file or any reader (entry data is copied). Entries
//! can be overwritten but never grow.
//!
//! ```
//! use tarfs::{OpenFlags, TarFs};
//!
//! let mut archive = Vec::new();
//! let header = tarfs::repr::Header::new(b"a.text", 11, tarfs::TypeFlag::REGULAR)
//!     .expect("11 bytes fit in the size field");
//! tarfs::repr::append(&mut archive, &header, b"hello world");
//! tarfs::repr::finish(&mut archive);
//!
//! let mut fs = TarFs::from_memory(&mut archive)?;
//! let fd = fs.open("a.text", OpenFlags::READ)?;
//! let mut buf = [0; 16];
//! assert_eq!(fs.read(fd, &mut buf)?, 11);
//! assert_eq!(&buf[..11], b"hello world");
//! # Ok::<(), tarfs::Error>(())
//! ```

use bitflags::bitflags;
use slog::{Drain, Logger};

pub mod compression;
pub mod config;
pub mod errors;
pub mod fd;
pub mod file;
pub mod fs;
pub mod inode;
mod parse;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use errors::{Error, Result};
pub use fd::Fd;
pub use file::File;
pub use fs::TarFs;
pub use inode::Metadata;
pub use repr;
pub use repr::{Mode, TypeFlag};
pub use sync::SharedTarFs;

/// Default number of archive entries indexed
pub const MAX_INODE: usize = 16;
/// Default number of descriptor slots
pub const MAX_FDS: usize = 16;

bitflags! {
    /// Accepted by [`TarFs::open`] and currently ignored: every descriptor can read and write
    #[derive(Default)]
    pub struct OpenFlags: u32 {
        const READ = 1;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits | Self::WRITE.bits;
    }
}

/// Origin of a seek
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Offset 0
    Start,
    /// The descriptor's cursor
    Current,
    /// The size of the entry
    End,
}

fn default_logger() -> Logger {
    slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!())
}
