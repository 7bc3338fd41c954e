use slog::Logger;

use std::cmp;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::compression;
use crate::errors::{Error, Result};
use crate::fd::{self, Fd};
use crate::file::File;
use crate::inode::{self, Inode, Metadata};
use crate::parse;
use crate::{Config, OpenFlags, Whence};

/// A mounted archive: the inode table plus the open descriptors into it
///
/// `'a` is the lifetime of the buffer passed to [`init_from_memory`](TarFs::init_from_memory);
/// archives loaded from a path or reader own their data and work with any `'a`.
#[derive(Debug)]
pub struct TarFs<'a> {
    inodes: inode::Table<'a>,
    fds: fd::Table,
    logger: Logger,
}

impl<'a> TarFs<'a> {
    /// An empty filesystem with the default configuration
    pub fn new() -> Self {
        Config::new().build()
    }

    pub(crate) fn with_config(max_inodes: usize, max_fds: usize, logger: Logger) -> Self {
        Self {
            inodes: inode::Table::new(max_inodes),
            fds: fd::Table::new(max_fds),
            logger,
        }
    }

    pub fn from_memory(archive: &'a mut [u8]) -> Result<Self> {
        let mut fs = Self::new();
        fs.init_from_memory(archive)?;
        Ok(fs)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut fs = Self::new();
        fs.init_from_path(path)?;
        Ok(fs)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut fs = Self::new();
        fs.init_from_reader(reader)?;
        Ok(fs)
    }

    /// Index an archive held in memory, replacing anything loaded before
    ///
    /// Entries are not copied: reads come from `archive`, and writes modify it.
    /// Every open descriptor is closed.
    pub fn init_from_memory(&mut self, archive: &'a mut [u8]) -> Result<()> {
        self.reset();
        let result = parse::parse_memory(archive, &mut self.inodes, &self.logger);
        self.finish_load(result, "memory")
    }

    /// Load an archive file, replacing anything loaded before
    ///
    /// Gzip and zstd compressed archives are detected and decoded. Every open
    /// descriptor is closed.
    pub fn init_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self._init_from_path(path.as_ref())
    }

    fn _init_from_path(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path).map_err(|source| Error::UnableToOpen {
            path: path.to_owned(),
            source,
        })?;

        let path_str = path.display().to_string();
        let logger = self.logger.new(slog::o!("file" => path_str));
        let logger = std::mem::replace(&mut self.logger, logger);
        let result = self.init_from_reader(file);
        self.logger = logger;
        result
    }

    /// Load an archive from a stream positioned at its first header, replacing
    /// anything loaded before
    ///
    /// Gzip and zstd compressed streams are detected and decoded. Every open
    /// descriptor is closed.
    pub fn init_from_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        self.reset();
        let result = self.load_stream(reader);
        self.finish_load(result, "stream")
    }

    fn load_stream<R: Read>(&mut self, reader: R) -> Result<()> {
        let (kind, reader) = compression::sniff(reader)?;
        slog::debug!(self.logger, "Detected archive encoding"; "compression" => %kind);
        let decoded = compression::decoder(kind, BufReader::new(reader))?;
        parse::parse_stream(decoded, &mut self.inodes, &self.logger)
    }

    fn finish_load(&mut self, result: Result<()>, source: &'static str) -> Result<()> {
        match result {
            Ok(()) => {
                slog::info!(self.logger, "Loaded archive";
                    "entries" => self.inodes.len(),
                    "source" => source
                );
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn reset(&mut self) {
        self.fds.reset();
        self.inodes.reset();
    }

    /// Close every descriptor and drop every entry, releasing owned entry data
    pub fn unmount(&mut self) {
        self.reset();
        slog::debug!(self.logger, "Unmounted archive");
    }

    /// Open the first entry named exactly `path`
    ///
    /// `flags` are accepted for interface compatibility but have no effect.
    pub fn open<P: AsRef<[u8]>>(&mut self, path: P, flags: OpenFlags) -> Result<Fd> {
        self._open(path.as_ref(), flags)
    }

    fn _open(&mut self, path: &[u8], flags: OpenFlags) -> Result<Fd> {
        let inode = self.inodes.lookup(path).ok_or_else(|| Error::NotFound {
            path: path.into(),
        })?;
        let fd = self.fds.alloc(inode)?;
        slog::trace!(self.logger, "Opened entry";
            "fd" => fd.index(),
            "inode" => inode.index(),
            "flags" => flags.bits()
        );
        Ok(fd)
    }

    /// Copy bytes at the cursor into `buf`, returning how many were copied
    ///
    /// Fewer than `buf.len()` bytes are copied near the end of the entry, and
    /// none at the end.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let desc = self.fds.get_mut(fd)?;
        let data = self
            .inodes
            .get(desc.inode)
            .ok_or(Error::InvalidDescriptor { fd })?
            .data()
            .as_slice();

        let count = cmp::min(buf.len(), data.len() - desc.cursor);
        buf[..count].copy_from_slice(&data[desc.cursor..desc.cursor + count]);
        desc.cursor += count;
        Ok(count)
    }

    /// Overwrite bytes at the cursor with `buf`, returning how many were written
    ///
    /// Entries never grow: bytes that would land past the end are dropped.
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let desc = self.fds.get_mut(fd)?;
        let data = self
            .inodes
            .get_mut(desc.inode)
            .ok_or(Error::InvalidDescriptor { fd })?
            .data_mut()
            .as_mut_slice();

        let count = cmp::min(buf.len(), data.len() - desc.cursor);
        data[desc.cursor..desc.cursor + count].copy_from_slice(&buf[..count]);
        desc.cursor += count;
        Ok(count)
    }

    /// Move the cursor to `offset` relative to `whence`, returning the new position
    ///
    /// Positions past the end clamp to the end. Positions before the start are
    /// rejected and leave the cursor where it was.
    pub fn seek(&mut self, fd: Fd, offset: i64, whence: Whence) -> Result<usize> {
        let desc = self.fds.get_mut(fd)?;
        let size = self
            .inodes
            .get(desc.inode)
            .ok_or(Error::InvalidDescriptor { fd })?
            .size();

        let origin = match whence {
            Whence::Start => 0,
            Whence::Current => desc.cursor,
            Whence::End => size,
        };
        let position = origin as i128 + i128::from(offset);
        if position < 0 {
            return Err(Error::InvalidArgument { offset, whence });
        }
        // Clamped to `size`, so the cast is lossless
        let position = cmp::min(position, size as i128) as usize;
        desc.cursor = position;
        Ok(position)
    }

    /// Free the descriptor slot; closing a closed descriptor is not an error
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.fds.release(fd)?;
        slog::trace!(self.logger, "Closed descriptor"; "fd" => fd.index());
        Ok(())
    }

    /// Current cursor of an open descriptor
    pub fn tell(&self, fd: Fd) -> Result<usize> {
        Ok(self.fds.get(fd)?.cursor())
    }

    /// Header information for the entry behind an open descriptor
    pub fn metadata(&self, fd: Fd) -> Result<&Metadata> {
        let desc = self.fds.get(fd)?;
        self.inodes
            .get(desc.inode)
            .map(Inode::metadata)
            .ok_or(Error::InvalidDescriptor { fd })
    }

    /// Every indexed entry in archive order, including ones shadowed by an earlier
    /// entry of the same name
    pub fn entries(&self) -> impl Iterator<Item = &Metadata> + '_ {
        self.inodes.iter().map(Inode::metadata)
    }

    /// A `std::io` view of an open descriptor
    pub fn file(&mut self, fd: Fd) -> Result<File<'_, 'a>> {
        self.fds.get(fd)?;
        Ok(File::new(self, fd))
    }

    pub fn open_count(&self) -> usize {
        self.fds.open_count()
    }

    pub fn max_fds(&self) -> usize {
        self.fds.capacity()
    }

    pub fn max_inodes(&self) -> usize {
        self.inodes.capacity()
    }
}

impl Default for TarFs<'_> {
    fn default() -> Self {
        Self::new()
    }
}
