//! Archive Parser
//!
//! Walks the header chain of an archive, appending one inode per entry until the
//! end-of-archive marker, the end of input, or a full table.

use repr::{Header, BLOCK_SIZE};
use slog::Logger;
use zerocopy::{AsBytes, FromBytes, LayoutVerified};

use std::convert::TryFrom;
use std::io::{self, Read};
use std::mem;

use crate::errors::{Error, Result};
use crate::inode::{self, Data, Inode, Metadata};
use crate::Mode;

/// Parse an archive held in memory
///
/// Entry data is not copied: each inode borrows its window of `archive`.
pub(crate) fn parse_memory<'a>(
    archive: &'a mut [u8],
    table: &mut inode::Table<'a>,
    logger: &Logger,
) -> Result<()> {
    let mut rest = archive;
    while !rest.is_empty() {
        let index = table.len();
        if rest.len() < BLOCK_SIZE {
            return Err(Error::Truncated {
                index,
                expected: BLOCK_SIZE,
                available: rest.len(),
            });
        }

        let (block, tail) = mem::take(&mut rest).split_at_mut(BLOCK_SIZE);
        let header = LayoutVerified::<_, Header>::new_unaligned(&block[..])
            .map(LayoutVerified::into_ref)
            .ok_or(Error::Truncated {
                index,
                expected: BLOCK_SIZE,
                available: block.len(),
            })?;
        if header.is_end() {
            break;
        }
        if table.is_full() {
            warn_full(logger, table.capacity());
            break;
        }

        let meta = read_metadata(header, index)?;
        if tail.len() < meta.size {
            return Err(Error::Truncated {
                index,
                expected: meta.size,
                available: tail.len(),
            });
        }
        let (data, tail) = tail.split_at_mut(meta.size);
        // The padding after the last entry may be cut off
        let skip = repr::padding(meta.size).min(tail.len());
        let (_, tail) = tail.split_at_mut(skip);
        rest = tail;

        log_entry(logger, index, &meta);
        table.push(Inode::new(meta, Data::Borrowed(data)));
    }
    Ok(())
}

/// Parse an archive from a stream positioned at its first header
///
/// Each entry's data is copied into an owned buffer.
pub(crate) fn parse_stream<R: Read>(
    mut reader: R,
    table: &mut inode::Table<'_>,
    logger: &Logger,
) -> Result<()> {
    let mut header = Header::new_zeroed();
    loop {
        let index = table.len();
        let read = read_full(&mut reader, header.as_bytes_mut())?;
        if read == 0 {
            break;
        }
        if read < BLOCK_SIZE {
            return Err(Error::Truncated {
                index,
                expected: BLOCK_SIZE,
                available: read,
            });
        }
        if header.is_end() {
            break;
        }
        if table.is_full() {
            warn_full(logger, table.capacity());
            break;
        }

        let meta = read_metadata(&header, index)?;
        let mut data = Vec::new();
        (&mut reader)
            .take(meta.size as u64)
            .read_to_end(&mut data)?;
        if data.len() < meta.size {
            return Err(Error::Truncated {
                index,
                expected: meta.size,
                available: data.len(),
            });
        }
        let padding = repr::padding(meta.size) as u64;
        io::copy(&mut (&mut reader).take(padding), &mut io::sink())?;

        log_entry(logger, index, &meta);
        table.push(Inode::new(meta, Data::Owned(data.into_boxed_slice())));
    }
    Ok(())
}

/// Read until `buf` is full or the reader is exhausted, returning the bytes read
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_metadata(header: &Header, index: usize) -> Result<Metadata> {
    let size = header.size().map_err(Error::malformed(index, "size"))?;
    let size = usize::try_from(size)
        .map_err(|_| repr::OctalError::Overflow)
        .map_err(Error::malformed(index, "size"))?;

    Ok(Metadata {
        name: header.name().into(),
        size,
        kind: header.typeflag(),
        mode: Mode::from_bits_truncate(numeric(header.mode(), index, "mode")?),
        uid: numeric(header.uid(), index, "uid")?,
        gid: numeric(header.gid(), index, "gid")?,
        mtime: optional(header.mtime()).map_err(Error::malformed(index, "mtime"))?,
        link_name: header.link_name().into(),
    })
}

type Field = std::result::Result<u64, repr::OctalError>;

/// Empty fields other than `size` read as zero
fn optional(field: Field) -> Field {
    match field {
        Err(repr::OctalError::Empty) => Ok(0),
        other => other,
    }
}

fn numeric(field: Field, index: usize, name: &'static str) -> Result<u32> {
    optional(field)
        .and_then(|value| u32::try_from(value).map_err(|_| repr::OctalError::Overflow))
        .map_err(Error::malformed(index, name))
}

fn log_entry(logger: &Logger, index: usize, meta: &Metadata) {
    slog::debug!(logger, "Parsed entry";
        "index" => index,
        "name" => %meta.name,
        "size" => meta.size,
        "type" => %meta.kind
    );
}

fn warn_full(logger: &Logger, capacity: usize) {
    slog::warn!(logger, "Inode table is full, ignoring remaining entries"; "capacity" => capacity);
}
