//! Header blocks
//!
//! Every entry starts with one 512 byte header. Only the pre-POSIX fields up to
//! `link_name` are interpreted; the USTAR fields are written for compatibility
//! with other tools.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, Unaligned};

use std::fmt;

use crate::{parse_octal, write_octal, OctalError, TypeFlag, BLOCK_SIZE};

pub const MAGIC: &[u8; 6] = b"ustar\0";
pub const VERSION: &[u8; 2] = b"00";

#[derive(Copy, Clone, AsBytes, FromBytes, Unaligned)]
#[repr(C)]
pub struct Header {
    /// Entry path, NUL terminated unless all 100 bytes are used
    pub name: [u8; 100],
    pub mode: [u8; 8],
    pub uid: [u8; 8],
    pub gid: [u8; 8],
    /// Size of the data following this header, in bytes
    pub size: [u8; 12],
    /// Seconds since 00:00, Jan 1 1970 UTC
    pub mtime: [u8; 12],
    /// Sum of all header bytes, counting this field as eight spaces
    pub checksum: [u8; 8],
    pub typeflag: u8,
    /// Target of a hard or symbolic link
    pub link_name: [u8; 100],
    pub magic: [u8; 6],
    pub version: [u8; 2],
    pub uname: [u8; 32],
    pub gname: [u8; 32],
    pub dev_major: [u8; 8],
    pub dev_minor: [u8; 8],
    pub prefix: [u8; 155],
    pub _padding: [u8; 12],
}

assert_eq_size!(Header, [u8; BLOCK_SIZE]);

fn until_nul(field: &[u8]) -> &[u8] {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..len]
}

impl Header {
    /// Build a header for a `size` byte entry
    ///
    /// Fails with `Overflow` for sizes of 8 GiB and up, which need more than
    /// the eleven octal digits of the size field. Panics if `name` does not fit
    /// in the name field.
    pub fn new(name: &[u8], size: u64, typeflag: TypeFlag) -> Result<Self, OctalError> {
        assert!(
            name.len() <= 100,
            "name is {} bytes, at most 100 fit in a header",
            name.len()
        );
        let mut header = Header::new_zeroed();
        header.name[..name.len()].copy_from_slice(name);
        header.typeflag = typeflag.0;
        header.magic = *MAGIC;
        header.version = *VERSION;
        write_octal(&mut header.size, size)?;
        write_octal(&mut header.uid, 0)?;
        write_octal(&mut header.gid, 0)?;
        write_octal(&mut header.mtime, 0)?;
        let mode = if typeflag.is_dir() {
            crate::Mode::O755
        } else {
            crate::Mode::O644
        };
        header.set_mode(mode.bits())?;
        Ok(header)
    }

    pub fn set_mode(&mut self, mode: u32) -> Result<&mut Self, OctalError> {
        write_octal(&mut self.mode, mode.into())?;
        Ok(self.update_checksum())
    }

    pub fn set_uid(&mut self, uid: u32) -> Result<&mut Self, OctalError> {
        write_octal(&mut self.uid, uid.into())?;
        Ok(self.update_checksum())
    }

    pub fn set_gid(&mut self, gid: u32) -> Result<&mut Self, OctalError> {
        write_octal(&mut self.gid, gid.into())?;
        Ok(self.update_checksum())
    }

    pub fn set_mtime(&mut self, mtime: u64) -> Result<&mut Self, OctalError> {
        write_octal(&mut self.mtime, mtime)?;
        Ok(self.update_checksum())
    }

    /// Panics if `target` does not fit in the link name field.
    pub fn set_link_name(&mut self, target: &[u8]) -> &mut Self {
        assert!(target.len() <= self.link_name.len());
        self.link_name = [0; 100];
        self.link_name[..target.len()].copy_from_slice(target);
        self.update_checksum()
    }

    /// Replace the raw size field, without re-encoding
    pub fn set_raw_size(&mut self, size: [u8; 12]) -> &mut Self {
        self.size = size;
        self.update_checksum()
    }

    fn update_checksum(&mut self) -> &mut Self {
        let sum = self.compute_checksum();
        // At most 512 * 255, which fits the six digits before NUL and space
        let written = write_octal(&mut self.checksum[..7], sum.into());
        debug_assert!(written.is_ok());
        self.checksum[7] = b' ';
        self
    }

    /// True for the end-of-archive marker
    pub fn is_end(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name(&self) -> &[u8] {
        until_nul(&self.name)
    }

    pub fn link_name(&self) -> &[u8] {
        until_nul(&self.link_name)
    }

    pub fn typeflag(&self) -> TypeFlag {
        TypeFlag(self.typeflag)
    }

    pub fn size(&self) -> Result<u64, OctalError> {
        parse_octal(&self.size)
    }

    pub fn mode(&self) -> Result<u64, OctalError> {
        parse_octal(&self.mode)
    }

    pub fn uid(&self) -> Result<u64, OctalError> {
        parse_octal(&self.uid)
    }

    pub fn gid(&self) -> Result<u64, OctalError> {
        parse_octal(&self.gid)
    }

    pub fn mtime(&self) -> Result<u64, OctalError> {
        parse_octal(&self.mtime)
    }

    pub fn checksum(&self) -> Result<u64, OctalError> {
        parse_octal(&self.checksum)
    }

    pub fn compute_checksum(&self) -> u32 {
        let bytes = self.as_bytes();
        let before = &bytes[..148];
        let after = &bytes[156..];
        let spaces = 8 * u32::from(b' ');
        before
            .iter()
            .chain(after)
            .map(|&b| u32::from(b))
            .sum::<u32>()
            + spaces
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Header")
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("size", &self.size())
            .field("typeflag", &self.typeflag())
            .finish()
    }
}

/// Append an entry (header, data and padding) to an archive being built in memory
///
/// Panics if `data` is not exactly as long as the header's size field says.
pub fn append(out: &mut Vec<u8>, header: &Header, data: &[u8]) {
    assert_eq!(
        header.size(),
        Ok(data.len() as u64),
        "data does not match the header size"
    );
    out.reserve(BLOCK_SIZE + data.len() + crate::padding(data.len()));
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out.resize(out.len() + crate::padding(data.len()), 0);
}

/// Append the two zero blocks which end an archive
pub fn finish(out: &mut Vec<u8>) {
    out.resize(out.len() + 2 * BLOCK_SIZE, 0);
}
