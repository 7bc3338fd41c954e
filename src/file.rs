use std::convert::TryFrom;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::fd::Fd;
use crate::fs::TarFs;
use crate::inode::Metadata;
use crate::Whence;

/// An open descriptor viewed through `std::io`
///
/// Dropping a `File` does not close its descriptor; call [`TarFs::close`] for that.
#[derive(Debug)]
pub struct File<'fs, 'a> {
    fs: &'fs mut TarFs<'a>,
    fd: Fd,
}

impl<'fs, 'a> File<'fs, 'a> {
    pub(crate) fn new(fs: &'fs mut TarFs<'a>, fd: Fd) -> Self {
        Self { fs, fd }
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }

    pub fn metadata(&self) -> crate::Result<&Metadata> {
        self.fs.metadata(self.fd)
    }
}

impl Read for File<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.fs.read(self.fd, buf)?)
    }
}

impl Write for File<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.fs.write(self.fd, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for File<'_, '_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(n) => {
                let n = i64::try_from(n).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
                })?;
                (n, Whence::Start)
            }
            SeekFrom::Current(n) => (n, Whence::Current),
            SeekFrom::End(n) => (n, Whence::End),
        };
        let position = self.fs.seek(self.fd, offset, whence)?;
        Ok(position as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::hello;
    use crate::OpenFlags;

    #[test]
    fn read_to_string() {
        let mut bytes = hello();
        let mut fs = TarFs::from_memory(&mut bytes).unwrap();
        let fd = fs.open("a.text", OpenFlags::READ).unwrap();

        let mut contents = String::new();
        fs.file(fd).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello world");
        // Still open, at the end
        assert_eq!(fs.tell(fd).unwrap(), 11);
    }

    #[test]
    fn write_all_stops_at_end() {
        let mut bytes = hello();
        let mut fs = TarFs::from_memory(&mut bytes).unwrap();
        let fd = fs.open("a.text", OpenFlags::WRITE).unwrap();
        let mut file = fs.file(fd).unwrap();

        file.write_all(b"HELLO").unwrap();
        let err = file.write_all(b" there, world").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        file.flush().unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"HELLO there");
    }

    #[test]
    fn seek_positions() {
        let mut bytes = hello();
        let mut fs = TarFs::from_memory(&mut bytes).unwrap();
        let fd = fs.open("a.text", OpenFlags::READ).unwrap();
        let mut file = fs.file(fd).unwrap();

        assert_eq!(file.seek(SeekFrom::End(-5)).unwrap(), 6);
        assert_eq!(file.seek(SeekFrom::Current(1)).unwrap(), 7);
        assert_eq!(file.seek(SeekFrom::Start(u64::MAX >> 1)).unwrap(), 11);

        let err = file.seek(SeekFrom::Start(u64::MAX)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = file.seek(SeekFrom::Current(-100)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(file.seek(SeekFrom::Current(0)).unwrap(), 11);
        assert_eq!(file.metadata().unwrap().name(), "a.text");
    }
}
