//! A [`TarFs`] that can be shared between threads
//!
//! Every operation takes the lock for its whole duration, so calls on the same
//! descriptor from different threads never interleave partway through.

use parking_lot::{Mutex, MutexGuard};
use static_assertions::assert_impl_all;

use std::io::Read;
use std::path::Path;

use crate::errors::Result;
use crate::fd::Fd;
use crate::fs::TarFs;
use crate::inode::Metadata;
use crate::{OpenFlags, Whence};

#[derive(Debug, Default)]
pub struct SharedTarFs<'a> {
    inner: Mutex<TarFs<'a>>,
}

assert_impl_all!(SharedTarFs<'static>: Send, Sync);

impl<'a> SharedTarFs<'a> {
    pub fn new(fs: TarFs<'a>) -> Self {
        Self {
            inner: Mutex::new(fs),
        }
    }

    pub fn into_inner(self) -> TarFs<'a> {
        self.inner.into_inner()
    }

    /// Hold the filesystem for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, TarFs<'a>> {
        self.inner.lock()
    }

    pub fn init_from_memory(&self, archive: &'a mut [u8]) -> Result<()> {
        self.lock().init_from_memory(archive)
    }

    pub fn init_from_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.lock().init_from_path(path)
    }

    pub fn init_from_reader<R: Read>(&self, reader: R) -> Result<()> {
        self.lock().init_from_reader(reader)
    }

    pub fn unmount(&self) {
        self.lock().unmount()
    }

    pub fn open<P: AsRef<[u8]>>(&self, path: P, flags: OpenFlags) -> Result<Fd> {
        self.lock().open(path, flags)
    }

    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.lock().read(fd, buf)
    }

    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        self.lock().write(fd, buf)
    }

    pub fn seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<usize> {
        self.lock().seek(fd, offset, whence)
    }

    pub fn close(&self, fd: Fd) -> Result<()> {
        self.lock().close(fd)
    }

    pub fn tell(&self, fd: Fd) -> Result<usize> {
        self.lock().tell(fd)
    }

    /// A copy, since the lock is released on return
    pub fn metadata(&self, fd: Fd) -> Result<Metadata> {
        self.lock().metadata(fd).map(Clone::clone)
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count()
    }
}

impl<'a> From<TarFs<'a>> for SharedTarFs<'a> {
    fn from(fs: TarFs<'a>) -> Self {
        Self::new(fs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{archive, hello};
    use crate::MAX_FDS;

    use std::thread;

    #[test]
    fn delegates() {
        let mut bytes = hello();
        let fs = SharedTarFs::new(TarFs::new());
        fs.init_from_memory(&mut bytes).unwrap();

        let fd = fs.open("a.text", OpenFlags::READ).unwrap();
        assert_eq!(fs.seek(fd, 6, Whence::Start).unwrap(), 6);
        let mut buf = [0; 5];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(fs.metadata(fd).unwrap().size(), 11);
        fs.close(fd).unwrap();
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    fn readers_on_many_threads() {
        let contents: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let bytes = archive(&[("data", &contents[..])]);
        let fs = SharedTarFs::new(TarFs::from_reader(&bytes[..]).unwrap());

        thread::scope(|s| {
            for _ in 0..MAX_FDS {
                s.spawn(|| {
                    let fd = fs.open("data", OpenFlags::READ).unwrap();
                    let mut out = Vec::new();
                    let mut buf = [0; 100];
                    loop {
                        let n = fs.read(fd, &mut buf).unwrap();
                        if n == 0 {
                            break;
                        }
                        out.extend_from_slice(&buf[..n]);
                    }
                    fs.close(fd).unwrap();
                    assert_eq!(out, contents);
                });
            }
        });
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    fn writers_see_each_other() {
        let bytes = archive(&[("counter", &[0u8; 64][..])]);
        let fs = SharedTarFs::new(TarFs::from_reader(&bytes[..]).unwrap());

        thread::scope(|s| {
            for i in 0..8u8 {
                let fs = &fs;
                s.spawn(move || {
                    let fd = fs.open("counter", OpenFlags::WRITE).unwrap();
                    fs.seek(fd, i64::from(i) * 8, Whence::Start).unwrap();
                    assert_eq!(fs.write(fd, &[i + 1; 8]).unwrap(), 8);
                    fs.close(fd).unwrap();
                });
            }
        });

        let mut fs = fs.into_inner();
        let fd = fs.open("counter", OpenFlags::READ).unwrap();
        let mut buf = [0; 64];
        fs.read(fd, &mut buf).unwrap();
        for (i, chunk) in buf.chunks(8).enumerate() {
            assert!(chunk.iter().all(|&b| usize::from(b) == i + 1));
        }
    }
}
