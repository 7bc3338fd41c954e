use repr::{Header, TypeFlag};
use slog::Logger;

use std::io::{self, Read};

/// A terminated archive of regular files
pub fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(name, data) in entries {
        let header = Header::new(name.as_bytes(), data.len() as u64, TypeFlag::REGULAR)
            .expect("test entries fit in a header");
        repr::append(&mut out, &header, data);
    }
    repr::finish(&mut out);
    out
}

/// The one entry archive most tests start from
pub fn hello() -> Vec<u8> {
    archive(&[("a.text", b"hello world")])
}

pub fn logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

/// A reader which hands out at most one byte per call
pub struct Trickle<R>(pub R);

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(1);
        self.0.read(&mut buf[..len])
    }
}

/// One gzip member holding `data`
#[cfg(feature = "gzip")]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
