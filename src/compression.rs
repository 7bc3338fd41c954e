use std::fmt;
use std::io::{self, BufRead, Read};

use crate::errors::{Error, Result};
use crate::parse::read_full;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// How a stream source is encoded
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A plain archive
    None,
    Gzip,
    Zstd,
}

impl Kind {
    /// Identify an encoding by the first bytes of a stream
    pub fn detect(magic: &[u8]) -> Kind {
        if magic.starts_with(GZIP_MAGIC) {
            Kind::Gzip
        } else if magic.starts_with(ZSTD_MAGIC) {
            Kind::Zstd
        } else {
            Kind::None
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::None => "uncompressed",
            Kind::Gzip => "gzip",
            Kind::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Identify the encoding of `reader` from its first bytes
///
/// Reads until the longest magic is buffered or the input ends. The returned
/// reader yields the whole stream, peeked bytes included.
pub(crate) fn sniff<R: Read>(mut reader: R) -> io::Result<(Kind, impl Read)> {
    let mut magic = [0; ZSTD_MAGIC.len()];
    let len = read_full(&mut reader, &mut magic)?;
    let kind = Kind::detect(&magic[..len]);
    let peeked = io::Cursor::new(magic).take(len as u64);
    Ok((kind, peeked.chain(reader)))
}

/// Wrap `reader` so it yields the plain archive
///
/// Gzip streams may hold several members back to back; all of them are decoded.
pub(crate) fn decoder<'r, R: BufRead + 'r>(kind: Kind, reader: R) -> Result<Box<dyn Read + 'r>> {
    let decoder: Box<dyn Read + 'r> = match kind {
        Kind::None => Box::new(reader),
        #[cfg(feature = "gzip")]
        Kind::Gzip => Box::new(flate2::bufread::MultiGzDecoder::new(reader)),
        #[cfg(feature = "zstd")]
        Kind::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::DisabledCompression { kind }),
    };
    Ok(decoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Trickle;

    fn decode<R: BufRead>(kind: Kind, encoded: R) -> Vec<u8> {
        let mut out = Vec::new();
        decoder(kind, encoded)
            .expect("decoder")
            .read_to_end(&mut out)
            .expect("decompression");
        out
    }

    fn sniff_all<R: Read>(reader: R) -> (Kind, Vec<u8>) {
        let (kind, mut reader) = sniff(reader).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        (kind, out)
    }

    #[test]
    fn detect() {
        assert_eq!(Kind::detect(&[0x1f, 0x8b, 0x08, 0x00]), Kind::Gzip);
        assert_eq!(Kind::detect(&[0x28, 0xb5, 0x2f, 0xfd, 0x00]), Kind::Zstd);
        assert_eq!(Kind::detect(b"a.text\0\0"), Kind::None);
        assert_eq!(Kind::detect(&[0x1f]), Kind::None);
        assert_eq!(Kind::detect(&[]), Kind::None);
    }

    #[test]
    fn sniff_replays_peeked_bytes() {
        assert_eq!(
            sniff_all(&b"plain tar bytes"[..]),
            (Kind::None, b"plain tar bytes".to_vec())
        );
        assert_eq!(sniff_all(&b"ab"[..]), (Kind::None, b"ab".to_vec()));
        assert_eq!(sniff_all(&b""[..]), (Kind::None, Vec::new()));
    }

    #[test]
    fn sniff_across_short_reads() {
        let zstd_magic = [0x28, 0xb5, 0x2f, 0xfd, 0x04, 0x00];
        assert_eq!(
            sniff_all(Trickle(&zstd_magic[..])),
            (Kind::Zstd, zstd_magic.to_vec())
        );
        assert_eq!(
            sniff_all(Trickle(&[0x1f, 0x8b][..])),
            (Kind::Gzip, vec![0x1f, 0x8b])
        );
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_round_trip() {
        let encoded = crate::test_utils::gzip(b"hello world");
        let (kind, plain) = sniff_all(Trickle(&encoded[..]));
        assert_eq!(kind, Kind::Gzip);
        assert_eq!(plain, encoded);
        assert_eq!(decode(Kind::Gzip, &encoded[..]), b"hello world");
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_members_concatenated() {
        let mut encoded = crate::test_utils::gzip(b"hello ");
        encoded.extend(crate::test_utils::gzip(b"world"));
        assert_eq!(decode(Kind::Gzip, &encoded[..]), b"hello world");
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_round_trip() {
        let encoded = zstd::stream::encode_all(&b"hello world"[..], 0).unwrap();
        assert_eq!(Kind::detect(&encoded), Kind::Zstd);
        assert_eq!(decode(Kind::Zstd, &encoded[..]), b"hello world");
    }

    #[cfg(not(feature = "zstd"))]
    #[test]
    fn disabled_codec() {
        assert!(matches!(
            decoder(Kind::Zstd, &b""[..]),
            Err(Error::DisabledCompression { kind: Kind::Zstd })
        ));
    }
}
