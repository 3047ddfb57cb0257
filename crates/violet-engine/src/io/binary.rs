use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ResourceError;

/// Little-endian reader for the engine's binary resource formats.
///
/// `path` is only used to label errors; in-memory readers pass a descriptive name.
pub struct BinaryReader<R> {
    inner: R,
    path: PathBuf,
}

impl BinaryReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => Ok(buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ResourceError::Truncated {
                path: self.path.clone(),
            }
            .into()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes::<1>()?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_bytes()?))
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_bytes()?))
    }

    /// Consumes `magic.len()` bytes and checks them against `magic`.
    pub fn expect_magic(&mut self, magic: &'static str) -> Result<()> {
        let mut buf = vec![0u8; magic.len()];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {}
            // A file shorter than its signature is not that kind of file.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        }
        if buf != magic.as_bytes() {
            return Err(ResourceError::BadMagic {
                path: self.path.clone(),
                expected: magic,
            }
            .into());
        }
        Ok(())
    }

    /// Reads the format version byte and checks it equals `supported`.
    pub fn expect_version(&mut self, supported: u8) -> Result<()> {
        let version = self.read_u8()?;
        if version != supported {
            return Err(ResourceError::UnsupportedVersion {
                path: self.path.clone(),
                version,
            }
            .into());
        }
        Ok(())
    }
}

/// Little-endian writer mirroring `BinaryReader`.
pub struct BinaryWriter<W> {
    inner: W,
}

impl BinaryWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).context("failed to write resource data")
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    #[inline]
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("failed to flush resource data")
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> BinaryReader<Cursor<Vec<u8>>> {
        BinaryReader::new(Cursor::new(bytes.to_vec()), "mem")
    }

    #[test]
    fn integers_are_little_endian() {
        let mut r = reader(&[0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_i32().unwrap(), 0x1234_5678);
    }

    #[test]
    fn writer_matches_reader() {
        let mut w = BinaryWriter::new(Vec::new());
        w.write_u16(0xBEEF).unwrap();
        w.write_i32(-2).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, [0xEF, 0xBE, 0xFE, 0xFF, 0xFF, 0xFF]);

        let mut r = reader(&bytes);
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_i32().unwrap(), -2);
    }

    #[test]
    fn short_read_is_truncated() {
        let mut r = reader(&[0x01]);
        let err = r.read_u16().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::Truncated { .. })
        ));
    }

    #[test]
    fn magic_mismatch() {
        let mut r = reader(b"VIOLSPR\x01");
        let err = r.expect_magic("VIOLMAP").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::BadMagic { expected: "VIOLMAP", .. })
        ));
    }

    #[test]
    fn short_file_is_bad_magic() {
        let mut r = reader(b"VIO");
        assert!(r.expect_magic("VIOLMAP").is_err());
    }

    #[test]
    fn version_check() {
        let mut r = reader(&[2]);
        let err = r.expect_version(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::UnsupportedVersion { version: 2, .. })
        ));
    }
}
