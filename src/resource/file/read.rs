//! Asynchronous file reading.

use std::io;
use std::path::Path;

use futures_util::future::BoxFuture;

use super::path::FileId;
use crate::error::{Error, Result};

/// Source of stylesheet bytes.
///
/// Each call reads from storage again; implementations must not cache.
/// The returned future resolves exactly once.
pub trait FileLoader: Send + Sync {
    /// Read the full contents of `path`.
    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>>;
}

/// Reads files from disk through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskLoader;

impl FileLoader for DiskLoader {
    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>> {
        Box::pin(read_disk(path))
    }
}

/// Read a stylesheet as text, mapping failures to [`Error`].
pub async fn read_source(loader: &dyn FileLoader, id: &FileId) -> Result<String> {
    let bytes = loader
        .read(id.as_path())
        .await
        .map_err(|e| Error::file_read(id.as_path(), e))?;
    decode_utf8(&bytes)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidUtf8 {
            path: id.as_path().to_path_buf(),
        })
}

/// Decode bytes as UTF-8, stripping BOM if present.
pub fn decode_utf8(buf: &[u8]) -> Option<&str> {
    let buf = buf.strip_prefix(b"\xef\xbb\xbf").unwrap_or(buf);
    std::str::from_utf8(buf).ok()
}

/// Read file from disk.
async fn read_disk(path: &Path) -> io::Result<Vec<u8>> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("{} is a directory", path.display()),
        ));
    }
    tokio::fs::read(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_decode_utf8_valid() {
        let text = ".a { content: \"世界\"; }";
        assert_eq!(decode_utf8(text.as_bytes()), Some(text));
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b".a {}");
        assert_eq!(decode_utf8(&bytes), Some(".a {}"));
    }

    #[test]
    fn test_decode_utf8_invalid() {
        assert!(decode_utf8(&[0xff, 0xfe]).is_none());
    }

    #[tokio::test]
    async fn test_read_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        fs::write(&path, ".a { color: red; }").unwrap();

        let bytes = DiskLoader.read(&path).await.unwrap();
        assert_eq!(bytes, b".a { color: red; }");
    }

    #[tokio::test]
    async fn test_read_disk_directory() {
        let dir = TempDir::new().unwrap();
        assert!(DiskLoader.read(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_source_nonexistent() {
        let id = FileId::new("/nonexistent/file.css");
        let err = read_source(&DiskLoader, &id).await.unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_read_source_rereads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        let id = FileId::new(&path);

        fs::write(&path, ".a {}").unwrap();
        assert_eq!(read_source(&DiskLoader, &id).await.unwrap(), ".a {}");

        fs::write(&path, ".b {}").unwrap();
        assert_eq!(read_source(&DiskLoader, &id).await.unwrap(), ".b {}");
    }
}
