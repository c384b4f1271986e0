/*!
 * Bounded range reader over one local file
 *
 * A `ChunkReader` represents exactly one transfer part: a fixed `[offset,
 * offset + length)` window of a file with an internal cursor. Several readers
 * may be open concurrently on the same file because each holds its own handle
 * and the windows are disjoint.
 */

use std::io::SeekFrom;
use std::path::Path;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::Result;
use crate::part::Part;

/// Sequential reader over a fixed byte range of a local file
pub struct ChunkReader {
    file: Option<File>,
    length: u64,
    remaining: u64,
}

impl ChunkReader {
    /// Open a reader positioned at the start of `part`'s byte range.
    pub async fn open(path: &Path, part: &Part) -> Result<Self> {
        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(part.offset)).await?;
        Ok(Self {
            file: Some(file),
            length: part.length,
            remaining: part.length,
        })
    }

    /// The part's declared byte length, invariant for the reader's lifetime.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Read up to `n` bytes (or everything left when `n` is `None`) from the
    /// unread span of the part.
    ///
    /// Never reads past the window even if the underlying file is longer, and
    /// returns an empty buffer once the span is exhausted or the reader has
    /// been closed. The underlying file must cover the whole window; a file
    /// truncated mid-transfer surfaces as an I/O error.
    pub async fn read(&mut self, n: Option<usize>) -> Result<Bytes> {
        let take = match n {
            Some(n) => (n as u64).min(self.remaining),
            None => self.remaining,
        };
        let Some(file) = self.file.as_mut() else {
            return Ok(Bytes::new());
        };
        if take == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; take as usize];
        file.read_exact(&mut buf).await?;
        self.remaining -= take;
        Ok(Bytes::from(buf))
    }

    /// Drain the remaining span in one buffer.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        self.read(None).await
    }

    /// Release the file handle. Idempotent; runs implicitly on drop, so every
    /// exit path of the owning task closes the handle.
    pub fn close(&mut self) {
        self.file.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::plan_parts;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[tokio::test]
    async fn test_reads_exact_window() {
        // 2 full parts of 16 bytes plus a 16-byte tail message.
        let mut content = vec![b'a'; 32];
        content.extend_from_slice(b"just for testing");
        let file = fixture(&content);

        let parts = plan_parts(content.len() as u64, 16);
        assert_eq!(parts.len(), 3);

        let mut last = ChunkReader::open(file.path(), &parts[2]).await.unwrap();
        assert_eq!(last.len(), 16);
        assert_eq!(&last.read(Some(5)).await.unwrap()[..], b"just ");
        assert_eq!(&last.read(None).await.unwrap()[..], b"for testing");
        // Exhausted: further reads yield nothing, no wraparound.
        assert!(last.read(None).await.unwrap().is_empty());
        assert!(last.read(Some(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_never_reads_past_window() {
        let file = fixture(b"0123456789");
        let part = crate::part::Part { index: 0, offset: 2, length: 4 };

        let mut reader = ChunkReader::open(file.path(), &part).await.unwrap();
        // Ask for more than the window holds.
        assert_eq!(&reader.read(Some(100)).await.unwrap()[..], b"2345");
        assert!(reader.read(Some(100)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_readers_on_one_file() {
        let file = fixture(b"aaaabbbbcccc");
        let parts = plan_parts(12, 4);

        let mut readers = Vec::new();
        for part in &parts {
            readers.push(ChunkReader::open(file.path(), part).await.unwrap());
        }
        let mut all = Vec::new();
        for reader in readers.iter_mut() {
            all.extend_from_slice(&reader.read_to_end().await.unwrap());
        }
        assert_eq!(all, b"aaaabbbbcccc");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let file = fixture(b"data");
        let part = crate::part::Part { index: 0, offset: 0, length: 4 };

        let mut reader = ChunkReader::open(file.path(), &part).await.unwrap();
        reader.close();
        reader.close();
        assert!(reader.read(None).await.unwrap().is_empty());
        assert_eq!(reader.len(), 4);
    }

    #[tokio::test]
    async fn test_zero_length_part() {
        let file = fixture(b"");
        let parts = plan_parts(0, 16);
        let mut reader = ChunkReader::open(file.path(), &parts[0]).await.unwrap();
        assert!(reader.is_empty());
        assert!(reader.read(None).await.unwrap().is_empty());
    }
}
