use std::io::{self, Read};

/// Buffer size used by [`ChunkReader::new`].
pub const DEFAULT_CAPACITY: usize = 512;

/// Pull-based reader over a payload of known length.
///
/// Each [`pull`](Self::pull) yields at most one buffer worth of bytes and never
/// reads past the payload, so trailing data in the source (such as the glue
/// trailer itself) is never handed out. Read failures end the stream.
pub struct ChunkReader<R> {
    source: R,
    remaining: u64,
    buf: Box<[u8]>,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R, len: u64) -> Self {
        Self::with_capacity(source, len, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: R, len: u64, capacity: usize) -> Self {
        Self {
            source,
            remaining: len,
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
        }
    }

    /// Bytes of the payload not yet handed out.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns the next slice of the payload, or `None` at end of stream.
    ///
    /// A short read is returned as-is and does not end the stream.
    pub fn pull(&mut self) -> Option<&[u8]> {
        if self.remaining == 0 {
            return None;
        }

        let want = usize::try_from(self.remaining)
            .map_or(self.buf.len(), |r| r.min(self.buf.len()));
        let read = loop {
            match self.source.read(&mut self.buf[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break 0,
            }
        };

        if read == 0 {
            // Source ended or failed before the declared length.
            self.remaining = 0;
            return None;
        }

        self.remaining -= read as u64;
        Some(&self.buf[..read])
    }

    /// Gives the source back so the caller decides when it is closed.
    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Cursor;

    fn collect<R: Read>(reader: &mut ChunkReader<R>) -> Vec<Vec<u8>> {
        let mut pulls = Vec::new();
        while let Some(bytes) = reader.pull() {
            pulls.push(bytes.to_vec());
        }
        pulls
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_pull_count_and_reassembly() {
        let data = payload(1300);
        let mut reader = ChunkReader::new(Cursor::new(data.clone()), 1300);

        let pulls = collect(&mut reader);
        assert_eq!(
            pulls.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![512, 512, 276]
        );
        assert_eq!(pulls.concat(), data);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.pull().is_none());
    }

    #[test]
    fn test_exact_multiple_of_capacity() {
        let data = payload(64);
        let mut reader = ChunkReader::with_capacity(Cursor::new(data.clone()), 64, 16);

        let pulls = collect(&mut reader);
        assert_eq!(pulls.len(), 4);
        assert_eq!(pulls.concat(), data);
    }

    #[test]
    fn test_empty_payload_ends_immediately() {
        let mut reader = ChunkReader::new(Cursor::new(b"ignored".to_vec()), 0);
        assert!(reader.pull().is_none());
    }

    #[test]
    fn test_stops_at_declared_length() {
        let mut source = b"payload".to_vec();
        source.extend_from_slice(b"%%glue:L trailer bytes");
        let mut reader = ChunkReader::new(Cursor::new(source), 7);

        assert_eq!(collect(&mut reader).concat(), b"payload");
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle {
        inner: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            self.inner.read(&mut buf[..n])
        }
    }

    #[test]
    fn test_short_reads_are_reported_faithfully() {
        let data = payload(250);
        let source = Trickle {
            inner: Cursor::new(data.clone()),
            step: 100,
        };
        let mut reader = ChunkReader::new(source, 250);

        let pulls = collect(&mut reader);
        assert_eq!(
            pulls.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
        assert_eq!(pulls.concat(), data);
    }

    #[test]
    fn test_truncated_source_ends_stream() {
        let mut reader = ChunkReader::new(Cursor::new(b"abc".to_vec()), 10);

        assert_eq!(reader.pull().unwrap(), b"abc");
        assert!(reader.pull().is_none());
        assert_eq!(reader.remaining(), 0);
    }

    struct Flaky {
        interrupts: usize,
        fail: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::ErrorKind::Interrupted.into());
            }
            if self.fail {
                return Err(io::Error::other("disk went away"));
            }
            buf[0] = b'x';
            Ok(1)
        }
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let mut reader = ChunkReader::new(
            Flaky {
                interrupts: 3,
                fail: false,
            },
            1,
        );
        assert_eq!(reader.pull().unwrap(), b"x");
        assert!(reader.pull().is_none());
    }

    #[test]
    fn test_read_error_is_end_of_stream() {
        let mut reader = ChunkReader::new(
            Flaky {
                interrupts: 0,
                fail: true,
            },
            100,
        );
        assert!(reader.pull().is_none());
        assert!(reader.pull().is_none());
    }

    #[test]
    fn test_into_inner_returns_source() {
        let mut reader = ChunkReader::new(Cursor::new(b"abcdef".to_vec()), 3);
        collect(&mut reader);
        let cursor = reader.into_inner();
        assert_eq!(cursor.position(), 3);
    }
}
