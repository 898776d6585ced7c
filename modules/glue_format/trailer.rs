use crate::chunk_reader::ChunkReader;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Magic bytes opening every trailer.
pub const GLUE_SIGNATURE: &[u8; 8] = b"%%glue:L";

/// Size of the trailer: signature plus two little-endian `u32` sizes.
pub const TRAILER_LEN: usize = GLUE_SIGNATURE.len() + 4 + 4;

const TRAILER_LEN_U64: u64 = TRAILER_LEN as u64;

/// Payload location recorded at the end of a glued executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Offset from the start of the file where the payload begins.
    pub loader_size: u32,
    /// Length of the payload in bytes.
    pub payload_size: u32,
}

impl Trailer {
    /// Parses raw trailer bytes, returning `None` unless the signature matches exactly.
    pub fn parse(bytes: &[u8; TRAILER_LEN]) -> Option<Self> {
        let (signature, sizes) = bytes.split_at(GLUE_SIGNATURE.len());
        if signature != GLUE_SIGNATURE {
            return None;
        }
        let (loader, payload) = sizes.split_at(4);
        Some(Self {
            loader_size: u32::from_le_bytes(loader.try_into().ok()?),
            payload_size: u32::from_le_bytes(payload.try_into().ok()?),
        })
    }

    pub fn to_bytes(self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..8].copy_from_slice(GLUE_SIGNATURE);
        out[8..12].copy_from_slice(&self.loader_size.to_le_bytes());
        out[12..].copy_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    /// Offset one past the last payload byte.
    pub fn payload_end(self) -> u64 {
        u64::from(self.loader_size) + u64::from(self.payload_size)
    }
}

/// A source positioned at the start of its glued payload.
#[derive(Debug)]
pub struct Glued<R> {
    source: R,
    trailer: Trailer,
}

impl<R> Glued<R> {
    pub fn trailer(&self) -> Trailer {
        self.trailer
    }
}

impl<R: Read> Glued<R> {
    /// Hands the positioned source to a [`ChunkReader`] bounded by the payload size.
    pub fn into_reader(self) -> ChunkReader<R> {
        ChunkReader::new(self.source, u64::from(self.trailer.payload_size))
    }
}

/// Looks for a glued payload at the end of the file at `path`.
///
/// Returns `None` when the file cannot be opened or carries no valid trailer;
/// a missing payload is an ordinary condition, not an error.
pub fn locate(path: &Path) -> Option<Glued<File>> {
    let file = File::open(path).ok()?;
    locate_in(file)
}

/// Same as [`locate`] over any seekable source.
///
/// On `None` the source is dropped, which closes it.
pub fn locate_in<R: Read + Seek>(mut source: R) -> Option<Glued<R>> {
    let len = source.seek(SeekFrom::End(0)).ok()?;
    let body_len = len.checked_sub(TRAILER_LEN_U64)?;
    source.seek(SeekFrom::Start(body_len)).ok()?;

    let mut raw = [0u8; TRAILER_LEN];
    source.read_exact(&mut raw).ok()?;
    let trailer = Trailer::parse(&raw)?;

    if trailer.payload_end() > body_len {
        return None;
    }
    source
        .seek(SeekFrom::Start(u64::from(trailer.loader_size)))
        .ok()?;

    Some(Glued { source, trailer })
}

/// Writes `loader`, then `payload`, then the trailer describing them.
///
/// # Errors
/// Returns an error if writing fails or either part does not fit a `u32` size.
pub fn write_glued<L: Read, W: Write>(
    loader: &mut L,
    payload: &[u8],
    out: &mut W,
) -> io::Result<Trailer> {
    let loader_size = io::copy(loader, out)?;
    let trailer = Trailer {
        loader_size: u32::try_from(loader_size).map_err(|_| too_large("launcher"))?,
        payload_size: u32::try_from(payload.len()).map_err(|_| too_large("payload"))?,
    };
    out.write_all(payload)?;
    out.write_all(&trailer.to_bytes())?;
    out.flush()?;
    Ok(trailer)
}

fn too_large(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} does not fit in a glue trailer (4 GiB limit)"),
    )
}
