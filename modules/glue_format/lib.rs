//! On-disk format of a glued executable.
//!
//! A glued executable is a native launcher followed by a script payload and
//! a fixed-size [`Trailer`]:
//!
//! ```text
//! +-----------------+-------------------+-----------+
//! | launcher bytes  | payload bytes     | trailer   |
//! +-----------------+-------------------+-----------+
//! 0                 loader_size         len - 16    len
//! ```

mod chunk_reader;
mod trailer;

pub use chunk_reader::{ChunkReader, DEFAULT_CAPACITY};
pub use trailer::{GLUE_SIGNATURE, Glued, TRAILER_LEN, Trailer, locate, locate_in, write_glued};
