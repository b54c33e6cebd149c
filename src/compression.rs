//! Decompression support.

use flate2::read::GzDecoder;
use std::io::Read;

/// Leading bytes of every gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression applied to an input file
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Compression {
    Gzip,
}

/// Detect compression from the leading bytes of `data`.
pub fn detect(data: &[u8]) -> Option<Compression> {
    if data.starts_with(&GZIP_MAGIC) {
        Some(Compression::Gzip)
    } else {
        None
    }
}

/// Decompresses some data and returns the uncompressed data.
///
/// # Arguments
///
/// * `compression`: Compression algorithm
/// * `data`: Compressed data
pub fn decompress(compression: Compression, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    match compression {
        Compression::Gzip => decompress_flate2_gzip(data),
    }
}

/// Decompress `data` if it is compressed, otherwise return it unchanged.
pub fn decompress_if_needed(data: Vec<u8>) -> Result<Vec<u8>, std::io::Error> {
    match detect(&data) {
        Some(compression) => decompress(compression, &data),
        None => Ok(data),
    }
}

fn decompress_flate2_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut decoder = GzDecoder::new(data);
    // Compressed JSON typically expands several times over.
    let mut buf = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}
