use std::io;

use flate2::{Decompress, FlushDecompress, Status};

use crate::header::parse_header;
use crate::{ExtractError, ObjectKind};

/// The content of a loose object with its header stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedObject {
    pub kind: ObjectKind,
    /// Size printed in the object header.
    pub size: usize,
    pub content: Vec<u8>,
}

impl ExtractedObject {
    /// Whether the printed size agrees with a size recorded elsewhere (e.g. the index).
    pub fn matches_declared(&self, declared: u64) -> bool {
        self.size as u64 == declared
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

/// Inflates loose objects, refusing to produce more than `limit` bytes.
#[derive(Debug, Clone, Copy)]
pub struct ContentExtractor {
    limit: u64,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl ContentExtractor {
    /// 1 GiB of inflated output.
    pub const DEFAULT_LIMIT: u64 = 1 << 30;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Inflate `compressed` and return the object content after its header.
    ///
    /// `declared_size` is only a capacity hint: the index may legitimately be
    /// older than the object, so it is not checked here.
    pub fn extract(
        &self,
        compressed: &[u8],
        declared_size: u64,
    ) -> Result<ExtractedObject, ExtractError> {
        let hint = declared_size.min(self.limit).min(1 << 24) as usize;
        let mut inflated = self.inflate(compressed, hint + 32)?;

        let (kind, size, header_len) = parse_header(&inflated)?;
        let actual = inflated.len() - header_len;
        if actual != size {
            return Err(ExtractError::SizeMismatch {
                expected: size,
                actual,
            });
        }

        inflated.drain(..header_len);
        Ok(ExtractedObject {
            kind,
            size,
            content: inflated,
        })
    }

    /// Inflate a complete zlib stream. A stream that ends before its
    /// terminator is an error, not a short read.
    fn inflate(&self, compressed: &[u8], capacity: usize) -> Result<Vec<u8>, ExtractError> {
        const CHUNK: usize = 64 * 1024;

        let mut z = Decompress::new(true);
        let mut out = Vec::with_capacity(capacity.max(CHUNK));

        loop {
            if out.len() == out.capacity() {
                out.reserve(CHUNK);
            }
            let (in_before, out_before) = (z.total_in(), z.total_out());
            let input = &compressed[in_before as usize..];

            let status = z
                .decompress_vec(input, &mut out, FlushDecompress::None)
                .map_err(|e| {
                    ExtractError::DecompressionFailed(io::Error::new(io::ErrorKind::InvalidData, e))
                })?;

            if z.total_out() > self.limit {
                return Err(ExtractError::TooLarge { limit: self.limit });
            }

            match status {
                Status::StreamEnd => return Ok(out),
                Status::Ok | Status::BufError => {
                    if z.total_in() == in_before && z.total_out() == out_before {
                        return Err(ExtractError::DecompressionFailed(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "zlib stream ended early",
                        )));
                    }
                }
            }
        }
    }
}

/// Extract with the default output limit.
pub fn extract(compressed: &[u8], declared_size: u64) -> Result<ExtractedObject, ExtractError> {
    ContentExtractor::default().extract(compressed, declared_size)
}
