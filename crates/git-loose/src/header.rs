use crate::{ExtractError, ObjectKind};

/// Longest header we accept: `"commit "` plus a 20-digit size and the NUL.
pub const MAX_HEADER_LEN: usize = 32;

/// Parse an object header from the start of `data`.
///
/// The header format is `"<type> <size>\0"`. Returns `(kind, content_size, header_len)`
/// where `header_len` includes the NUL terminator.
pub fn parse_header(data: &[u8]) -> Result<(ObjectKind, usize, usize), ExtractError> {
    let window = &data[..data.len().min(MAX_HEADER_LEN)];
    let nul = window
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ExtractError::InvalidHeader("missing NUL terminator".into()))?;

    let header = &window[..nul];
    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ExtractError::InvalidHeader("missing space in header".into()))?;

    let kind = ObjectKind::from_bytes(&header[..space]).ok_or_else(|| {
        ExtractError::InvalidHeader(format!(
            "unknown object type {:?}",
            String::from_utf8_lossy(&header[..space])
        ))
    })?;

    let size = std::str::from_utf8(&header[space + 1..])
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| {
            ExtractError::InvalidHeader(format!(
                "invalid size {:?}",
                String::from_utf8_lossy(&header[space + 1..])
            ))
        })?;

    Ok((kind, size, nul + 1))
}
