use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid UTF-8 byte sequence at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{encoding} stream has a truncated code unit ({len} bytes after the byte-order mark)")]
    TruncatedCodeUnit { encoding: &'static str, len: usize },

    #[error("{encoding} stream contains an invalid code point")]
    InvalidCodePoint { encoding: &'static str },
}

/// Strips a leading byte-order mark and transcodes the input to UTF-8.
///
/// Input that is already UTF-8 without a mark is returned borrowed. The
/// output never carries a mark, so the operation is idempotent.
pub fn normalize(raw: &[u8]) -> Result<Cow<'_, str>, EncodingError> {
    // The UTF-32LE mark starts with the UTF-16LE mark, so the four-byte
    // marks must be checked first.
    if raw.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        return decode_utf32(&raw[4..], "UTF-32BE", u32::from_be_bytes).map(Cow::Owned);
    }
    if raw.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return decode_utf32(&raw[4..], "UTF-32LE", u32::from_le_bytes).map(Cow::Owned);
    }
    if raw.starts_with(&[0xFE, 0xFF]) {
        return decode_utf16(&raw[2..], "UTF-16BE", u16::from_be_bytes).map(Cow::Owned);
    }
    if raw.starts_with(&[0xFF, 0xFE]) {
        return decode_utf16(&raw[2..], "UTF-16LE", u16::from_le_bytes).map(Cow::Owned);
    }

    let body = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw);
    match std::str::from_utf8(body) {
        Ok(text) => Ok(Cow::Borrowed(text)),
        Err(e) => Err(EncodingError::InvalidUtf8 {
            offset: e.valid_up_to(),
        }),
    }
}

fn decode_utf16(
    body: &[u8],
    encoding: &'static str,
    read: fn([u8; 2]) -> u16,
) -> Result<String, EncodingError> {
    if body.len() % 2 != 0 {
        return Err(EncodingError::TruncatedCodeUnit {
            encoding,
            len: body.len(),
        });
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| EncodingError::InvalidCodePoint { encoding })
}

fn decode_utf32(
    body: &[u8],
    encoding: &'static str,
    read: fn([u8; 4]) -> u32,
) -> Result<String, EncodingError> {
    if body.len() % 4 != 0 {
        return Err(EncodingError::TruncatedCodeUnit {
            encoding,
            len: body.len(),
        });
    }
    body.chunks_exact(4)
        .map(|quad| {
            let unit = read([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(unit).ok_or(EncodingError::InvalidCodePoint { encoding })
        })
        .collect()
}
