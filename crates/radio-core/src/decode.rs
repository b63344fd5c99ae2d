//! Text decoding for descriptor files.
//!
//! Descriptors in the wild are written in whatever encoding the creator's
//! editor used. Decoders are tried in a fixed order; the first one that
//! accepts the whole input wins. A lossy UTF-8 decode terminates the chain,
//! so decoding never fails.

use std::borrow::Cow;

/// A single decoder in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoder {
    /// Strict UTF-8; a leading byte-order mark is dropped
    Utf8,
    /// Cyrillic Windows code page
    Windows1251,
    /// ISO-8859-1, maps every byte straight to U+0000..U+00FF
    Latin1,
}

/// Default order used for descriptor files
pub const DECODER_CHAIN: &[TextDecoder] = &[
    TextDecoder::Utf8,
    TextDecoder::Windows1251,
    TextDecoder::Latin1,
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

impl TextDecoder {
    /// Decode the whole input, or `None` if it is not valid for this encoding
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextDecoder::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            TextDecoder::Windows1251 => {
                // 0x98 is unassigned in cp1251
                if bytes.contains(&0x98) {
                    return None;
                }
                encoding_rs::WINDOWS_1251
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(Cow::into_owned)
            }
            TextDecoder::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Decode with the default chain
pub fn decode_text(bytes: &[u8]) -> String {
    decode_with(DECODER_CHAIN, bytes)
}

/// Decode with an explicit chain, falling back to lossy UTF-8
pub fn decode_with(chain: &[TextDecoder], bytes: &[u8]) -> String {
    chain
        .iter()
        .find_map(|decoder| decoder.decode(bytes))
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}
