// ============================================================
// TEXT DECODING
// ============================================================
// Turn uploaded bytes into text: BOM sniffing, UTF-8, Windows-1252 fallback

use encoding_rs::{Encoding, WINDOWS_1252};

/// Decoded text plus the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode `bytes` with BOM detection, then strict UTF-8, then Windows-1252.
///
/// Spreadsheet tools on Windows commonly export CSV as UTF-16 with a BOM or as
/// Windows-1252 without one; both are handled here so the parser only sees `&str`.
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText {
            text: text.into_owned(),
            encoding: encoding.name(),
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: encoding_rs::UTF_8.name(),
        };
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: WINDOWS_1252.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_bom_is_stripped() {
        let decoded = decode_text(b"\xEF\xBB\xBFKeyword Phrase\nshoes");
        assert_eq!(decoded.text, "Keyword Phrase\nshoes");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn test_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Keyword Phrase".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_text(&bytes);
        assert_eq!(decoded.text, "Keyword Phrase");
        assert_eq!(decoded.encoding, "UTF-16LE");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "café" with 0xE9 for é is not valid UTF-8
        let decoded = decode_text(b"caf\xE9");
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn test_plain_utf8() {
        let decoded = decode_text("über shoes".as_bytes());
        assert_eq!(decoded.text, "über shoes");
    }
}
