//! Upload decoding
//!
//! Detection is deliberately simple: a byte-order mark wins, valid UTF-8 is
//! UTF-8, and anything else is taken to be Windows-1252 (what spreadsheet
//! exports on Windows produce). If the chosen decoder still reports
//! malformed input the bytes are decoded as UTF-8 with replacement
//! characters.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use super::ImportError;

/// Decoded upload text
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    /// Name of the encoding used
    pub encoding: &'static str,
    /// True if undecodable bytes were replaced with U+FFFD
    pub lossy: bool,
}

/// Best-guess encoding of the raw bytes, and the length of any BOM
pub fn detect(bytes: &[u8]) -> (&'static Encoding, usize) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, bom_len);
    }
    if std::str::from_utf8(bytes).is_ok() {
        (UTF_8, 0)
    } else {
        (WINDOWS_1252, 0)
    }
}

/// Decode an uploaded file
pub fn decode(bytes: &[u8]) -> Result<Decoded, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::EmptyUpload);
    }

    let (encoding, bom_len) = detect(bytes);
    let body = &bytes[bom_len..];

    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => {
            tracing::debug!("decoded upload as {}", encoding.name());
            Ok(Decoded {
                text: text.into_owned(),
                encoding: encoding.name(),
                lossy: false,
            })
        }
        None => {
            tracing::warn!(
                "upload is not valid {}; falling back to lossy UTF-8",
                encoding.name()
            );
            Ok(Decoded {
                text: String::from_utf8_lossy(body).into_owned(),
                encoding: UTF_8.name(),
                lossy: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        let decoded = decode("Routage,,,\nshow ip route,Affiche les routes,,\n".as_bytes()).unwrap();
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(!decoded.lossy);
        assert!(decoded.text.starts_with("Routage"));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Switching,,,");
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.text, "Switching,,,");
    }

    #[test]
    fn test_windows_1252_guess() {
        // "Caf\xe9" is not UTF-8 but is valid Windows-1252
        let decoded = decode(b"Caf\xe9,,,").unwrap();
        assert_eq!(decoded.encoding, "windows-1252");
        assert_eq!(decoded.text, "Café,,,");
    }

    #[test]
    fn test_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "ab".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.encoding, "UTF-16LE");
        assert_eq!(decoded.text, "ab");
    }

    #[test]
    fn test_malformed_falls_back_to_lossy_utf8() {
        // UTF-16LE BOM followed by an odd trailing byte
        let decoded = decode(&[0xFF, 0xFE, 0x61, 0x00, 0x62]).unwrap();
        assert!(decoded.lossy);
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        assert!(matches!(decode(b""), Err(ImportError::EmptyUpload)));
    }
}
