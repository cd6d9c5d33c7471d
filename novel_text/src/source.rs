//! Source decoding - turns raw novel files into text.
//!
//! Legacy Chinese novels are frequently distributed as GBK or Big5. Decoding
//! tries a fixed list of encodings in order and never fails: when nothing
//! decodes cleanly, the bytes are read as UTF-8 with invalid sequences dropped.

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, BIG5, GB18030, GBK};
use tracing::{debug, warn};

use crate::{Result, TextError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text decoded from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,

    /// Name of the encoding that produced `text`.
    pub encoding: &'static str,

    /// Whether invalid byte sequences had to be dropped.
    pub lossy: bool,
}

/// Decode raw bytes with the UTF-8 → GBK → GB18030 → Big5 chain.
pub fn decode(bytes: &[u8]) -> DecodedText {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: "UTF-8",
            lossy: false,
        };
    }

    let fallbacks: [&'static Encoding; 3] = [GBK, GB18030, BIG5];
    for encoding in fallbacks {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!(encoding = encoding.name(), "decoded source with fallback encoding");
            return DecodedText {
                text: text.into_owned(),
                encoding: encoding.name(),
                lossy: false,
            };
        }
    }

    warn!("no encoding decoded the source cleanly, dropping invalid UTF-8 sequences");
    let text = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();
    DecodedText {
        text,
        encoding: "UTF-8",
        lossy: true,
    }
}

/// Read a source file and decode it.
///
/// Only an unreadable file is an error; undecodable bytes degrade through
/// [`decode`].
pub fn read_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| TextError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = decode(&bytes);
    debug!(
        path = %path.display(),
        encoding = decoded.encoding,
        lossy = decoded.lossy,
        bytes = bytes.len(),
        "read source file"
    );
    Ok(decoded.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_utf8() {
        let decoded = decode("第一章 开始".as_bytes());
        assert_eq!(decoded.text, "第一章 开始");
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Chapter 1".as_bytes());
        assert_eq!(decode(&bytes).text, "Chapter 1");
    }

    #[test]
    fn test_decode_gbk() {
        let (encoded, _, _) = GBK.encode("哈利是一个年轻的巫师");
        let decoded = decode(&encoded);
        assert_eq!(decoded.text, "哈利是一个年轻的巫师");
        assert_ne!(decoded.encoding, "UTF-8");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_read_source_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Chapter 1\nHello".as_bytes()).unwrap();

        let text = read_source(file.path()).unwrap();
        assert_eq!(text, "Chapter 1\nHello");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_source("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, TextError::Io { .. }));
    }
}
