use std::fmt;

use anyhow::{Result, bail};
use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LineEnding::Lf => "lf",
            LineEnding::Crlf => "crlf",
        };
        f.write_str(label)
    }
}

/// Which terminator the rewritten file uses.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EolPolicy {
    /// Keep whatever the input file uses.
    #[default]
    Auto,
    Lf,
    Crlf,
}

impl EolPolicy {
    pub fn resolve(self, detected: LineEnding) -> LineEnding {
        match self {
            EolPolicy::Auto => detected,
            EolPolicy::Lf => LineEnding::Lf,
            EolPolicy::Crlf => LineEnding::Crlf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub had_bom: bool,
}

/// Decodes raw file bytes as UTF-8, stripping (and remembering) a UTF-8 BOM.
///
/// Other byte-order marks are refused instead of being transcoded: the file
/// would not survive the round trip byte for byte.
pub fn decode(bytes: &[u8]) -> Result<DecodedText> {
    let (body, had_bom) = match Encoding::for_bom(bytes) {
        Some((encoding, len)) if encoding == UTF_8 => (&bytes[len..], true),
        Some((encoding, _)) => bail!("unsupported encoding {}", encoding.name()),
        None => (bytes, false),
    };

    let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(body) else {
        bail!("content is not valid UTF-8");
    };

    Ok(DecodedText {
        text: text.into_owned(),
        had_bom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bom_is_stripped_and_recorded() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"(A) call mom\n");
        let decoded = decode(&data).expect("decodes");
        assert!(decoded.had_bom);
        assert_eq!(decoded.text, "(A) call mom\n");
    }

    #[test]
    fn plain_utf8_has_no_bom() {
        let decoded = decode("caf\u{e9} @town".as_bytes()).expect("decodes");
        assert!(!decoded.had_bom);
        assert_eq!(decoded.text, "caf\u{e9} @town");
    }

    #[test]
    fn utf16_bom_is_rejected() {
        let err = decode(&[0xFF, 0xFE, 0x61, 0x00]).unwrap_err();
        assert!(err.to_string().contains("UTF-16LE"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(decode(&[0x61, 0xFF, 0x62]).is_err());
    }

    #[test]
    fn crlf_wins_over_lf() {
        assert_eq!(LineEnding::detect("a\r\nb\nc"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("single line"), LineEnding::Lf);
    }

    #[test]
    fn policy_overrides_detection() {
        assert_eq!(EolPolicy::Auto.resolve(LineEnding::Crlf), LineEnding::Crlf);
        assert_eq!(EolPolicy::Lf.resolve(LineEnding::Crlf), LineEnding::Lf);
        assert_eq!(EolPolicy::Crlf.resolve(LineEnding::Lf), LineEnding::Crlf);
    }
}
