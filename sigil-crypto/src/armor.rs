//! Text armor for keys and messages.
//!
//! ```text
//! -----BEGIN SIGIL MESSAGE-----
//! <base64, 64 columns>
//! -----END SIGIL MESSAGE-----
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const LINE_WIDTH: usize = 64;

/// What an armored block contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmorKind {
    PublicKey,
    PrivateKey,
    Message,
    SymmetricMessage,
}

impl ArmorKind {
    fn label(self) -> &'static str {
        match self {
            ArmorKind::PublicKey => "PUBLIC KEY",
            ArmorKind::PrivateKey => "PRIVATE KEY",
            ArmorKind::Message => "MESSAGE",
            ArmorKind::SymmetricMessage => "SYMMETRIC MESSAGE",
        }
    }

    fn header(self) -> String {
        format!("-----BEGIN SIGIL {}-----", self.label())
    }

    fn footer(self) -> String {
        format!("-----END SIGIL {}-----", self.label())
    }
}

#[derive(Debug, Error)]
pub enum ArmorError {
    #[error("missing or unexpected armor header (expected {0:?})")]
    Header(ArmorKind),

    #[error("missing or unexpected armor footer (expected {0:?})")]
    Footer(ArmorKind),

    #[error("invalid armor body: {0}")]
    Body(#[from] base64::DecodeError),
}

/// Wraps raw bytes in an armored block.
pub fn armor(kind: ArmorKind, bytes: &[u8]) -> String {
    let body = STANDARD.encode(bytes);
    let mut out = String::with_capacity(body.len() + body.len() / LINE_WIDTH + 80);
    out.push_str(&kind.header());
    out.push('\n');
    // base64 output is ASCII, so byte chunks are valid str slices
    for line in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str(&kind.footer());
    out.push('\n');
    out
}

/// Extracts the raw bytes from an armored block of the given kind.
pub fn dearmor(kind: ArmorKind, text: &str) -> Result<Vec<u8>, ArmorError> {
    let mut lines = text.trim().lines().map(str::trim);

    if lines.next() != Some(kind.header().as_str()) {
        return Err(ArmorError::Header(kind));
    }

    let footer = kind.footer();
    let mut body = String::new();
    let mut closed = false;
    for line in lines {
        if closed {
            // Nothing may follow the footer
            return Err(ArmorError::Footer(kind));
        }
        if line == footer {
            closed = true;
        } else {
            body.push_str(line);
        }
    }
    if !closed {
        return Err(ArmorError::Footer(kind));
    }

    Ok(STANDARD.decode(body)?)
}
