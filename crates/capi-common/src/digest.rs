//! Stable content hashing
//!
//! Content identifiers are persisted in revision history, so they must be
//! stable across toolchains and releases. SHA-256 via aws-lc-rs, hex encoded.

use std::fmt::Write;

use aws_lc_rs::digest;

/// Incremental SHA-256 over a sequence of length-prefixed fields
pub struct ContentHasher {
    ctx: digest::Context,
}

impl ContentHasher {
    /// Start a new hash
    pub fn new() -> Self {
        Self {
            ctx: digest::Context::new(&digest::SHA256),
        }
    }

    /// Feed a length-prefixed field, so adjacent fields cannot run together
    pub fn update_field(&mut self, field: &str) {
        self.ctx.update(&(field.len() as u64).to_be_bytes());
        self.ctx.update(field.as_bytes());
    }

    /// Finish and return the lowercase hex digest
    pub fn finish_hex(self) -> String {
        to_hex(self.ctx.finish().as_ref())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of `data` as 64 lowercase hex characters
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(digest::digest(&digest::SHA256, data).as_ref())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{:02x}", b);
            s
        })
}
