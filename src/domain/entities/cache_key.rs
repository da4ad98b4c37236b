//! Cache keys and their on-disk filenames.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Longest filename most filesystems accept for a single path component.
const MAX_FILENAME_LEN: usize = 255;

/// Normalized fetch locator used to key both cache tiers.
///
/// The memory tier uses the locator verbatim. The disk tier uses
/// [`CacheKey::disk_filename`], which is a pure function of the locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from a locator, trimming surrounding whitespace.
    #[must_use]
    pub fn new(locator: impl AsRef<str>) -> Self {
        Self(locator.as_ref().trim().to_string())
    }

    /// Returns the locator string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the locator is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives the disk filename for this key.
    ///
    /// Path separators (`/` and `:`) become `_`, then everything that is not
    /// ASCII alphanumeric is percent-encoded. Names that would exceed the
    /// filesystem component limit fall back to a SHA-256 digest.
    #[must_use]
    pub fn disk_filename(&self) -> String {
        let substituted = self.0.replace(['/', ':'], "_");
        let encoded = encode_alphanumeric(&substituted);

        if encoded.len() <= MAX_FILENAME_LEN {
            encoded
        } else {
            let digest = Sha256::digest(self.0.as_bytes());
            hex::encode(digest)
        }
    }
}

/// Percent-encodes every byte outside `[A-Za-z0-9]`.
///
/// `urlencoding` leaves the unreserved marks `-._~` alone, so those are
/// encoded here as well.
fn encode_alphanumeric(input: &str) -> String {
    let partially = urlencoding::encode(input);
    let mut out = String::with_capacity(partially.len());
    for c in partially.chars() {
        match c {
            '-' | '.' | '_' | '~' => {
                let _ = write!(out, "%{:02X}", c as u32);
            }
            other => out.push(other),
        }
    }
    out
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
