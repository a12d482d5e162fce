//! Canonical hashing for graph fingerprints.
//!
//! Values are fed field by field into a streaming xxh64 state. Strings are
//! length-prefixed so adjacent fields cannot run into each other.
//!
//! ## Determinism Guarantees
//!
//! - Callers feed collections in a sorted order
//! - JSON values are written in their compact form; object keys are sorted
//!   because `serde_json::Map` is a `BTreeMap`
//! - Integers are written little-endian

use xxhash_rust::xxh64::Xxh64;

/// Streaming canonical hasher.
#[derive(Clone)]
pub struct CanonicalHasher {
    state: Xxh64,
}

impl CanonicalHasher {
    /// Start a hash with seed 0.
    pub fn new() -> Self {
        Self { state: Xxh64::new(0) }
    }

    /// Feed an integer.
    pub fn write_u64(&mut self, value: u64) {
        self.state.update(&value.to_le_bytes());
    }

    /// Feed a length-prefixed string.
    pub fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.state.update(value.as_bytes());
    }

    /// Feed an opaque JSON value.
    pub fn write_json(&mut self, value: &serde_json::Value) {
        self.write_str(&value.to_string());
    }

    /// Hash of everything fed so far.
    pub fn finish(&self) -> u64 {
        self.state.digest()
    }

    /// Hash as a 16-digit hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.finish())
    }
}

impl Default for CanonicalHasher {
    fn default() -> Self {
        Self::new()
    }
}
