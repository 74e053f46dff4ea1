//! Request id generation
//!
//! Ids look like `"<prefix>-<n>"`: the prefix is 10 random bytes in hex,
//! drawn once per client, and `n` counts up from 1. Ids are unique for the
//! life of a client, including across clones.

use jrpc_core::Id;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};

const PREFIX_BYTES: usize = 10;

/// Generator of client-unique string ids
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl IdGenerator {
    /// Generator with a fresh random prefix
    pub fn new() -> Self {
        let mut bytes = [0u8; PREFIX_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::with_prefix(hex::encode(bytes))
    }

    /// Generator with a fixed prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
        }
    }

    /// Prefix shared by every id of this generator
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Reserve the next id
    pub fn next_id(&self) -> Id {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Id::String(format!("{}-{}", self.prefix, n))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
