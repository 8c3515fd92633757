use speedy::{Readable, Writable};
use std::collections::HashMap;

pub const NUM_VISITS: &str = "num_visits";

/// Per-browser key/value state, persisted as a speedy blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Readable, Writable)]
pub struct Session {
    values: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unreadable blobs start a fresh session.
    pub fn decode(data: &[u8]) -> Self {
        Self::read_from_buffer(data).unwrap_or_else(|err| {
            log::warn!("discarding unreadable session data: {err}");
            Self::default()
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, speedy::Error> {
        self.write_to_vec()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Bumps a counter and returns the value it held before.
    pub fn increment(&mut self, key: &str) -> i64 {
        let current = self
            .get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        self.set(key, (current + 1).to_string());
        current
    }
}
