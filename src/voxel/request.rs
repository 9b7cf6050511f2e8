//! Chunk request levels

use serde::{Deserialize, Serialize};

/// How far a chunk acquisition may go to produce a chunk.
///
/// Levels are ordered: each level includes everything the lower ones do.
/// The level is a per-call policy, never stored state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestLevel {
    /// Resident chunks only; may return absent
    Cache,
    /// Cache, then persistent storage
    Load,
    /// Cache, then persistent storage, then procedural generation
    Generate,
}

impl RequestLevel {
    /// Whether this level may read from persistent storage
    pub fn allows_load(self) -> bool {
        self >= RequestLevel::Load
    }

    /// Whether this level may run the generator
    pub fn allows_generate(self) -> bool {
        self >= RequestLevel::Generate
    }
}

impl std::fmt::Display for RequestLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestLevel::Cache => "cache",
            RequestLevel::Load => "load",
            RequestLevel::Generate => "generate",
        };
        f.write_str(name)
    }
}
