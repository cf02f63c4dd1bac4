use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::session::Resolution;

pub const MATCH_SETTLE_MS: u64 = 500;
pub const MISMATCH_SETTLE_MS: u64 = 1000;
pub const TICK: Duration = Duration::from_secs(1);

/// Settle delays applied after the second card of a pair is revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub match_settle_ms: u64,
    pub mismatch_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            match_settle_ms: MATCH_SETTLE_MS,
            mismatch_settle_ms: MISMATCH_SETTLE_MS,
        }
    }
}

impl Timings {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn settle_delay(&self, resolution: Resolution) -> Duration {
        match resolution {
            Resolution::Match => Duration::from_millis(self.match_settle_ms),
            Resolution::Mismatch => Duration::from_millis(self.mismatch_settle_ms),
        }
    }
}
