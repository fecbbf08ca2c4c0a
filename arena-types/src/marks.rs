use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Per-position feedback for one digit of a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GuessMark {
    Exact,   // right digit, right position
    Partial, // digit occurs elsewhere in the secret
    Miss,    // digit not available in the secret
}
