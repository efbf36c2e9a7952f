use serde::{Deserialize, Serialize};

/// Range operators the binary index understands.
///
/// This is deliberately a small, closed set — the full query-operator
/// vocabulary (`$contains`, `$regex`, ...) belongs to the query compiler,
/// which is out of scope here. The core only ever needs to turn one of
/// these into a `[lo, hi]` slice of a sorted permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeOp {
    /// Strict equality: same type tag and same value.
    Eq,
    /// "Almost equal" — equality tolerant of numeric subtype (i32 vs i64 vs
    /// f64) and of date-vs-epoch-millis representation.
    Aeq,
    /// Date-time equality: both operands normalised to epoch milliseconds.
    Dteq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Inclusive on both ends.
    Between,
}
