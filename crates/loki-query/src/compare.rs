use std::cmp::Ordering;

use bson::Bson;

/// Rank used to order values of different BSON types against each other.
/// `null`/missing sorts before everything; numbers before strings; anything
/// else (bool, date, array, document, binary, ...) sorts after strings in a
/// stable but otherwise arbitrary position — the spec only pins the first
/// three ranks, so the rest just need to be total and consistent.
fn rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 1,
        Bson::String(_) => 2,
        Bson::Boolean(_) => 3,
        Bson::DateTime(_) => 4,
        _ => 5,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

fn as_millis(value: &Bson) -> Option<i64> {
    match value {
        Bson::DateTime(dt) => Some(dt.timestamp_millis()),
        Bson::Int64(i) => Some(*i),
        Bson::Int32(i) => Some(*i as i64),
        Bson::Double(d) => Some(*d as i64),
        _ => None,
    }
}

/// The three-way total order pinned by the spec: `null` before numbers
/// before strings, with a consistent (if unspecified by the spec)
/// extension for every other BSON type so the comparator is total.
pub fn compare_total_order(a: &Bson, b: &Bson) -> Ordering {
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Bson::Null | Bson::Undefined, Bson::Null | Bson::Undefined) => Ordering::Equal,
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => {
            if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            } else {
                Ordering::Equal
            }
        }
    }
}

/// `$eq`: same type rank *and* same value under the total order.
pub fn strict_eq(a: &Bson, b: &Bson) -> bool {
    rank(a) == rank(b) && compare_total_order(a, b) == Ordering::Equal
}

/// `$aeq`: equal under the total order regardless of numeric subtype or
/// date/epoch-millis representation.
pub fn almost_eq(a: &Bson, b: &Bson) -> bool {
    if let (Some(x), Some(y)) = (as_millis(a), as_millis(b))
        && (matches!(a, Bson::DateTime(_)) || matches!(b, Bson::DateTime(_)))
    {
        return x == y;
    }
    compare_total_order(a, b) == Ordering::Equal
}

/// `$dteq`: both operands normalised to epoch milliseconds before compare.
pub fn date_eq(a: &Bson, b: &Bson) -> bool {
    match (as_millis(a), as_millis(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
