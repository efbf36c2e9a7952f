use bson::Bson;
use rand::Rng;

use loki_query::{RangeOp, almost_eq, compare_total_order, date_eq, strict_eq};

use crate::document::Document;

/// Extract the value a binary index compares on. A missing field reads as
/// `Bson::Null` — consistent with the total order's "null sorts first" and
/// with `$eq null` matching both explicit nulls and absent fields.
fn field_value(doc: &Document, field: &str) -> Bson {
    doc.get(field).cloned().unwrap_or(Bson::Null)
}

/// Options for [`BinaryIndex::check_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckIndexOptions {
    pub random_sampling: bool,
    pub random_sampling_factor: f64,
    pub repair: bool,
}

/// A sorted permutation of `Data` positions, keyed by one document field.
///
/// `values` is a permutation of `[0, Data.len())` sorted by
/// `Data[pos][field]` under the total order in `loki_query::compare`,
/// whenever `dirty == false` (§3 invariant #3). Two maintenance modes
/// (§4.3): **adaptive**, where [`BinaryIndex::adaptive_insert`] /
/// `_update` / `_remove` keep it sorted on every mutation, and **lazy**,
/// where mutations only call [`BinaryIndex::mark_dirty`] and a rebuild is
/// deferred to the next read via [`BinaryIndex::ensure_built`].
#[derive(Debug, Clone)]
pub struct BinaryIndex {
    pub field: String,
    pub dirty: bool,
    pub values: Vec<usize>,
}

impl BinaryIndex {
    /// A fresh index starts clean — an empty permutation trivially satisfies
    /// the sorted-order invariant, so the first adaptive insert doesn't need
    /// a rebuild first.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dirty: false,
            values: Vec::new(),
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Full rebuild from scratch: `O(n log n)`.
    pub fn rebuild(&mut self, data: &[Document]) {
        self.values = (0..data.len()).collect();
        self.values
            .sort_by(|&a, &b| compare_total_order(&field_value(&data[a], &self.field), &field_value(&data[b], &self.field)));
        self.dirty = false;
    }

    /// Rebuild iff dirty. Idempotent, and the only place a lazy index ever
    /// gets touched outside a mutation (§5: "Lazy rebuild is idempotent and
    /// may be triggered by the first read after a dirty mark").
    pub fn ensure_built(&mut self, data: &[Document]) {
        if self.dirty {
            self.rebuild(data);
        }
    }

    /// Binary-search insertion point for `value` among the (assumed sorted)
    /// `values` permutation, resolved against `data`.
    fn insertion_point(&self, data: &[Document], value: &Bson) -> usize {
        self.values
            .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), value).is_lt())
    }

    /// Splice a freshly-appended position into its sorted slot.
    pub fn adaptive_insert(&mut self, data: &[Document], position: usize) {
        debug_assert!(!self.dirty, "adaptive_insert on a dirty index");
        let value = field_value(&data[position], &self.field);
        let k = self.insertion_point(data, &value);
        self.values.insert(k, position);
    }

    /// Linear scan for the slot holding `position` (§4.3: "no secondary map
    /// from position→index-slot exists"), splice it out, then re-insert at
    /// `position`'s new sorted location. Call *after* `Data[position]` has
    /// already been overwritten with the new record.
    pub fn adaptive_update(&mut self, data: &[Document], position: usize) {
        debug_assert!(!self.dirty, "adaptive_update on a dirty index");
        if let Some(slot) = self.values.iter().position(|&p| p == position) {
            self.values.remove(slot);
        }
        self.adaptive_insert(data, position);
    }

    /// Locate and remove the slot for `position` (via `calculate_range`
    /// over its current value, narrowed with a linear scan through ties),
    /// then decrement every stored position `> position` — the only
    /// operation that shifts positions (§4.1).
    ///
    /// Must be called *before* `Data`/`IdIndex` are spliced, since it reads
    /// `Data[position]` to relocate the slot.
    pub fn adaptive_remove(&mut self, data: &[Document], position: usize) {
        debug_assert!(!self.dirty, "adaptive_remove on a dirty index");
        let value = field_value(&data[position], &self.field);
        if let Some((lo, hi)) = self.calculate_range(data, RangeOp::Eq, &RangeValue::Single(&value)) {
            if let Some(slot) = (lo..=hi).find(|&i| self.values[i] == position) {
                self.values.remove(slot);
            }
        } else {
            // Shouldn't happen if the index is in sync, but stay robust: fall
            // back to a full linear scan.
            if let Some(slot) = self.values.iter().position(|&p| p == position) {
                self.values.remove(slot);
            }
        }
        for stored in self.values.iter_mut() {
            if *stored > position {
                *stored -= 1;
            }
        }
    }

    /// `[lo, hi]` inclusive bounds into `self.values` matching `op` against
    /// `target`, or `None` for an empty result. Requires `!self.dirty` —
    /// callers must `ensure_built` first.
    pub fn calculate_range(
        &self,
        data: &[Document],
        op: RangeOp,
        target: &RangeValue<'_>,
    ) -> Option<(usize, usize)> {
        if self.values.is_empty() {
            return None;
        }
        let value_at = |i: usize| field_value(&data[self.values[i]], &self.field);
        let first = value_at(0);
        let last = value_at(self.values.len() - 1);

        match (op, target) {
            (RangeOp::Eq, RangeValue::Single(v)) => {
                self.equal_range(data, v, strict_eq, &first, &last)
            }
            (RangeOp::Aeq, RangeValue::Single(v)) => {
                self.equal_range(data, v, almost_eq, &first, &last)
            }
            (RangeOp::Dteq, RangeValue::Single(v)) => {
                self.equal_range(data, v, date_eq, &first, &last)
            }
            (RangeOp::Gt, RangeValue::Single(v)) => {
                if compare_total_order(v, &last).is_ge() {
                    return None;
                }
                let lo = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), v).is_le());
                (lo < self.values.len()).then_some((lo, self.values.len() - 1))
            }
            (RangeOp::Gte, RangeValue::Single(v)) => {
                if compare_total_order(v, &last).is_gt() {
                    return None;
                }
                let lo = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), v).is_lt());
                (lo < self.values.len()).then_some((lo, self.values.len() - 1))
            }
            (RangeOp::Lt, RangeValue::Single(v)) => {
                if compare_total_order(v, &first).is_le() {
                    return None;
                }
                let hi = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), v).is_lt());
                (hi > 0).then_some((0, hi - 1))
            }
            (RangeOp::Lte, RangeValue::Single(v)) => {
                if compare_total_order(v, &first).is_lt() {
                    return None;
                }
                let hi = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), v).is_le());
                (hi > 0).then_some((0, hi - 1))
            }
            (RangeOp::Between, RangeValue::Between(lo_v, hi_v)) => {
                if compare_total_order(hi_v, &first).is_lt() || compare_total_order(lo_v, &last).is_gt() {
                    return None;
                }
                let lo = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), lo_v).is_lt());
                let hi_excl = self
                    .values
                    .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), hi_v).is_le());
                (lo < hi_excl).then_some((lo, hi_excl - 1))
            }
            _ => None,
        }
    }

    /// Locate the contiguous total-order-equal window, then trim from both
    /// ends while `pred` fails — gives `Aeq`/`Dteq` a looser equality than
    /// `Eq` without losing the `[lo, hi]` contiguity `calculate_range`
    /// promises (see DESIGN.md for the "homogeneous field type" assumption
    /// this relies on).
    fn equal_range(
        &self,
        data: &[Document],
        target: &Bson,
        pred: impl Fn(&Bson, &Bson) -> bool,
        first: &Bson,
        last: &Bson,
    ) -> Option<(usize, usize)> {
        if compare_total_order(target, first).is_lt() || compare_total_order(target, last).is_gt() {
            return None;
        }
        let lo = self
            .values
            .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), target).is_lt());
        let hi_excl = self
            .values
            .partition_point(|&pos| compare_total_order(&field_value(&data[pos], &self.field), target).is_le());
        if lo >= hi_excl {
            return None;
        }
        let mut lo = lo;
        let mut hi = hi_excl - 1;
        while lo <= hi {
            let v = field_value(&data[self.values[lo]], &self.field);
            if pred(&v, target) {
                break;
            }
            if lo == hi {
                return None;
            }
            lo += 1;
        }
        while hi > lo {
            let v = field_value(&data[self.values[hi]], &self.field);
            if pred(&v, target) {
                break;
            }
            hi -= 1;
        }
        Some((lo, hi))
    }

    /// Verify `values.len() == data.len()` and adjacent ordering. In
    /// sampling mode, only the first/last pair plus
    /// `floor((n-1) * factor)` random adjacent pairs are checked. Rebuilds
    /// from scratch (and returns `true`) when `repair` is set and a check
    /// fails.
    pub fn check_index(&mut self, data: &[Document], opts: CheckIndexOptions) -> bool {
        let ok = self.check_index_readonly(data, opts);
        if !ok && opts.repair {
            self.rebuild(data);
            return true;
        }
        ok
    }

    fn check_index_readonly(&self, data: &[Document], opts: CheckIndexOptions) -> bool {
        if self.dirty {
            return false;
        }
        if self.values.len() != data.len() {
            return false;
        }
        let n = self.values.len();
        if n < 2 {
            return true;
        }

        let pair_ok = |i: usize| -> bool {
            let a = field_value(&data[self.values[i]], &self.field);
            let b = field_value(&data[self.values[i + 1]], &self.field);
            compare_total_order(&a, &b).is_le()
        };

        if !opts.random_sampling {
            return (0..n - 1).all(pair_ok);
        }

        if !pair_ok(0) || !pair_ok(n - 2) {
            return false;
        }
        let samples = ((n - 1) as f64 * opts.random_sampling_factor).floor() as usize;
        let mut rng = rand::thread_rng();
        for _ in 0..samples {
            let i = rng.gen_range(0..n - 1);
            if !pair_ok(i) {
                return false;
            }
        }
        true
    }
}

/// The right-hand side of a `calculate_range` call.
pub enum RangeValue<'a> {
    Single(&'a Bson),
    Between(&'a Bson, &'a Bson),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ages: &[i32]) -> Vec<Document> {
        ages.iter().map(|&a| bson::doc! {"age": a}).collect()
    }

    fn values_for(idx: &BinaryIndex, data: &[Document], range: Option<(usize, usize)>) -> Vec<i32> {
        match range {
            None => vec![],
            Some((lo, hi)) => (lo..=hi)
                .map(|i| data[idx.values[i]].get_i32("age").unwrap())
                .collect(),
        }
    }

    #[test]
    fn rebuild_sorts_positions_by_field() {
        let data = docs(&[30, 10, 20, 40]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        let sorted: Vec<i32> = idx.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect();
        assert_eq!(sorted, vec![10, 20, 30, 40]);
    }

    #[test]
    fn between_is_inclusive_both_ends() {
        let data = docs(&[30, 10, 20, 40]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        let range = idx.calculate_range(
            &data,
            RangeOp::Between,
            &RangeValue::Between(&Bson::Int32(10), &Bson::Int32(30)),
        );
        let mut got = values_for(&idx, &data, range);
        got.sort();
        assert_eq!(got, vec![10, 20, 30]);
    }

    #[test]
    fn binary_range_after_shift_matches_seed_scenario() {
        // spec §8 scenario 2
        let mut data = docs(&[30, 10, 20, 40]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);

        // remove the document with age == 20 (position 2)
        idx.adaptive_remove(&data, 2);
        data.remove(2);

        let range = idx.calculate_range(
            &data,
            RangeOp::Between,
            &RangeValue::Between(&Bson::Int32(15), &Bson::Int32(35)),
        );
        let got = values_for(&idx, &data, range);
        assert_eq!(got, vec![30]);
        assert!(idx.check_index(&data, CheckIndexOptions::default()));
    }

    #[test]
    fn adaptive_insert_keeps_sorted_order() {
        let mut data = docs(&[10, 30]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        data.push(bson::doc! {"age": 20});
        idx.adaptive_insert(&data, 2);
        let order: Vec<i32> = idx.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect();
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn adaptive_update_relocates() {
        let mut data = docs(&[10, 20, 30]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        data[0] = bson::doc! {"age": 99};
        idx.adaptive_update(&data, 0);
        let order: Vec<i32> = idx.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect();
        assert_eq!(order, vec![20, 30, 99]);
    }

    #[test]
    fn gt_gte_lt_lte_bounds() {
        let data = docs(&[10, 20, 20, 30]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);

        let gt = idx.calculate_range(&data, RangeOp::Gt, &RangeValue::Single(&Bson::Int32(20)));
        assert_eq!(values_for(&idx, &data, gt), vec![30]);

        let gte = idx.calculate_range(&data, RangeOp::Gte, &RangeValue::Single(&Bson::Int32(20)));
        assert_eq!(values_for(&idx, &data, gte), vec![20, 20, 30]);

        let lt = idx.calculate_range(&data, RangeOp::Lt, &RangeValue::Single(&Bson::Int32(20)));
        assert_eq!(values_for(&idx, &data, lt), vec![10]);

        let lte = idx.calculate_range(&data, RangeOp::Lte, &RangeValue::Single(&Bson::Int32(20)));
        assert_eq!(values_for(&idx, &data, lte), vec![10, 20, 20]);
    }

    #[test]
    fn out_of_range_target_is_empty() {
        let data = docs(&[10, 20, 30]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        assert!(
            idx.calculate_range(&data, RangeOp::Gt, &RangeValue::Single(&Bson::Int32(30)))
                .is_none()
        );
        assert!(
            idx.calculate_range(&data, RangeOp::Lt, &RangeValue::Single(&Bson::Int32(10)))
                .is_none()
        );
        assert!(
            idx.calculate_range(&data, RangeOp::Eq, &RangeValue::Single(&Bson::Int32(999)))
                .is_none()
        );
    }

    #[test]
    fn check_index_detects_corruption_and_repairs() {
        let data = docs(&[10, 20, 30]);
        let mut idx = BinaryIndex::new("age");
        idx.rebuild(&data);
        idx.values.swap(0, 2);

        let opts = CheckIndexOptions::default();
        assert!(!idx.check_index(&data, opts));

        let repair = CheckIndexOptions {
            repair: true,
            ..Default::default()
        };
        assert!(idx.check_index(&data, repair));
        let order: Vec<i32> = idx.values.iter().map(|&p| data[p].get_i32("age").unwrap()).collect();
        assert_eq!(order, vec![10, 20, 30]);
    }
}
