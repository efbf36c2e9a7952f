//! The minimal query-side vocabulary a collection engine needs.
//!
//! Per the design notes this crate's sibling answers to: filter trees,
//! sort compilation and query execution belong to a query compiler that is
//! out of scope here. This crate holds only the total-order comparator and
//! the range-operator vocabulary a binary index needs to compute
//! `calculate_range`.

mod compare;
mod operator;

pub use compare::{almost_eq, compare_total_order, date_eq, strict_eq};
pub use operator::RangeOp;
