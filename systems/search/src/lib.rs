#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid searches used by the tactical rules.
//!
//! Both searches run over a [`CostGrid`](bomberland_core::CostGrid) where every
//! finite value is an additive traversal cost and `f64::INFINITY` marks a cell
//! that cannot be entered. Searches own their scratch buffers so a rule engine
//! can keep one instance alive across ticks without reallocating.

mod frontier;
mod path;
mod retreat;

pub use path::{PathOutcome, PathSearch};
pub use retreat::{RetreatOutcome, RetreatSearch};
