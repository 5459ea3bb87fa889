//! Numerical primitives for sequential hypothesis testing.
//!
//! The centerpiece is [`MomentStatistic`], a bin-rotated online
//! mean/variance accumulator that avoids the catastrophic cancellation
//! an unshifted running sum of squares would suffer over long Monte
//! Carlo runs. It is generic over anything implementing [`Accumulate`],
//! which covers both plain scalars and fixed-shape numeric grids (used
//! to accumulate run-length and decision-error statistics per
//! threshold-grid cell in a single pass).

pub mod grid;
pub mod moment_statistic;
pub mod sliding_array;

pub use grid::Grid;
pub use moment_statistic::{Accumulate, MomentStatistic};
pub use sliding_array::SlidingArray;
