//! Bin-rotated online mean/variance accumulator.
//!
//! Observations are shifted by an "anticipated mean" before being added
//! to one of `order + 1` rotating bins, so that no single running sum
//! ever accumulates more than a bounded fraction of the total mass —
//! the same defense against catastrophic cancellation the original
//! implementation uses. Each bin carries its own partial sum and
//! partial sum-of-squares; the final mean and variance are assembled
//! from all bins together.

use crate::grid::Grid;

/// Values that a [`MomentStatistic`] can accumulate: a scalar or a
/// fixed-shape grid of scalars, accumulated element-wise.
pub trait Accumulate: Clone {
    fn zero_like(shape_of: &Self) -> Self;
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn scale(&self, factor: f64) -> Self;
    /// Element-wise square, used to accumulate sums of squares.
    fn square(&self) -> Self;
    /// Element-wise product, used for the mean-squared cross term.
    fn mul(&self, other: &Self) -> Self;
    /// Clip negative components to zero (variance can drift slightly
    /// negative under floating-point rounding; the original clips it).
    fn positive_part(&self) -> Self;
}

impl Accumulate for f64 {
    fn zero_like(_shape_of: &Self) -> Self {
        0.0
    }
    fn add(&self, other: &Self) -> Self {
        self + other
    }
    fn sub(&self, other: &Self) -> Self {
        self - other
    }
    fn scale(&self, factor: f64) -> Self {
        self * factor
    }
    fn square(&self) -> Self {
        self * self
    }
    fn mul(&self, other: &Self) -> Self {
        self * other
    }
    fn positive_part(&self) -> Self {
        self.max(0.0)
    }
}

impl Accumulate for Grid<f64> {
    fn zero_like(shape_of: &Self) -> Self {
        Grid::zeros_like(shape_of)
    }
    fn add(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a + b)
    }
    fn sub(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a - b)
    }
    fn scale(&self, factor: f64) -> Self {
        self.map(|a| a * factor)
    }
    fn square(&self) -> Self {
        self.map(|a| a * a)
    }
    fn mul(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a * b)
    }
    fn positive_part(&self) -> Self {
        self.map(|a| a.max(0.0))
    }
}

/// Bin-rotated online accumulator of mean and variance.
#[derive(Debug, Clone)]
pub struct MomentStatistic<T: Accumulate> {
    shift: T,
    bins_sum: Vec<T>,
    bins_square: Vec<T>,
    count: u64,
    next_bin: usize,
}

impl<T: Accumulate> MomentStatistic<T> {
    /// Construct an accumulator with `order + 1` rotating bins and the
    /// given anticipated-mean shift. `order` defaults to 3 in the
    /// simulator's own construction sites but is configurable here.
    pub fn new(order: usize, shift: T) -> Self {
        let breadth = order + 1;
        let zero = T::zero_like(&shift);
        MomentStatistic {
            bins_sum: vec![zero.clone(); breadth],
            bins_square: vec![zero; breadth],
            shift,
            count: 0,
            next_bin: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Add an observation, shifting it by the anticipated mean before
    /// accumulating it into the next bin in rotation.
    pub fn observe(&mut self, x: T) {
        let shifted = x.sub(&self.shift);
        let bin = self.next_bin;
        self.bins_sum[bin] = self.bins_sum[bin].add(&shifted);
        self.bins_square[bin] = self.bins_square[bin].add(&shifted.square());
        self.count += 1;
        self.next_bin = (self.next_bin + 1) % self.bins_sum.len();
    }

    /// The sample mean, or the anticipated-mean shift if no
    /// observations have been made yet.
    pub fn mean(&self) -> T {
        if self.count == 0 {
            return self.shift.clone();
        }
        let n = self.count as f64;
        let mut total = T::zero_like(&self.shift);
        for bin in &self.bins_sum {
            total = total.add(&bin.scale(1.0 / n));
        }
        self.shift.add(&total)
    }

    /// The sample variance, clipped to non-negative. Returns a zero
    /// grid/scalar when fewer than two observations have been made.
    pub fn variance(&self) -> T {
        if self.count < 2 {
            return T::zero_like(&self.shift);
        }
        let n = self.count as f64;
        let n_minus_one = n - 1.0;

        let mut sum_q_over_n1 = T::zero_like(&self.shift);
        let mut sum_sum_over_n1 = T::zero_like(&self.shift);
        let mut sum_sum_over_n = T::zero_like(&self.shift);
        for (sum_bin, sq_bin) in self.bins_sum.iter().zip(self.bins_square.iter()) {
            sum_q_over_n1 = sum_q_over_n1.add(&sq_bin.scale(1.0 / n_minus_one));
            sum_sum_over_n1 = sum_sum_over_n1.add(&sum_bin.scale(1.0 / n_minus_one));
            sum_sum_over_n = sum_sum_over_n.add(&sum_bin.scale(1.0 / n));
        }

        let cross = sum_sum_over_n1.mul(&sum_sum_over_n);
        sum_q_over_n1.sub(&cross).positive_part()
    }

    /// Reset all bins and the observation count, keeping the shift.
    pub fn reset(&mut self) {
        let zero = T::zero_like(&self.shift);
        for bin in self.bins_sum.iter_mut() {
            *bin = zero.clone();
        }
        for bin in self.bins_square.iter_mut() {
            *bin = zero.clone();
        }
        self.count = 0;
        self.next_bin = 0;
    }

    /// Merge another accumulator's bins and count into this one.
    ///
    /// Both accumulators must have the same number of bins and the
    /// same shift; this is how per-worker accumulators from a
    /// multi-threaded Monte Carlo run are combined into one result,
    /// since each bin is itself a linear accumulator and bin *position*
    /// carries no meaning across workers.
    pub fn merge(&mut self, other: &MomentStatistic<T>) {
        debug_assert_eq!(self.bins_sum.len(), other.bins_sum.len());
        for (a, b) in self.bins_sum.iter_mut().zip(other.bins_sum.iter()) {
            *a = a.add(b);
        }
        for (a, b) in self.bins_square.iter_mut().zip(other.bins_square.iter()) {
            *a = a.add(b);
        }
        self.count += other.count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance_of_known_scalar_sample() {
        let mut stat = MomentStatistic::new(3, 0.0);
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stat.observe(x);
        }
        assert!((stat.mean() - 5.0).abs() < 1e-9);
        assert!((stat.variance() - 4.571428571428571).abs() < 1e-6);
    }

    #[test]
    fn variance_is_zero_with_fewer_than_two_observations() {
        let mut stat = MomentStatistic::new(3, 0.0);
        assert_eq!(stat.variance(), 0.0);
        stat.observe(10.0);
        assert_eq!(stat.variance(), 0.0);
    }

    #[test]
    fn mean_with_no_observations_is_the_shift() {
        let stat: MomentStatistic<f64> = MomentStatistic::new(3, 2.5);
        assert_eq!(stat.mean(), 2.5);
    }

    #[test]
    fn variance_never_negative_even_near_constant_stream() {
        let mut stat = MomentStatistic::new(3, 1.0);
        for _ in 0..1000 {
            stat.observe(1.0 + 1e-14);
        }
        assert!(stat.variance() >= 0.0);
    }

    #[test]
    fn reset_clears_bins_but_keeps_shift() {
        let mut stat = MomentStatistic::new(3, 1.0);
        stat.observe(5.0);
        stat.observe(6.0);
        stat.reset();
        assert_eq!(stat.count(), 0);
        assert_eq!(stat.mean(), 1.0);
    }

    #[test]
    fn merge_matches_accumulating_all_observations_in_one() {
        let mut combined = MomentStatistic::new(2, 0.0);
        for x in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            combined.observe(x);
        }

        let mut a = MomentStatistic::new(2, 0.0);
        let mut b = MomentStatistic::new(2, 0.0);
        for x in [1.0, 2.0, 3.0] {
            a.observe(x);
        }
        for x in [4.0, 5.0, 6.0] {
            b.observe(x);
        }
        a.merge(&b);

        assert_eq!(a.count(), combined.count());
        assert!((a.mean() - combined.mean()).abs() < 1e-12);
        assert!((a.variance() - combined.variance()).abs() < 1e-12);
    }

    #[test]
    fn mean_and_variance_of_195_consecutive_integers_are_shift_invariant() {
        for shift in [0.0, 1.0, 17.0, 50.0, 100.0] {
            for order in 0..4usize {
                let mut stat = MomentStatistic::new(order, shift);
                for x in 0..195 {
                    stat.observe(x as f64);
                }
                assert!((stat.mean() - 97.0).abs() < 1e-6, "shift={shift} order={order}");
                assert!(
                    (stat.variance() - 3185.0).abs() < 1e-3,
                    "shift={shift} order={order}"
                );
            }
        }
    }

    #[test]
    fn grid_accumulation_tracks_per_cell_statistics() {
        let shift = Grid::zeros(1, 2);
        let mut stat: MomentStatistic<Grid<f64>> = MomentStatistic::new(3, shift);
        let mut a = Grid::zeros(1, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 10.0;
        let mut b = Grid::zeros(1, 2);
        b[(0, 0)] = 3.0;
        b[(0, 1)] = 30.0;
        stat.observe(a);
        stat.observe(b);
        let mean = stat.mean();
        assert!((mean[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((mean[(0, 1)] - 20.0).abs() < 1e-12);
    }
}
