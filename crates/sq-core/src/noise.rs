//! Runtime noise generators built from [`sq_config::NoiseConfig`].
//!
//! White noise draws independent Gaussian innovations; autoregressive
//! noise filters its own white-noise driver through a trailing window
//! of past values held in a [`SlidingArray`].

use rand::Rng;
use rand_distr::{Distribution, Normal};
use sq_config::NoiseConfig;
use sq_math::SlidingArray;

/// A stateful noise generator, advanced one observation at a time.
pub enum NoiseGenerator {
    White {
        sigma: f64,
        normal: Normal<f64>,
    },
    Autoregressive {
        rho: Vec<f64>,
        white: Box<NoiseGenerator>,
        window: SlidingArray<f64>,
    },
}

impl NoiseGenerator {
    /// Build a generator from a validated configuration. Panics if
    /// `config` was never passed through [`NoiseConfig::validate`],
    /// since `sigma` is assumed positive there.
    pub fn build(config: &NoiseConfig) -> Self {
        match config {
            NoiseConfig::White { sigma } => NoiseGenerator::White {
                sigma: *sigma,
                normal: Normal::new(0.0, *sigma).expect("noise config already validated"),
            },
            NoiseConfig::Autoregressive { white, rho } => NoiseGenerator::Autoregressive {
                rho: rho.clone(),
                white: Box::new(NoiseGenerator::build(white)),
                window: SlidingArray::new(rho.len(), 0.0),
            },
        }
    }

    /// The variance of the driving white-noise innovations, used to
    /// de-scale unscaled log-likelihood sums back to natural units.
    pub fn innovation_variance(&self) -> f64 {
        match self {
            NoiseGenerator::White { sigma, .. } => sigma * sigma,
            NoiseGenerator::Autoregressive { white, .. } => white.innovation_variance(),
        }
    }

    /// Clear all filter state ahead of a fresh replication.
    pub fn reset(&mut self) {
        match self {
            NoiseGenerator::White { .. } => {}
            NoiseGenerator::Autoregressive { white, window, .. } => {
                white.reset();
                *window = SlidingArray::new(window.capacity(), 0.0);
            }
        }
    }

    /// Draw the next noise value.
    pub fn next(&mut self, rng: &mut impl Rng) -> f64 {
        match self {
            NoiseGenerator::White { normal, .. } => normal.sample(rng),
            NoiseGenerator::Autoregressive { rho, white, window } => {
                let w = white.next(rng);
                let mut v = w;
                for (i, coeff) in rho.iter().enumerate() {
                    if let Some(past) = window.lag(i) {
                        v += coeff * past;
                    }
                }
                window.push_back(v);
                v
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn white_noise_has_sigma_squared_innovation_variance() {
        let gen = NoiseGenerator::build(&NoiseConfig::White { sigma: 2.0 });
        assert_eq!(gen.innovation_variance(), 4.0);
    }

    #[test]
    fn autoregressive_inherits_embedded_white_variance() {
        let gen = NoiseGenerator::build(&NoiseConfig::Autoregressive {
            white: Box::new(NoiseConfig::White { sigma: 1.5 }),
            rho: vec![0.3, 0.2],
        });
        assert_eq!(gen.innovation_variance(), 2.25);
    }

    #[test]
    fn autoregressive_recurrence_matches_hand_computation() {
        // rho = [1.0], so v(t) = w(t) + v(t-1): the window should always
        // hold exactly the last value returned.
        let mut gen = NoiseGenerator::Autoregressive {
            rho: vec![1.0],
            white: Box::new(NoiseGenerator::White {
                sigma: 1.0,
                normal: Normal::new(0.0, 1.0).unwrap(),
            }),
            window: SlidingArray::new(1, 0.0),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let a = gen.next(&mut rng);
        let b = gen.next(&mut rng);
        // b should equal (innovation at t=1) + rho[0] * a
        if let NoiseGenerator::Autoregressive { window, .. } = &gen {
            assert_eq!(window.lag(0), Some(&b));
        }
        assert!(a.is_finite() && b.is_finite());
    }

    #[test]
    fn reset_clears_the_trailing_window() {
        let mut gen = NoiseGenerator::build(&NoiseConfig::Autoregressive {
            white: Box::new(NoiseConfig::White { sigma: 1.0 }),
            rho: vec![0.5],
        });
        let mut rng = StdRng::seed_from_u64(7);
        gen.next(&mut rng);
        gen.reset();
        if let NoiseGenerator::Autoregressive { window, .. } = &gen {
            assert_eq!(window.lag(0), Some(&0.0));
        }
    }
}
