use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::allocation::{FACTOR_CEILING, FACTOR_FLOOR};

/// Source of uniform draws in `[0, 1)` feeding the allocation factor.
pub trait FactorSource {
    fn next_draw(&mut self) -> f64;

    /// Maps the next draw onto the `[0.7, 1.0]` factor window.
    fn next_factor(&mut self) -> f64 {
        let draw = self.next_draw();
        let draw = if draw.is_finite() {
            draw.clamp(0.0, 1.0)
        } else {
            0.0
        };
        FACTOR_FLOOR + (FACTOR_CEILING - FACTOR_FLOOR) * draw
    }
}

pub struct SeededFactors {
    rng: StdRng,
}

impl SeededFactors {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }
}

impl FactorSource for SeededFactors {
    fn next_draw(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Returns the same draw every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedFactors(pub f64);

impl FactorSource for FixedFactors {
    fn next_draw(&mut self) -> f64 {
        self.0
    }
}

/// Cycles through a fixed list of draws.
#[derive(Debug, Clone)]
pub struct SequenceFactors {
    draws: Vec<f64>,
    cursor: usize,
}

impl SequenceFactors {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }
}

impl FactorSource for SequenceFactors {
    fn next_draw(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_stays_inside_window() {
        let mut seeded = SeededFactors::new(7);
        for _ in 0..500 {
            let f = seeded.next_factor();
            assert!((0.7..=1.0).contains(&f), "factor {f} out of window");
        }
        assert!((FixedFactors(-3.0).next_factor() - 0.7).abs() < 1e-12);
        assert!((FixedFactors(9.0).next_factor() - 1.0).abs() < 1e-12);
        assert!((FixedFactors(f64::NAN).next_factor() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn same_seed_gives_same_draws() {
        let mut a = SeededFactors::new(42);
        let mut b = SeededFactors::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_draw().to_bits(), b.next_draw().to_bits());
        }
    }

    #[test]
    fn sequence_cycles() {
        let mut seq = SequenceFactors::new(vec![0.0, 1.0]);
        assert!((seq.next_factor() - 0.7).abs() < 1e-12);
        assert!((seq.next_factor() - 1.0).abs() < 1e-12);
        assert!((seq.next_factor() - 0.7).abs() < 1e-12);
        assert_eq!(SequenceFactors::new(Vec::new()).next_draw(), 0.0);
    }
}
