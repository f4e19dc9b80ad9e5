//! Pluggable market-price simulation
//!
//! There is no real pricing feed: "live" prices are produced by perturbing
//! the last trade or quote through a [`PriceStrategy`]. The ledger applies
//! the injected strategy after every trade and on explicit refresh, so a
//! consumer can substitute a deterministic strategy (or, eventually, a real
//! market-data adapter) without touching the accounting code.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Produces the next simulated market price from the current one
pub trait PriceStrategy: Send {
    fn next_price(&mut self, current: Decimal) -> Decimal;
}

/// Uniform random walk: multiplies the price by a factor drawn from
/// `1 - band ..= 1 + band`, clamped to a minimum price of 0.01.
pub struct RandomWalk {
    band: f64,
    floor: Decimal,
    rng: StdRng,
}

impl RandomWalk {
    /// Default simulation band (+/-5%)
    pub const DEFAULT_BAND: f64 = 0.05;

    pub fn new(band: f64) -> Self {
        Self::from_rng(band, StdRng::from_os_rng())
    }

    /// Deterministic walk for tests
    pub fn with_seed(band: f64, seed: u64) -> Self {
        Self::from_rng(band, StdRng::seed_from_u64(seed))
    }

    fn from_rng(band: f64, rng: StdRng) -> Self {
        Self {
            band: band.abs(),
            floor: Decimal::new(1, 2),
            rng,
        }
    }
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BAND)
    }
}

impl PriceStrategy for RandomWalk {
    fn next_price(&mut self, current: Decimal) -> Decimal {
        let factor = 1.0 + self.rng.random_range(-self.band..=self.band);
        let next = current * Decimal::from_f64(factor).unwrap_or(Decimal::ONE);
        next.max(self.floor)
    }
}

/// Returns the input price unchanged. Used by tests and by consumers that
/// opt out of price simulation.
pub struct Identity;

impl PriceStrategy for Identity {
    fn next_price(&mut self, current: Decimal) -> Decimal {
        current
    }
}
