//! Poisson arrival process used to space out the demo's entry requests.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::time::Duration;

pub struct Poisson<R: Rng + ?Sized> {
    pub rng: Box<R>,
    /// Mean number of events per second.
    pub rate: f64,
}

impl Poisson<SmallRng> {
    pub fn new(rate: f64, seed: u64) -> Self {
        Self {
            rng: Box::new(SmallRng::seed_from_u64(seed)),
            rate,
        }
    }
}

impl<R: Rng + ?Sized> Poisson<R> {
    /// Seconds until the next event, drawn from the exponential distribution.
    pub fn time_for_next_event(&mut self) -> f64 {
        if self.rate.is_nan() || self.rate <= 0. {
            return 0.;
        }
        -(1.0f64 - self.rng.random::<f64>()).ln() / self.rate
    }

    /// Saturates at `Duration::MAX` when the rate is so small the delay does not fit.
    pub fn delay_for_next_event(&mut self) -> Duration {
        Duration::try_from_secs_f64(self.time_for_next_event()).unwrap_or(Duration::MAX)
    }
}
