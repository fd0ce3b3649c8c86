use rand::Rng;

use crate::decay::Decay;

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// The caller supplies the random source, so two policies driven by
/// independently seeded generators never interfere.
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// The exploration threshold at time `t`
    pub fn threshold(&self, t: f64) -> f64 {
        self.epsilon.evaluate(t)
    }

    /// Invoke epsilon greedy policy at time `t`, drawing from `rng`
    pub fn choose<R: Rng>(&self, t: f64, rng: &mut R) -> Choice {
        if rng.gen::<f64>() > self.threshold(t) {
            Choice::Exploit
        } else {
            Choice::Explore
        }
    }
}
