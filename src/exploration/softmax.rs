use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::decay::Decay;

/// Softmax exploration policy (also known as Boltzmann exploration) with time-decaying temperature
pub struct Softmax<D: Decay> {
    temperature: D,
}

impl<D: Decay> Softmax<D> {
    pub fn new(decay: D) -> Self {
        Self { temperature: decay }
    }

    /// Sample an action index in proportion to the exponentiated action values
    pub fn choose<R: Rng>(&self, t: f64, q_values: &[f64], rng: &mut R) -> usize {
        let tau = self.temperature.evaluate(t);
        let exponentials = q_values.iter().map(|x| (x / tau).exp());
        let sum: f64 = exponentials.clone().sum();
        let weights = exponentials.map(|x| x / sum);
        let dist = WeightedIndex::new(weights).expect("`q_values` is not empty");
        dist.sample(rng)
    }
}
