pub mod sarsa;

pub use sarsa::{EvalStats, SarsaAgent, SarsaAgentConfig};
