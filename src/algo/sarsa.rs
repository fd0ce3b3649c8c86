use std::fmt;

use log::{debug, info};
use strum::IntoEnumIterator;

use crate::assert_interval;
use crate::decay;
use crate::env::{Action, GridWorld, Pos};
use crate::exploration::{Choice, EpsilonGreedy};

/// Steps taken by a random demonstration walk
const RANDOM_WALK_STEPS: usize = 5;

/// Stochastic episodes in an evaluation batch
const N_ITERS: usize = 100;

/// Multiplicative epsilon decay factor, applied every [`EPSILON_DECAY_INTERVAL`] episodes
const EPSILON_DECAY_RATE: f64 = 0.995;
const EPSILON_DECAY_INTERVAL: f64 = 25.0;

/// Configuration for the [`SarsaAgent`]
pub struct SarsaAgentConfig {
    /// Learning rate, in `[0, 1]`
    pub alpha: f64,
    /// Discount factor, in `[0, 1]`
    pub gamma: f64,
    /// Floor for the exploration rate, in `[0, 1)`
    pub min_epsilon: f64,
    /// Episodes run by [`SarsaAgent::learn`]
    pub n_episodes: u32,
}

impl Default for SarsaAgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.999,
            min_epsilon: 0.01,
            n_episodes: 5000,
        }
    }
}

/// Aggregate results of an evaluation batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalStats {
    /// Percentage of episodes that ended on a goal cell
    pub goal_reach_pct: f64,
    /// Mean cumulative reward per episode
    pub avg_reward: f64,
}

/// A tabular on-policy TD agent bound to one [`GridWorld`]
///
/// The agent owns its world, so the binding is exclusive and the agent is not
/// reusable across worlds. Its value table has one row per cell (flattened as
/// `row * cols + col`) and one column per action, zero-initialized; the
/// derived policy covers every cell. Until [`SarsaAgent::learn`] has run,
/// lookups see those zero/unset defaults and action selection falls back to
/// [`Action::Up`], the lowest action index. That is documented behavior, not
/// an error.
pub struct SarsaAgent {
    world: GridWorld,
    q_table: Vec<[f64; Action::COUNT]>,
    policy: Vec<Vec<Option<Action>>>,
    trajectory: Vec<Pos>,
    exploration: EpsilonGreedy<decay::Step>,
    alpha: f64,
    gamma: f64,
    n_episodes: u32,
    episode: u32,
}

impl SarsaAgent {
    /// Bind a new agent to `world`
    ///
    /// **Panics** if `alpha`, `gamma`, or `min_epsilon` is outside its
    /// documented interval
    pub fn new(world: GridWorld, config: SarsaAgentConfig) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        assert_interval!(config.min_epsilon, 0.0, 1.0);

        let schedule = decay::Step::new(
            EPSILON_DECAY_RATE,
            1.0,
            config.min_epsilon,
            EPSILON_DECAY_INTERVAL,
        )
        .expect("`min_epsilon` must be below the initial epsilon of 1.0");

        let (rows, cols) = world.size();
        Self {
            q_table: vec![[0.0; Action::COUNT]; rows * cols],
            policy: vec![vec![None; cols]; rows],
            trajectory: Vec::new(),
            exploration: EpsilonGreedy::new(schedule),
            alpha: config.alpha,
            gamma: config.gamma,
            n_episodes: config.n_episodes,
            episode: 0,
            world,
        }
    }

    /// Flatten a position into a value-table row, `row * cols + col`
    ///
    /// The same convention is used for every read and write, so learning and
    /// policy lookups always agree.
    pub fn state_index(&self, (row, col): Pos) -> usize {
        row * self.world.cols() + col
    }

    /// The value-maximizing action at `state`, ties broken toward the lowest
    /// action index
    pub fn greedy_action(&self, state: Pos) -> Action {
        let values = &self.q_table[self.state_index(state)];
        let mut best = Action::Up;
        for action in Action::iter().skip(1) {
            if values[action as usize] > values[best as usize] {
                best = action;
            }
        }
        best
    }

    /// Epsilon-greedy selection for the current episode
    fn act(&mut self, state: Pos) -> Action {
        let t = f64::from(self.episode);
        match self.exploration.choose(t, self.world.rng_mut()) {
            Choice::Explore => self.world.random_action(),
            Choice::Exploit => self.greedy_action(state),
        }
    }

    /// Run the configured number of learning episodes, then derive the policy
    pub fn learn(&mut self) {
        for _ in 0..self.n_episodes {
            self.run_episode();
        }
        self.derive_policy();
        info!("learning finished after {} episodes", self.episode);
    }

    /// Run one SARSA episode and advance the episode counter
    ///
    /// The episode starts from the initial position and ends on a goal cell or
    /// after `rows * cols * 10` steps, whichever comes first. Each step
    /// updates the value table toward the action actually selected next, not
    /// the best-valued one.
    pub fn run_episode(&mut self) {
        let max_steps = self.world.rows() * self.world.cols() * 10;
        let mut state = self.world.reset();
        let mut action = self.act(state);

        for _ in 0..max_steps {
            let (next_state, reward, done) = self.world.step(action);
            let next_action = self.act(next_state);

            let i = self.state_index(state);
            let i_next = self.state_index(next_state);
            let q = self.q_table[i][action as usize];
            let q_next = self.q_table[i_next][next_action as usize];
            self.q_table[i][action as usize] =
                q + self.alpha * (reward + self.gamma * q_next - q);

            state = next_state;
            action = next_action;
            if done {
                break;
            }
        }

        if self.episode % 2000 == 0 {
            debug!(
                "episode {}: epsilon {:.4}",
                self.episode,
                self.exploration.threshold(f64::from(self.episode))
            );
        }
        self.episode += 1;
    }

    /// Fill the policy table with the greedy action for every cell
    ///
    /// The policy is total: obstacle and unreachable cells get an entry too.
    pub fn derive_policy(&mut self) {
        for i in 0..self.world.rows() {
            for j in 0..self.world.cols() {
                self.policy[i][j] = Some(self.greedy_action((i, j)));
            }
        }
    }

    fn policy_action(&self, (row, col): Pos) -> Action {
        self.policy[row][col].unwrap_or(Action::Up)
    }

    /// Demonstration run: a fixed number of uniformly random steps
    pub fn random_walk(&mut self) {
        self.trajectory.clear();
        let mut state = self.world.reset();
        for _ in 0..RANDOM_WALK_STEPS {
            self.trajectory.push(state);
            let action = self.world.random_action();
            let (next_state, reward, _) = self.world.step(action);
            info!("state: {state:?}, action: {action}, reward: {reward}");
            state = next_state;
        }
    }

    /// Follow the learned policy deterministically from the initial position
    ///
    /// Transitions go through [`GridWorld::next_state`], so the walk is not
    /// subject to slip. It stops on a goal cell or the moment a state repeats,
    /// so a degenerate policy cannot loop forever; the repeated state is still
    /// recorded. Cells without a learned entry fall back to [`Action::Up`].
    pub fn greedy_replay(&mut self) {
        self.trajectory.clear();
        self.world.reset();
        let mut state = self.world.init_pos();
        self.trajectory.push(state);

        loop {
            let action = self.policy_action(state);
            let next_state = self
                .world
                .next_state(state, action)
                .expect("replay states stay inside the grid");
            let revisited = self.trajectory.contains(&next_state);
            self.trajectory.push(next_state);
            if revisited || self.world.is_goal(next_state) {
                break;
            }
            state = next_state;
        }
    }

    /// Evaluate the learned policy over a batch of stochastic episodes
    ///
    /// Episodes run through [`GridWorld::step`], so they are subject to slip.
    /// Each one stops on a goal or early when a state repeats. The last
    /// episode's visited states are kept as the trajectory.
    pub fn evaluate(&mut self) -> EvalStats {
        let mut total_reward = 0.0;
        let mut goal_reached = 0u32;

        for _ in 0..N_ITERS {
            let mut state = self.world.reset();
            let mut visited = vec![state];
            let mut ep_reward = 0.0;

            loop {
                let action = self.policy_action(state);
                let (next_state, reward, done) = self.world.step(action);
                ep_reward += reward;
                let revisited = visited.contains(&next_state);
                if !revisited {
                    visited.push(next_state);
                }
                state = next_state;
                if done || revisited {
                    break;
                }
            }

            if self.world.is_goal(state) {
                goal_reached += 1;
            }
            total_reward += ep_reward;
            self.trajectory = visited;
        }

        let stats = EvalStats {
            goal_reach_pct: f64::from(goal_reached) * 100.0 / N_ITERS as f64,
            avg_reward: total_reward / N_ITERS as f64,
        };
        info!(
            "goal reach percentage: {:.3}, average reward: {:.3}",
            stats.goal_reach_pct, stats.avg_reward
        );
        stats
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GridWorld {
        &mut self.world
    }

    pub fn q_table(&self) -> &[[f64; Action::COUNT]] {
        &self.q_table
    }

    pub fn policy(&self) -> &[Vec<Option<Action>>] {
        &self.policy
    }

    pub fn trajectory(&self) -> &[Pos] {
        &self.trajectory
    }
}

impl fmt::Display for SarsaAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.policy {
            for entry in row {
                match entry {
                    Some(action) => write!(f, "{action} ")?,
                    None => write!(f, "· ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn agent_on(world: GridWorld, n_episodes: u32) -> SarsaAgent {
        SarsaAgent::new(
            world,
            SarsaAgentConfig {
                n_episodes,
                ..Default::default()
            },
        )
    }

    #[test]
    fn state_index_is_bijective() {
        let world = GridWorld::new(5, 4, (0, 0), [], [], 0.5, 0).unwrap();
        let agent = agent_on(world, 0);

        let mut seen = HashSet::new();
        for i in 0..5 {
            for j in 0..4 {
                let index = agent.state_index((i, j));
                assert!(index < 20);
                assert!(seen.insert(index));
            }
        }
        assert_eq!(agent.state_index((1, 0)), 4);
        assert_eq!(agent.state_index((4, 3)), 19);
    }

    #[test]
    fn zero_episodes_leave_the_default_policy() {
        let world = GridWorld::new(5, 5, (4, 0), [(0, 4), (4, 4)], [], 0.8, 0).unwrap();
        let mut agent = agent_on(world, 0);
        agent.learn();

        assert!(agent
            .q_table()
            .iter()
            .all(|row| row.iter().all(|&q| q == 0.0)));
        assert!(agent
            .policy()
            .iter()
            .all(|row| row.iter().all(|&a| a == Some(Action::Up))));
    }

    #[test]
    fn greedy_action_breaks_ties_toward_the_lowest_index() {
        let world = GridWorld::new(3, 3, (0, 0), [], [], 0.5, 0).unwrap();
        let mut agent = agent_on(world, 0);

        assert_eq!(agent.greedy_action((1, 1)), Action::Up);

        let i = agent.state_index((1, 1));
        agent.q_table[i] = [0.0, 2.0, 2.0, 0.0];
        assert_eq!(agent.greedy_action((1, 1)), Action::Right);

        agent.q_table[i] = [-1.0, -0.5, -2.0, -0.5];
        assert_eq!(agent.greedy_action((1, 1)), Action::Right);
    }

    #[test]
    fn degenerate_policy_stops_after_one_repeat() {
        let world = GridWorld::new(3, 3, (0, 0), [], [], 0.5, 0).unwrap();
        let mut agent = agent_on(world, 0);
        agent.derive_policy();

        // Up from the top row points every start-row cell back at itself.
        agent.greedy_replay();
        assert_eq!(agent.trajectory(), [(0, 0), (0, 0)]);
    }

    #[test]
    fn random_walk_records_five_states() {
        let world = GridWorld::new(5, 5, (4, 0), [(0, 4)], [], 0.8, 0).unwrap();
        let mut agent = agent_on(world, 0);
        agent.random_walk();
        assert_eq!(agent.trajectory().len(), RANDOM_WALK_STEPS);
        assert_eq!(agent.trajectory()[0], (4, 0));
    }

    #[test]
    fn handcrafted_policy_evaluates_perfectly_without_slip() {
        let world = GridWorld::new(5, 5, (4, 0), [(4, 4)], [], 1.0, 0).unwrap();
        let mut agent = agent_on(world, 0);
        for i in 0..5 {
            for j in 0..5 {
                agent.policy[i][j] = Some(Action::Right);
            }
        }

        let stats = agent.evaluate();
        assert_eq!(stats.goal_reach_pct, 100.0);
        assert_eq!(stats.avg_reward, 1.0);
        assert_eq!(agent.trajectory(), [(4, 0), (4, 1), (4, 2), (4, 3), (4, 4)]);
    }

    #[test]
    fn learning_finds_a_goal_on_a_small_grid() {
        let world = GridWorld::new(5, 5, (4, 0), [(0, 4), (4, 4)], [], 1.0, 0).unwrap();
        let mut agent = agent_on(world, 5000);
        agent.learn();

        assert!(agent
            .q_table()
            .iter()
            .any(|row| row.iter().any(|&q| q != 0.0)));

        agent.greedy_replay();
        let last = *agent.trajectory().last().unwrap();
        assert!(agent.world().is_goal(last));
    }

    #[test]
    fn generation_runs_reset_the_trajectory() {
        let world = GridWorld::new(5, 5, (4, 0), [(4, 4)], [], 1.0, 0).unwrap();
        let mut agent = agent_on(world, 0);
        agent.random_walk();
        let first = agent.trajectory().to_vec();
        agent.greedy_replay();
        assert_ne!(agent.trajectory(), first);
        assert_eq!(agent.trajectory()[0], (4, 0));
    }

    #[test]
    #[should_panic]
    fn invalid_alpha_panics() {
        let world = GridWorld::new(3, 3, (0, 0), [], [], 0.5, 0).unwrap();
        SarsaAgent::new(
            world,
            SarsaAgentConfig {
                alpha: 1.5,
                ..Default::default()
            },
        );
    }
}
