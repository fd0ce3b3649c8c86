use std::collections::HashSet;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use strum::IntoEnumIterator;

use crate::env::{Action, Pos, Report};
use crate::error::{GridError, Result};

/// What a grid cell holds, derived from the goal/obstacle sets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Start,
    Goal,
    Obstacle,
}

/// Everything a persistence collaborator needs to reconstruct a [`GridWorld`]
///
/// A world imported from a snapshot behaves identically to a freshly
/// constructed one, including its random stream.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldState {
    pub rows: usize,
    pub cols: usize,
    pub init_pos: Pos,
    pub goals: HashSet<Pos>,
    pub obstacles: HashSet<Pos>,
    pub p_slip: f64,
    pub seed: u64,
}

/// A grid-world with stochastic transitions
///
/// The grid is a `rows x cols` board with one start cell, zero or more goal
/// cells (+1 reward, terminal) and zero or more obstacle cells (-1 reward,
/// non-blocking and non-terminal). A requested action executes as-is with
/// probability `p_slip`; otherwise it slips into one of its two orthogonal
/// directions with equal odds, so a higher `p_slip` means less slippage.
///
/// All randomness flows through one private generator seeded at construction,
/// so runs are reproducible per instance and multiple worlds in one process
/// never interfere.
pub struct GridWorld {
    rows: usize,
    cols: usize,
    init_pos: Pos,
    goals: HashSet<Pos>,
    obstacles: HashSet<Pos>,
    p_slip: f64,
    reward: Vec<Vec<f64>>,
    current_pos: Pos,
    seed: u64,
    rng: StdRng,
    pub report: Report,
}

impl GridWorld {
    /// Construct a world with fixed geometry
    ///
    /// Fails with [`GridError::InvalidParameter`] on non-positive dimensions,
    /// an out-of-range `p_slip`, out-of-bounds coordinates, or goal/obstacle
    /// sets that overlap each other or the initial position.
    pub fn new(
        rows: usize,
        cols: usize,
        init_pos: Pos,
        goals: impl IntoIterator<Item = Pos>,
        obstacles: impl IntoIterator<Item = Pos>,
        p_slip: f64,
        seed: u64,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidParameter(format!(
                "grid dimensions must be positive, got {rows}x{cols}"
            )));
        }
        if !(0.0..=1.0).contains(&p_slip) {
            return Err(GridError::InvalidParameter(format!(
                "slipping probability must be in [0, 1], got {p_slip}"
            )));
        }

        let goals: HashSet<Pos> = goals.into_iter().collect();
        let obstacles: HashSet<Pos> = obstacles.into_iter().collect();

        let mut world = Self {
            rows,
            cols,
            init_pos,
            goals: HashSet::new(),
            obstacles: HashSet::new(),
            p_slip,
            reward: vec![vec![0.0; cols]; rows],
            current_pos: init_pos,
            seed,
            rng: StdRng::seed_from_u64(seed),
            report: Report::new(vec!["reward", "steps"]),
        };

        if !world.in_bounds(init_pos) {
            return Err(GridError::InvalidParameter(format!(
                "initial position {init_pos:?} is outside the {rows}x{cols} grid"
            )));
        }
        world.validate_layout(&goals, &obstacles)?;

        world.goals = goals;
        world.obstacles = obstacles;
        world.rebuild_rewards();
        Ok(world)
    }

    /// Reconstruct a world from a persisted snapshot
    pub fn import_state(state: &WorldState) -> Result<Self> {
        Self::new(
            state.rows,
            state.cols,
            state.init_pos,
            state.goals.iter().copied(),
            state.obstacles.iter().copied(),
            state.p_slip,
            state.seed,
        )
    }

    /// Snapshot this world for a persistence collaborator
    pub fn export_state(&self) -> WorldState {
        WorldState {
            rows: self.rows,
            cols: self.cols,
            init_pos: self.init_pos,
            goals: self.goals.clone(),
            obstacles: self.obstacles.clone(),
            p_slip: self.p_slip,
            seed: self.seed,
        }
    }

    fn validate_layout(&self, goals: &HashSet<Pos>, obstacles: &HashSet<Pos>) -> Result<()> {
        if let Some(pos) = goals.iter().find(|&&p| !self.in_bounds(p)) {
            return Err(GridError::InvalidParameter(format!(
                "goal {pos:?} is outside the {}x{} grid",
                self.rows, self.cols
            )));
        }
        if let Some(pos) = obstacles.iter().find(|&&p| !self.in_bounds(p)) {
            return Err(GridError::InvalidParameter(format!(
                "obstacle {pos:?} is outside the {}x{} grid",
                self.rows, self.cols
            )));
        }
        if let Some(pos) = goals.intersection(obstacles).next() {
            return Err(GridError::InvalidParameter(format!(
                "{pos:?} is marked as both goal and obstacle"
            )));
        }
        if goals.contains(&self.init_pos) || obstacles.contains(&self.init_pos) {
            return Err(GridError::InvalidParameter(format!(
                "initial position {:?} overlaps a goal or obstacle",
                self.init_pos
            )));
        }
        Ok(())
    }

    /// Reward function:
    ///     Goals: +1
    ///     Obstacles: -1
    ///     Others: 0
    fn rebuild_rewards(&mut self) {
        self.reward = (0..self.rows)
            .map(|i| {
                (0..self.cols)
                    .map(|j| match self.cell_unchecked((i, j)) {
                        Cell::Goal => 1.0,
                        Cell::Obstacle => -1.0,
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect();

        // The rebuilt table must read back what the sets say.
        for &(i, j) in &self.goals {
            assert_eq!(self.reward[i][j], 1.0);
        }
        for &(i, j) in &self.obstacles {
            assert_eq!(self.reward[i][j], -1.0);
        }
    }

    fn in_bounds(&self, (row, col): Pos) -> bool {
        row < self.rows && col < self.cols
    }

    fn check_state(&self, pos: Pos) -> Result<()> {
        self.in_bounds(pos)
            .then_some(())
            .ok_or(GridError::InvalidState(pos))
    }

    fn cell_unchecked(&self, pos: Pos) -> Cell {
        if self.goals.contains(&pos) {
            Cell::Goal
        } else if self.obstacles.contains(&pos) {
            Cell::Obstacle
        } else if pos == self.init_pos {
            Cell::Start
        } else {
            Cell::Empty
        }
    }

    /// The derived [`Cell`] marking at `pos`
    pub fn cell(&self, pos: Pos) -> Result<Cell> {
        self.check_state(pos)?;
        Ok(self.cell_unchecked(pos))
    }

    /// The cell one step in `action`'s direction from `state`
    ///
    /// Deterministic. Stepping off an edge returns `state` unchanged, and
    /// obstacle cells do not block movement, they only carry negative reward.
    pub fn next_state(&self, state: Pos, action: Action) -> Result<Pos> {
        self.check_state(state)?;
        Ok(self.shift(state, action))
    }

    fn shift(&self, (row, col): Pos, action: Action) -> Pos {
        match action {
            Action::Up if row > 0 => (row - 1, col),
            Action::Right if col < self.cols - 1 => (row, col + 1),
            Action::Down if row < self.rows - 1 => (row + 1, col),
            Action::Left if col > 0 => (row, col - 1),
            _ => (row, col),
        }
    }

    /// The distinct cells reachable by one action application from `state`
    ///
    /// Boundary bounces collapse, so a corner cell reports itself plus its
    /// two in-grid neighbors.
    pub fn neighbors(&self, state: Pos) -> Result<HashSet<Pos>> {
        self.check_state(state)?;
        Ok(Action::iter().map(|a| self.shift(state, a)).collect())
    }

    /// Pass `action` through the slip model
    ///
    /// One uniform draw decides: with probability `p_slip` the requested
    /// action is kept, otherwise one of its two orthogonal directions is
    /// chosen with equal odds from the same source.
    pub fn choose_stochastic_action(&mut self, action: Action) -> Action {
        let roll = self.rng.gen::<f64>();
        if roll < self.p_slip {
            action
        } else {
            *action
                .orthogonals()
                .choose(&mut self.rng)
                .expect("there are always two orthogonal actions")
        }
    }

    /// Advance one step: apply the slip model, move, observe the reward
    ///
    /// **Returns** `(next_state, reward, done)`. Only goal cells terminate an
    /// episode; entering an obstacle yields its negative reward and continues.
    pub fn step(&mut self, action: Action) -> (Pos, f64, bool) {
        let actual = self.choose_stochastic_action(action);
        let next = self.shift(self.current_pos, actual);
        let reward = self.reward[next.0][next.1];
        self.current_pos = next;
        let done = self.is_goal(next);

        self.report.entry("steps").and_modify(|x| *x += 1.0);
        self.report.entry("reward").and_modify(|x| *x += reward);

        (next, reward, done)
    }

    /// Move back to the initial position, leaving everything else untouched
    pub fn reset(&mut self) -> Pos {
        self.current_pos = self.init_pos;
        self.current_pos
    }

    /// Replace the obstacle set wholesale, rebuilding rewards and resetting
    pub fn replace_obstacles(&mut self, obstacles: impl IntoIterator<Item = Pos>) -> Result<()> {
        let obstacles: HashSet<Pos> = obstacles.into_iter().collect();
        self.validate_layout(&self.goals, &obstacles)?;
        self.obstacles = obstacles;
        self.rebuild_rewards();
        self.reset();
        Ok(())
    }

    /// Replace the goal set wholesale, rebuilding rewards and resetting
    pub fn replace_goals(&mut self, goals: impl IntoIterator<Item = Pos>) -> Result<()> {
        let goals: HashSet<Pos> = goals.into_iter().collect();
        self.validate_layout(&goals, &self.obstacles)?;
        self.goals = goals;
        self.rebuild_rewards();
        self.reset();
        Ok(())
    }

    /// Whether `pos` is a goal cell
    pub fn is_goal(&self, pos: Pos) -> bool {
        self.goals.contains(&pos)
    }

    /// Whether `pos` is an obstacle cell
    pub fn is_obstacle(&self, pos: Pos) -> bool {
        self.obstacles.contains(&pos)
    }

    /// A uniformly random action drawn from the world's own source
    pub fn random_action(&mut self) -> Action {
        Action::iter()
            .choose(&mut self.rng)
            .expect("action space is not empty")
    }

    /// Replace the slip parameter
    pub fn set_p_slip(&mut self, p_slip: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&p_slip) {
            return Err(GridError::InvalidParameter(format!(
                "slipping probability must be in [0, 1], got {p_slip}"
            )));
        }
        self.p_slip = p_slip;
        Ok(())
    }

    /// The reward observed on entering `pos`
    pub fn reward_at(&self, pos: Pos) -> Result<f64> {
        self.check_state(pos)?;
        Ok(self.reward[pos.0][pos.1])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn init_pos(&self) -> Pos {
        self.init_pos
    }

    pub fn current_pos(&self) -> Pos {
        self.current_pos
    }

    pub fn p_slip(&self) -> f64 {
        self.p_slip
    }

    pub fn goals(&self) -> &HashSet<Pos> {
        &self.goals
    }

    pub fn obstacles(&self) -> &HashSet<Pos> {
        &self.obstacles
    }

    pub fn reward(&self) -> &[Vec<f64>] {
        &self.reward
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                let tag = if self.current_pos == (i, j) {
                    'C'
                } else {
                    match self.cell_unchecked((i, j)) {
                        Cell::Goal => 'G',
                        Cell::Obstacle => 'O',
                        Cell::Start => 'S',
                        Cell::Empty => '_',
                    }
                };
                write!(f, "{tag}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
