pub mod q_learning;
pub mod value_iteration;

use rand::Rng;

use crate::gridworld::{Direction, Grid};

pub const TERMINAL_REWARD: f64 = 1.0;
pub const PENALTY_REWARD: f64 = -1.0;

// Probabilities of the actual outcomes of a move, aligned with the order
// returned by drift_outcomes: intended first, then the two drifts.
pub const OUTCOME_PROBS: [f64; 3] = [0.8, 0.1, 0.1];

// Possible actual outcomes when attempting a move: the intended direction
// and its two orthogonals. The reverse direction never occurs.
pub fn drift_outcomes(intended: Direction) -> [Direction; 3] {
    use Direction::*;
    match intended {
        North => [North, East, West],
        East => [East, South, North],
        South => [South, West, East],
        West => [West, North, South],
    }
}

// The transition and reward model of the grid MDP, shared by both solvers.
// Stateless apart from the grid it reads.
#[derive(Clone, Copy, Debug)]
pub struct Transitions<'a> {
    grid: &'a Grid,
}

impl<'a> Transitions<'a> {
    pub fn new(grid: &'a Grid) -> Transitions<'a> {
        Transitions { grid: grid }
    }

    pub fn grid(&self) -> &Grid {
        self.grid
    }

    // Resolves an actual outcome direction to the resulting cell.
    // Leaving the terminal cell teleports back to start regardless of the
    // outcome; a direction without an edge leaves the agent in place.
    pub fn resolve(&self, from: usize, outcome: Direction) -> usize {
        if from == self.grid.terminal() {
            return self.grid.start();
        }

        let cell = self.grid.cell(from);
        if cell.allows(outcome) {
            let (x, y) = cell.neighbour(outcome);
            self.grid.index_of(x, y)
        } else {
            from
        }
    }

    // Reward is attributed on arrival and depends on the resulting cell only.
    pub fn reward(&self, arrived: usize) -> f64 {
        if arrived == self.grid.terminal() {
            TERMINAL_REWARD
        } else if arrived == self.grid.penalty() {
            PENALTY_REWARD
        } else {
            0.0
        }
    }

    // Exact enumeration of the three outcomes of an intended action with
    // their probabilities. Used by value iteration.
    pub fn enumerate(&self, from: usize, action: Direction) -> [(f64, usize); 3] {
        let outcomes = drift_outcomes(action);
        [
            (OUTCOME_PROBS[0], self.resolve(from, outcomes[0])),
            (OUTCOME_PROBS[1], self.resolve(from, outcomes[1])),
            (OUTCOME_PROBS[2], self.resolve(from, outcomes[2])),
        ]
    }

    // Single stochastic draw from the same outcome distribution. Used by
    // Q-learning.
    pub fn sample<R: Rng + ?Sized>(&self, from: usize, action: Direction, rng: &mut R) -> usize {
        let outcomes = drift_outcomes(action);
        let draw = rng.gen::<f64>();
        let outcome = if draw < OUTCOME_PROBS[0] {
            outcomes[0]
        } else if draw < OUTCOME_PROBS[0] + OUTCOME_PROBS[1] {
            outcomes[1]
        } else {
            outcomes[2]
        };
        self.resolve(from, outcome)
    }
}
