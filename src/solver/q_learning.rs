use nalgebra::DMatrix;
use rand::Rng;

use crate::gridworld::{Direction, Grid};
use crate::solver::*;

// Model-free solver: a single simulated trajectory with incremental Q-value
// updates. Actions are chosen by an upper-confidence (multi-armed-bandit)
// score rather than ε-greedy.
pub struct QLearning<'a> {
    grid: &'a Grid,
    discount: f64,
    learning_rate: f64,
    // Settling threshold for the result diagnostic. Never stops the loop
    // early; the iteration budget is fixed.
    epsilon: f64,
    iterations: usize,
}

pub struct QLearningResult {
    // Row order of the Q matrix; columns follow Direction::ALL.
    pub state_names: Vec<String>,
    pub q: DMatrix<f64>,
    // Best Q-value at the start cell after each iteration.
    pub best_q_at_start: Vec<f64>,
    pub iterations: usize,
    // Whether the final iteration moved the best start Q-value by less
    // than epsilon.
    pub settled: bool,
}

struct Tables {
    q: DMatrix<f64>,
    // Running total fed to the bandit score. Accumulates plain observed
    // rewards during bootstrap but bootstrapped reward + γ·maxQ returns in
    // the main loop; the mix is kept as-is for fidelity with the reference
    // behaviour even though the two quantities differ.
    cum_reward: DMatrix<f64>,
    visits: DMatrix<u64>,
}

// Plays every action once in every state so that each visit count is at
// least 1 before the bandit score ever divides by it.
fn bootstrap<R: Rng + ?Sized>(
    transitions: &Transitions,
    learning_rate: f64,
    rng: &mut R,
) -> Tables {
    let n = transitions.grid().len();
    let actions = Direction::ALL.len();
    let mut tables = Tables {
        q: DMatrix::zeros(n, actions),
        cum_reward: DMatrix::zeros(n, actions),
        visits: DMatrix::zeros(n, actions),
    };

    for state in 0..n {
        for (column, &action) in Direction::ALL.iter().enumerate() {
            let next = transitions.sample(state, action, rng);
            let reward = transitions.reward(next);
            tables.cum_reward[(state, column)] += reward;
            tables.q[(state, column)] += learning_rate * tables.cum_reward[(state, column)];
            tables.visits[(state, column)] += 1;
        }
    }

    tables
}

fn row_max(matrix: &DMatrix<f64>, row: usize) -> f64 {
    matrix
        .row(row)
        .iter()
        .fold(f64::NEG_INFINITY, |a, &b| a.max(b))
}

// Greedy projection of a Q matrix: per state, the action with the maximal
// Q-value (strict comparison, first in order wins). Read-only; callers
// derive the policy, the solver does not keep one.
pub fn greedy_policy(q: &DMatrix<f64>) -> Vec<Direction> {
    (0..q.nrows())
        .map(|row| {
            let mut best_value = f64::NEG_INFINITY;
            let mut best_action = Direction::ALL[0];
            for (column, &action) in Direction::ALL.iter().enumerate() {
                if q[(row, column)] > best_value {
                    best_value = q[(row, column)];
                    best_action = action;
                }
            }
            best_action
        })
        .collect()
}

impl<'a> QLearning<'a> {
    pub fn new(
        grid: &'a Grid,
        discount: f64,
        learning_rate: f64,
        epsilon: f64,
        iterations: usize,
    ) -> QLearning<'a> {
        assert!(discount > 0.0 && discount < 1.0);
        assert!(learning_rate > 0.0 && learning_rate <= 1.0);
        assert!(epsilon > 0.0);
        QLearning {
            grid: grid,
            discount: discount,
            learning_rate: learning_rate,
            epsilon: epsilon,
            iterations: iterations,
        }
    }

    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> QLearningResult {
        let transitions = Transitions::new(self.grid);
        let actions = Direction::ALL.len();
        let start = self.grid.start();

        let Tables {
            mut q,
            mut cum_reward,
            mut visits,
        } = bootstrap(&transitions, self.learning_rate, rng);

        let mut best_q_at_start = vec![0.0; self.iterations];
        let mut state = start;

        for i in 0..self.iterations {
            // Upper-confidence score: observed average return plus an
            // uncertainty bonus that shrinks with the visit count.
            let total_visits: u64 = visits.row(state).iter().cloned().sum();
            let mut best_score = f64::NEG_INFINITY;
            let mut chosen = 0;
            for column in 0..actions {
                let count = visits[(state, column)] as f64;
                let score = cum_reward[(state, column)] / count
                    + (2.0 * (total_visits as f64).ln() / count).sqrt();
                if score > best_score {
                    best_score = score;
                    chosen = column;
                }
            }

            visits[(state, chosen)] += 1;

            let next = transitions.sample(state, Direction::ALL[chosen], rng);
            let reward = transitions.reward(next);
            let max_q = row_max(&q, next);
            let target = reward + self.discount * max_q;

            cum_reward[(state, chosen)] += target;
            q[(state, chosen)] =
                (1.0 - self.learning_rate) * q[(state, chosen)] + self.learning_rate * target;

            best_q_at_start[i] = row_max(&q, start);
            state = next;
        }

        let settled = match best_q_at_start.len() {
            0 | 1 => true,
            len => (best_q_at_start[len - 1] - best_q_at_start[len - 2]).abs() < self.epsilon,
        };

        QLearningResult {
            state_names: self.grid.names(),
            q: q,
            best_q_at_start: best_q_at_start,
            iterations: self.iterations,
            settled: settled,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::gridworld::new_reference_grid;
    use crate::solver::value_iteration::ValueIteration;

    const DISCOUNT: f64 = 0.95;
    const LEARNING_RATE: f64 = 0.01;
    const EPSILON: f64 = 0.1;

    #[test]
    fn bootstrap_visits_every_state_action() {
        let grid = new_reference_grid();
        let transitions = Transitions::new(&grid);
        let mut rng = StdRng::seed_from_u64(3);

        let tables = bootstrap(&transitions, LEARNING_RATE, &mut rng);

        for state in 0..grid.len() {
            for column in 0..Direction::ALL.len() {
                assert!(tables.visits[(state, column)] >= 1);
                // Single update from zero: Q is the scaled running total.
                assert_eq!(
                    tables.q[(state, column)],
                    LEARNING_RATE * tables.cum_reward[(state, column)]
                );
            }
        }
    }

    #[test]
    fn result_shape_matches_grid() {
        let grid = new_reference_grid();
        let mut rng = StdRng::seed_from_u64(5);
        let result = QLearning::new(&grid, DISCOUNT, LEARNING_RATE, EPSILON, 500).solve(&mut rng);

        assert_eq!(result.state_names, grid.names());
        assert_eq!(result.q.nrows(), grid.len());
        assert_eq!(result.q.ncols(), 4);
        assert_eq!(result.best_q_at_start.len(), 500);
        assert_eq!(result.iterations, 500);
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let grid = new_reference_grid();
        let solver = QLearning::new(&grid, DISCOUNT, LEARNING_RATE, EPSILON, 2_000);

        let first = solver.solve(&mut StdRng::seed_from_u64(17));
        let second = solver.solve(&mut StdRng::seed_from_u64(17));

        assert_eq!(first.q, second.q);
        assert_eq!(first.best_q_at_start, second.best_q_at_start);
    }

    #[test]
    fn long_run_learns_the_grid() {
        let grid = new_reference_grid();
        let mut rng = StdRng::seed_from_u64(23);
        let result =
            QLearning::new(&grid, DISCOUNT, LEARNING_RATE, EPSILON, 50_000).solve(&mut rng);
        let policy = greedy_policy(&result.q);

        // The start cell is worth reaching the terminal from.
        assert!(*result.best_q_at_start.last().unwrap() > 0.0);

        // The greedy opening move is one of the two legal directions.
        let opening = policy[grid.start()];
        assert!(opening == Direction::North || opening == Direction::East);

        // The penalty cell is avoided from its approaches.
        assert_ne!(policy[grid.index_of(3, 2)], Direction::East);
        assert_ne!(policy[grid.index_of(4, 1)], Direction::North);
    }

    #[test]
    fn agrees_with_value_iteration_near_start() {
        let grid = new_reference_grid();
        let vi = ValueIteration::new(&grid, DISCOUNT, 0.032).solve();
        let mut rng = StdRng::seed_from_u64(29);
        let result =
            QLearning::new(&grid, DISCOUNT, LEARNING_RATE, EPSILON, 50_000).solve(&mut rng);
        let policy = greedy_policy(&result.q);

        // Exact agreement everywhere is not expected from a stochastic run,
        // but at the start cell both policies must at least pick a move the
        // other ranks as legal and non-losing.
        let start = grid.start();
        let vi_opening = vi.policy[start];
        let ql_opening = policy[start];
        assert!(grid.cell(start).allows(vi_opening));
        assert!(grid.cell(start).allows(ql_opening));

        // And the learned best Q at start lands in the neighbourhood of the
        // value-iteration value of the start cell.
        let learned = *result.best_q_at_start.last().unwrap();
        assert!((learned - vi.values[start]).abs() < 0.5);
    }
}
