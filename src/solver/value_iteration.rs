use crate::gridworld::{Direction, Grid};
use crate::solver::*;

// Safety bound; hitting it is reported, not fatal.
const MAX_SWEEPS: usize = 10_000;

// Model-based solver: synchronous Bellman-optimality sweeps using the exact
// outcome probabilities, repeated until the sup-norm change falls under the
// contraction bound ε(1-γ)/(2γ).
pub struct ValueIteration<'a> {
    grid: &'a Grid,
    discount: f64,
    epsilon: f64,
}

pub struct ValueIterationResult {
    // Both indexed in grid order.
    pub values: Vec<f64>,
    pub policy: Vec<Direction>,
    pub sweeps: usize,
    pub converged: bool,
}

impl<'a> ValueIteration<'a> {
    pub fn new(grid: &'a Grid, discount: f64, epsilon: f64) -> ValueIteration<'a> {
        assert!(discount > 0.0 && discount < 1.0);
        assert!(epsilon > 0.0);
        ValueIteration {
            grid: grid,
            discount: discount,
            epsilon: epsilon,
        }
    }

    pub fn solve(&self) -> ValueIterationResult {
        let transitions = Transitions::new(self.grid);
        let n = self.grid.len();
        let threshold = self.epsilon * (1.0 - self.discount) / (2.0 * self.discount);

        let mut values = vec![0.0; n];
        let mut policy = vec![Direction::ALL[0]; n];

        for sweep in 0..MAX_SWEEPS {
            // Jacobi update: every new value is computed against the previous
            // sweep's snapshot, so the per-cell order cannot matter.
            let mut new_values = vec![0.0; n];
            let mut max_delta: f64 = 0.0;

            for state in 0..n {
                let mut best_value = f64::NEG_INFINITY;
                let mut best_action = Direction::ALL[0];

                for &action in Direction::ALL.iter() {
                    let action_value: f64 = transitions
                        .enumerate(state, action)
                        .iter()
                        .map(|&(probability, next)| {
                            probability
                                * (transitions.reward(next) + self.discount * values[next])
                        })
                        .sum();

                    // Strict comparison: the first action in enumeration
                    // order wins ties.
                    if action_value > best_value {
                        best_value = action_value;
                        best_action = action;
                    }
                }

                new_values[state] = best_value;
                policy[state] = best_action;
                max_delta = max_delta.max((best_value - values[state]).abs());
            }

            values = new_values;
            if max_delta <= threshold {
                return ValueIterationResult {
                    values: values,
                    policy: policy,
                    sweeps: sweep + 1,
                    converged: true,
                };
            }
        }

        ValueIterationResult {
            values: values,
            policy: policy,
            sweeps: MAX_SWEEPS,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gridworld::new_reference_grid;

    const DISCOUNT: f64 = 0.95;
    const EPSILON: f64 = 0.032;

    fn reference_solution() -> (Grid, ValueIterationResult) {
        let grid = new_reference_grid();
        let result = ValueIteration::new(&grid, DISCOUNT, EPSILON).solve();
        (grid, result)
    }

    #[test]
    fn repeated_solves_are_identical() {
        let grid = new_reference_grid();
        let first = ValueIteration::new(&grid, DISCOUNT, EPSILON).solve();
        let second = ValueIteration::new(&grid, DISCOUNT, EPSILON).solve();

        assert_eq!(first.sweeps, second.sweeps);
        assert_eq!(first.values, second.values);
        assert_eq!(first.policy, second.policy);
    }

    #[test]
    fn converges_within_cap() {
        let (_grid, result) = reference_solution();
        assert!(result.converged);
        assert!(result.sweeps < 10_000);
    }

    #[test]
    fn satisfies_bellman_optimality() {
        let (grid, result) = reference_solution();
        let transitions = Transitions::new(&grid);
        let threshold = EPSILON * (1.0 - DISCOUNT) / (2.0 * DISCOUNT);

        // One more backup moves every value by at most the convergence
        // threshold.
        for state in 0..grid.len() {
            let backup = Direction::ALL
                .iter()
                .map(|&action| {
                    transitions
                        .enumerate(state, action)
                        .iter()
                        .map(|&(probability, next)| {
                            probability
                                * (transitions.reward(next) + DISCOUNT * result.values[next])
                        })
                        .sum::<f64>()
                })
                .fold(f64::NEG_INFINITY, |a, b| a.max(b));

            assert!(
                (backup - result.values[state]).abs() <= threshold,
                "Bellman residual too large at {}",
                grid.cell(state).name()
            );
        }
    }

    #[test]
    fn start_value_is_positive() {
        let (grid, result) = reference_solution();
        assert!(result.values[grid.start()] > 0.0);
    }

    #[test]
    fn values_decrease_with_distance_from_terminal() {
        let (grid, result) = reference_solution();
        let near = result.values[grid.index_of(3, 3)];
        for &(x, y) in [(1, 1), (1, 2), (1, 3), (2, 1), (2, 3)].iter() {
            assert!(
                near > result.values[grid.index_of(x, y)],
                "Expected (3,3) to beat ({}, {})",
                x,
                y
            );
        }
    }

    #[test]
    fn policy_avoids_penalty_cell() {
        let (grid, result) = reference_solution();
        assert_ne!(result.policy[grid.index_of(3, 2)], Direction::East);
        assert_ne!(result.policy[grid.index_of(4, 1)], Direction::North);
    }

    #[test]
    fn greedy_rollout_reaches_terminal() {
        let (grid, result) = reference_solution();
        let transitions = Transitions::new(&grid);

        // Follow the policy assuming the intended outcome every step.
        let mut state = grid.start();
        let mut reached = false;
        for _ in 0..20 {
            if state == grid.terminal() {
                reached = true;
                break;
            }
            state = transitions.resolve(state, result.policy[state]);
            assert_ne!(state, grid.penalty());
        }
        assert!(reached);
    }
}
