mod gridworld;
mod solver;

use std::env;
use std::process;

use plotlib::{page::Page, repr::Plot, style::LineStyle, view::ContinuousView};
use rand::thread_rng;

use gridworld::*;
use solver::q_learning::{greedy_policy, QLearning};
use solver::value_iteration::ValueIteration;

const USAGE: &'static str = "usage: grid_mdp [-p] [-i <iterations>]";

const DISCOUNT: f64 = 0.95;
const VI_EPSILON: f64 = 0.032;
const QL_LEARNING_RATE: f64 = 0.01;
const QL_EPSILON: f64 = 0.1;
const QL_DEFAULT_ITERATIONS: usize = 100_000;

struct Options {
    plot: bool,
    iterations: usize,
}

fn parse_options() -> Options {
    let mut options = Options {
        plot: false,
        iterations: QL_DEFAULT_ITERATIONS,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" => options.plot = true,
            "-i" => {
                options.iterations = match args.next().and_then(|v| v.parse().ok()) {
                    Some(n) => n,
                    None => {
                        eprintln!("{}", USAGE);
                        process::exit(1);
                    }
                }
            }
            _ => {
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
    }

    options
}

fn print_convergence_chart(history: &[f64], start_value: f64) {
    let curve: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, &q)| (i as f64, q))
        .collect();
    let reference = vec![(0.0, start_value), (history.len() as f64, start_value)];

    let learned = Plot::new(curve).line_style(LineStyle::new().colour("#35C788"));
    let target = Plot::new(reference).line_style(LineStyle::new().colour("#DD3355"));
    let view = ContinuousView::new()
        .add(learned)
        .add(target)
        .x_label("Iteration")
        .y_label("Best Q at start");

    println!(
        "{}",
        Page::single(&view).dimensions(100, 50).to_text().unwrap()
    );
    println!("Reference line: value-iteration value of the start cell.");
}

fn main() {
    let options = parse_options();
    let grid = new_reference_grid();

    println!("Performing value iteration...");
    let vi = ValueIteration::new(&grid, DISCOUNT, VI_EPSILON).solve();
    if vi.converged {
        println!("Value iteration converged after {} sweeps.", vi.sweeps);
    } else {
        println!(
            "Value iteration stopped after {} sweeps without converging.",
            vi.sweeps
        );
    }
    println!("Cell values:");
    print_grid_values(&grid, &vi.values);
    println!("Policy found by value iteration:");
    print_grid_policy(&grid, &vi.policy);

    println!();
    println!(
        "Performing Q-learning ({} iterations)...",
        options.iterations
    );
    let solver = QLearning::new(
        &grid,
        DISCOUNT,
        QL_LEARNING_RATE,
        QL_EPSILON,
        options.iterations,
    );
    let ql = solver.solve(&mut thread_rng());
    if !ql.settled {
        println!("Q-values at the start cell were still moving at the end of the run.");
    }
    println!("Policy found by Q-learning:");
    print_grid_policy(&grid, &greedy_policy(&ql.q));

    if options.plot {
        print_convergence_chart(&ql.best_q_at_start, vi.values[grid.start()]);
    }
}
