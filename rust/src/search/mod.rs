//! Exact branch-and-bound search for the minimum-imbalance rota.
//!
//! Days are decided in horizon order. Candidates failing leave or cooldown are
//! never branched on. A branch is pruned as soon as its recent assignees leave
//! no way to cover the remaining days, or the lower bound on its final sum of
//! squared shift counts cannot beat the incumbent.

mod engine;
mod feasibility;
mod parallel;
mod solver;
mod state;

pub use engine::{BranchAndBound, Flow};
pub use feasibility::CompletionMemo;
pub use parallel::search_parallel;
pub use solver::{solve, Solver};
pub use state::SearchState;
