//! Incrementally updated accumulator stack for dual-network NNUE chess evaluation.
//!
//! A search thread owns one [`AccumulatorStack`] and one pair of refresh tables, shares an
//! immutable pair of feature transformers with its siblings, and drives the stack with
//! `reset` / `push` / `pop` / `evaluate` as it walks the game tree.

pub mod board;
pub mod evaluation;
pub mod utils;

pub use evaluation::accumulator::{Accumulator, AccumulatorState};
pub use evaluation::cache::{RefreshCaches, RefreshTable};
pub use evaluation::network::{FeatureTransformer, Networks};
pub use evaluation::update::DirtyPiece;
pub use evaluation::AccumulatorStack;
