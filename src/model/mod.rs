//! Tree ensemble models
//!
//! Native evaluation of XGBoost JSON models.

pub mod booster;
pub mod tree;

pub use booster::{Booster, BoosterKind, Objective};
pub use tree::{Node, Tree};
