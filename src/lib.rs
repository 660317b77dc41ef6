//! The contingency planning core of a real-time drone-swarm display
//! simulator: a branching tree of target frames, a depth-first planner that
//! fills in per-edge drone trajectories under kinematic limits, and a tick
//! loop that advances the whole thing and feeds a renderer.

pub mod config;
pub mod constants;
pub mod controller;
pub mod decision;
pub mod drone;
pub mod error;
pub mod formation;
pub mod frame;
pub mod frame_tree;
pub mod game;
pub mod game_tree;
pub mod geometry;
#[cfg(feature = "cli")]
pub mod logging;
pub mod planner;
pub mod rng;

pub use config::Config;
pub use controller::SpicompSimulator;
pub use error::{Result, SpicompError};
pub use rng::SpicompRng;
