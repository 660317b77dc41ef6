//! Runs the planning core standalone for a fixed number of ticks, logging
//! every emitted frame. Useful for eyeballing determinism without wiring up
//! a renderer.

use clap::Parser;
use spicomp::game::canonical_gun_trajectory;
use spicomp::{Config, SpicompRng, SpicompSimulator};

#[derive(Parser, Debug)]
#[command(name = "demo", about = "Runs the drone-swarm contingency planner for N ticks")]
struct Args {
    /// Number of simulated ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u32,

    /// Drone fleet size.
    #[arg(long, default_value_t = spicomp::constants::DRONE_NUM)]
    drone_num: usize,

    /// Path to a config file (same `key = value` shape `Config::from_str` parses).
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> anyhow::Result<()> {
    spicomp::logging::init()?;
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Config::from_str(&text)?
        }
        None => Config::default(),
    };
    config.validate()?;

    if config.is_show_rand_seed {
        log::info!("rand_seed = {}", config.rand_seed);
    }

    let rng = SpicompRng::new(config.rand_seed);
    let scene_size = (config.scene_size_x, config.scene_size_y, config.scene_size_z);
    let mut sim = SpicompSimulator::new(args.drone_num, spicomp::constants::MICRO_FRAME_NUM, scene_size, canonical_gun_trajectory(), rng);

    sim.reset()?;
    log::info!("reset complete, running {} ticks", args.ticks);

    for tick in 0..args.ticks {
        let frame = sim.get_current_micro_frame()?;
        log::debug!("tick {tick}: frame with {} pixels", frame.len());
        sim.next_step()?;
    }

    log::info!("done: sim_step_count={}", sim.sim_step_count());
    Ok(())
}
