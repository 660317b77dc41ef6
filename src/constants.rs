//! Normative constants from the planning core's external interface.

pub const MAX_MICRO_FRAME_NUM: i32 = 100;
pub const MICRO_FRAME_NUM: usize = 5;
pub const BULLET_JUMP_DISTANCE: f64 = 50.0;
pub const BULLET_MAX_DISTANCE: f64 = 600.0;
pub const INIT_FRAMETREE_LENGTH: usize = 20;
pub const MAX_DRONE_FLIGHT_DISTANCE_PER_FRAME: f64 = 1000.0;
pub const DRONE_NUM: usize = 100;
pub const TIME_STEP_DURATION: f64 = 0.02;

pub fn max_drone_flight_distance_per_microframe() -> f64 {
    MAX_DRONE_FLIGHT_DISTANCE_PER_FRAME / MICRO_FRAME_NUM as f64
}
