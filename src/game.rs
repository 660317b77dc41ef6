//! The upstream generator of branching target frames: a gun tracing a
//! cyclic trajectory, periodically firing bullets that travel away from it.
//!
//! Grounded on `spicomp_simulator.h`/`.cpp`'s `GameState` — the gun mesh
//! offsets and the trajectory's exact point list are taken from the
//! original, since spec.md's distillation only describes them in the
//! abstract ("8/4/1 pixels", "roughly 22 points").

use rand::rngs::SmallRng;
use rand::Rng;

use crate::constants::{BULLET_JUMP_DISTANCE, BULLET_MAX_DISTANCE};
use crate::decision::{DecisionVariable, NIL};
use crate::frame::Frame;
use crate::geometry::{Color, Pixel, Pos3D};

/// Option `1` fires a bullet at the decision state; this is also the
/// default option (spec.md §3: "Default option is `1`").
pub const FIRE_OPTION: i32 = 1;
pub const HOLD_OPTION: i32 = 0;

/// Base gun mesh, before the gun's current position translation.
fn gun_mesh_offsets() -> [(Pos3D, usize); 13] {
    const BASE: usize = 0;
    const MID: usize = 1;
    const TIP: usize = 2;
    [
        (Pos3D::new(0.0, 0.0, 0.0), BASE),
        (Pos3D::new(50.0, 0.0, 0.0), BASE),
        (Pos3D::new(100.0, 0.0, 0.0), BASE),
        (Pos3D::new(0.0, 50.0, 0.0), BASE),
        (Pos3D::new(0.0, 100.0, 0.0), BASE),
        (Pos3D::new(50.0, 100.0, 0.0), BASE),
        (Pos3D::new(100.0, 50.0, 0.0), BASE),
        (Pos3D::new(100.0, 100.0, 0.0), BASE),
        (Pos3D::new(25.0, 25.0, 50.0), MID),
        (Pos3D::new(75.0, 25.0, 50.0), MID),
        (Pos3D::new(25.0, 75.0, 50.0), MID),
        (Pos3D::new(75.0, 75.0, 50.0), MID),
        (Pos3D::new(50.0, 50.0, 100.0), TIP),
    ]
}

/// The canonical, un-perturbed gun trajectory (21 points tracing three
/// near-identical loops in the z=0 plane). Tests inject this directly so
/// they aren't at the mercy of `perturbed_gun_trajectory`'s independent
/// randomness (see the module-level note below).
pub fn canonical_gun_trajectory() -> Vec<Pos3D> {
    let raw: [(f64, f64); 21] = [
        (0.0, -200.0),
        (200.0, -200.0),
        (200.0, 0.0),
        (200.0, 200.0),
        (0.0, 200.0),
        (-200.0, 200.0),
        (-200.0, 0.0),
        (0.0, -200.0),
        (200.0, -200.0),
        (200.0, 0.0),
        (0.0, 200.0),
        (-200.0, 200.0),
        (-200.0, 0.0),
        (-200.0, -200.0),
        (0.0, -200.0),
        (200.0, -200.0),
        (200.0, 0.0),
        (0.0, 200.0),
        (-200.0, 200.0),
        (-200.0, 0.0),
        (-200.0, -200.0),
    ];
    raw.iter().map(|(x, y)| Pos3D::new(*x, *y, 0.0)).collect()
}

/// Perturbs the canonical trajectory by a uniform random offset in
/// `[-100, 100]^2` per point, using an RNG *independent* of the
/// simulation's seeded adapter.
///
/// This reproduces a quirk of the original implementation rather than
/// fixing it: `spicomp_simulator.cpp`'s static trajectory initializer seeds
/// its own `mt19937` from `std::random_device`, so the trajectory is not
/// reproducible across runs even when the rest of the simulation is seeded
/// (see spec.md §9's open question). Tests should call
/// `canonical_gun_trajectory` directly instead of this function.
pub fn perturbed_gun_trajectory(rng: &mut SmallRng) -> Vec<Pos3D> {
    canonical_gun_trajectory()
        .into_iter()
        .map(|mut p| {
            let dx = rng.random_range(-100.0..=100.0);
            let dy = rng.random_range(-100.0..=100.0);
            p.translate(dx, dy, 0.0);
            p
        })
        .collect()
}

/// One node of the upstream game process: the gun's position index along
/// the trajectory, its firing-cycle phase, and the bullets currently in
/// flight.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub id: i32,
    pub pos_id: usize,
    pub power_level_id: i32,
    pub bullets: Vec<Pos3D>,
}

impl GameState {
    pub fn initial(id: i32) -> Self {
        GameState {
            id,
            pos_id: 0,
            power_level_id: 0,
            bullets: Vec::new(),
        }
    }

    /// A state is a decision state iff `power_level_id == 2` — the instant
    /// the gun may or may not fire.
    pub fn is_decision_state(&self) -> bool {
        self.power_level_id == 2
    }

    pub fn decision_variable(&self) -> DecisionVariable {
        DecisionVariable::new(self.id, vec![HOLD_OPTION, FIRE_OPTION], FIRE_OPTION)
    }

    /// Produces the successor state. `fire_bullet` is only consulted when
    /// `self.is_decision_state()`; callers transitioning a non-decision
    /// state should pass `false`.
    pub fn advance(&self, next_id: i32, trajectory: &[Pos3D], fire_bullet: bool) -> GameState {
        let next_pos_id = (self.pos_id + 1) % trajectory.len();
        let next_power_level_id = (self.power_level_id + 1) % 4;

        let mut bullets: Vec<Pos3D> = self
            .bullets
            .iter()
            .map(|b| b.translated(0.0, 0.0, BULLET_JUMP_DISTANCE))
            .filter(|b| b.z <= BULLET_MAX_DISTANCE)
            .collect();

        if self.is_decision_state() && fire_bullet {
            let gun_pos = trajectory[next_pos_id];
            bullets.push(gun_pos.translated(50.0, 50.0, 125.0));
        }

        GameState {
            id: next_id,
            pos_id: next_pos_id,
            power_level_id: next_power_level_id,
            bullets,
        }
    }

    /// Builds the target [`Frame`] for this state: the gun mesh (colored
    /// green, except the layer indexed by `power_level_id` which is red —
    /// unless `power_level_id == 3`, in which case every layer is green)
    /// plus two orange-red pixels per in-flight bullet.
    pub fn make_frame(&self, trajectory: &[Pos3D]) -> Frame {
        let gun_pos = trajectory[self.pos_id % trajectory.len().max(1)];
        let mut frame = Frame::new(self.id);

        for (offset, layer) in gun_mesh_offsets() {
            let color = if layer as i32 == self.power_level_id {
                Color::RED
            } else {
                Color::GREEN
            };
            let pos = gun_pos.translated(offset.x, offset.y, offset.z);
            frame.add_pixel(Pixel::new(pos, color));
        }

        for bullet in &self.bullets {
            let below = bullet.translated(0.0, 0.0, -BULLET_JUMP_DISTANCE / 4.0);
            let above = bullet.translated(0.0, 0.0, BULLET_JUMP_DISTANCE / 4.0);
            frame.add_pixel(Pixel::new(below, Color::ORANGE_RED));
            frame.add_pixel(Pixel::new(above, Color::ORANGE_RED));
        }

        frame
    }
}

#[allow(dead_code)]
pub const DECISION_NIL: i32 = NIL;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_state_is_power_level_two() {
        let mut state = GameState::initial(0);
        assert!(!state.is_decision_state());
        state.power_level_id = 2;
        assert!(state.is_decision_state());
    }

    #[test]
    fn firing_adds_a_bullet_holding_does_not() {
        let trajectory = canonical_gun_trajectory();
        let mut state = GameState::initial(0);
        state.power_level_id = 2;

        let fired = state.advance(1, &trajectory, true);
        let held = state.advance(2, &trajectory, false);

        assert_eq!(fired.bullets.len(), 1);
        assert_eq!(held.bullets.len(), 0);
    }

    #[test]
    fn bullets_drop_past_max_distance() {
        let trajectory = canonical_gun_trajectory();
        let mut state = GameState::initial(0);
        state.bullets.push(Pos3D::new(0.0, 0.0, BULLET_MAX_DISTANCE));
        let next = state.advance(1, &trajectory, false);
        assert!(next.bullets.is_empty());
    }

    #[test]
    fn make_frame_has_thirteen_gun_pixels_plus_bullets() {
        let trajectory = canonical_gun_trajectory();
        let mut state = GameState::initial(0);
        state.bullets.push(Pos3D::new(0.0, 0.0, 0.0));
        let frame = state.make_frame(&trajectory);
        assert_eq!(frame.len(), 13 + 2);
    }

    #[test]
    fn power_level_three_has_no_red_layer() {
        let trajectory = canonical_gun_trajectory();
        let mut state = GameState::initial(0);
        state.power_level_id = 3;
        let frame = state.make_frame(&trajectory);
        assert!(frame.pixels().iter().all(|p| p.color == Color::GREEN));
    }
}
