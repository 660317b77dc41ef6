//! The tick loop: `GameController` drives the upstream game-state process,
//! `FrameBuffer` owns the live frame tree the renderer consumes from, and
//! `SpicompSimulator` wires the two together with the planner.
//!
//! Grounded on `spicomp_simulator.h`/`.cpp`'s `GameController`, `FrameBuffer`,
//! and `SpicompSimulator`.

use log::{debug, info};

use crate::constants::{INIT_FRAMETREE_LENGTH, MICRO_FRAME_NUM, TIME_STEP_DURATION};
use crate::decision::NIL;
use crate::drone::DroneState;
use crate::error::{Result, SpicompError};
use crate::formation::{ContingencyFormationPlan, DroneAssignment, Formation};
use crate::frame::Frame;
use crate::frame_tree::{FrameId, FrameTree};
use crate::game::{GameState, FIRE_OPTION, HOLD_OPTION};
use crate::game_tree::{GameStateId, GameStateTree};
use crate::geometry::{Color, Pos3D};
use crate::planner::SpicompPlanner;
use crate::rng::SpicompRng;

/// Owner of the live `GameStateTree`. Mints fresh ids as the upstream
/// process branches, and knows how far the decision-variable tracker
/// pixels stay pinned (`pixel_trajectory_tracking_num`).
#[derive(Debug, Clone)]
pub struct GameController {
    tree: GameStateTree,
    next_state_id: i32,
    trajectory: Vec<Pos3D>,
    pixel_trajectory_tracking_num: usize,
}

impl GameController {
    pub fn new(trajectory: Vec<Pos3D>) -> Self {
        GameController {
            tree: GameStateTree::new(),
            next_state_id: 0,
            trajectory,
            pixel_trajectory_tracking_num: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    pub fn tree(&self) -> &GameStateTree {
        &self.tree
    }

    pub fn pixel_trajectory_tracking_num(&self) -> usize {
        self.pixel_trajectory_tracking_num
    }

    fn mint_id(&mut self) -> i32 {
        let id = self.next_state_id;
        self.next_state_id += 1;
        id
    }

    /// Mints a root state and expands it `INIT_FRAMETREE_LENGTH` steps deep,
    /// building the matching `FrameTree` as we go.
    pub fn reset(&mut self) -> FrameTree {
        self.tree.clear();
        self.next_state_id = 0;

        let root_id = self.mint_id();
        let root_state = GameState::initial(root_id);
        let root_frame = root_state.make_frame(&self.trajectory);
        self.pixel_trajectory_tracking_num = root_frame.len();

        self.tree.add_state(root_state);
        self.tree.set_root(GameStateId(root_id));

        let mut frame_tree = FrameTree::new();
        frame_tree.add_frame(root_frame);
        frame_tree.set_root(FrameId(root_id));

        for _ in 0..INIT_FRAMETREE_LENGTH {
            self.extend_frame_tree(&mut frame_tree);
        }
        frame_tree
    }

    /// Expands every current terminal game state one step, attaching the
    /// resulting frame(s) to the matching terminal of `frame_tree`.
    fn extend_frame_tree(&mut self, frame_tree: &mut FrameTree) {
        for terminal in self.tree.terminal_states() {
            self.expand_state(terminal, frame_tree);
        }
    }

    fn expand_state(&mut self, parent: GameStateId, frame_tree: &mut FrameTree) {
        let state = self.tree.state(parent).expect("terminal state must exist").clone();

        if state.is_decision_state() {
            let dv = state.decision_variable();
            self.tree.set_decision_variable(parent, dv.clone()).expect("state exists");
            frame_tree
                .set_decision_variable(FrameId(parent.0), dv)
                .expect("frame exists");

            for (option, fire) in [(HOLD_OPTION, false), (FIRE_OPTION, true)] {
                let child_id = self.mint_id();
                let child_state = state.advance(child_id, &self.trajectory, fire);
                let child_frame = child_state.make_frame(&self.trajectory);
                self.tree.add_state(child_state);
                self.tree.add_child_edge(parent, option, GameStateId(child_id)).expect("parent exists");
                frame_tree.add_frame(child_frame);
                frame_tree
                    .add_child_edge(FrameId(parent.0), option, FrameId(child_id))
                    .expect("parent exists");
            }
        } else {
            let child_id = self.mint_id();
            let child_state = state.advance(child_id, &self.trajectory, false);
            let child_frame = child_state.make_frame(&self.trajectory);
            self.tree.add_state(child_state);
            self.tree.add_child_edge(parent, NIL, GameStateId(child_id)).expect("parent exists");
            frame_tree.add_frame(child_frame);
            frame_tree
                .add_child_edge(FrameId(parent.0), NIL, FrameId(child_id))
                .expect("parent exists");
        }
    }

    /// One new one-level subtree per currently-terminal game state, keyed
    /// by the terminal's id (the frame-tree terminal it must attach to).
    pub fn get_new_frame_trees(&mut self) -> Vec<(FrameId, FrameTree)> {
        let mut result = Vec::new();
        for terminal in self.tree.terminal_states() {
            let mut sub = FrameTree::new();
            let state = self.tree.state(terminal).expect("terminal state must exist").clone();
            sub.add_frame(state.make_frame(&self.trajectory));
            sub.set_root(FrameId(terminal.0));
            self.expand_state(terminal, &mut sub);
            result.push((FrameId(terminal.0), sub));
        }
        result
    }

    pub fn remove_first_game_state(&mut self) -> Result<()> {
        self.tree.pop_front()
    }
}

/// Thin owner of the live `FrameTree`.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    tree: FrameTree,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer::default()
    }

    pub fn reset(&mut self, tree: FrameTree) {
        self.tree = tree;
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Attaches `sub` at its own root id, which must be an existing
    /// terminal of the live tree.
    pub fn attach_frame_tree(&mut self, sub: &FrameTree) -> Result<()> {
        let sub_root = sub.root().ok_or_else(|| SpicompError::InvariantViolation("attached subtree has no root".into()))?;
        self.tree.attach_subtree_to_terminal(sub, sub_root)
    }

    pub fn remove_first_frame(&mut self) -> Result<()> {
        self.tree.pop_front()
    }
}

/// The tick-driven controller: advances the micro-frame index, pops the
/// frame tree and game-state tree on macro-step boundaries, pulls fresh
/// subtrees from the `GameController`, and re-invokes the planner.
pub struct SpicompSimulator {
    drone_num: usize,
    micro_frame_num: usize,
    scene_size: (f64, f64, f64),
    controller: GameController,
    buffer: FrameBuffer,
    cf_plan: ContingencyFormationPlan,
    rng: SpicompRng,
    sim_step_count: i32,
    micro_frame_step_count: usize,
}

impl SpicompSimulator {
    pub fn new(drone_num: usize, micro_frame_num: usize, scene_size: (f64, f64, f64), trajectory: Vec<Pos3D>, rng: SpicompRng) -> Self {
        SpicompSimulator {
            drone_num,
            micro_frame_num,
            scene_size,
            controller: GameController::new(trajectory),
            buffer: FrameBuffer::new(),
            cf_plan: ContingencyFormationPlan::new(),
            rng,
            sim_step_count: 0,
            micro_frame_step_count: 0,
        }
    }

    pub fn sim_step_count(&self) -> i32 {
        self.sim_step_count
    }

    pub fn time_step_duration(&self) -> f64 {
        TIME_STEP_DURATION
    }

    pub fn is_stopped(&self) -> bool {
        false
    }

    pub fn get_current_micro_frame(&self) -> Result<Frame> {
        let root = self.buffer.tree().root().ok_or_else(|| SpicompError::InvariantViolation("frame buffer is empty".into()))?;
        let child = self.buffer.tree().default_child(root)?;
        let plan = self
            .cf_plan
            .get(root, child)
            .ok_or_else(|| SpicompError::InvariantViolation(format!("no formation plan for {root}->{child}")))?;
        Ok(plan.micro_formation(self.micro_frame_step_count).make_frame())
    }

    pub fn reset(&mut self) -> Result<()> {
        let frame_tree = self.controller.reset();
        let root_frame = frame_tree.root_frame().expect("reset always mints a root frame").clone();
        let p0 = root_frame.len();
        assert!(p0 <= self.drone_num, "root frame has more pixels than drones");

        let mut formation = Formation::with_capacity(self.drone_num);
        for pixel in root_frame.pixels() {
            formation.add_drone(DroneState::from_pixel(*pixel));
        }
        let (sx, sy, sz) = self.scene_size;
        for _ in p0..self.drone_num {
            let pos = Pos3D::new(
                self.rng.uniform_in(-sx / 2.0, sx / 2.0),
                self.rng.uniform_in(-sy / 2.0, sy / 2.0),
                self.rng.uniform_in(0.0, sz),
            );
            formation.add_drone(DroneState::new(pos, Color::HIDDEN));
        }
        let assignment = DroneAssignment::identity(p0);

        self.buffer.reset(frame_tree);
        self.sim_step_count = 0;
        self.micro_frame_step_count = 0;
        self.replan(formation, assignment)?;
        info!("simulator reset: drone_num={} pixel_trajectory_tracking_num={}", self.drone_num, self.controller.pixel_trajectory_tracking_num());
        Ok(())
    }

    fn replan(&mut self, formation: Formation, assignment: DroneAssignment) -> Result<()> {
        let tracking_num = self.controller.pixel_trajectory_tracking_num();
        let frame_tree = self.buffer.tree().clone();
        let mut planner = SpicompPlanner::new(self.drone_num, self.micro_frame_num, tracking_num, &frame_tree, &mut self.rng);
        self.cf_plan = planner.solve(formation, assignment)?;
        Ok(())
    }

    pub fn next_step(&mut self) -> Result<()> {
        if self.micro_frame_step_count == self.micro_frame_num - 1 {
            let root = self.buffer.tree().root().expect("buffer must have a root");
            let child = self.buffer.tree().default_child(root)?;
            let plan = self
                .cf_plan
                .get(root, child)
                .ok_or_else(|| SpicompError::InvariantViolation(format!("no formation plan for {root}->{child}")))?;
            let formation2 = plan.formation2().clone();
            let assignment2 = plan.assignment2().clone();

            self.controller.remove_first_game_state()?;
            self.buffer.remove_first_frame()?;
            for (terminal, sub) in self.controller.get_new_frame_trees() {
                debug!("attaching new subtree at {terminal}");
                self.buffer.attach_frame_tree(&sub)?;
            }
            self.replan(formation2, assignment2)?;
            self.micro_frame_step_count = 0;
        } else {
            self.micro_frame_step_count += 1;
        }
        self.sim_step_count += 1;

        assert_eq!(
            self.controller.size(),
            self.buffer.size(),
            "game-state tree and frame tree must stay in lockstep"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::canonical_gun_trajectory;

    fn simulator(seed: u32) -> SpicompSimulator {
        SpicompSimulator::new(8, MICRO_FRAME_NUM, (2000.0, 2000.0, 1000.0), canonical_gun_trajectory(), SpicompRng::new(seed))
    }

    #[test]
    fn reset_produces_a_renderable_frame() {
        let mut sim = simulator(42);
        sim.reset().unwrap();
        let frame = sim.get_current_micro_frame().unwrap();
        assert!(!frame.is_empty());
    }

    #[test]
    fn controller_and_buffer_stay_in_lockstep_across_ticks() {
        let mut sim = simulator(42);
        sim.reset().unwrap();
        for _ in 0..30 {
            sim.next_step().unwrap();
        }
        assert_eq!(sim.controller.size(), sim.buffer.size());
        assert_eq!(sim.sim_step_count(), 30);
    }

    #[test]
    fn same_seed_and_trajectory_are_deterministic() {
        let mut a = simulator(7);
        let mut b = simulator(7);
        a.reset().unwrap();
        b.reset().unwrap();
        for _ in 0..40 {
            a.next_step().unwrap();
            b.next_step().unwrap();
            assert_eq!(a.get_current_micro_frame().unwrap(), b.get_current_micro_frame().unwrap());
        }
    }

    #[test]
    fn is_stopped_is_always_false() {
        let mut sim = simulator(1);
        sim.reset().unwrap();
        assert!(!sim.is_stopped());
    }
}

