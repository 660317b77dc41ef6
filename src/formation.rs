//! Per-edge drone trajectories: a fleet's instantaneous state, a drone's
//! assignment to pixel indices, and the short interpolated plan connecting
//! two consecutive frames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::drone::DroneState;
use crate::frame::Frame;
use crate::frame_tree::FrameId;

/// The full fleet's state at one instant. Fixed length `drone_num`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation(Vec<DroneState>);

impl Formation {
    pub fn new() -> Self {
        Formation(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Formation(Vec::with_capacity(capacity))
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn drone(&self, drone_id: usize) -> DroneState {
        self.0[drone_id]
    }

    pub fn set_drone(&mut self, drone_id: usize, state: DroneState) {
        self.0[drone_id] = state;
    }

    pub fn add_drone(&mut self, state: DroneState) {
        self.0.push(state);
    }

    pub fn drones(&self) -> &[DroneState] {
        &self.0
    }

    /// Flattens the formation into a rendering [`Frame`]; frame id `0` since
    /// micro-formations aren't keyed by a frame tree node.
    pub fn make_frame(&self) -> Frame {
        let pixels = self.0.iter().map(|d| d.pixel()).collect();
        Frame::with_pixels(0, pixels)
    }
}

impl Default for Formation {
    fn default() -> Self {
        Formation::new()
    }
}

/// Sentinel marking a pixel index not yet assigned a drone, during
/// construction of an assignment.
pub const UNASSIGNED: i32 = -1;

/// For each pixel index `i` in a frame, the drone id assigned to it, or
/// [`UNASSIGNED`] while the assignment is still being built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneAssignment(Vec<i32>);

impl DroneAssignment {
    pub fn new(len: usize) -> Self {
        DroneAssignment(vec![UNASSIGNED; len])
    }

    pub fn identity(len: usize) -> Self {
        DroneAssignment((0..len as i32).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, pixel_id: usize) -> i32 {
        self.0[pixel_id]
    }

    pub fn set(&mut self, pixel_id: usize, drone_id: i32) {
        self.0[pixel_id] = drone_id;
    }

    pub fn is_assigned(&self, drone_id: i32) -> bool {
        self.0.contains(&drone_id)
    }

    pub fn assigned_pixel(&self, drone_id: i32) -> Option<usize> {
        self.0.iter().position(|&d| d == drone_id)
    }

    pub fn has_unassigned(&self) -> bool {
        self.0.iter().any(|&d| d == UNASSIGNED)
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}

/// One parent→child edge's worth of drone trajectories: endpoint formations
/// and assignments, plus the intermediate micro-formations rendered between
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationPlan {
    frame1_id: i32,
    frame2_id: i32,
    formation1: Formation,
    micro_formations: Vec<Formation>,
    assignment1: DroneAssignment,
    assignment2: DroneAssignment,
}

impl FormationPlan {
    pub fn new(frame1_id: i32, frame2_id: i32, micro_frame_num: usize) -> Self {
        FormationPlan {
            frame1_id,
            frame2_id,
            formation1: Formation::new(),
            micro_formations: vec![Formation::new(); micro_frame_num],
            assignment1: DroneAssignment::new(0),
            assignment2: DroneAssignment::new(0),
        }
    }

    pub fn frame1_id(&self) -> i32 {
        self.frame1_id
    }

    pub fn frame2_id(&self) -> i32 {
        self.frame2_id
    }

    pub fn formation1(&self) -> &Formation {
        &self.formation1
    }

    pub fn set_formation1(&mut self, formation: Formation) {
        self.formation1 = formation;
    }

    /// The endpoint formation: the last micro-formation in the sequence.
    pub fn formation2(&self) -> &Formation {
        self.micro_formations
            .last()
            .expect("FormationPlan must have at least one micro-formation")
    }

    pub fn micro_formation(&self, index: usize) -> &Formation {
        &self.micro_formations[index]
    }

    pub fn micro_formation_mut(&mut self, index: usize) -> &mut Formation {
        &mut self.micro_formations[index]
    }

    pub fn assignment1(&self) -> &DroneAssignment {
        &self.assignment1
    }

    pub fn set_assignment1(&mut self, assignment: DroneAssignment) {
        self.assignment1 = assignment;
    }

    pub fn assignment2(&self) -> &DroneAssignment {
        &self.assignment2
    }

    pub fn assignment2_mut(&mut self) -> &mut DroneAssignment {
        &mut self.assignment2
    }

    pub fn set_assignment2(&mut self, assignment: DroneAssignment) {
        self.assignment2 = assignment;
    }
}

/// Sparse map from a directed frame-tree edge to its [`FormationPlan`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContingencyFormationPlan {
    plans: HashMap<(i32, i32), FormationPlan>,
}

impl ContingencyFormationPlan {
    pub fn new() -> Self {
        ContingencyFormationPlan::default()
    }

    pub fn clear(&mut self) {
        self.plans.clear();
    }

    pub fn contains(&self, frame1: FrameId, frame2: FrameId) -> bool {
        self.plans.contains_key(&(frame1.0, frame2.0))
    }

    pub fn get(&self, frame1: FrameId, frame2: FrameId) -> Option<&FormationPlan> {
        self.plans.get(&(frame1.0, frame2.0))
    }

    pub fn get_mut(&mut self, frame1: FrameId, frame2: FrameId) -> Option<&mut FormationPlan> {
        self.plans.get_mut(&(frame1.0, frame2.0))
    }

    /// Inserts an empty plan for `(frame1, frame2)`. Panics if the edge
    /// already has a plan — double insertion is a planner bug.
    pub fn emplace(&mut self, frame1: FrameId, frame2: FrameId, micro_frame_num: usize) -> &mut FormationPlan {
        let key = (frame1.0, frame2.0);
        assert!(
            !self.plans.contains_key(&key),
            "formation plan for {frame1}->{frame2} already exists"
        );
        self.plans
            .entry(key)
            .or_insert_with(|| FormationPlan::new(frame1.0, frame2.0, micro_frame_num))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Pos3D};

    #[test]
    fn assignment_tracks_unassigned_slots() {
        let mut a = DroneAssignment::new(3);
        assert!(a.has_unassigned());
        a.set(0, 5);
        a.set(1, 2);
        a.set(2, 9);
        assert!(!a.has_unassigned());
        assert_eq!(a.assigned_pixel(2), Some(1));
    }

    #[test]
    fn emplace_twice_panics() {
        let mut plan = ContingencyFormationPlan::new();
        plan.emplace(FrameId(0), FrameId(1), 5);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            plan.emplace(FrameId(0), FrameId(1), 5);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn formation_make_frame_preserves_order() {
        let mut formation = Formation::new();
        formation.add_drone(DroneState::new(Pos3D::new(0.0, 0.0, 0.0), Color::RED));
        formation.add_drone(DroneState::new(Pos3D::new(1.0, 0.0, 0.0), Color::GREEN));
        let frame = formation.make_frame();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.pixel(0).color, Color::RED);
    }
}
