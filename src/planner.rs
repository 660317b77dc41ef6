//! The depth-first assignment-and-motion planner: for every parent→child
//! edge of a [`FrameTree`], fills in a [`FormationPlan`] describing how the
//! fleet moves from one target frame to the next.
//!
//! Grounded on `spicomp_simulator.cpp`'s `SpicompPlanner::solve`,
//! `computeFormationPlan`, `computeEarliestAvailableMicroFormations`,
//! `computeLinearMicroFormations`, `computeGoDarkMicroFormations`, and
//! `findEarliestAvailableFrameId` — structure and loop order preserved, the
//! C++'s `std::list`-of-ids pool replaced with a plain `Vec<i32>` (removal
//! order is equivalent).

use log::{debug, trace};

use crate::drone::DroneState;
use crate::error::{Result, SpicompError};
use crate::formation::{ContingencyFormationPlan, DroneAssignment, Formation};
use crate::frame::Frame;
use crate::frame_tree::{FrameId, FrameTree};
use crate::geometry::{Color, Pixel, Pos3D, EPSILON};
use crate::rng::SpicompRng;

/// Depth-first assignment-and-motion planner.
///
/// Holds the drone fleet size, micro-frame resolution, and the count of
/// leading "tracker" pixels (the gun) that must stay with the same drones
/// across the whole tree — everything else is threaded through explicitly.
pub struct SpicompPlanner<'a> {
    drone_num: usize,
    micro_frame_num: usize,
    pixel_trajectory_tracking_num: usize,
    frame_tree: &'a FrameTree,
    rng: &'a mut SpicompRng,
}

impl<'a> SpicompPlanner<'a> {
    pub fn new(
        drone_num: usize,
        micro_frame_num: usize,
        pixel_trajectory_tracking_num: usize,
        frame_tree: &'a FrameTree,
        rng: &'a mut SpicompRng,
    ) -> Self {
        SpicompPlanner {
            drone_num,
            micro_frame_num,
            pixel_trajectory_tracking_num,
            frame_tree,
            rng,
        }
    }

    /// Runs the planner over the whole tree. Either returns a fully
    /// populated plan or an error — `cf_plan` is built fresh and never
    /// partially handed back (spec.md §7's plan-mutation policy).
    pub fn solve(&mut self, init_formation: Formation, init_assignment: DroneAssignment) -> Result<ContingencyFormationPlan> {
        assert_eq!(
            init_formation.size(),
            self.drone_num,
            "initial formation must have exactly drone_num drones"
        );
        let mut cf_plan = ContingencyFormationPlan::new();
        if let Some(root) = self.frame_tree.root() {
            self.solve_from(root, init_formation, init_assignment, &mut cf_plan)?;
        }
        Ok(cf_plan)
    }

    fn solve_from(
        &mut self,
        frame_id: FrameId,
        formation: Formation,
        assignment: DroneAssignment,
        cf_plan: &mut ContingencyFormationPlan,
    ) -> Result<()> {
        if self.frame_tree.is_terminal(frame_id) {
            return Ok(());
        }
        let mut children: Vec<(i32, FrameId)> = self
            .frame_tree
            .children_of(frame_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();
        children.sort_by_key(|(option, _)| *option);

        for (_option, child_id) in children {
            trace!("planning edge {frame_id}->{child_id}");
            cf_plan.emplace(frame_id, child_id, self.micro_frame_num);
            let (formation2, assignment2) =
                self.compute_formation_plan(frame_id, child_id, &formation, &assignment, cf_plan)?;
            self.solve_from(child_id, formation2, assignment2, cf_plan)?;
        }
        Ok(())
    }

    fn compute_formation_plan(
        &mut self,
        frame1_id: FrameId,
        frame2_id: FrameId,
        formation1: &Formation,
        assignment1: &DroneAssignment,
        cf_plan: &mut ContingencyFormationPlan,
    ) -> Result<(Formation, DroneAssignment)> {
        let frame1 = self.frame_tree.frame(frame1_id)?.clone();
        let frame2 = self.frame_tree.frame(frame2_id)?.clone();
        assert_eq!(frame1.len(), assignment1.len());

        let k = self.pixel_trajectory_tracking_num;
        let p2 = frame2.len();
        assert!(frame1.len() >= k && p2 >= k);

        // Step 1 — reserve tracker assignments.
        let mut assignment2 = DroneAssignment::new(p2);
        for pixel_id in 0..k {
            assignment2.set(pixel_id, assignment1.get(pixel_id));
        }

        {
            let plan = cf_plan
                .get_mut(frame1_id, frame2_id)
                .expect("plan must have been emplaced by the caller");
            plan.set_formation1(formation1.clone());
            plan.set_assignment1(assignment1.clone());
            plan.set_assignment2(assignment2.clone());
            // Micro-formations start as copies of formation1 so every drone
            // has a valid slot to overwrite below; any drone this edge never
            // touches simply holds its frame1 state throughout.
            for micro_id in 0..self.micro_frame_num {
                *plan.micro_formation_mut(micro_id) = formation1.clone();
            }
        }

        // Step 2 — precompute earliest-availability walks for every drone
        // not already pinned to a tracker pixel.
        let mut earliest_available: std::collections::HashMap<i32, Vec<FrameId>> = std::collections::HashMap::new();
        if p2 > k {
            let unassigned = unassigned_drone_ids(self.drone_num, &assignment2);
            for drone_id in &unassigned {
                let mut path = self.find_earliest_available_path(frame1_id, *drone_id, cf_plan)?;
                path.push(frame2_id);
                earliest_available.insert(*drone_id, path);
            }

            // Step 3 — fill the trailing pixels, weighted by inverse average
            // distance per flight step.
            let mut pool = unassigned;
            for pixel_id in k..p2 {
                let pixel = frame2.pixel(pixel_id);
                let weights: Vec<f64> = pool
                    .iter()
                    .map(|drone_id| {
                        let pos = formation1.drone(*drone_id as usize).pos;
                        let flight_steps = (earliest_available[drone_id].len() - 1) as f64;
                        let avg_distance = pos.distance(&pixel.pos) / flight_steps;
                        1.0 / (avg_distance + EPSILON)
                    })
                    .collect();
                let selected = self.rng.weighted_index(&weights);
                let drone_id = pool.remove(selected);
                debug!("trailing pixel {pixel_id} of {frame1_id}->{frame2_id} assigned to drone {drone_id}");
                assignment2.set(pixel_id, drone_id);
            }
        }
        assert!(!assignment2.has_unassigned());

        cf_plan
            .get_mut(frame1_id, frame2_id)
            .expect("plan must exist")
            .set_assignment2(assignment2.clone());

        // Step 4 — compute micro-formations per pixel.
        for pixel2_id in 0..p2 {
            let drone_id = assignment2.get(pixel2_id);
            let drone_state = formation1.drone(drone_id as usize);
            let mut pixel1 = drone_state.pixel();
            if pixel2_id >= k {
                pixel1.color = Color::HIDDEN;
            }
            let pixel2 = frame2.pixel(pixel2_id);

            if assignment1.is_assigned(drone_id) {
                self.compute_linear_micro_formations(cf_plan, frame1_id, frame2_id, drone_id, pixel1, pixel2);
            } else {
                let path = earliest_available
                    .get(&drone_id)
                    .expect("trailing-pixel drones all have a precomputed path")
                    .clone();
                self.compute_earliest_available_micro_formations(cf_plan, frame1_id, frame2_id, drone_id, pixel2, pixel2_id, &path)?;
            }
        }

        // Step 5 — every drone still unassigned fades out.
        for drone_id in unassigned_drone_ids(self.drone_num, &assignment2) {
            let pixel1 = formation1.drone(drone_id as usize).pixel();
            self.compute_go_dark_micro_formations(cf_plan, frame1_id, frame2_id, drone_id, pixel1);
        }

        let plan = cf_plan.get(frame1_id, frame2_id).expect("plan must exist");
        Ok((plan.formation2().clone(), assignment2))
    }

    /// Walks from `frame1_id` up through ancestor edges while the drone
    /// remains hidden, stopping at the earliest ancestor where it was last
    /// visible (or at the tree root). Mirrors
    /// `SpicompPlanner::findEarliestAvailableFrameId`.
    fn find_earliest_available_path(
        &self,
        frame1_id: FrameId,
        drone_id: i32,
        cf_plan: &ContingencyFormationPlan,
    ) -> Result<Vec<FrameId>> {
        let mut path = Vec::new();
        let mut current = frame1_id;
        loop {
            match self.frame_tree.parent_of(current) {
                None => {
                    path.push(current);
                    break;
                }
                Some(parent_id) => {
                    let parent_plan = cf_plan.get(parent_id, current).ok_or_else(|| {
                        SpicompError::InvariantViolation(format!(
                            "missing formation plan for {parent_id}->{current} during earliest-available walk"
                        ))
                    })?;
                    path.push(current);
                    if parent_plan.assignment2().is_assigned(drone_id) {
                        break;
                    }
                    current = parent_id;
                }
            }
        }
        path.reverse();
        Ok(path)
    }

    fn compute_linear_micro_formations(
        &self,
        cf_plan: &mut ContingencyFormationPlan,
        frame1_id: FrameId,
        frame2_id: FrameId,
        drone_id: i32,
        pixel1: Pixel,
        pixel2: Pixel,
    ) {
        let m = self.micro_frame_num;
        let plan = cf_plan.get_mut(frame1_id, frame2_id).expect("plan must exist");
        for micro_id in 0..m {
            let (pos, color) = if micro_id == m - 1 {
                (pixel2.pos, pixel2.color)
            } else {
                let t = (micro_id + 1) as f64 / m as f64;
                (Pos3D::lerp(pixel1.pos, pixel2.pos, t), pixel1.color)
            };
            plan.micro_formation_mut(micro_id).set_drone(drone_id as usize, DroneState::new(pos, color));
        }
    }

    fn compute_go_dark_micro_formations(
        &self,
        cf_plan: &mut ContingencyFormationPlan,
        frame1_id: FrameId,
        frame2_id: FrameId,
        drone_id: i32,
        pixel1: Pixel,
    ) {
        let plan = cf_plan.get_mut(frame1_id, frame2_id).expect("plan must exist");
        for micro_id in 0..self.micro_frame_num {
            plan.micro_formation_mut(micro_id)
                .set_drone(drone_id as usize, DroneState::new(pixel1.pos, Color::HIDDEN));
        }
    }

    /// Flies a hidden drone from its last-visible position, piecewise
    /// across every ancestor edge in `path`, to `pixel2`'s position,
    /// arriving with `pixel2`'s color on the very last micro-frame. Mirrors
    /// `computeEarliestAvailableMicroFormations`, including its temporary
    /// removal of the in-progress assignment so the mid-flight asserts
    /// don't see the drone as "already arrived".
    fn compute_earliest_available_micro_formations(
        &self,
        cf_plan: &mut ContingencyFormationPlan,
        frame1_id: FrameId,
        frame2_id: FrameId,
        drone_id: i32,
        pixel2: Pixel,
        pixel2_id: usize,
        path: &[FrameId],
    ) -> Result<()> {
        cf_plan
            .get_mut(frame1_id, frame2_id)
            .expect("plan must exist")
            .assignment2_mut()
            .set(pixel2_id, crate::formation::UNASSIGNED);

        assert!(path.len() >= 2, "earliest-available path must span at least one frame step");
        assert_eq!(path[path.len() - 2], frame1_id, "path's penultimate frame must be this edge's frame1");
        let flight_time_steps = path.len() - 1;

        let first_pos = cf_plan
            .get(path[0], path[1])
            .expect("first leg of the earliest-available path must already have a plan")
            .formation1()
            .drone(drone_id as usize)
            .pos;

        let dist = first_pos.distance(&pixel2.pos);
        let max_dist = crate::constants::MAX_DRONE_FLIGHT_DISTANCE_PER_FRAME * flight_time_steps as f64;
        if dist > max_dist {
            return Err(SpicompError::PlanInfeasible(format!(
                "drone {drone_id} must cover {dist:.1} over {flight_time_steps} frame(s), but the kinematic bound is {max_dist:.1}"
            )));
        }

        let max_per_micro = crate::constants::max_drone_flight_distance_per_microframe();
        let mut current_pos = first_pos;

        for i in 0..flight_time_steps {
            if i > 0 {
                let prev_formation2 = cf_plan
                    .get(path[i - 1], path[i])
                    .expect("earlier leg of the earliest-available path must already have a plan")
                    .formation2()
                    .clone();
                cf_plan
                    .get_mut(path[i], path[i + 1])
                    .expect("leg of the earliest-available path must already have a plan")
                    .set_formation1(prev_formation2);
            }

            let leg = cf_plan
                .get_mut(path[i], path[i + 1])
                .expect("leg of the earliest-available path must already have a plan");
            debug_assert!(!leg.assignment2().is_assigned(drone_id));
            debug_assert!(leg.formation2().drone(drone_id as usize).is_hidden());

            for micro_id in 0..self.micro_frame_num {
                current_pos = current_pos.step_toward(pixel2.pos, max_per_micro);
                let color = if i == flight_time_steps - 1 && micro_id == self.micro_frame_num - 1 {
                    pixel2.color
                } else {
                    Color::HIDDEN
                };
                leg.micro_formation_mut(micro_id)
                    .set_drone(drone_id as usize, DroneState::new(current_pos, color));
            }
        }

        cf_plan
            .get_mut(frame1_id, frame2_id)
            .expect("plan must exist")
            .assignment2_mut()
            .set(pixel2_id, drone_id);
        Ok(())
    }
}

fn unassigned_drone_ids(drone_num: usize, assignment: &DroneAssignment) -> Vec<i32> {
    (0..drone_num as i32).filter(|d| !assignment.is_assigned(*d)).collect()
}

/// Flattens a frame's pixels into an identity `(formation, assignment)`
/// pair, used when seeding the fleet at the root of a fresh frame tree.
pub fn seed_formation_from_frame(frame: &Frame) -> (Formation, DroneAssignment) {
    let mut formation = Formation::with_capacity(frame.len());
    for pixel in frame.pixels() {
        formation.add_drone(DroneState::from_pixel(*pixel));
    }
    let assignment = DroneAssignment::identity(frame.len());
    (formation, assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionVariable;
    use crate::drone::DroneState;
    use crate::frame_tree::FrameTree;
    use crate::geometry::{Color, Pos3D};

    fn pix(x: f64, color: Color) -> Pixel {
        Pixel::new(Pos3D::new(x, 0.0, 0.0), color)
    }

    fn formation_of(positions: &[(f64, Color)], drone_num: usize) -> Formation {
        let mut formation = Formation::with_capacity(drone_num);
        for (x, color) in positions {
            formation.add_drone(DroneState::new(Pos3D::new(*x, 0.0, 0.0), *color));
        }
        while formation.size() < drone_num {
            formation.add_drone(DroneState::new(Pos3D::new(1000.0, 1000.0, 0.0), Color::HIDDEN));
        }
        formation
    }

    #[test]
    fn s1_linear_chain_keeps_assignment_and_interpolates() {
        let mut tree = FrameTree::new();
        for i in 0..3 {
            let frame = Frame::with_pixels(i, vec![pix(0.0, Color::RED), pix(10.0, Color::RED)]);
            tree.add_frame(frame);
            if i == 0 {
                tree.set_root(FrameId(0));
            } else {
                tree.add_child_edge(FrameId(i - 1), crate::decision::NIL, FrameId(i)).unwrap();
            }
        }

        let drone_num = 4;
        let formation1 = formation_of(&[(0.0, Color::RED), (10.0, Color::RED)], drone_num);
        let assignment1 = DroneAssignment::identity(2);

        let mut rng = SpicompRng::new(42);
        let mut planner = SpicompPlanner::new(drone_num, 5, 2, &tree, &mut rng);
        let cf_plan = planner.solve(formation1, assignment1).unwrap();

        assert_eq!(cf_plan.len(), 2);
        for (f1, f2) in [(0, 1), (1, 2)] {
            let plan = cf_plan.get(FrameId(f1), FrameId(f2)).unwrap();
            assert_eq!(plan.assignment2().as_slice(), &[0, 1]);
            assert!(plan.micro_formation(4).drone(2).is_hidden());
            assert!(plan.micro_formation(4).drone(3).is_hidden());
            let last = plan.micro_formation(4).drone(1);
            assert!((last.pos.x - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn s2_decision_tree_assigns_hopping_drone_to_trailing_pixel() {
        let mut tree = FrameTree::new();
        let root = Frame::with_pixels(0, vec![pix(0.0, Color::RED), pix(10.0, Color::RED)]);
        tree.add_frame(root);
        tree.set_root(FrameId(0));

        let child0 = Frame::with_pixels(1, vec![pix(0.0, Color::RED), pix(10.0, Color::RED)]);
        let child1 = Frame::with_pixels(
            2,
            vec![pix(0.0, Color::RED), pix(10.0, Color::RED), Pixel::new(Pos3D::new(5.0, 5.0, 0.0), Color::BLUE)],
        );
        tree.add_frame(child0);
        tree.add_frame(child1);
        tree.add_child_edge(FrameId(0), 0, FrameId(1)).unwrap();
        tree.add_child_edge(FrameId(0), 1, FrameId(2)).unwrap();
        tree.set_decision_variable(FrameId(0), DecisionVariable::new(0, vec![0, 1], 1)).unwrap();
        tree.is_valid().unwrap();

        let drone_num = 4;
        let formation1 = formation_of(&[(0.0, Color::RED), (10.0, Color::RED)], drone_num);
        let assignment1 = DroneAssignment::identity(2);

        let mut rng = SpicompRng::new(42);
        let mut planner = SpicompPlanner::new(drone_num, 5, 2, &tree, &mut rng);
        let cf_plan = planner.solve(formation1, assignment1).unwrap();

        assert!(cf_plan.contains(FrameId(0), FrameId(1)));
        assert!(cf_plan.contains(FrameId(0), FrameId(2)));
        let branch1 = cf_plan.get(FrameId(0), FrameId(2)).unwrap();
        assert_eq!(branch1.assignment2().len(), 3);
        let trailing_drone = branch1.assignment2().get(2);
        assert!(trailing_drone == 2 || trailing_drone == 3);

        tree.pop_front().unwrap();
        assert_eq!(tree.root(), Some(FrameId(2)));
        assert!(!tree.frame_exists(FrameId(1)));
    }

    #[test]
    fn s3_infeasible_flight_is_reported() {
        let mut tree = FrameTree::new();
        let root = Frame::with_pixels(0, vec![pix(0.0, Color::RED)]);
        tree.add_frame(root);
        tree.set_root(FrameId(0));
        let child = Frame::with_pixels(
            1,
            vec![pix(0.0, Color::RED), Pixel::new(Pos3D::new(1_000_000.0, 0.0, 0.0), Color::BLUE)],
        );
        tree.add_frame(child);
        tree.add_child_edge(FrameId(0), crate::decision::NIL, FrameId(1)).unwrap();

        let drone_num = 2;
        let mut formation1 = Formation::with_capacity(drone_num);
        formation1.add_drone(DroneState::new(Pos3D::new(0.0, 0.0, 0.0), Color::RED));
        formation1.add_drone(DroneState::new(Pos3D::new(0.0, 0.0, 0.0), Color::HIDDEN));
        let assignment1 = DroneAssignment::identity(1);

        let mut rng = SpicompRng::new(1);
        let mut planner = SpicompPlanner::new(drone_num, 5, 1, &tree, &mut rng);
        let result = planner.solve(formation1, assignment1);
        assert!(matches!(result, Err(SpicompError::PlanInfeasible(_))));
    }
}
