//! The contingency frame tree: an arena-indexed tree of [`Frame`]s with an
//! optional [`DecisionVariable`] at branching nodes.
//!
//! Grounded on `spicomp_simulator.cpp`'s `FrameTree`, reworked from a web of
//! cross-referenced maps with C++ iterator handles into a pure arena of
//! `HashMap`s keyed by a monotonic [`FrameId`] that is never reused —
//! unlike `petgraph`'s `StableGraph`, nothing here recycles a freed index.

use std::collections::HashMap;
use std::fmt;

use crate::decision::{DecisionVariable, NIL};
use crate::error::{Result, SpicompError};
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub i32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame{}", self.0)
    }
}

fn invariant(cond: bool, msg: impl Into<String>) -> Result<()> {
    let msg = msg.into();
    debug_assert!(cond, "{msg}");
    if cond {
        Ok(())
    } else {
        Err(SpicompError::InvariantViolation(msg))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameTree {
    root: Option<FrameId>,
    frames: HashMap<FrameId, Frame>,
    decision_var: HashMap<FrameId, DecisionVariable>,
    children: HashMap<FrameId, HashMap<i32, FrameId>>,
    parent: HashMap<FrameId, FrameId>,
    parent_option: HashMap<FrameId, i32>,
}

impl FrameTree {
    pub fn new() -> Self {
        FrameTree::default()
    }

    pub fn clear(&mut self) {
        *self = FrameTree::default();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn size(&self) -> usize {
        self.frames.len()
    }

    pub fn root(&self) -> Option<FrameId> {
        self.root
    }

    pub fn root_frame(&self) -> Option<&Frame> {
        self.root.and_then(|id| self.frames.get(&id))
    }

    pub fn set_root(&mut self, id: FrameId) {
        self.root = Some(id);
    }

    pub fn frame_exists(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    pub fn frame(&self, id: FrameId) -> Result<&Frame> {
        self.frames
            .get(&id)
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} does not exist")))
    }

    pub fn is_decision(&self, id: FrameId) -> bool {
        self.decision_var.contains_key(&id)
    }

    pub fn decision_variable(&self, id: FrameId) -> Result<&DecisionVariable> {
        self.decision_var
            .get(&id)
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} has no decision variable")))
    }

    pub fn is_terminal(&self, id: FrameId) -> bool {
        !self.children.contains_key(&id)
    }

    pub fn children_of(&self, id: FrameId) -> Option<&HashMap<i32, FrameId>> {
        self.children.get(&id)
    }

    pub fn child(&self, id: FrameId, option: i32) -> Result<FrameId> {
        self.children
            .get(&id)
            .and_then(|map| map.get(&option))
            .copied()
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} has no child for option {option}")))
    }

    pub fn unique_child(&self, id: FrameId) -> Result<FrameId> {
        self.child(id, NIL)
    }

    pub fn default_child(&self, id: FrameId) -> Result<FrameId> {
        if self.is_decision(id) {
            let option = self.decision_variable(id)?.default_option();
            self.child(id, option)
        } else {
            self.unique_child(id)
        }
    }

    pub fn parent_of(&self, id: FrameId) -> Option<FrameId> {
        self.parent.get(&id).copied()
    }

    pub fn parent_option_of(&self, id: FrameId) -> Option<i32> {
        self.parent_option.get(&id).copied()
    }

    pub fn add_frame(&mut self, frame: Frame) -> FrameId {
        let id = FrameId(frame.id);
        self.frames.insert(id, frame);
        id
    }

    /// Wires `child` as `parent`'s child under `option`, and records the
    /// inverse parent link on `child`.
    pub fn add_child_edge(&mut self, parent: FrameId, option: i32, child: FrameId) -> Result<()> {
        invariant(self.frame_exists(parent), format!("{parent} does not exist"))?;
        invariant(self.frame_exists(child), format!("{child} does not exist"))?;
        self.children.entry(parent).or_default().insert(option, child);
        self.parent.insert(child, parent);
        self.parent_option.insert(child, option);
        Ok(())
    }

    fn remove_child_edge(&mut self, parent: FrameId, option: i32, child: FrameId) {
        if let Some(map) = self.children.get_mut(&parent) {
            map.remove(&option);
            if map.is_empty() {
                self.children.remove(&parent);
            }
        }
        self.parent.remove(&child);
        self.parent_option.remove(&child);
    }

    pub fn set_decision_variable(&mut self, id: FrameId, dv: DecisionVariable) -> Result<()> {
        invariant(self.frame_exists(id), format!("{id} does not exist"))?;
        self.decision_var.insert(id, dv);
        Ok(())
    }

    fn remove_decision_variable(&mut self, id: FrameId) {
        self.decision_var.remove(&id);
    }

    fn remove_frame(&mut self, id: FrameId) {
        self.frames.remove(&id);
    }

    /// Recursively copies the descendants of `sub_root` from `sub` into
    /// `self`, preserving ids, decision variables, and option labels.
    /// Precondition: `sub_root` exists in `self` as a terminal, non-decision
    /// frame, and the same id exists in `sub`.
    pub fn attach_subtree_to_terminal(&mut self, sub: &FrameTree, sub_root: FrameId) -> Result<()> {
        invariant(!sub.is_empty(), "subtree must be non-empty")?;
        invariant(self.frame_exists(sub_root), format!("{sub_root} does not exist in self"))?;
        invariant(!self.is_decision(sub_root), format!("{sub_root} must not be a decision frame"))?;
        invariant(self.is_terminal(sub_root), format!("{sub_root} must be terminal"))?;

        if sub.is_terminal(sub_root) {
            return Ok(());
        }

        if sub.is_decision(sub_root) {
            let dv = sub.decision_variable(sub_root)?.clone();
            self.set_decision_variable(sub_root, dv.clone())?;
            let children = sub.children_of(sub_root).cloned().unwrap_or_default();
            for (option, child_id) in children {
                invariant(dv.contains(option), format!("option {option} not in domain"))?;
                invariant(!self.frame_exists(child_id), format!("{child_id} already exists"))?;
                self.add_frame(sub.frame(child_id)?.clone());
                self.add_child_edge(sub_root, option, child_id)?;
                self.attach_subtree_to_terminal(sub, child_id)?;
            }
        } else {
            let child_id = sub.unique_child(sub_root)?;
            invariant(!self.frame_exists(child_id), format!("{child_id} already exists"))?;
            self.add_frame(sub.frame(child_id)?.clone());
            self.add_child_edge(sub_root, NIL, child_id)?;
            self.attach_subtree_to_terminal(sub, child_id)?;
        }
        Ok(())
    }

    /// Merges a branching subtree at an interior node, relabeling it with
    /// `new_dv`. See spec.md §4.D for the option-accounting constraints this
    /// enforces.
    pub fn attach_subtree(
        &mut self,
        sub: &FrameTree,
        sub_root: FrameId,
        new_dv: DecisionVariable,
        option_for_orig_unique_child: i32,
        option_for_sub_unique_child: i32,
    ) -> Result<()> {
        invariant(!sub.is_empty(), "subtree must be non-empty")?;
        invariant(self.frame_exists(sub_root), format!("{sub_root} does not exist"))?;
        invariant(!self.is_terminal(sub_root), format!("{sub_root} must not be terminal"))?;

        if sub.is_terminal(sub_root) {
            return Ok(());
        }

        if self.is_decision(sub_root) {
            invariant(
                option_for_orig_unique_child == NIL,
                "option_for_orig_unique_child must be NIL when original is a decision frame",
            )?;
            let old_dv = self.decision_variable(sub_root)?.clone();
            invariant(old_dv.is_subdomain_of(&new_dv), "old decision variable must be a subdomain of new_dv")?;
            if sub.is_decision(sub_root) {
                invariant(
                    option_for_sub_unique_child == NIL,
                    "option_for_sub_unique_child must be NIL when subtree is a decision frame",
                )?;
                let sub_dv = sub.decision_variable(sub_root)?.clone();
                invariant(sub_dv.is_subdomain_of(&new_dv), "subtree decision variable must be a subdomain of new_dv")?;
                for option in new_dv.domain() {
                    invariant(
                        old_dv.contains(*option) || sub_dv.contains(*option),
                        format!("option {option} not accounted for"),
                    )?;
                }
            } else {
                invariant(
                    new_dv.contains(option_for_sub_unique_child),
                    "new_dv must contain option_for_sub_unique_child",
                )?;
                for option in new_dv.domain() {
                    invariant(
                        old_dv.contains(*option) || *option == option_for_sub_unique_child,
                        format!("option {option} not accounted for"),
                    )?;
                }
            }
            self.remove_decision_variable(sub_root);
            self.set_decision_variable(sub_root, new_dv.clone())?;
        } else {
            invariant(
                option_for_orig_unique_child != NIL,
                "option_for_orig_unique_child must not be NIL when original has no decision variable",
            )?;
            invariant(
                new_dv.contains(option_for_orig_unique_child),
                "new_dv must contain option_for_orig_unique_child",
            )?;
            if sub.is_decision(sub_root) {
                invariant(
                    option_for_sub_unique_child == NIL,
                    "option_for_sub_unique_child must be NIL when subtree is a decision frame",
                )?;
                let sub_dv = sub.decision_variable(sub_root)?.clone();
                invariant(sub_dv.is_subdomain_of(&new_dv), "subtree decision variable must be a subdomain of new_dv")?;
                for option in new_dv.domain() {
                    invariant(
                        *option == option_for_orig_unique_child || sub_dv.contains(*option),
                        format!("option {option} not accounted for"),
                    )?;
                }
            } else {
                invariant(
                    option_for_sub_unique_child != NIL,
                    "option_for_sub_unique_child must not be NIL when both sides lack a decision variable",
                )?;
                invariant(
                    new_dv.contains(option_for_sub_unique_child),
                    "new_dv must contain option_for_sub_unique_child",
                )?;
                for option in new_dv.domain() {
                    invariant(
                        *option == option_for_orig_unique_child || *option == option_for_sub_unique_child,
                        format!("option {option} not accounted for"),
                    )?;
                }
            }
            let original_child = self.unique_child(sub_root)?;
            self.remove_child_edge(sub_root, NIL, original_child);
            self.add_child_edge(sub_root, option_for_orig_unique_child, original_child)?;
            self.set_decision_variable(sub_root, new_dv.clone())?;
        }

        if option_for_sub_unique_child == NIL {
            let sub_dv = sub.decision_variable(sub_root)?.clone();
            for option in new_dv.domain() {
                if sub_dv.contains(*option) {
                    let child_id = sub.child(sub_root, *option)?;
                    invariant(!self.frame_exists(child_id), format!("{child_id} already exists"))?;
                    self.add_frame(sub.frame(child_id)?.clone());
                    self.add_child_edge(sub_root, *option, child_id)?;
                    self.attach_subtree_to_terminal(sub, child_id)?;
                }
            }
        } else {
            let child_id = sub.unique_child(sub_root)?;
            invariant(!self.frame_exists(child_id), format!("{child_id} already exists"))?;
            self.add_frame(sub.frame(child_id)?.clone());
            self.add_child_edge(sub_root, option_for_sub_unique_child, child_id)?;
            self.attach_subtree_to_terminal(sub, child_id)?;
        }

        self.is_valid()
    }

    /// Post-order removal of `id` and everything below it. If `id` is the
    /// root, the whole tree is cleared.
    pub fn delete_subtree(&mut self, id: FrameId) -> Result<()> {
        invariant(self.frame_exists(id), format!("{id} does not exist"))?;
        if self.root == Some(id) {
            self.clear();
            return Ok(());
        }
        if !self.is_terminal(id) {
            let children: Vec<(i32, FrameId)> = self
                .children_of(id)
                .map(|map| map.iter().map(|(o, c)| (*o, *c)).collect())
                .unwrap_or_default();
            for (option, child_id) in children {
                self.remove_child_edge(id, option, child_id);
                self.delete_subtree(child_id)?;
            }
        }
        if self.is_decision(id) {
            self.remove_decision_variable(id);
        }
        self.remove_frame(id);
        Ok(())
    }

    /// Removes the root. If it had a decision variable, only the subtree
    /// rooted at `default_child` survives; otherwise the unique child
    /// becomes the new root.
    pub fn pop_front(&mut self) -> Result<()> {
        invariant(!self.is_empty(), "cannot pop_front an empty tree")?;
        let root = self.root.unwrap();
        if self.size() == 1 {
            self.clear();
            return self.is_valid();
        }

        if self.is_decision(root) {
            let dv = self.decision_variable(root)?.clone();
            let default_option = dv.default_option();
            let next_frame = self.child(root, default_option)?;
            let options: Vec<i32> = dv.domain().to_vec();
            for option in options {
                let child_id = self.child(root, option)?;
                self.remove_child_edge(root, option, child_id);
                if option != default_option {
                    self.delete_subtree(child_id)?;
                }
            }
            self.remove_decision_variable(root);
            self.remove_frame(root);
            self.root = Some(next_frame);
        } else {
            let next_frame = self.unique_child(root)?;
            self.remove_child_edge(root, NIL, next_frame);
            self.remove_frame(root);
            self.root = Some(next_frame);
        }
        self.is_valid()
    }

    pub fn is_valid(&self) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut visited = Vec::new();
        self.is_valid_from(root, &mut visited)?;
        invariant(
            self.size() == visited.len(),
            "size() must equal the number of reachable frames",
        )?;
        for id in self.decision_var.keys() {
            invariant(self.frame_exists(*id), format!("{id} in decision_var but missing from frames"))?;
        }
        for id in self.children.keys() {
            invariant(self.frame_exists(*id), format!("{id} in children but missing from frames"))?;
        }
        for id in self.parent.keys() {
            invariant(self.frame_exists(*id), format!("{id} in parent but missing from frames"))?;
        }
        for id in self.parent_option.keys() {
            invariant(self.frame_exists(*id), format!("{id} in parent_option but missing from frames"))?;
        }
        Ok(())
    }

    fn is_valid_from(&self, id: FrameId, visited: &mut Vec<FrameId>) -> Result<()> {
        invariant(!visited.contains(&id), format!("{id} visited twice — not a tree"))?;
        invariant(self.frame_exists(id), format!("{id} does not exist"))?;
        visited.push(id);

        if let Some(parent_id) = self.parent_of(id) {
            let option = self
                .parent_option_of(id)
                .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} has parent but no parent_option")))?;
            let expected = if self.is_decision(parent_id) {
                self.child(parent_id, option)?
            } else {
                self.unique_child(parent_id)?
            };
            invariant(expected == id, format!("parent/child link mismatch at {id}"))?;
        }

        if !self.is_terminal(id) {
            if self.is_decision(id) {
                let dv = self.decision_variable(id)?;
                let children = self.children_of(id).cloned().unwrap_or_default();
                for (option, child_id) in children {
                    invariant(option != NIL, format!("decision frame {id} has a NIL-keyed child"))?;
                    invariant(dv.contains(option), format!("option {option} not in {id}'s domain"))?;
                    self.is_valid_from(child_id, visited)?;
                }
            } else {
                let children = self.children_of(id).cloned().unwrap_or_default();
                invariant(children.len() == 1, format!("non-decision frame {id} must have exactly one child"))?;
                invariant(children.contains_key(&NIL), format!("non-decision frame {id}'s child must be NIL-keyed"))?;
                let child_id = self.unique_child(id)?;
                self.is_valid_from(child_id, visited)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn linear_tree(n: i32) -> FrameTree {
        let mut tree = FrameTree::new();
        tree.add_frame(Frame::new(0));
        tree.set_root(FrameId(0));
        for i in 1..n {
            tree.add_frame(Frame::new(i));
            tree.add_child_edge(FrameId(i - 1), NIL, FrameId(i)).unwrap();
        }
        tree
    }

    #[test]
    fn linear_chain_is_valid() {
        let tree = linear_tree(5);
        tree.is_valid().unwrap();
        assert_eq!(tree.size(), 5);
        assert!(tree.is_terminal(FrameId(4)));
        assert!(!tree.is_terminal(FrameId(0)));
    }

    #[test]
    fn pop_front_on_linear_chain() {
        let mut tree = linear_tree(3);
        tree.pop_front().unwrap();
        assert_eq!(tree.root(), Some(FrameId(1)));
        assert_eq!(tree.size(), 2);
        assert!(!tree.frame_exists(FrameId(0)));
        tree.is_valid().unwrap();
    }

    #[test]
    fn pop_front_on_single_node_clears() {
        let mut tree = linear_tree(1);
        tree.pop_front().unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn decision_node_pop_front_keeps_default_branch_only() {
        let mut tree = FrameTree::new();
        tree.add_frame(Frame::new(0));
        tree.set_root(FrameId(0));
        tree.add_frame(Frame::new(1));
        tree.add_frame(Frame::new(2));
        tree.add_child_edge(FrameId(0), 0, FrameId(1)).unwrap();
        tree.add_child_edge(FrameId(0), 1, FrameId(2)).unwrap();
        tree.set_decision_variable(FrameId(0), DecisionVariable::new(0, vec![0, 1], 1))
            .unwrap();
        tree.is_valid().unwrap();

        tree.pop_front().unwrap();
        assert_eq!(tree.root(), Some(FrameId(2)));
        assert!(!tree.frame_exists(FrameId(1)));
        assert!(!tree.frame_exists(FrameId(0)));
        tree.is_valid().unwrap();
    }

    #[test]
    fn delete_subtree_removes_branch() {
        let mut tree = FrameTree::new();
        tree.add_frame(Frame::new(0));
        tree.set_root(FrameId(0));
        tree.add_frame(Frame::new(1));
        tree.add_child_edge(FrameId(0), NIL, FrameId(1)).unwrap();
        tree.add_frame(Frame::new(2));
        tree.add_child_edge(FrameId(1), NIL, FrameId(2)).unwrap();

        tree.delete_subtree(FrameId(1)).unwrap();
        assert!(!tree.frame_exists(FrameId(1)));
        assert!(!tree.frame_exists(FrameId(2)));
        assert!(tree.is_terminal(FrameId(0)));
        tree.is_valid().unwrap();
    }

    #[test]
    fn attach_subtree_to_terminal_extends_leaf() {
        let mut tree = linear_tree(1);
        let mut sub = FrameTree::new();
        sub.add_frame(Frame::new(0));
        sub.set_root(FrameId(0));
        sub.add_frame(Frame::new(1));
        sub.add_child_edge(FrameId(0), NIL, FrameId(1)).unwrap();

        tree.attach_subtree_to_terminal(&sub, FrameId(0)).unwrap();
        assert!(tree.frame_exists(FrameId(1)));
        assert!(tree.is_terminal(FrameId(1)));
        tree.is_valid().unwrap();
    }

    #[test]
    fn invalid_unknown_child_is_rejected() {
        let tree = linear_tree(1);
        let err = tree.child(FrameId(0), NIL);
        assert!(err.is_err());
    }
}
