//! Arena for the upstream game-state process. Structurally the same shape
//! as [`crate::frame_tree::FrameTree`] but without parent back-pointers —
//! nothing in the planner walks this tree upward, only the frame tree does.

use std::collections::HashMap;
use std::fmt;

use crate::decision::{DecisionVariable, NIL};
use crate::error::{Result, SpicompError};
use crate::game::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameStateId(pub i32);

impl fmt::Display for GameStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameState{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameStateTree {
    root: Option<GameStateId>,
    states: HashMap<GameStateId, GameState>,
    decision_var: HashMap<GameStateId, DecisionVariable>,
    children: HashMap<GameStateId, HashMap<i32, GameStateId>>,
}

impl GameStateTree {
    pub fn new() -> Self {
        GameStateTree::default()
    }

    pub fn clear(&mut self) {
        *self = GameStateTree::default();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn size(&self) -> usize {
        self.states.len()
    }

    pub fn root(&self) -> Option<GameStateId> {
        self.root
    }

    pub fn set_root(&mut self, id: GameStateId) {
        self.root = Some(id);
    }

    pub fn state_exists(&self, id: GameStateId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn state(&self, id: GameStateId) -> Result<&GameState> {
        self.states
            .get(&id)
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} does not exist")))
    }

    pub fn root_state(&self) -> Option<&GameState> {
        self.root.and_then(|id| self.states.get(&id))
    }

    pub fn is_decision(&self, id: GameStateId) -> bool {
        self.decision_var.contains_key(&id)
    }

    pub fn decision_variable(&self, id: GameStateId) -> Result<&DecisionVariable> {
        self.decision_var
            .get(&id)
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} has no decision variable")))
    }

    pub fn is_terminal(&self, id: GameStateId) -> bool {
        !self.children.contains_key(&id)
    }

    pub fn children_of(&self, id: GameStateId) -> Option<&HashMap<i32, GameStateId>> {
        self.children.get(&id)
    }

    pub fn child(&self, id: GameStateId, option: i32) -> Result<GameStateId> {
        self.children
            .get(&id)
            .and_then(|map| map.get(&option))
            .copied()
            .ok_or_else(|| SpicompError::InvariantViolation(format!("{id} has no child for option {option}")))
    }

    pub fn unique_child(&self, id: GameStateId) -> Result<GameStateId> {
        self.child(id, NIL)
    }

    /// All currently-terminal states, in ascending id order (stable for
    /// deterministic iteration by `GameController::get_new_frame_trees`).
    pub fn terminal_states(&self) -> Vec<GameStateId> {
        let mut terminals: Vec<GameStateId> =
            self.states.keys().copied().filter(|id| self.is_terminal(*id)).collect();
        terminals.sort();
        terminals
    }

    pub fn add_state(&mut self, state: GameState) -> GameStateId {
        let id = GameStateId(state.id);
        self.states.insert(id, state);
        id
    }

    pub fn add_child_edge(&mut self, parent: GameStateId, option: i32, child: GameStateId) -> Result<()> {
        if !self.state_exists(parent) {
            return Err(SpicompError::InvariantViolation(format!("{parent} does not exist")));
        }
        if !self.state_exists(child) {
            return Err(SpicompError::InvariantViolation(format!("{child} does not exist")));
        }
        self.children.entry(parent).or_default().insert(option, child);
        Ok(())
    }

    pub fn set_decision_variable(&mut self, id: GameStateId, dv: DecisionVariable) -> Result<()> {
        if !self.state_exists(id) {
            return Err(SpicompError::InvariantViolation(format!("{id} does not exist")));
        }
        self.decision_var.insert(id, dv);
        Ok(())
    }

    pub fn delete_subtree(&mut self, id: GameStateId) -> Result<()> {
        if !self.state_exists(id) {
            return Err(SpicompError::InvariantViolation(format!("{id} does not exist")));
        }
        if self.root == Some(id) {
            self.clear();
            return Ok(());
        }
        if !self.is_terminal(id) {
            let children: Vec<GameStateId> = self
                .children_of(id)
                .map(|map| map.values().copied().collect())
                .unwrap_or_default();
            for child_id in children {
                self.delete_subtree(child_id)?;
            }
        }
        self.children.remove(&id);
        self.decision_var.remove(&id);
        self.states.remove(&id);
        Ok(())
    }

    /// Mirrors [`crate::frame_tree::FrameTree::pop_front`]: keep only the
    /// default-option branch at a decision root.
    pub fn pop_front(&mut self) -> Result<()> {
        let root = self.root.ok_or_else(|| SpicompError::InvariantViolation("cannot pop_front an empty tree".into()))?;
        if self.size() == 1 {
            self.clear();
            return Ok(());
        }
        if self.is_decision(root) {
            let dv = self.decision_variable(root)?.clone();
            let default_option = dv.default_option();
            let next = self.child(root, default_option)?;
            for option in dv.domain() {
                if *option != default_option {
                    let discard = self.child(root, *option)?;
                    self.delete_subtree(discard)?;
                }
            }
            self.children.remove(&root);
            self.decision_var.remove(&root);
            self.states.remove(&root);
            self.root = Some(next);
        } else {
            let next = self.unique_child(root)?;
            self.children.remove(&root);
            self.states.remove(&root);
            self.root = Some(next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;

    #[test]
    fn pop_front_on_linear_chain() {
        let mut tree = GameStateTree::new();
        tree.add_state(GameState::initial(0));
        tree.set_root(GameStateId(0));
        tree.add_state(GameState::initial(1));
        tree.add_child_edge(GameStateId(0), NIL, GameStateId(1)).unwrap();

        tree.pop_front().unwrap();
        assert_eq!(tree.root(), Some(GameStateId(1)));
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn terminal_states_are_sorted() {
        let mut tree = GameStateTree::new();
        tree.add_state(GameState::initial(0));
        tree.set_root(GameStateId(0));
        tree.add_state(GameState::initial(2));
        tree.add_state(GameState::initial(1));
        tree.add_child_edge(GameStateId(0), 0, GameStateId(2)).unwrap();
        tree.add_child_edge(GameStateId(0), 1, GameStateId(1)).unwrap();
        tree.set_decision_variable(GameStateId(0), DecisionVariable::new(0, vec![0, 1], 1))
            .unwrap();
        assert_eq!(tree.terminal_states(), vec![GameStateId(1), GameStateId(2)]);
    }
}
