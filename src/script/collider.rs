//! Trigger-style box collider.
//!
//! [`BoxCollider`] keeps a world-space bounding box of its node's subtree and
//! reports enter/stay/exit transitions against another collider's box. The
//! box is built in `created`, refreshed every `render`, and outlined by a
//! helper node when debug visuals are enabled.

use crate::graph::{Aabb, NodeId, SceneGraph};

use super::{Behavior, ScriptBase};

/// Contact phase after the most recent [`BoxCollider::intersects`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Contact {
    #[default]
    None,
    Enter,
    Stay,
    Exit,
}

pub struct BoxCollider {
    base: ScriptBase,
    aabb: Option<Aabb>,
    helper: Option<NodeId>,
    contact: Contact,
}

impl BoxCollider {
    pub fn new(node: NodeId) -> Self {
        Self {
            base: ScriptBase::new(node),
            aabb: None,
            helper: None,
            contact: Contact::None,
        }
    }

    /// Current world-space box, once `created` has run.
    pub fn aabb(&self) -> Option<Aabb> {
        self.aabb
    }

    /// The debug helper node, once `debug_visual` has run.
    pub fn helper(&self) -> Option<NodeId> {
        self.helper
    }

    pub fn contact(&self) -> Contact {
        self.contact
    }

    fn measure(&self, graph: &SceneGraph) -> Aabb {
        graph.world_bounds(self.base.node()).unwrap_or_default()
    }

    /// Advance the contact phase against `other`'s box.
    ///
    /// Does nothing when either box is missing.
    pub fn intersects(&mut self, other: Option<Aabb>) {
        let (Some(mine), Some(other)) = (self.aabb, other) else {
            return;
        };
        let touching = mine.intersects(&other);
        self.contact = match (touching, self.contact) {
            (false, Contact::Enter | Contact::Stay) => Contact::Exit,
            (false, _) => Contact::None,
            (true, Contact::Enter | Contact::Stay) => Contact::Stay,
            (true, _) => Contact::Enter,
        };
    }

    pub fn trigger_enter(&self) -> bool {
        self.contact == Contact::Enter && !self.base.is_frozen()
    }

    pub fn trigger_stay(&self) -> bool {
        self.contact == Contact::Stay && !self.base.is_frozen()
    }

    pub fn trigger_exit(&self) -> bool {
        self.contact == Contact::Exit && !self.base.is_frozen()
    }

    pub fn toggle_helper(&self, graph: &mut SceneGraph, visible: bool) {
        if let Some(helper) = self.helper {
            graph.set_visible(helper, visible);
        }
    }

    /// Detach the helper from the tree.
    pub fn remove_helper(&self, graph: &mut SceneGraph) {
        if let Some(helper) = self.helper {
            graph.detach(helper);
        }
    }
}

impl Behavior for BoxCollider {
    fn base(&self) -> &ScriptBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScriptBase {
        &mut self.base
    }

    fn created(&mut self, graph: &mut SceneGraph) {
        self.aabb = Some(self.measure(graph));
    }

    fn render(&mut self, graph: &mut SceneGraph, _time: f32, _dt: f32) {
        if self.aabb.is_none() {
            return;
        }
        let aabb = self.measure(graph);
        self.aabb = Some(aabb);
        if let Some(helper) = self.helper {
            graph.set_bounds_helper(helper, aabb);
        }
    }

    fn debug_visual(&mut self, graph: &mut SceneGraph) {
        let Some(aabb) = self.aabb else {
            return;
        };
        if self.helper.is_some() {
            return;
        }
        let name = format!(
            "{}-box-helper",
            graph.name(self.base.node()).unwrap_or_default()
        );
        let root = graph.root();
        self.helper = Some(graph.spawn_bounds_helper(root, name, aabb));
    }
}
