//! The seam between the shell and whatever draws the scene.

use std::cell::RefCell;
use std::rc::Rc;

use crate::camera::Camera;
use crate::graph::SceneGraph;

/// Draws the scene graph to a surface.
///
/// The shell calls [`attach`](Renderer::attach) once on construction,
/// [`render`](Renderer::render) once per frame, [`resize`](Renderer::resize)
/// whenever the host reports a new surface size, and
/// [`dispose`](Renderer::dispose) once during teardown.
pub trait Renderer {
    fn attach(&mut self, _width: u32, _height: u32, _background: [f32; 4]) {}

    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, graph: &SceneGraph, camera: &Camera);

    /// Release the surface. No call follows.
    fn dispose(&mut self);
}

/// What a [`HeadlessRenderer`] has been asked to do so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    pub attached: bool,
    pub disposed: bool,
    pub width: u32,
    pub height: u32,
    pub background: [f32; 4],
    pub frames: u64,
    /// Visible nodes under the root in the most recent frame.
    pub visible_nodes: usize,
}

/// A renderer that draws nothing and keeps statistics instead.
///
/// Useful for tests and for running scenes without a window. The statistics
/// are shared, so a clone of [`HeadlessRenderer::stats`] can be kept after the
/// renderer is handed to a shell.
#[derive(Clone, Debug, Default)]
pub struct HeadlessRenderer {
    stats: Rc<RefCell<RenderStats>>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Rc<RefCell<RenderStats>> {
        Rc::clone(&self.stats)
    }
}

/// Count nodes that would be drawn: visible, with every ancestor visible.
fn count_visible(graph: &SceneGraph) -> usize {
    let mut count = 0;
    let mut stack = vec![graph.root()];
    while let Some(node) = stack.pop() {
        if !graph.is_visible(node) {
            continue;
        }
        count += 1;
        stack.extend(graph.children(node));
    }
    count
}

impl Renderer for HeadlessRenderer {
    fn attach(&mut self, width: u32, height: u32, background: [f32; 4]) {
        let mut stats = self.stats.borrow_mut();
        stats.attached = true;
        stats.width = width;
        stats.height = height;
        stats.background = background;
    }

    fn resize(&mut self, width: u32, height: u32) {
        let mut stats = self.stats.borrow_mut();
        stats.width = width;
        stats.height = height;
    }

    fn render(&mut self, graph: &SceneGraph, _camera: &Camera) {
        let mut stats = self.stats.borrow_mut();
        stats.frames += 1;
        stats.visible_nodes = count_visible(graph);
    }

    fn dispose(&mut self) {
        let mut stats = self.stats.borrow_mut();
        stats.disposed = true;
        stats.attached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Transform;

    #[test]
    fn hidden_subtrees_are_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.spawn_child(root, "a", Transform::new());
        graph.spawn_child(a, "a1", Transform::new());
        graph.spawn_child(root, "b", Transform::new());
        assert_eq!(count_visible(&graph), 4);

        graph.set_visible(a, false);
        assert_eq!(count_visible(&graph), 2);
    }

    #[test]
    fn stats_are_shared() {
        let mut renderer = HeadlessRenderer::new();
        let stats = renderer.stats();
        renderer.attach(640, 480, [0.0, 0.0, 0.0, 1.0]);
        renderer.render(&SceneGraph::new(), &Camera::new());
        renderer.resize(800, 600);
        renderer.dispose();

        let stats = stats.borrow();
        assert_eq!(stats.frames, 1);
        assert_eq!((stats.width, stats.height), (800, 600));
        assert!(stats.disposed);
    }
}
