//! Graph-node capability.
//!
//! A controller is also a node in a larger media routing graph (video
//! widgets, audio outputs, effects). Downstream nodes attach here and are told
//! about video availability, state changes and pointer hover.

use bridge_traits::PlaybackState;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    VideoAvailable,
    StateChanged(PlaybackState),
    VideoMouseOver(bool),
}

/// Receives notifications from the controller it is attached to.
pub trait GraphNode: Send + Sync {
    fn on_node_event(&self, event: &NodeEvent);
}

/// Downstream nodes attached to one controller.
#[derive(Default)]
pub struct GraphLinks {
    nodes: Vec<Arc<dyn GraphNode>>,
    linked: bool,
}

impl GraphLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, node: Arc<dyn GraphNode>) {
        self.nodes.push(node);
    }

    pub fn notify(&self, event: NodeEvent) {
        for node in &self.nodes {
            node.on_node_event(&event);
        }
    }

    /// Marks the graph as fully connected after loading completed.
    pub fn link(&mut self) {
        self.linked = true;
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for GraphLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphLinks")
            .field("nodes", &self.nodes.len())
            .field("linked", &self.linked)
            .finish()
    }
}
