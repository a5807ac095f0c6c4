//! Arena-backed scene graph.
//!
//! Nodes live in a [`SlotMap`] and refer to their parent by key, so a node
//! never owns anything above it. Removal is cooperative: a node is first
//! marked, then erased (with its subtree) by the next [`Scene::cleanup`] of
//! its parent, which always runs before anything is drawn.

use glam::DVec2;
use slotmap::{SlotMap, new_key_type};
use tracing::trace;

use crate::sys::geometry::Rect;
use crate::sys::host::Host;
use crate::ui::animation::AnimatedValue;
use crate::ui::element::{ClickResponse, DrawCx, Element, ElementAction, ElementKind, UpdateCx};

new_key_type! {
    pub struct NodeId;
}

/// State every element carries. `pos`/`size` are the authoritative box and
/// are copied from the animated values on every tick.
#[derive(Debug, Clone)]
pub struct ElementBase {
    pub pos: DVec2,
    pub size: DVec2,
    pub anim_pos: AnimatedValue<DVec2>,
    pub anim_size: AnimatedValue<DVec2>,
    pub alpha: AnimatedValue<f64>,
    pub scale: AnimatedValue<f64>,
    pub hovered: bool,
    marked_for_removal: bool,
}

impl Default for ElementBase {
    fn default() -> Self {
        Self {
            pos: DVec2::ZERO,
            size: DVec2::ZERO,
            anim_pos: AnimatedValue::default(),
            anim_size: AnimatedValue::default(),
            alpha: AnimatedValue::new(1.0),
            scale: AnimatedValue::new(1.0),
            hovered: false,
            marked_for_removal: false,
        }
    }
}

impl ElementBase {
    pub fn tick(&mut self, delta: f64, speed: f64) {
        self.anim_pos.tick(delta, speed);
        self.anim_size.tick(delta, speed);
        self.alpha.tick(delta, speed);
        self.scale.tick(delta, speed);
        self.pos = self.anim_pos.current();
        self.size = self.anim_size.current();
    }

    /// Moves the box without animating.
    pub fn place(&mut self, pos: DVec2, size: DVec2) {
        self.anim_pos.snap(pos);
        self.anim_size.snap(size);
        self.pos = pos;
        self.size = size;
    }

    /// Stops every animation at its current value.
    pub fn freeze(&mut self) {
        self.anim_pos.freeze();
        self.anim_size.freeze();
        self.alpha.freeze();
        self.scale.freeze();
    }

    pub fn bounds(&self) -> Rect { Rect::new(self.pos, self.size) }

    pub fn should_be_removed(&self) -> bool { self.marked_for_removal }
}

#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub base: ElementBase,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickHit {
    pub node: NodeId,
    pub action: Option<ElementAction>,
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
}

impl Scene {
    pub fn new() -> Self { Self::default() }

    /// Appends a node after its parent's existing children.
    pub fn insert(&mut self, parent: Option<NodeId>, kind: impl Into<ElementKind>) -> NodeId {
        let id = self.nodes.insert(Node {
            parent,
            children: Vec::new(),
            base: ElementBase::default(),
            kind: kind.into(),
        });
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn base(&self, id: NodeId) -> Option<&ElementBase> { self.nodes.get(id).map(|n| &n.base) }

    pub fn base_mut(&mut self, id: NodeId) -> Option<&mut ElementBase> {
        self.nodes.get_mut(id).map(|n| &mut n.base)
    }

    pub fn kind(&self, id: NodeId) -> Option<&ElementKind> { self.nodes.get(id).map(|n| &n.kind) }

    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut ElementKind> {
        self.nodes.get_mut(id).map(|n| &mut n.kind)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn freeze_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.base.freeze();
        }
    }

    pub fn mark_for_removal(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.base.marked_for_removal = true;
        }
    }

    pub fn should_be_removed(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_none_or(|n| n.base.marked_for_removal)
    }

    /// Advances the node's own animations.
    pub fn tick_node(&mut self, id: NodeId, cx: &mut UpdateCx<'_>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind.update(&mut node.base, cx);
        }
    }

    /// Erases removed children, then updates the survivors in stored order.
    pub fn update_children(&mut self, id: NodeId, cx: &mut UpdateCx<'_>) {
        self.cleanup(id, cx.host);
        for child in self.children(id).to_vec() {
            self.update(child, cx);
        }
    }

    pub fn update(&mut self, id: NodeId, cx: &mut UpdateCx<'_>) {
        self.tick_node(id, cx);
        if self.nodes.get(id).is_some_and(|n| n.kind.is_container()) {
            self.update_children(id, cx);
        }
    }

    /// Erases every marked child of `id`, compacting nested containers first.
    pub fn cleanup(&mut self, id: NodeId, host: &mut dyn Host) {
        for child in self.children(id).to_vec() {
            if self.nodes.get(child).is_some_and(|n| n.kind.is_container()) {
                self.cleanup(child, host);
            }
            if self.should_be_removed(child) {
                self.remove_subtree(child, host);
            }
        }
    }

    /// Detaches `id` from its parent and erases it with all descendants,
    /// releasing their host resources.
    pub fn remove_subtree(&mut self, id: NodeId, host: &mut dyn Host) {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
            return;
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(mut node) = self.nodes.remove(next) {
                trace!(node = %node.kind.describe(), "erasing");
                node.kind.release(host);
                stack.extend(node.children);
            }
        }
    }

    pub fn draw(&self, id: NodeId, offset: DVec2, cx: &mut DrawCx<'_>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if let ElementKind::Container(container) = &node.kind {
            let child_offset = container.child_offset(&node.base, offset);
            for child in &node.children {
                self.draw(*child, child_offset, cx);
            }
        } else {
            node.kind.draw(&node.base, offset, self.alpha_abs(id), cx);
        }
    }

    /// Own opacity multiplied by every ancestor's.
    pub fn alpha_abs(&self, id: NodeId) -> f64 {
        let mut alpha = 1.0;
        let mut cursor = Some(id);
        while let Some(node) = cursor.and_then(|c| self.nodes.get(c)) {
            alpha *= node.base.alpha.current();
            cursor = node.parent;
        }
        alpha
    }

    /// Top-left corner with every ancestor's position added in.
    pub fn absolute_pos(&self, id: NodeId) -> DVec2 {
        let mut pos = DVec2::ZERO;
        let mut cursor = Some(id);
        while let Some(node) = cursor.and_then(|c| self.nodes.get(c)) {
            pos += node.base.pos;
            cursor = node.parent;
        }
        pos
    }

    pub fn absolute_bounds(&self, id: NodeId) -> Rect {
        let size = self.base(id).map(|b| b.size).unwrap_or_default();
        Rect::new(self.absolute_pos(id), size)
    }

    /// Recomputes hover for `id` and its subtree. The hover hook fires only
    /// when the state flips. Returns whether anything in the subtree is
    /// hovered.
    pub fn on_mouse_move(&mut self, id: NodeId, point: DVec2) -> bool {
        let mut any_child = false;
        for child in self.children(id).to_vec() {
            any_child |= self.on_mouse_move(child, point);
        }
        let over = self.absolute_bounds(id).contains_point(point);
        let Some(node) = self.nodes.get_mut(id) else {
            return any_child;
        };
        if node.base.hovered != over {
            node.base.hovered = over;
            node.kind.on_hover_changed(&mut node.base);
        }
        any_child || over
    }

    /// Resolves a click topmost-first: children in reverse order, then the
    /// node itself.
    pub fn on_mouse_click(&mut self, id: NodeId, point: DVec2) -> Option<ClickHit> {
        for child in self.children(id).iter().rev().copied().collect::<Vec<_>>() {
            if self.should_be_removed(child) {
                continue;
            }
            if let Some(hit) = self.on_mouse_click(child, point) {
                return Some(hit);
            }
        }
        if !self.absolute_bounds(id).contains_point(point) {
            return None;
        }
        let node = self.nodes.get_mut(id)?;
        match node.kind.on_click() {
            ClickResponse::Ignored => None,
            ClickResponse::Hit => Some(ClickHit { node: id, action: None }),
            ClickResponse::Action(action) => Some(ClickHit { node: id, action: Some(action) }),
        }
    }

    pub fn debug_tree(&self, id: NodeId) -> ascii_tree::Tree {
        let Some(node) = self.nodes.get(id) else {
            return ascii_tree::Tree::Leaf(vec!["<erased>".to_string()]);
        };
        let b = &node.base;
        let label = format!(
            "{} @ ({:.0}, {:.0}) {:.0}x{:.0} alpha={:.2}{}",
            node.kind.describe(),
            b.pos.x,
            b.pos.y,
            b.size.x,
            b.size.y,
            b.alpha.current(),
            if b.marked_for_removal { " [removed]" } else { "" },
        );
        if node.kind.is_container() {
            let children = node.children.iter().map(|c| self.debug_tree(*c)).collect();
            ascii_tree::Tree::Node(label, children)
        } else {
            ascii_tree::Tree::Leaf(vec![label])
        }
    }

    pub fn render_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &self.debug_tree(id)).is_err() {
            out.push_str("<unprintable>");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::CarouselSettings;
    use crate::sys::headless::HeadlessHost;
    use crate::ui::button::Button;
    use crate::ui::element::Container;
    use crate::ui::style::Style;

    fn update(scene: &mut Scene, root: NodeId, host: &mut HeadlessHost, delta: f64) {
        let style = Style::from_settings(&CarouselSettings::default());
        let mut cx = UpdateCx { delta, speed: 1.0, host, style: &style };
        scene.update(root, &mut cx);
    }

    fn place(scene: &mut Scene, id: NodeId, x: f64, y: f64, w: f64, h: f64) {
        scene.base_mut(id).unwrap().place(DVec2::new(x, y), DVec2::new(w, h));
    }

    #[test]
    fn alpha_multiplies_up_the_chain() {
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        let mid = scene.insert(Some(root), Container::new("mid"));
        let leaf = scene.insert(Some(mid), Container::new("leaf"));
        scene.base_mut(root).unwrap().alpha.snap(0.5);
        scene.base_mut(mid).unwrap().alpha.snap(0.5);
        scene.base_mut(leaf).unwrap().alpha.snap(0.8);
        assert_eq!(scene.alpha_abs(leaf), 0.2);
    }

    #[test]
    fn cleanup_erases_marked_subtrees_before_draw() {
        let mut host = HeadlessHost::new();
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        let keep = scene.insert(Some(root), Container::new("keep"));
        let doomed = scene.insert(Some(root), Container::new("doomed"));
        let grandchild = scene.insert(Some(doomed), Container::new("grandchild"));
        let nested = scene.insert(Some(keep), Container::new("nested"));
        scene.mark_for_removal(doomed);
        scene.mark_for_removal(nested);

        update(&mut scene, root, &mut host, 0.016);

        assert_eq!(scene.children(root), &[keep]);
        assert!(scene.children(keep).is_empty());
        assert!(!scene.contains(doomed));
        assert!(!scene.contains(grandchild));
        assert!(!scene.contains(nested));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn click_resolves_in_absolute_coordinates() {
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        let child = scene.insert(Some(root), Container::new("child"));
        place(&mut scene, root, 100.0, 100.0, 200.0, 200.0);
        place(&mut scene, child, 10.0, 10.0, 50.0, 50.0);

        let hit = scene.on_mouse_click(root, DVec2::new(120.0, 120.0)).unwrap();
        assert_eq!(hit.node, child);
        // Inside the child's local box but not its absolute one.
        let hit = scene.on_mouse_click(root, DVec2::new(105.0, 105.0)).unwrap();
        assert_eq!(hit.node, root);
        assert_eq!(scene.on_mouse_click(root, DVec2::new(20.0, 20.0)), None);
    }

    #[test]
    fn topmost_child_wins() {
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        let below = scene.insert(Some(root), Container::new("below"));
        let above = scene.insert(Some(root), Container::new("above"));
        place(&mut scene, root, 0.0, 0.0, 100.0, 100.0);
        place(&mut scene, below, 0.0, 0.0, 50.0, 50.0);
        place(&mut scene, above, 0.0, 0.0, 50.0, 50.0);
        assert_eq!(scene.on_mouse_click(root, DVec2::new(10.0, 10.0)).unwrap().node, above);
    }

    #[test]
    fn hover_fires_on_edges_only() {
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        let button = scene.insert(Some(root), Button::new(crate::common::color::Color::WHITE, None));
        place(&mut scene, root, 0.0, 0.0, 100.0, 100.0);
        place(&mut scene, button, 10.0, 10.0, 20.0, 20.0);

        assert!(scene.on_mouse_move(root, DVec2::new(15.0, 15.0)));
        let base = scene.base(button).unwrap();
        assert!(base.hovered);
        assert_eq!(base.scale.target(), 1.1);
        assert_eq!(base.alpha.target(), 1.0);

        scene.base_mut(button).unwrap().scale.snap(1.0);
        scene.on_mouse_move(root, DVec2::new(16.0, 16.0));
        // Still hovered, so the hook must not run again.
        assert_eq!(scene.base(button).unwrap().scale.target(), 1.0);

        scene.on_mouse_move(root, DVec2::new(90.0, 90.0));
        let base = scene.base(button).unwrap();
        assert!(!base.hovered);
        assert_eq!(base.alpha.target(), 0.8);
    }

    #[test]
    fn debug_tree_lists_children() {
        let mut scene = Scene::new();
        let root = scene.insert(None, Container::new("root"));
        scene.insert(Some(root), Container::new("child"));
        let text = scene.render_tree(root);
        assert!(text.contains("root"));
        assert!(text.contains("child"));
    }
}
