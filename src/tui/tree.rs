use std::collections::HashMap;

use crossterm::style::Color;
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, trace, warn};

use crate::error::TreeError;
use crate::tui::geometry::{Point, Size};
use crate::tui::signal::{Handler, Signal, SubscriptionId};
use crate::tui::terminal_buffer::TerminalBuffer;
use crate::tui::{AsAny, Control, ControlState, Result};

new_key_type! {
    /// Handle to a control stored in a [`ControlTree`].
    pub struct ControlId;
}

/// One entry of a container's child collection.
///
/// The relay subscription lives exactly as long as the entry.
#[derive(Debug, Clone, Copy)]
struct Membership {
    control: ControlId,
    relay: SubscriptionId,
}

/// Ordered children of a container. Order is z-order: last is front-most.
#[derive(Debug, Default)]
struct Container {
    controls: Vec<Membership>,
}

impl Container {
    fn position(&self, control: ControlId) -> Option<usize> {
        self.controls.iter().position(|m| m.control == control)
    }
}

enum ControlNode {
    Leaf(Box<dyn Control>),
    Container(Container),
}

struct Node {
    kind: ControlNode,
    state: ControlState,
    /// Back-reference only. Written by membership operations, never by callers.
    parent: Option<ControlId>,
    invalidated: Signal,
}

impl Node {
    fn new(kind: ControlNode, state: ControlState) -> Self {
        Self {
            kind,
            state,
            parent: None,
            invalidated: Signal::default(),
        }
    }

    fn name(&self) -> &'static str {
        match &self.kind {
            ControlNode::Leaf(control) => control.name(),
            ControlNode::Container(_) => "container",
        }
    }
}

/// Arena holding every control, attached or not.
///
/// Containers own their children through their membership list; a child's
/// parent is a plain handle kept in step with that list. Invalidation raised
/// on any control runs its callbacks and walks relays up to the root.
#[derive(Default)]
pub struct ControlTree {
    nodes: SlotMap<ControlId, Node>,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unattached leaf control.
    pub fn create_control<C: Control + 'static>(
        &mut self,
        control: C,
        state: ControlState,
    ) -> ControlId {
        self.create_boxed(Box::new(control), state)
    }

    pub fn create_boxed(&mut self, control: Box<dyn Control>, state: ControlState) -> ControlId {
        let id = self
            .nodes
            .insert(Node::new(ControlNode::Leaf(control), state));
        debug!("create_control id={:?} size={:?}", id, state.size);
        id
    }

    /// Create an unattached, empty container.
    pub fn create_container(&mut self, state: ControlState) -> ControlId {
        let id = self
            .nodes
            .insert(Node::new(ControlNode::Container(Container::default()), state));
        debug!("create_container id={:?} size={:?}", id, state.size);
        id
    }

    /// Drop an unattached control and, for a container, its whole subtree.
    pub fn destroy(&mut self, id: ControlId) -> Result<()> {
        let node = self.node(id)?;
        if node.parent.is_some() {
            return Err(TreeError::StillAttached(id));
        }

        let mut pending = vec![id];
        let mut dropped = 0usize;
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                if let ControlNode::Container(container) = node.kind {
                    pending.extend(container.controls.iter().map(|m| m.control));
                }
                dropped += 1;
            }
        }
        debug!("destroy id={:?} dropped={}", id, dropped);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn exists(&self, id: ControlId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_container(&self, id: ControlId) -> bool {
        matches!(
            self.nodes.get(id).map(|node| &node.kind),
            Some(ControlNode::Container(_))
        )
    }

    fn node(&self, id: ControlId) -> Result<&Node> {
        self.nodes.get(id).ok_or(TreeError::UnknownControl(id))
    }

    fn node_mut(&mut self, id: ControlId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(TreeError::UnknownControl(id))
    }

    fn container(&self, id: ControlId) -> Result<&Container> {
        match &self.node(id)?.kind {
            ControlNode::Container(container) => Ok(container),
            ControlNode::Leaf(_) => Err(TreeError::NotAContainer(id)),
        }
    }

    fn container_mut(&mut self, id: ControlId) -> Result<&mut Container> {
        match &mut self.node_mut(id)?.kind {
            ControlNode::Container(container) => Ok(container),
            ControlNode::Leaf(_) => Err(TreeError::NotAContainer(id)),
        }
    }

    // -- membership --

    /// Children of `container` in z-order.
    pub fn controls(&self, container: ControlId) -> Result<Vec<ControlId>> {
        Ok(self
            .container(container)?
            .controls
            .iter()
            .map(|m| m.control)
            .collect())
    }

    pub fn contains(&self, container: ControlId, control: ControlId) -> Result<bool> {
        Ok(self.container(container)?.position(control).is_some())
    }

    pub fn parent(&self, id: ControlId) -> Result<Option<ControlId>> {
        Ok(self.node(id)?.parent)
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: ControlId) -> Result<Vec<ControlId>> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent)?.parent;
        }
        Ok(chain)
    }

    fn is_ancestor_or_self(&self, candidate: ControlId, of: ControlId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes.get(id).and_then(|node| node.parent);
        }
        false
    }

    /// Append `control` to `container`, making it the front-most child.
    pub fn add(&mut self, container: ControlId, control: ControlId) -> Result<()> {
        self.attach(container, None, control)
    }

    /// Insert `control` at `index` in `container`'s z-order.
    pub fn insert(
        &mut self,
        container: ControlId,
        index: usize,
        control: ControlId,
    ) -> Result<()> {
        self.attach(container, Some(index), control)
    }

    fn attach(
        &mut self,
        container: ControlId,
        index: Option<usize>,
        control: ControlId,
    ) -> Result<()> {
        let len = self.container(container)?.controls.len();
        let child = self.node(control)?;

        if let Some(parent) = child.parent {
            if parent == container {
                return Err(TreeError::AlreadyMember { container, control });
            }
            return Err(TreeError::AlreadyParented { control, parent });
        }
        if self.container(container)?.position(control).is_some() {
            return Err(TreeError::AlreadyMember { container, control });
        }
        if self.is_ancestor_or_self(control, container) {
            return Err(TreeError::WouldCycle { container, control });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }

        let child = self.node_mut(control)?;
        let relay = child.invalidated.subscribe(Handler::Relay(container));
        child.parent = Some(container);
        self.container_mut(container)?
            .controls
            .insert(index, Membership { control, relay });

        debug!(
            "add container={:?} control={:?} index={}",
            container, control, index
        );
        self.raise(container);
        Ok(())
    }

    /// Detach `control` from `container`. The control stays alive, unattached.
    pub fn remove(&mut self, container: ControlId, control: ControlId) -> Result<()> {
        let members = self.container_mut(container)?;
        let index = members
            .position(control)
            .ok_or(TreeError::NotAMember { container, control })?;
        let membership = members.controls.remove(index);
        self.release(membership);

        debug!(
            "remove container={:?} control={:?} index={}",
            container, control, index
        );
        self.raise(container);
        Ok(())
    }

    /// Detach every child of `container`. Returns how many were removed.
    ///
    /// Invalidation is raised once, and only if something was removed.
    pub fn clear(&mut self, container: ControlId) -> Result<usize> {
        let drained: Vec<Membership> = self
            .container_mut(container)?
            .controls
            .drain(..)
            .collect();
        let removed = drained.len();
        for membership in drained {
            self.release(membership);
        }

        debug!("clear container={:?} removed={}", container, removed);
        if removed > 0 {
            self.raise(container);
        }
        Ok(removed)
    }

    /// Move the child at `from` to `to` in `container`'s z-order.
    pub fn move_control(&mut self, container: ControlId, from: usize, to: usize) -> Result<()> {
        let members = self.container_mut(container)?;
        let len = members.controls.len();
        for index in [from, to] {
            if index >= len {
                return Err(TreeError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let membership = members.controls.remove(from);
        members.controls.insert(to, membership);
        debug!(
            "move container={:?} control={:?} from={} to={}",
            container, membership.control, from, to
        );
        self.raise(container);
        Ok(())
    }

    /// Undo what `attach` did to the child side of a membership.
    fn release(&mut self, membership: Membership) {
        match self.nodes.get_mut(membership.control) {
            Some(child) => {
                child.parent = None;
                if child.invalidated.unsubscribe(membership.relay).is_none() {
                    warn!("relay for {:?} was already gone", membership.control);
                }
            }
            None => warn!("released member {:?} no longer exists", membership.control),
        }
    }

    // -- attributes --

    pub fn state(&self, id: ControlId) -> Result<&ControlState> {
        Ok(&self.node(id)?.state)
    }

    /// Apply `change` to the state of `id`, raising invalidation if it differs.
    fn set_state(
        &mut self,
        id: ControlId,
        change: impl FnOnce(&mut ControlState),
    ) -> Result<bool> {
        let node = self.node_mut(id)?;
        let before = node.state;
        change(&mut node.state);
        let changed = node.state != before;
        if changed {
            self.raise(id);
        }
        Ok(changed)
    }

    pub fn set_size(&mut self, id: ControlId, size: Size) -> Result<bool> {
        self.set_state(id, |state| state.size = size)
    }

    pub fn set_location(&mut self, id: ControlId, location: Point) -> Result<bool> {
        self.set_state(id, |state| state.location = location)
    }

    pub fn set_visible(&mut self, id: ControlId, visible: bool) -> Result<bool> {
        self.set_state(id, |state| state.visible = visible)
    }

    pub fn set_background(&mut self, id: ControlId, color: Color) -> Result<bool> {
        self.set_state(id, |state| state.background = color)
    }

    pub fn set_foreground(&mut self, id: ControlId, color: Color) -> Result<bool> {
        self.set_state(id, |state| state.foreground = color)
    }

    /// Borrow the concrete widget behind a leaf control.
    pub fn widget<T: Control + 'static>(&self, id: ControlId) -> Result<&T> {
        match &self.node(id)?.kind {
            ControlNode::Leaf(control) => AsAny::as_any(&**control)
                .downcast_ref::<T>()
                .ok_or(TreeError::WrongControlType(id)),
            ControlNode::Container(_) => Err(TreeError::WrongControlType(id)),
        }
    }

    /// Mutate the concrete widget behind a leaf control, then invalidate it.
    pub fn update<T, R>(&mut self, id: ControlId, f: impl FnOnce(&mut T) -> R) -> Result<R>
    where
        T: Control + 'static,
    {
        let widget = match &mut self.node_mut(id)?.kind {
            ControlNode::Leaf(control) => AsAny::as_any_mut(&mut **control)
                .downcast_mut::<T>()
                .ok_or(TreeError::WrongControlType(id))?,
            ControlNode::Container(_) => return Err(TreeError::WrongControlType(id)),
        };
        let result = f(widget);
        self.raise(id);
        Ok(result)
    }

    // -- invalidation --

    /// Listen for invalidation of `id` and of everything below it.
    pub fn subscribe(
        &mut self,
        id: ControlId,
        callback: impl FnMut() + 'static,
    ) -> Result<SubscriptionId> {
        let node = self.node_mut(id)?;
        Ok(node.invalidated.subscribe(Handler::Callback(Box::new(callback))))
    }

    /// Drop a subscription made with [`subscribe`](Self::subscribe).
    ///
    /// Relay subscriptions belong to membership and cannot be removed here.
    pub fn unsubscribe(&mut self, id: ControlId, subscription: SubscriptionId) -> Result<()> {
        let node = self.node_mut(id)?;
        let not_found = TreeError::UnknownSubscription {
            control: id,
            subscription,
        };
        if !node.invalidated.contains(subscription)
            || node.invalidated.relay_target(subscription).is_some()
        {
            return Err(not_found);
        }
        node.invalidated.unsubscribe(subscription);
        Ok(())
    }

    /// Handlers on `id`, relays included.
    pub fn subscriber_count(&self, id: ControlId) -> Result<usize> {
        Ok(self.node(id)?.invalidated.len())
    }

    /// Raise invalidation on `id` explicitly.
    pub fn invalidate(&mut self, id: ControlId) -> Result<()> {
        self.node(id)?;
        self.raise(id);
        Ok(())
    }

    fn raise(&mut self, id: ControlId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            trace!("invalidated id={:?}", current);
            node.invalidated.raise(&mut pending);
        }
    }

    // -- rendering --

    /// Allocate a buffer the size of `id` and render into it.
    pub fn render_to_buffer(&self, id: ControlId) -> Result<TerminalBuffer> {
        let mut buffer = TerminalBuffer::new(self.node(id)?.state.size);
        self.render(id, &mut buffer)?;
        Ok(buffer)
    }

    /// Render `id` into `buffer`, which must be exactly the control's size.
    pub fn render(&self, id: ControlId, buffer: &mut TerminalBuffer) -> Result<()> {
        let node = self.node(id)?;
        if buffer.size() != node.state.size {
            return Err(TreeError::BufferSize {
                control: id,
                expected: node.state.size,
                actual: buffer.size(),
            });
        }
        self.render_node(id, node, buffer)
    }

    fn render_node(
        &self,
        id: ControlId,
        node: &Node,
        buffer: &mut TerminalBuffer,
    ) -> Result<()> {
        debug!(
            "render_node id={:?} kind={} at=({},{}) {}x{}",
            id,
            node.name(),
            node.state.location.x,
            node.state.location.y,
            node.state.size.width,
            node.state.size.height
        );

        buffer.set_drawing_colors(node.state.background, node.state.foreground);

        let container = match &node.kind {
            ControlNode::Leaf(control) => {
                control.render(&node.state, buffer);
                return Ok(());
            }
            ControlNode::Container(container) => container,
        };

        buffer.draw_rectangle(' ', Point::ORIGIN, node.state.size, true);
        if !node.state.visible {
            return Ok(());
        }

        for membership in &container.controls {
            let child = self.node(membership.control)?;
            if !child.state.visible {
                continue;
            }
            let mut local = TerminalBuffer::new(child.state.size);
            self.render_node(membership.control, child, &mut local)?;
            buffer.merge(&local, child.state.location);
        }
        Ok(())
    }

    // -- invariants --

    /// Check that parent handles, membership lists and relays agree.
    pub fn validate(&self) -> Result<()> {
        let mut owner: HashMap<ControlId, ControlId> = HashMap::new();

        for (id, node) in &self.nodes {
            let ControlNode::Container(container) = &node.kind else {
                continue;
            };
            for membership in &container.controls {
                let child = self.node(membership.control)?;
                if child.parent != Some(id) {
                    return Err(TreeError::InconsistentParent {
                        control: membership.control,
                        recorded: child.parent,
                        actual: Some(id),
                    });
                }
                if let Some(previous) = owner.insert(membership.control, id) {
                    return Err(TreeError::InconsistentParent {
                        control: membership.control,
                        recorded: Some(previous),
                        actual: Some(id),
                    });
                }
                if child.invalidated.relay_target(membership.relay) != Some(id) {
                    return Err(TreeError::MissingRelay {
                        container: id,
                        control: membership.control,
                    });
                }
            }
        }

        for (id, node) in &self.nodes {
            let relays = node.invalidated.relay_count();
            match node.parent {
                Some(parent) => {
                    if owner.get(&id) != Some(&parent) {
                        return Err(TreeError::InconsistentParent {
                            control: id,
                            recorded: Some(parent),
                            actual: owner.get(&id).copied(),
                        });
                    }
                    if relays != 1 {
                        return Err(TreeError::MissingRelay {
                            container: parent,
                            control: id,
                        });
                    }
                }
                None if relays > 0 => return Err(TreeError::StrayRelay(id)),
                None => {}
            }
        }
        Ok(())
    }
}
