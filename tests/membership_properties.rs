//! Random membership edits must keep parent handles, child lists and relay
//! subscriptions in agreement, and must leave no trace when they fail.

use std::cell::Cell;
use std::rc::Rc;

use celltree::tui::block::Block;
use celltree::{ControlId, ControlState, ControlTree, Size};
use proptest::prelude::*;

const CONTAINERS: usize = 3;
const LEAVES: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Add { container: usize, control: usize },
    Insert { container: usize, index: usize, control: usize },
    Remove { container: usize, control: usize },
    Clear { container: usize },
    Move { container: usize, from: usize, to: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    let container = 0..CONTAINERS;
    let control = 0..CONTAINERS + LEAVES;
    prop_oneof![
        4 => (container.clone(), control.clone())
            .prop_map(|(container, control)| Op::Add { container, control }),
        2 => (container.clone(), 0usize..6, control.clone())
            .prop_map(|(container, index, control)| Op::Insert { container, index, control }),
        3 => (container.clone(), control)
            .prop_map(|(container, control)| Op::Remove { container, control }),
        1 => container.clone().prop_map(|container| Op::Clear { container }),
        1 => (container, 0usize..6, 0usize..6)
            .prop_map(|(container, from, to)| Op::Move { container, from, to }),
    ]
}

struct Fixture {
    tree: ControlTree,
    containers: Vec<ControlId>,
    all: Vec<ControlId>,
    hits: Vec<Rc<Cell<usize>>>,
}

impl Fixture {
    fn new() -> Self {
        let mut tree = ControlTree::new();
        let containers: Vec<_> = (0..CONTAINERS)
            .map(|_| tree.create_container(ControlState::new(Size::new(8, 4))))
            .collect();
        let mut all = containers.clone();
        all.extend((0..LEAVES).map(|_| {
            tree.create_control(Block::new('x'), ControlState::new(Size::new(2, 1)))
        }));

        let hits = containers
            .iter()
            .map(|id| {
                let hits = Rc::new(Cell::new(0));
                let sink = hits.clone();
                tree.subscribe(*id, move || sink.set(sink.get() + 1)).unwrap();
                hits
            })
            .collect();

        Self {
            tree,
            containers,
            all,
            hits,
        }
    }

    fn snapshot(&self) -> Vec<(Vec<ControlId>, Vec<Option<ControlId>>)> {
        self.containers
            .iter()
            .map(|c| {
                let controls = self.tree.controls(*c).unwrap();
                let parents = controls
                    .iter()
                    .map(|id| self.tree.parent(*id).unwrap())
                    .collect();
                (controls, parents)
            })
            .collect()
    }

    fn check_invariants(&self) {
        self.tree.validate().unwrap();
        for (i, id) in self.all.iter().enumerate() {
            let parent = self.tree.parent(*id).unwrap();
            let owners: Vec<_> = self
                .containers
                .iter()
                .filter(|c| self.tree.contains(**c, *id).unwrap())
                .copied()
                .collect();
            assert_eq!(owners, parent.into_iter().collect::<Vec<_>>());

            let external = usize::from(i < CONTAINERS);
            let relays = usize::from(parent.is_some());
            assert_eq!(self.tree.subscriber_count(*id).unwrap(), external + relays);
        }
    }
}

proptest! {
    #[test]
    fn membership_invariants_hold(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut fx = Fixture::new();

        for op in ops {
            let before = fx.snapshot();
            let target = match &op {
                Op::Add { container, .. }
                | Op::Insert { container, .. }
                | Op::Remove { container, .. }
                | Op::Clear { container }
                | Op::Move { container, .. } => *container,
            };
            let hits_before = fx.hits[target].get();
            let container = fx.containers[target];

            let raised = match op {
                Op::Add { control, .. } => fx.tree.add(container, fx.all[control]).map(|_| 1),
                Op::Insert { index, control, .. } => {
                    fx.tree.insert(container, index, fx.all[control]).map(|_| 1)
                }
                Op::Remove { control, .. } => fx.tree.remove(container, fx.all[control]).map(|_| 1),
                Op::Clear { .. } => fx.tree.clear(container).map(|n| usize::from(n > 0)),
                Op::Move { from, to, .. } => {
                    fx.tree.move_control(container, from, to).map(|_| usize::from(from != to))
                }
            };

            match raised {
                Ok(expected) => {
                    // Descendants never raise on their own here, so the target
                    // sees exactly its own notification.
                    prop_assert_eq!(fx.hits[target].get(), hits_before + expected);
                }
                Err(_) => {
                    prop_assert_eq!(fx.snapshot(), before);
                    prop_assert_eq!(fx.hits[target].get(), hits_before);
                }
            }
            fx.check_invariants();
        }
    }

    #[test]
    fn render_never_leaves_buffer_bounds(
        x in -12i32..12,
        y in -6i32..6,
        width in 0u16..10,
        height in 0u16..6,
    ) {
        let mut tree = ControlTree::new();
        let root = tree.create_container(ControlState::new(Size::new(8, 4)));
        let child = tree.create_control(
            Block::new('#'),
            ControlState::new(Size::new(width, height)).at(celltree::Point::new(x, y)),
        );
        tree.add(root, child).unwrap();

        let buffer = tree.render_to_buffer(root).unwrap();
        prop_assert_eq!(buffer.size(), Size::new(8, 4));

        let painted = buffer.cells().iter().filter(|c| c.glyph == '#').count();
        let overlap = |start: i32, len: u16, limit: i32| {
            let end = start + len as i32;
            (end.min(limit) - start.max(0)).max(0) as usize
        };
        prop_assert_eq!(painted, overlap(x, width, 8) * overlap(y, height, 4));
    }
}
