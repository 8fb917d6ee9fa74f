// Binary space partitioning of a level into room footprints.
//
// The tree is an arena: `BspTree` owns a `Vec<BspNode>` and nodes refer to
// their children by `BspNodeId` index. A node is either a leaf or has
// exactly two children covering its bounds with no overlap, so the leaves
// always partition the root region exactly. A leaf may carry a `RoomId`
// back-reference once a room has been placed in it; the tree never owns
// rooms.
//
// Split rule: when one side is at least 1.25× the other the long axis is
// split, otherwise the axis is a coin flip. The split offset is uniform in
// `[min_leaf, len - min_leaf]`, so both children are at least `min_leaf`
// along the split axis.
//
// See also: `planner.rs` (expansion) which partitions the region around the
// hub and places one room per usable leaf.

use crate::geometry::Rect;
use crate::types::RoomId;
use rand::Rng;

/// Index of a node inside its `BspTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BspNodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct BspNode {
    pub bounds: Rect,
    pub left: Option<BspNodeId>,
    pub right: Option<BspNodeId>,
    /// Room placed in this leaf, if any.
    pub room: Option<RoomId>,
}

impl BspNode {
    fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            left: None,
            right: None,
            room: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Arena of partition cells rooted at `BspTree::ROOT`.
#[derive(Clone, Debug)]
pub struct BspTree {
    nodes: Vec<BspNode>,
}

impl BspTree {
    pub const ROOT: BspNodeId = BspNodeId(0);

    /// Split the long side when it is at least this many times the short one.
    const ASPECT_RATIO: f32 = 1.25;

    pub fn new(region: Rect) -> Self {
        Self {
            nodes: vec![BspNode::new(region)],
        }
    }

    pub fn node(&self, id: BspNodeId) -> &BspNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, bounds: Rect) -> BspNodeId {
        let id = BspNodeId(self.nodes.len() as u32);
        self.nodes.push(BspNode::new(bounds));
        id
    }

    /// Split a leaf into two children. Returns `false` (and leaves the tree
    /// untouched) if the node is already split or neither axis is at least
    /// `2 * min_leaf` long.
    pub fn split(&mut self, id: BspNodeId, min_leaf: i32, rng: &mut impl Rng) -> bool {
        let node = self.node(id);
        if !node.is_leaf() {
            return false;
        }
        let bounds = node.bounds;
        let min_leaf = min_leaf.max(1);
        let can_split_x = bounds.width >= 2 * min_leaf;
        let can_split_y = bounds.height >= 2 * min_leaf;
        if !can_split_x && !can_split_y {
            return false;
        }

        let (w, h) = (bounds.width as f32, bounds.height as f32);
        let preferred_x = if w >= h * Self::ASPECT_RATIO {
            true
        } else if h >= w * Self::ASPECT_RATIO {
            false
        } else {
            rng.gen_bool(0.5)
        };
        // Fall back to the other axis when the preferred one is too short.
        let split_x = if preferred_x { can_split_x } else { !can_split_y };

        let (first, second) = if split_x {
            let offset = rng.gen_range(min_leaf..=bounds.width - min_leaf);
            (
                Rect::new(bounds.x, bounds.y, offset, bounds.height),
                Rect::new(bounds.x + offset, bounds.y, bounds.width - offset, bounds.height),
            )
        } else {
            let offset = rng.gen_range(min_leaf..=bounds.height - min_leaf);
            (
                Rect::new(bounds.x, bounds.y, bounds.width, offset),
                Rect::new(bounds.x, bounds.y + offset, bounds.width, bounds.height - offset),
            )
        };

        let left = self.push(first);
        let right = self.push(second);
        let node = &mut self.nodes[id.0 as usize];
        node.left = Some(left);
        node.right = Some(right);
        true
    }

    /// Split recursively from the root down to `max_depth`, yielding at most
    /// `2^max_depth` leaves.
    pub fn partition(&mut self, max_depth: u32, min_leaf: i32, rng: &mut impl Rng) {
        let mut frontier = vec![(Self::ROOT, 0u32)];
        while let Some((id, depth)) = frontier.pop() {
            if depth >= max_depth || !self.split(id, min_leaf, rng) {
                continue;
            }
            let node = self.node(id);
            // Push right first so the left subtree is split first.
            if let (Some(left), Some(right)) = (node.left, node.right) {
                frontier.push((right, depth + 1));
                frontier.push((left, depth + 1));
            }
        }
    }

    /// Leaves in pre-order (left before right).
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![Self::ROOT],
        }
    }

    /// Record the room placed in a leaf.
    pub fn assign_room(&mut self, leaf: BspNodeId, room: RoomId) {
        self.nodes[leaf.0 as usize].room = Some(room);
    }

    pub fn room(&self, leaf: BspNodeId) -> Option<RoomId> {
        self.node(leaf).room
    }
}

/// One-shot pre-order iterator over a tree's leaves.
pub struct Leaves<'a> {
    tree: &'a BspTree,
    stack: Vec<BspNodeId>,
}

impl Iterator for Leaves<'_> {
    type Item = (BspNodeId, Rect);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.node(id);
            match (node.left, node.right) {
                (Some(left), Some(right)) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
                _ => return Some((id, node.bounds)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn small_region_does_not_split() {
        let mut tree = BspTree::new(Rect::new(0, 0, 5, 5));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(!tree.split(BspTree::ROOT, 3, &mut rng));
        assert_eq!(tree.leaves().count(), 1);
    }

    #[test]
    fn split_node_cannot_split_again() {
        let mut tree = BspTree::new(Rect::new(0, 0, 20, 20));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(tree.split(BspTree::ROOT, 4, &mut rng));
        assert!(!tree.split(BspTree::ROOT, 4, &mut rng));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn long_axis_is_split() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for seed in 0..20 {
            let mut rng_seeded = ChaCha8Rng::seed_from_u64(seed);
            let mut tree = BspTree::new(Rect::new(0, 0, 30, 10));
            assert!(tree.split(BspTree::ROOT, 4, &mut rng_seeded));
            for (_, leaf) in tree.leaves() {
                assert_eq!(leaf.height, 10, "wide region split across its short axis");
            }
        }
        // Too thin to split along x falls back to y.
        let mut tree = BspTree::new(Rect::new(0, 0, 7, 8));
        assert!(tree.split(BspTree::ROOT, 4, &mut rng));
        for (_, leaf) in tree.leaves() {
            assert_eq!(leaf.width, 7);
            assert_eq!(leaf.height, 4);
        }
    }

    #[test]
    fn leaves_partition_region_exactly() {
        let regions = [
            Rect::new(0, 0, 30, 30),
            Rect::new(-12, 5, 41, 17),
            Rect::new(3, 3, 9, 50),
            Rect::new(0, 0, 6, 6),
        ];
        for region in regions {
            for min_leaf in [3, 4, 6] {
                for seed in 0..25 {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let mut tree = BspTree::new(region);
                    tree.partition(4, min_leaf, &mut rng);

                    let leaves: Vec<Rect> = tree.leaves().map(|(_, r)| r).collect();
                    assert!(leaves.len() <= 16);
                    let area: i32 = leaves.iter().map(Rect::area).sum();
                    assert_eq!(area, region.area(), "{region:?} min {min_leaf} seed {seed}");
                    for (i, a) in leaves.iter().enumerate() {
                        assert!(a.width >= min_leaf && a.height >= min_leaf, "{a:?} too small");
                        assert!(region.contains_rect(a));
                        for b in &leaves[i + 1..] {
                            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn leaves_are_pre_order() {
        let mut tree = BspTree::new(Rect::new(0, 0, 40, 40));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        tree.partition(2, 5, &mut rng);
        let ids: Vec<BspNodeId> = tree.leaves().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 4);
        // Root's left child subtree is allocated before its right child's.
        let root = tree.node(BspTree::ROOT);
        let left = tree.node(root.left.unwrap());
        assert_eq!(ids[0], left.left.unwrap());
        assert_eq!(ids[1], left.right.unwrap());
    }

    #[test]
    fn room_back_reference() {
        let mut tree = BspTree::new(Rect::new(0, 0, 12, 12));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        tree.partition(1, 6, &mut rng);
        let (leaf, _) = tree.leaves().next().unwrap();
        assert_eq!(tree.room(leaf), None);
        tree.assign_room(leaf, RoomId(7));
        assert_eq!(tree.room(leaf), Some(RoomId(7)));
    }

    #[test]
    fn same_seed_same_partition() {
        let build = |seed| {
            let mut tree = BspTree::new(Rect::new(0, 0, 30, 30));
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            tree.partition(4, 4, &mut rng);
            tree.leaves().map(|(_, r)| r).collect::<Vec<_>>()
        };
        assert_eq!(build(42), build(42));
    }
}
