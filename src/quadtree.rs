//! Barnes-Hut spatial index over the active layout level's node positions
//! (component C).
//!
//! Rebuilt from scratch every force iteration from a flat `Vec<QuadNode>`
//! that plays the role of the original's `quad_tree_pool` bump allocator —
//! a `Vec` already gives amortised O(1) push with no per-node `malloc`, so
//! the paged-pool chain in the source collapses to one growable arena here
//! (see DESIGN.md). Nodes reference each other by index (`QuadId`) rather
//! than pointer for the same reason the layout and paper arenas do.

use crate::layout::NodeId as LayoutNodeId;

/// Index of a node within a [`QuadTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadId(pub u32);

impl QuadId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A point mass handed to [`QuadTree::build`].
#[derive(Debug, Clone, Copy)]
pub struct QuadItem {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub radius: f64,
    pub node: LayoutNodeId,
}

#[derive(Debug, Clone)]
pub struct QuadNode {
    /// Mass-weighted centroid; for a leaf this is exactly the item's own
    /// position (a one-item average).
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    /// Only meaningful for leaves: the item's own radius. The force engine
    /// never reads an internal node's radius (§4.E only uses `q2.radius`
    /// when `q2` is a leaf).
    pub radius: f64,
    pub side_length: f64,
    pub num_items: u32,
    pub item: Option<LayoutNodeId>,
    children: [Option<QuadId>; 4],
    parent: Option<QuadId>,
    min_x: f64,
    min_y: f64,
}

impl QuadNode {
    fn leaf(min_x: f64, min_y: f64, side_length: f64, parent: Option<QuadId>, it: QuadItem) -> Self {
        QuadNode {
            x: it.x,
            y: it.y,
            mass: it.mass,
            radius: it.radius,
            side_length,
            num_items: 1,
            item: Some(it.node),
            children: [None; 4],
            parent,
            min_x,
            min_y,
        }
    }
}

/// Below this side length we stop subdividing and simply accumulate mass
/// into the existing leaf rather than recurse forever on (near-)coincident
/// points. A numerical-degeneracy guard, not part of the source, which
/// assumed no two papers ever occupy the exact same point in floating
/// point.
const MIN_SIDE: f64 = 1e-9;

pub struct QuadTree {
    nodes: Vec<QuadNode>,
    pub root: Option<QuadId>,
    /// `leaf_of[item.node.0]` is the leaf that ended up holding that item,
    /// so the force engine can skip a leaf's own subtree while walking the
    /// tree for that leaf.
    leaf_of: Vec<Option<QuadId>>,
}

impl QuadTree {
    /// Build a fresh tree from `items`. Returns an empty tree (`root =
    /// None`) if `items` is empty.
    pub fn build(items: &[QuadItem]) -> Self {
        let max_node = items.iter().map(|it| it.node.0).max().map(|m| m as usize + 1).unwrap_or(0);
        let mut tree = QuadTree {
            nodes: Vec::with_capacity(items.len() * 2),
            root: None,
            leaf_of: vec![None; max_node],
        };
        if items.is_empty() {
            return tree;
        }

        let (min_x, min_y, side) = bounding_square(items);

        for it in items {
            tree.insert(min_x, min_y, side, *it);
        }

        tree
    }

    /// The leaf holding `node`, if it was present when the tree was built.
    pub fn leaf_of(&self, node: LayoutNodeId) -> Option<QuadId> {
        self.leaf_of.get(node.0 as usize).copied().flatten()
    }

    pub fn node(&self, id: QuadId) -> &QuadNode {
        &self.nodes[id.idx()]
    }

    pub fn is_leaf(&self, id: QuadId) -> bool {
        self.nodes[id.idx()].num_items == 1
    }

    pub fn children(&self, id: QuadId) -> [Option<QuadId>; 4] {
        self.nodes[id.idx()].children
    }

    pub fn parent(&self, id: QuadId) -> Option<QuadId> {
        self.nodes[id.idx()].parent
    }

    /// Iterate every allocated node (leaf or internal), mirroring
    /// `Force_quad_tree_apply_if`'s walk over every pool page.
    pub fn all_ids(&self) -> impl Iterator<Item = QuadId> + '_ {
        (0..self.nodes.len() as u32).map(QuadId)
    }

    fn quadrant_of(min_x: f64, min_y: f64, side: f64, x: f64, y: f64) -> usize {
        let mid_x = min_x + side / 2.0;
        let mid_y = min_y + side / 2.0;
        let right = (x >= mid_x) as usize;
        let top = (y >= mid_y) as usize;
        top * 2 + right
    }

    fn quadrant_origin(min_x: f64, min_y: f64, side: f64, quadrant: usize) -> (f64, f64) {
        let half = side / 2.0;
        let dx = (quadrant % 2) as f64 * half;
        let dy = (quadrant / 2) as f64 * half;
        (min_x + dx, min_y + dy)
    }

    fn alloc(&mut self, node: QuadNode) -> QuadId {
        let id = QuadId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Insert `it` relative to the tree's fixed bounding square, creating
    /// the root on first call.
    fn insert(&mut self, root_min_x: f64, root_min_y: f64, root_side: f64, it: QuadItem) {
        match self.root {
            None => {
                let id = self.alloc(QuadNode::leaf(root_min_x, root_min_y, root_side, None, it));
                self.root = Some(id);
                self.leaf_of[it.node.0 as usize] = Some(id);
            }
            Some(root) => self.insert_into(root, it),
        }
    }

    fn insert_into(&mut self, id: QuadId, it: QuadItem) {
        if self.nodes[id.idx()].num_items == 1 {
            let n = &self.nodes[id.idx()];
            if n.side_length < MIN_SIDE {
                // Degenerate: fold the new mass into the existing leaf
                // rather than subdivide past floating-point resolution.
                let old_mass = n.mass;
                let new_mass = old_mass + it.mass;
                let x = (n.x * old_mass + it.x * it.mass) / new_mass;
                let y = (n.y * old_mass + it.y * it.mass) / new_mass;
                let node = &mut self.nodes[id.idx()];
                node.x = x;
                node.y = y;
                node.mass = new_mass;
                self.leaf_of[it.node.0 as usize] = Some(id);
                return;
            }

            // Subdivide: the existing item moves down into a new leaf
            // child, then both items are placed via the normal quadrant
            // routing below.
            let old_item = QuadItem {
                x: n.x,
                y: n.y,
                mass: n.mass,
                radius: n.radius,
                node: n.item.unwrap(),
            };
            self.nodes[id.idx()].item = None;
            self.nodes[id.idx()].children = [None; 4];

            self.place_in_child(id, old_item);
            self.place_in_child(id, it);
        } else {
            self.place_in_child(id, it);
        }

        self.recompute_aggregate(id);
    }

    fn place_in_child(&mut self, parent_id: QuadId, it: QuadItem) {
        let (min_x, min_y, side) = {
            let n = &self.nodes[parent_id.idx()];
            (n.min_x, n.min_y, n.side_length)
        };
        let quadrant = Self::quadrant_of(min_x, min_y, side, it.x, it.y);

        match self.nodes[parent_id.idx()].children[quadrant] {
            Some(child_id) => self.insert_into(child_id, it),
            None => {
                let (cmin_x, cmin_y) = Self::quadrant_origin(min_x, min_y, side, quadrant);
                let child = QuadNode::leaf(cmin_x, cmin_y, side / 2.0, Some(parent_id), it);
                let child_id = self.alloc(child);
                self.nodes[parent_id.idx()].children[quadrant] = Some(child_id);
                self.leaf_of[it.node.0 as usize] = Some(child_id);
            }
        }
    }

    /// Recompute `x`, `y`, `mass`, `num_items` for an internal node from
    /// its (up to four) children.
    fn recompute_aggregate(&mut self, id: QuadId) {
        let children = self.nodes[id.idx()].children;
        let mut total_mass = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut total_items = 0u32;
        for child in children.into_iter().flatten() {
            let c = &self.nodes[child.idx()];
            total_mass += c.mass;
            cx += c.mass * c.x;
            cy += c.mass * c.y;
            total_items += c.num_items;
        }
        let n = &mut self.nodes[id.idx()];
        n.mass = total_mass;
        n.num_items = total_items;
        if total_mass > 0.0 {
            n.x = cx / total_mass;
            n.y = cy / total_mass;
        }
    }
}

/// AABB over `items`' positions, squared and padded with a small margin so
/// boundary points never land exactly on an edge.
fn bounding_square(items: &[QuadItem]) -> (f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for it in items {
        min_x = min_x.min(it.x);
        max_x = max_x.max(it.x);
        min_y = min_y.min(it.y);
        max_y = max_y.max(it.y);
    }

    let width = (max_x - min_x).max(0.0);
    let height = (max_y - min_y).max(0.0);
    let mut side = width.max(height);
    if side <= 0.0 {
        side = 1.0;
    }
    let margin = side * 0.05 + 1e-6;
    side += 2.0 * margin;

    // Centre the square on the AABB's centre.
    let cx = (min_x + max_x) / 2.0;
    let cy = (min_y + max_y) / 2.0;
    (cx - side / 2.0, cy - side / 2.0, side)
}
