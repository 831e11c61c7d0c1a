use common::shapes::Rect;
use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{QuadtreeError, QuadtreeResult};

const ROOT: u32 = 0;
const NO_NODE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u32,
    x: f32,
    y: f32,
}

/// One node of the index. A leaf owns a rectangular region and a bounded
/// entity set; once split it owns exactly four child leaves partitioning the
/// region into quadrants.
#[derive(Debug, Default)]
struct Leaf {
    bounds: Rect,
    parent: u32,
    children: Option<[u32; 4]>,
    entities: SmallVec<[Entry; 4]>,
}

impl Leaf {
    fn reset(&mut self, bounds: Rect, parent: u32) {
        self.bounds = bounds;
        self.parent = parent;
        self.children = None;
        self.entities.clear();
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// A leaf holding more entities than this splits on the next rebalance;
    /// a subtree holding this many or fewer merges back.
    pub split_threshold: usize,
    /// Smallest width/height a leaf may be reduced to.
    pub min_leaf_size: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            split_threshold: 2,
            min_leaf_size: 1.0,
        }
    }
}

/// Point-partitioning quadtree over the entities of one map.
///
/// Entities are keyed by a caller-supplied `u32` value and tracked by their
/// continuous position; each lives in the deepest leaf containing that
/// position. Splitting and merging happen only in [`QuadTree::rebalance`],
/// which the simulation runs once per tick.
pub struct QuadTree {
    nodes: Vec<Leaf>,
    free: Vec<u32>,
    owner: FxHashMap<u32, u32>,
    config: Config,
}

impl QuadTree {
    pub fn try_new_with_config(bounds: Rect, config: Config) -> QuadtreeResult<Self> {
        let finite =
            bounds.x1.is_finite() && bounds.y1.is_finite() && bounds.x2.is_finite() && bounds.y2.is_finite();
        if !finite || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(QuadtreeError::InvalidBounds {
                x1: bounds.x1,
                y1: bounds.y1,
                x2: bounds.x2,
                y2: bounds.y2,
            });
        }
        let mut root = Leaf::default();
        root.reset(bounds, NO_NODE);
        Ok(QuadTree {
            nodes: vec![root],
            free: Vec::new(),
            owner: FxHashMap::default(),
            config,
        })
    }

    pub fn new_with_config(bounds: Rect, config: Config) -> Self {
        match Self::try_new_with_config(bounds, config) {
            Ok(tree) => tree,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn new(bounds: Rect) -> Self {
        Self::new_with_config(bounds, Config::default())
    }

    pub fn bounds(&self) -> Rect {
        self.nodes[ROOT as usize].bounds
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
    }

    pub fn contains(&self, value: u32) -> bool {
        self.owner.contains_key(&value)
    }

    /// Add an entity at its current position. No-op if already present.
    pub fn insert(&mut self, value: u32, x: f32, y: f32) {
        if self.owner.contains_key(&value) {
            return;
        }
        let (cx, cy) = self.bounds().clamp_point(x, y);
        let leaf = self.descend_from(ROOT, cx, cy);
        self.nodes[leaf as usize].entities.push(Entry { value, x, y });
        self.owner.insert(value, leaf);
    }

    /// Remove an entity. No-op if absent.
    pub fn remove(&mut self, value: u32) {
        let Some(leaf) = self.owner.remove(&value) else {
            return;
        };
        let entities = &mut self.nodes[leaf as usize].entities;
        if let Some(pos) = entities.iter().position(|e| e.value == value) {
            entities.swap_remove(pos);
        }
    }

    /// Re-evaluate containment after a position change. Relocates the entity
    /// only when it has left its current leaf. No-op if absent.
    pub fn update(&mut self, value: u32, x: f32, y: f32) {
        let Some(&leaf) = self.owner.get(&value) else {
            return;
        };
        let (cx, cy) = self.bounds().clamp_point(x, y);
        let entities = &mut self.nodes[leaf as usize].entities;
        let Some(pos) = entities.iter().position(|e| e.value == value) else {
            unreachable!("owner map points at a leaf without the entity");
        };
        entities[pos].x = x;
        entities[pos].y = y;
        if self.nodes[leaf as usize].bounds.contains_point(cx, cy) {
            return;
        }

        // Walk up to the nearest ancestor containing the new position,
        // then back down to its deepest leaf.
        let entry = self.nodes[leaf as usize].entities.swap_remove(pos);
        let mut node = leaf;
        while node != ROOT && !self.nodes[node as usize].bounds.contains_point(cx, cy) {
            node = self.nodes[node as usize].parent;
        }
        let dest = self.descend_from(node, cx, cy);
        self.nodes[dest as usize].entities.push(entry);
        self.owner.insert(value, dest);
    }

    /// Collect every entity whose owning leaf's rectangle touches the query
    /// box. A superset: callers filter the candidates to exact overlap.
    pub fn query(&self, min_x: f32, max_x: f32, min_y: f32, max_y: f32, out: &mut Vec<u32>) {
        let query = Rect::new(min_x, min_y, max_x, max_y);
        let mut stack: SmallVec<[u32; 16]> = SmallVec::new();
        stack.push(ROOT);
        while let Some(node) = stack.pop() {
            let leaf = &self.nodes[node as usize];
            if !leaf.bounds.touches(&query) {
                continue;
            }
            out.extend(leaf.entities.iter().map(|e| e.value));
            if let Some(children) = leaf.children {
                stack.extend(children);
            }
        }
    }

    /// Split overfull leaves and merge underfull subtrees. Run once per
    /// simulation tick.
    pub fn rebalance(&mut self) {
        self.rebalance_node(ROOT);
    }

    fn rebalance_node(&mut self, node: u32) {
        if let Some(children) = self.nodes[node as usize].children {
            if self.subtree_count(node) <= self.config.split_threshold {
                self.collapse(node);
            } else {
                for child in children {
                    self.rebalance_node(child);
                }
                return;
            }
        }
        self.try_split(node);
    }

    fn try_split(&mut self, node: u32) {
        let leaf = &self.nodes[node as usize];
        if leaf.entities.len() <= self.config.split_threshold {
            return;
        }
        let bounds = leaf.bounds;
        if bounds.width() / 2.0 < self.config.min_leaf_size
            || bounds.height() / 2.0 < self.config.min_leaf_size
        {
            return;
        }

        let quads = bounds.quadrants();
        let mut children = [NO_NODE; 4];
        for (slot, quad) in children.iter_mut().zip(quads) {
            *slot = self.alloc_node(quad, node);
        }
        let entries = std::mem::take(&mut self.nodes[node as usize].entities);
        self.nodes[node as usize].children = Some(children);

        for entry in entries {
            let (cx, cy) = bounds.clamp_point(entry.x, entry.y);
            let mut dest = node;
            for child in children {
                if self.nodes[child as usize].bounds.contains_point(cx, cy) {
                    dest = child;
                    break;
                }
            }
            debug_assert_ne!(dest, node, "quadrants must cover the parent rect");
            self.nodes[dest as usize].entities.push(entry);
            self.owner.insert(entry.value, dest);
        }

        for child in children {
            self.try_split(child);
        }
    }

    /// Pull every descendant entity back into `node` and recycle the
    /// descendant leaves.
    fn collapse(&mut self, node: u32) {
        let Some(children) = self.nodes[node as usize].children.take() else {
            return;
        };
        let mut gathered: SmallVec<[Entry; 8]> = SmallVec::new();
        let mut stack: SmallVec<[u32; 16]> = SmallVec::from_slice(&children);
        while let Some(idx) = stack.pop() {
            if let Some(grand) = self.nodes[idx as usize].children.take() {
                stack.extend(grand);
            }
            gathered.extend(self.nodes[idx as usize].entities.drain(..));
            self.free.push(idx);
        }
        for entry in &gathered {
            self.owner.insert(entry.value, node);
        }
        self.nodes[node as usize].entities.extend(gathered);
    }

    fn subtree_count(&self, node: u32) -> usize {
        let mut count = 0;
        let mut stack: SmallVec<[u32; 16]> = SmallVec::new();
        stack.push(node);
        while let Some(idx) = stack.pop() {
            let leaf = &self.nodes[idx as usize];
            count += leaf.entities.len();
            if let Some(children) = leaf.children {
                stack.extend(children);
            }
        }
        count
    }

    fn descend_from(&self, start: u32, x: f32, y: f32) -> u32 {
        let mut node = start;
        while let Some(children) = self.nodes[node as usize].children {
            let mut next = NO_NODE;
            for child in children {
                if self.nodes[child as usize].bounds.contains_point(x, y) {
                    next = child;
                    break;
                }
            }
            if next == NO_NODE {
                break;
            }
            node = next;
        }
        node
    }

    fn alloc_node(&mut self, bounds: Rect, parent: u32) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize].reset(bounds, parent);
            idx
        } else {
            let mut leaf = Leaf::default();
            leaf.reset(bounds, parent);
            self.nodes.push(leaf);
            (self.nodes.len() - 1) as u32
        }
    }

    /// Bounding boxes of every live node, for debug overlays.
    pub fn all_node_bounding_boxes(&self, out: &mut Vec<Rect>) {
        let mut stack: SmallVec<[u32; 16]> = SmallVec::new();
        stack.push(ROOT);
        while let Some(node) = stack.pop() {
            let leaf = &self.nodes[node as usize];
            out.push(leaf.bounds);
            if let Some(children) = leaf.children {
                stack.extend(children);
            }
        }
    }

    /// Panic if any entity is orphaned or owned by more than one leaf.
    pub fn assert_invariants(&self) {
        let mut seen: FxHashMap<u32, u32> = FxHashMap::default();
        let mut stack: SmallVec<[u32; 16]> = SmallVec::new();
        stack.push(ROOT);
        while let Some(node) = stack.pop() {
            let leaf = &self.nodes[node as usize];
            for entry in &leaf.entities {
                let previous = seen.insert(entry.value, node);
                assert!(
                    previous.is_none(),
                    "entity {} present in leaves {} and {}",
                    entry.value,
                    previous.unwrap_or(NO_NODE),
                    node
                );
                assert_eq!(
                    self.owner.get(&entry.value),
                    Some(&node),
                    "owner map out of sync for entity {}",
                    entry.value
                );
            }
            if let Some(children) = leaf.children {
                stack.extend(children);
            }
        }
        assert_eq!(seen.len(), self.owner.len(), "owner map tracks absent entities");
    }
}
