//! Mean-split k-d tree over scene entities.
//!
//! Nodes live in one arena and refer to each other by [`NodeId`]. Leaves
//! store indices into the owning scene's entity list, so the tree never owns
//! geometry and the whole structure is dropped and rebuilt on every scene
//! update.
//!
//! The split position is the mean of the entities' reference points on the
//! widest axis of the node's bounds. Clustered inputs produce lopsided trees;
//! the depth cap bounds the worst case.

use crate::{Color, Entity, HitRecord, Ray};
use kdt_math::{Aabb, Interval, Vec3};
use log::debug;

/// Maximum entities per leaf before splitting.
pub const LEAF_MAX_SIZE: usize = 4;

/// Nodes at this depth are always leaves; the root is depth 0.
pub const MAX_TREE_DEPTH: u32 = 8;

/// Handle of a node inside its [`KdTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which partition of its parent a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Root,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct KdNode {
    pub depth: u32,
    /// Split axis (0=X, 1=Y, 2=Z). Meaningless for leaves.
    pub axis: usize,
    /// Covers every entity reachable from this node. `Aabb::EMPTY` only for
    /// the root of an empty scene.
    pub bbox: Aabb,
    pub side: Side,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Entity indices, non-empty only at leaves.
    pub entities: Vec<usize>,
}

impl KdNode {
    fn new(depth: u32, side: Side) -> Self {
        Self {
            depth,
            axis: 0,
            bbox: Aabb::EMPTY,
            side,
            left: None,
            right: None,
            entities: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Collects tree-structure colors for debug renders.
///
/// Passed to [`KdTree::hit`] only when visualising; every node at
/// `target_depth` whose box the ray crosses adds red (left partition), green
/// (right partition) or blue (root), whether or not any geometry is hit.
#[derive(Debug, Clone)]
pub struct TreeProbe {
    pub target_depth: u32,
    pub color: Color,
    pub count: u32,
}

impl TreeProbe {
    pub fn new(target_depth: u32) -> Self {
        Self {
            target_depth,
            color: Color::ZERO,
            count: 0,
        }
    }

    fn visit(&mut self, node: &KdNode) {
        if node.depth != self.target_depth {
            return;
        }
        self.color += match node.side {
            Side::Left => Color::new(1.0, 0.0, 0.0),
            Side::Right => Color::new(0.0, 1.0, 0.0),
            Side::Root => Color::new(0.0, 0.0, 1.0),
        };
        self.count += 1;
    }

    /// Average collected color, `None` if no node at the target depth was
    /// crossed.
    pub fn average(&self) -> Option<Color> {
        (self.count > 0).then(|| self.color / f64::from(self.count))
    }
}

/// Arena-backed k-d tree. The root is always the first node.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
}

impl KdTree {
    /// Build a tree over every entity in `entities`.
    pub fn build(entities: &[Entity]) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(entities.len().max(1) * 2),
        };
        tree.build_node(entities, (0..entities.len()).collect(), 0, Side::Root);
        debug!(
            "Built k-d tree: {} nodes, {} leaves, depth {} over {} entities",
            tree.nodes.len(),
            tree.leaf_count(),
            tree.depth(),
            entities.len()
        );
        tree
    }

    fn build_node(&mut self, entities: &[Entity], members: Vec<usize>, depth: u32, side: Side) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(KdNode::new(depth, side));

        if members.is_empty() {
            debug!("empty leaf at depth {}", depth);
            return id;
        }

        let mut bbox = Aabb::EMPTY;
        let mut mean = Vec3::ZERO;
        for &i in &members {
            bbox.expand(&entities[i].bounding_box());
            mean += entities[i].transform();
        }
        mean /= members.len() as f64;

        if members.len() <= LEAF_MAX_SIZE || depth >= MAX_TREE_DEPTH {
            debug!("leaf with {} entities at depth {}", members.len(), depth);
            let node = &mut self.nodes[id.index()];
            node.bbox = bbox;
            node.entities = members;
            return id;
        }

        let axis = bbox.longest_axis();
        let split = mean[axis];
        let (left, right): (Vec<usize>, Vec<usize>) = members
            .into_iter()
            .partition(|&i| entities[i].transform()[axis] < split);
        debug!(
            "split depth {} on axis {} at {:.4}: {} left, {} right",
            depth,
            axis,
            split,
            left.len(),
            right.len()
        );

        let left_id = (!left.is_empty()).then(|| self.build_node(entities, left, depth + 1, Side::Left));
        let right_id = (!right.is_empty()).then(|| self.build_node(entities, right, depth + 1, Side::Right));

        for child in [left_id, right_id].into_iter().flatten() {
            let child_box = self.nodes[child.index()].bbox;
            bbox.expand(&child_box);
        }

        let node = &mut self.nodes[id.index()];
        node.axis = axis;
        node.bbox = bbox;
        node.left = left_id;
        node.right = right_id;
        id
    }

    /// Closest hit strictly inside `ray_t` among `entities`, which must be the
    /// slice the tree was built from.
    ///
    /// `rec` is only written on success. Pass a probe to collect debug colors.
    pub fn hit<'a>(
        &self,
        entities: &'a [Entity],
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord<'a>,
        mut probe: Option<&mut TreeProbe>,
    ) -> bool {
        self.hit_node(NodeId::ROOT, entities, ray, ray_t, rec, &mut probe)
    }

    fn hit_node<'a>(
        &self,
        id: NodeId,
        entities: &'a [Entity],
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord<'a>,
        probe: &mut Option<&mut TreeProbe>,
    ) -> bool {
        let node = &self.nodes[id.index()];
        if !node.bbox.intersect(ray) {
            return false;
        }
        if let Some(probe) = probe.as_deref_mut() {
            probe.visit(node);
        }

        // Visit the partition the ray enters first so its hits can cut the
        // search window for the far side.
        let (near, far) = if ray.direction()[node.axis] > 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        let mut closest = ray_t.max;
        let mut hit_child = false;
        for child in [near, far].into_iter().flatten() {
            if self.hit_node(child, entities, ray, ray_t.with_max(closest), rec, probe) {
                hit_child = true;
                closest = rec.t;
            }
        }
        if hit_child {
            return true;
        }

        for &i in &node.entities {
            if entities[i].hit(ray, ray_t.with_max(closest), rec) {
                closest = rec.t;
            }
        }
        closest < ray_t.max
    }

    pub fn root(&self) -> &KdNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> &KdNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Deepest node depth.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Entity indices of every leaf, in depth-first left-to-right order.
    pub fn leaf_partitions(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_leaf() {
                out.push(node.entities.clone());
            }
            // Right first so left pops first
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lambertian, Material, Sphere};
    use std::sync::Arc;

    fn gray() -> Arc<Material> {
        Arc::new(Material::from(Lambertian::new(Color::splat(0.5))))
    }

    fn spheres_along_x(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|i| Entity::from(Sphere::new(Vec3::new(i as f64, 0.0, -5.0), 0.4, gray())))
            .collect()
    }

    #[test]
    fn test_empty_tree_is_single_unset_root() {
        let tree = KdTree::build(&[]);

        assert_eq!(tree.nodes().len(), 1);
        assert!(tree.root().is_leaf());
        assert!(tree.root().entities.is_empty());
        assert!(tree.root().bbox.is_empty());

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let mut rec = HitRecord::default();
        assert!(!tree.hit(&[], &ray, Interval::new(0.001, 1000.0), &mut rec, None));
    }

    #[test]
    fn test_small_sets_become_single_leaf() {
        let entities = spheres_along_x(LEAF_MAX_SIZE);
        let tree = KdTree::build(&entities);

        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.root().entities, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_split_on_widest_axis_at_mean() {
        let entities = spheres_along_x(10);
        let tree = KdTree::build(&entities);
        let root = tree.root();

        assert_eq!(root.axis, 0);
        assert!(root.entities.is_empty());

        // Mean x is 4.5: 0..=4 go left, 5..=9 right
        let left = tree.node(root.left.expect("left child"));
        let right = tree.node(root.right.expect("right child"));
        assert_eq!(left.side, Side::Left);
        assert_eq!(right.side, Side::Right);
        assert_eq!(left.depth, 1);

        // Left subtree leaves come first in the listing
        let mut left_members: Vec<usize> = tree
            .leaf_partitions()
            .into_iter()
            .take_while(|leaf| leaf.iter().all(|&i| i < 5))
            .flatten()
            .collect();
        left_members.sort_unstable();
        assert_eq!(left_members, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_every_entity_inside_its_ancestors() {
        let entities = spheres_along_x(40);
        let tree = KdTree::build(&entities);

        fn check(tree: &KdTree, entities: &[Entity], id: NodeId, ancestors: &mut Vec<Aabb>) {
            let node = tree.node(id);
            ancestors.push(node.bbox);
            for &i in &node.entities {
                for bbox in ancestors.iter() {
                    assert!(bbox.contains_box(&entities[i].bounding_box()));
                }
            }
            if node.is_leaf() {
                assert!(!node.entities.is_empty());
            } else {
                assert!(node.entities.is_empty());
            }
            for child in [node.left, node.right].into_iter().flatten() {
                check(tree, entities, child, ancestors);
            }
            ancestors.pop();
        }

        check(&tree, &entities, NodeId::ROOT, &mut Vec::new());

        let mut all: Vec<usize> = tree.leaf_partitions().into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_identical_positions_stop_at_depth_cap() {
        let entities: Vec<Entity> = (0..50)
            .map(|_| Entity::from(Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, gray())))
            .collect();
        let tree = KdTree::build(&entities);

        assert_eq!(tree.depth(), MAX_TREE_DEPTH);
        // A chain of single children ending in one leaf holding everything
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.leaf_partitions()[0].len(), 50);
    }

    #[test]
    fn test_traversal_finds_nearest() {
        let entities = spheres_along_x(20);
        let tree = KdTree::build(&entities);

        // Looking down +X from the left: the first sphere is the nearest
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::X);
        let mut rec = HitRecord::default();
        assert!(tree.hit(&entities, &ray, Interval::new(0.001, 1000.0), &mut rec, None));
        assert!((rec.t - 4.6).abs() < 1e-9);
        assert!(rec.is_entity(&entities[0]));

        // And from the right
        let ray = Ray::new(Vec3::new(30.0, 0.0, -5.0), Vec3::NEG_X);
        let mut rec = HitRecord::default();
        assert!(tree.hit(&entities, &ray, Interval::new(0.001, 1000.0), &mut rec, None));
        assert!(rec.is_entity(&entities[19]));
    }

    #[test]
    fn test_hit_respects_caller_max() {
        let entities = spheres_along_x(20);
        let tree = KdTree::build(&entities);
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::X);
        let mut rec = HitRecord::default();

        assert!(!tree.hit(&entities, &ray, Interval::new(0.001, 4.0), &mut rec, None));
    }

    #[test]
    fn test_probe_counts_nodes_at_depth() {
        let entities = spheres_along_x(20);
        let tree = KdTree::build(&entities);
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::X);

        let mut root_probe = TreeProbe::new(0);
        let mut rec = HitRecord::default();
        tree.hit(&entities, &ray, Interval::new(0.001, 1000.0), &mut rec, Some(&mut root_probe));
        assert_eq!(root_probe.count, 1);
        assert_eq!(root_probe.average(), Some(Color::new(0.0, 0.0, 1.0)));

        // A ray above everything crosses no boxes at all
        let mut probe = TreeProbe::new(1);
        let miss = Ray::new(Vec3::new(-5.0, 10.0, -5.0), Vec3::X);
        tree.hit(&entities, &miss, Interval::new(0.001, 1000.0), &mut rec, Some(&mut probe));
        assert_eq!(probe.average(), None);
    }
}
