use std::fmt;
use arrayvec::ArrayVec;
use glam::Vec3;
use ordered_float::OrderedFloat;
use crate::{
    error::{ self, Result, TreeError },
    index::{ NearestSearch, SpatialIndex },
    AABB,
};

mod octant_index;
pub use octant_index::*;

#[derive(Debug)]
pub enum OctantContents {
    /// Indexed by `OctantIndex`.
    Children(Box<[OctantNode; 8]>),
    Points(Vec<Vec3>),
}

#[derive(Debug)]
pub struct OctantNode {
    pub aabb: AABB,
    pub center: Vec3,
    contents: OctantContents,
}

impl OctantNode {
    fn build(depth: u8, aabb: AABB) -> Self {
        // Zero volume boxes cannot be split any further
        let contents = if depth == 0 || aabb.is_degenerate() {
            OctantContents::Points(Vec::new())
        } else {
            let child_aabbs = aabb.octant_subdivide();
            OctantContents::Children(Box::new(child_aabbs.map(|child| OctantNode::build(depth - 1, child))))
        };

        Self {
            aabb,
            center: aabb.center(),
            contents,
        }
    }

    pub fn contents(&self) -> &OctantContents {
        &self.contents
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.contents, OctantContents::Points(_))
    }

    pub fn children(&self) -> Option<&[OctantNode; 8]> {
        match &self.contents {
            OctantContents::Children(children) => Some(&**children),
            OctantContents::Points(_) => None,
        }
    }

    /// Points stored in this node. Empty for internal nodes.
    pub fn points(&self) -> &[Vec3] {
        match &self.contents {
            OctantContents::Points(points) => points.as_slice(),
            OctantContents::Children(_) => &[],
        }
    }

    fn insert(&mut self, point: Vec3) -> AABB {
        match &mut self.contents {
            OctantContents::Children(children) => {
                let octant = OctantIndex::locate(point, self.center);
                children[octant.as_usize()].insert(point)
            }
            OctantContents::Points(points) => {
                points.push(point);
                self.aabb
            }
        }
    }

    fn locate_leaf(&self, point: Vec3) -> &OctantNode {
        match &self.contents {
            OctantContents::Children(children) => {
                children[OctantIndex::locate(point, self.center).as_usize()].locate_leaf(point)
            }
            OctantContents::Points(_) => self,
        }
    }

    fn nearest(&self, search: &mut NearestSearch) {
        match &self.contents {
            OctantContents::Points(points) => search.offer_all(points),
            OctantContents::Children(children) => {
                // TODO: A lookup table keyed by the target's octant would avoid this sort
                let mut order: ArrayVec<(OrderedFloat<f32>, usize), 8> = children.iter()
                    .enumerate()
                    .map(|(idx, child)| (OrderedFloat(child.aabb.min_distance_squared(search.target)), idx))
                    .collect();
                order.sort_unstable();

                for (bound, idx) in order {
                    if bound.0 > search.bound_squared() {
                        break;
                    }
                    children[idx].nearest(search);
                }
            }
        }
    }

    fn points_in_aabb(&self, aabb: &AABB, out: &mut Vec<Vec3>) {
        match &self.contents {
            OctantContents::Points(points) => {
                out.extend(points.iter().filter(|point| aabb.contains_strict(**point)))
            }
            OctantContents::Children(children) => {
                children.iter()
                    .filter(|child| child.aabb.intersects(aabb))
                    .for_each(|child| child.points_in_aabb(aabb, out));
            }
        }
    }

    fn write_dump(&self, f: &mut fmt::Formatter<'_>, depth: usize, reference: Vec3) -> fmt::Result {
        let indent = " ".repeat(depth * 4);
        match &self.contents {
            OctantContents::Points(points) => {
                if points.is_empty() {
                    return Ok(());
                }
                write!(f, "{indent}[leaf] ")?;
                for point in points {
                    write!(f, "({:.0}, {:.0}, {:.0}) {:.1}   ", point.x, point.y, point.z, point.distance(reference))?;
                }
                writeln!(f)
            }
            OctantContents::Children(children) => {
                writeln!(f, "{indent}[-], ({:.0}, {:.0}, {:.0})", self.center.x, self.center.y, self.center.z)?;
                children.iter().try_for_each(|child| child.write_dump(f, depth + 1, reference))
            }
        }
    }
}

/// Depth first walk over the leaves below a node.
pub struct Leaves<'a> {
    stack: Vec<&'a OctantNode>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a OctantNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match &node.contents {
                OctantContents::Points(_) => return Some(node),
                OctantContents::Children(children) => self.stack.extend(children.iter().rev()),
            }
        }
        None
    }
}

/// Fixed geometry octree over a bounding box. The eight way subdivision
/// is built up front; points are inserted afterwards into the leaves.
///
/// Insertion takes `&mut self`, so inserting while another thread
/// queries needs external synchronization such as a `RwLock`.
#[derive(Debug)]
pub struct OctantTree {
    root: OctantNode,
    max_depth: u8,
    len: usize,
}

impl OctantTree {
    /// Geometry is built eagerly: a depth of `d` allocates `8^d` leaves
    /// and about `8^d / 7` internal nodes. At depth 7 that is roughly
    /// 2.4M nodes, on the order of 150 MB before any point is inserted.
    pub const MAX_DEPTH: u8 = 7;

    pub fn build(max_depth: u8, min: Vec3, max: Vec3) -> Result<Self> {
        if max_depth > Self::MAX_DEPTH {
            return Err(TreeError::DepthTooLarge { depth: max_depth, max: Self::MAX_DEPTH });
        }
        let aabb = AABB::try_new(min, max)?;

        let tree = Self {
            root: OctantNode::build(max_depth, aabb),
            max_depth,
            len: 0,
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Built octant tree over {:?}: depth {}, {} leaves",
                aabb, max_depth, tree.leaf_count()
            );
        }

        Ok(tree)
    }

    /// Stores `point` in the leaf its position selects and returns that
    /// leaf's box. Points outside the tree's bounds are not rejected; they
    /// land in the edge leaf on their side.
    pub fn insert(&mut self, point: Vec3) -> Result<AABB> {
        error::check_finite(point)?;

        if !self.root.aabb.contains(point) {
            log::warn!("Inserting {point} outside octant tree bounds {:?}", self.root.aabb);
        }

        let leaf = self.root.insert(point);
        self.len += 1;
        log::trace!("Inserted {point} into leaf {:?}", leaf);

        Ok(leaf)
    }

    pub fn root(&self) -> &OctantNode {
        &self.root
    }

    pub fn bounds(&self) -> AABB {
        self.root.aabb
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![&self.root],
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// The leaf that `insert` would route `point` into.
    pub fn locate_leaf(&self, point: Vec3) -> &OctantNode {
        self.root.locate_leaf(point)
    }

    pub fn find_nearest_neighbour(&self, point: Vec3) -> Option<Vec3> {
        let mut search = NearestSearch::new(point);
        self.root.nearest(&mut search);
        search.result()
    }

    pub fn find_points_in_aabb(&self, min: Vec3, max: Vec3) -> Vec<Vec3> {
        let mut out = Vec::new();
        self.root.points_in_aabb(&AABB::new(min, max), &mut out);
        out
    }

    /// Human readable tree layout. Empty leaves are skipped.
    pub fn dump(&self, reference: Vec3) -> OctantTreeDump<'_> {
        OctantTreeDump {
            tree: self,
            reference,
        }
    }
}

impl SpatialIndex for OctantTree {
    fn nearest_neighbour(&self, point: Vec3) -> Option<Vec3> {
        self.find_nearest_neighbour(point)
    }

    fn points_in_aabb(&self, min: Vec3, max: Vec3) -> Vec<Vec3> {
        self.find_points_in_aabb(min, max)
    }

    fn len(&self) -> usize {
        self.len
    }
}

pub struct OctantTreeDump<'a> {
    tree: &'a OctantTree,
    reference: Vec3,
}

impl fmt::Display for OctantTreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree.root.write_dump(f, 0, self.reference)
    }
}

#[cfg(test)]
fn volume(aabb: &AABB) -> f32 {
    let size = aabb.size();
    size.x * size.y * size.z
}

#[cfg(test)]
fn assert_partitions(node: &OctantNode) {
    let Some(children) = node.children() else {
        return;
    };

    let mut union = children[0].aabb;
    for (idx, child) in children.iter().enumerate() {
        union.expand(child.aabb.start);
        union.expand(child.aabb.end);
        for other in &children[idx + 1..] {
            // Neighbours may share a face but never any volume
            let overlap = AABB::new(child.aabb.start.max(other.aabb.start), child.aabb.end.min(other.aabb.end));
            assert!(overlap.is_degenerate(), "{:?} overlaps {:?}", child.aabb, other.aabb);
        }
        assert_partitions(child);
    }
    assert_eq!(union, node.aabb);

    let child_volume: f32 = children.iter().map(|child| volume(&child.aabb)).sum();
    assert!((child_volume - volume(&node.aabb)).abs() <= volume(&node.aabb) * 1e-5);
}

#[test]
fn depth_zero_is_single_leaf() {
    let mut tree = OctantTree::build(0, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    assert!(tree.root().is_leaf());
    for i in 0..10 {
        tree.insert(Vec3::splat(i as f32 * 10.0)).unwrap();
    }
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.root().points().len(), 10);
    assert_eq!(tree.len(), 10);
}

#[test]
fn build_records_bounds_and_depth() {
    let (min, max) = (Vec3::new(-10.0, 0.0, 5.0), Vec3::new(30.0, 8.0, 6.0));
    let mut tree = OctantTree::build(2, min, max).unwrap();
    assert_eq!(tree.bounds(), AABB::new(min, max));
    assert_eq!(tree.max_depth(), 2);
    tree.insert(Vec3::new(100.0, 100.0, 100.0)).unwrap();
    assert_eq!(tree.bounds(), AABB::new(min, max));
}

#[test]
fn degenerate_box_is_single_leaf() {
    let tree = OctantTree::build(4, Vec3::ZERO, Vec3::new(100.0, 0.0, 100.0)).unwrap();
    assert!(tree.root().is_leaf());
    assert_eq!(tree.leaf_count(), 1);
}

#[test]
fn build_rejects_bad_input() {
    assert_eq!(
        OctantTree::build(8, Vec3::ZERO, Vec3::ONE).unwrap_err(),
        TreeError::DepthTooLarge { depth: 8, max: 7 }
    );
    assert!(matches!(
        OctantTree::build(2, Vec3::ONE, Vec3::ZERO),
        Err(TreeError::InvalidBounds { .. })
    ));

    let mut tree = OctantTree::build(2, Vec3::ZERO, Vec3::ONE).unwrap();
    assert!(tree.insert(Vec3::splat(f32::INFINITY)).is_err());
    assert!(tree.is_empty());
}

#[test]
fn children_partition_parent() {
    let tree = OctantTree::build(3, Vec3::new(-10.0, 0.0, 5.0), Vec3::new(30.0, 8.0, 6.0)).unwrap();
    assert_eq!(tree.leaf_count(), 512);
    assert_partitions(tree.root());
}

#[test]
fn geometry_does_not_depend_on_data() {
    let mut tree = OctantTree::build(2, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    let before: Vec<AABB> = tree.leaves().map(|leaf| leaf.aabb).collect();
    tree.insert(Vec3::splat(1.0)).unwrap();
    tree.insert(Vec3::splat(99.0)).unwrap();
    let after: Vec<AABB> = tree.leaves().map(|leaf| leaf.aabb).collect();
    assert_eq!(before, after);
}

#[test]
fn insert_routes_consistently() {
    let mut tree = OctantTree::build(4, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    let point = Vec3::new(12.0, 87.0, 50.0);
    let first = tree.insert(point).unwrap();
    let second = tree.insert(point).unwrap();
    assert_eq!(first, second);
    assert_eq!(tree.locate_leaf(point).aabb, first);
    assert_eq!(tree.locate_leaf(point).points(), &[point, point]);
    // The center plane belongs to the high side
    assert_eq!(first.start, Vec3::new(6.25, 81.25, 50.0));
}

#[test]
fn insert_outside_bounds_lands_on_edge() {
    let mut tree = OctantTree::build(2, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    let leaf = tree.insert(Vec3::new(-50.0, 150.0, 50.0)).unwrap();
    assert_eq!(leaf, AABB::new(Vec3::new(0.0, 75.0, 50.0), Vec3::new(25.0, 100.0, 75.0)));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.find_nearest_neighbour(Vec3::new(-50.0, 150.0, 50.0)), Some(Vec3::new(-50.0, 150.0, 50.0)));
}

#[test]
fn nearest_on_empty_tree() {
    let tree = OctantTree::build(3, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    assert_eq!(tree.find_nearest_neighbour(Vec3::splat(50.0)), None);
    assert_eq!(tree.nearest_or_sentinel(Vec3::splat(50.0)), crate::FAR_SENTINEL);
}

#[test]
fn nearest_searches_neighbouring_octants() {
    let mut tree = OctantTree::build(3, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    let points = [
        Vec3::new(51.0, 50.0, 50.0),
        Vec3::new(30.0, 30.0, 30.0),
        Vec3::new(90.0, 10.0, 10.0),
    ];
    points.iter().for_each(|point| { tree.insert(*point).unwrap(); });

    // The query sits in the low octant, the answer just across the center
    assert_eq!(tree.find_nearest_neighbour(Vec3::new(49.0, 49.0, 49.0)), Some(points[0]));
    assert_eq!(tree.find_nearest_neighbour(Vec3::new(80.0, 5.0, 0.0)), Some(points[2]));
    assert_eq!(tree.find_nearest_neighbour(Vec3::ZERO), Some(points[1]));
}

#[test]
fn aabb_query_is_strict() {
    let mut tree = OctantTree::build(2, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    for point in [Vec3::splat(15.0), Vec3::splat(20.0), Vec3::splat(40.0), Vec3::new(39.0, 39.0, 60.0)] {
        tree.insert(point).unwrap();
    }
    assert_eq!(tree.find_points_in_aabb(Vec3::splat(15.0), Vec3::splat(40.0)), vec![Vec3::splat(20.0)]);
    assert!(tree.find_points_in_aabb(Vec3::splat(200.0), Vec3::splat(300.0)).is_empty());
}

#[test]
fn dump_skips_empty_leaves() {
    let mut tree = OctantTree::build(1, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    tree.insert(Vec3::new(60.0, 10.0, 10.0)).unwrap();
    let dump = tree.dump(Vec3::new(60.0, 10.0, 13.0)).to_string();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines, vec![
        "[-], (50, 50, 50)",
        "    [leaf] (60, 10, 10) 3.0   ",
    ]);
}
