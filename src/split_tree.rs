use std::fmt;
use glam::Vec3;
use ordered_float::OrderedFloat;
use crate::{
    error::{ self, Result },
    index::{ NearestSearch, SpatialIndex },
    AABB,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The axis split on one level further down the tree.
    pub fn next(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    pub fn name(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

#[derive(Debug)]
pub enum SplitNode {
    /// Points with `point[axis] < split` live under `low`, all others under `high`.
    Internal {
        axis: Axis,
        split: f32,
        low: Box<SplitNode>,
        high: Box<SplitNode>,
    },
    Leaf {
        points: Vec<Vec3>,
    },
}

impl SplitNode {
    fn build(depth: u8, axis: Axis, mut points: Vec<Vec3>) -> SplitNode {
        if depth == 0 || points.len() < SplitTree::MIN_SPLIT_LEN {
            return SplitNode::Leaf { points };
        }

        let coord = |point: &Vec3| OrderedFloat(point[axis.index()]);
        points.sort_by_key(coord);

        // The element at the midpoint decides the split value. Anything
        // tied with it goes high along with it.
        let split = points[points.len() / 2][axis.index()];
        let split_at = points.partition_point(|point| point[axis.index()] < split);
        let high = points.split_off(split_at);

        SplitNode::Internal {
            axis,
            split,
            low: Box::new(SplitNode::build(depth - 1, axis.next(), points)),
            high: Box::new(SplitNode::build(depth - 1, axis.next(), high)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, SplitNode::Leaf { .. })
    }

    fn nearest(&self, search: &mut NearestSearch) {
        match self {
            SplitNode::Leaf { points } => search.offer_all(points),
            SplitNode::Internal { axis, split, low, high } => {
                let offset = search.target[axis.index()] - split;
                let (near, far) = if offset < 0.0 { (low, high) } else { (high, low) };

                near.nearest(search);

                // The far side can only hold something closer if the split
                // plane is no farther away than the current best.
                if offset * offset <= search.bound_squared() {
                    far.nearest(search);
                }
            }
        }
    }

    fn points_in_aabb(&self, aabb: &AABB, out: &mut Vec<Vec3>) {
        match self {
            SplitNode::Leaf { points } => {
                out.extend(points.iter().filter(|point| aabb.contains_strict(**point)))
            }
            SplitNode::Internal { axis, split, low, high } => {
                if aabb.start[axis.index()] < *split {
                    low.points_in_aabb(aabb, out);
                }
                if aabb.end[axis.index()] > *split {
                    high.points_in_aabb(aabb, out);
                }
            }
        }
    }

    fn count(&self) -> (usize, usize) {
        match self {
            SplitNode::Leaf { .. } => (1, 0),
            SplitNode::Internal { low, high, .. } => {
                let (low_leaves, low_internal) = low.count();
                let (high_leaves, high_internal) = high.count();
                (low_leaves + high_leaves, low_internal + high_internal + 1)
            }
        }
    }

    fn write_dump(&self, f: &mut fmt::Formatter<'_>, level: usize, reference: Vec3) -> fmt::Result {
        let indent = " ".repeat(level * 4);
        match self {
            SplitNode::Leaf { points } => {
                write!(f, "{indent}[leaf] ")?;
                for point in points {
                    write!(f, "({:.0}, {:.0}, {:.0}) {:.1}   ", point.x, point.y, point.z, point.distance(reference))?;
                }
                writeln!(f)
            }
            SplitNode::Internal { axis, split, low, high } => {
                writeln!(f, "{indent}[-] {} {:.0}", axis.name(), split)?;
                low.write_dump(f, level + 1, reference)?;
                high.write_dump(f, level + 1, reference)
            }
        }
    }
}

/// Binary partition of a fixed point set, split at the median coordinate
/// of an axis that cycles x, y, z with depth. Built once, read-only after.
#[derive(Debug)]
pub struct SplitTree {
    root: SplitNode,
    max_depth: u8,
    len: usize,
}

impl SplitTree {
    /// Nodes holding fewer points than this are never split.
    pub const MIN_SPLIT_LEN: usize = 3;

    /// Builds the tree over a copy of `points`.
    pub fn build(max_depth: u8, points: &[Vec3]) -> Result<Self> {
        for point in points {
            error::check_finite(*point)?;
        }

        let root = SplitNode::build(max_depth, Axis::X, points.to_vec());
        let tree = Self {
            root,
            max_depth,
            len: points.len(),
        };

        if log::log_enabled!(log::Level::Debug) {
            let (leaves, internal) = tree.root.count();
            log::debug!(
                "Built split tree over {} points: depth {}, {} internal nodes, {} leaves",
                tree.len, max_depth, internal, leaves
            );
        }

        Ok(tree)
    }

    pub fn root(&self) -> &SplitNode {
        &self.root
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn leaf_count(&self) -> usize {
        self.root.count().0
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

    /// Human readable tree layout, listing each leaf point with its
    /// distance to `reference`.
    pub fn dump(&self, reference: Vec3) -> SplitTreeDump<'_> {
        SplitTreeDump {
            tree: self,
            reference,
        }
    }
}

impl SpatialIndex for SplitTree {
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

pub struct SplitTreeDump<'a> {
    tree: &'a SplitTree,
    reference: Vec3,
}

impl fmt::Display for SplitTreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree.root.write_dump(f, 0, self.reference)
    }
}

#[cfg(test)]
fn leaf_sizes(node: &SplitNode, out: &mut Vec<usize>) {
    match node {
        SplitNode::Leaf { points } => out.push(points.len()),
        SplitNode::Internal { low, high, .. } => {
            leaf_sizes(low, out);
            leaf_sizes(high, out);
        }
    }
}

#[test]
fn empty_build_is_single_leaf() {
    let tree = SplitTree::build(4, &[]).unwrap();
    assert!(tree.root().is_leaf());
    assert!(tree.is_empty());
    assert_eq!(tree.find_nearest_neighbour(Vec3::ZERO), None);
    assert_eq!(tree.nearest_or_sentinel(Vec3::ZERO), crate::FAR_SENTINEL);
    assert!(tree.find_points_in_aabb(Vec3::splat(-1.0), Vec3::ONE).is_empty());
}

#[test]
fn depth_zero_is_single_leaf() {
    let points: Vec<Vec3> = (0..20).map(|i| Vec3::splat(i as f32)).collect();
    let tree = SplitTree::build(0, &points).unwrap();
    match tree.root() {
        SplitNode::Leaf { points: leaf } => assert_eq!(leaf.len(), 20),
        SplitNode::Internal { .. } => panic!("depth 0 tree should be a leaf"),
    }
    assert_eq!(tree.find_nearest_neighbour(Vec3::new(6.2, 6.0, 5.9)), Some(Vec3::splat(6.0)));
}

#[test]
fn small_sets_are_not_split() {
    let tree = SplitTree::build(8, &[Vec3::ZERO, Vec3::ONE]).unwrap();
    assert!(tree.root().is_leaf());
    assert_eq!(tree.max_depth(), 8);
    assert_eq!(tree.leaf_count(), 1);
}

#[test]
fn split_at_median_and_cycle_axes() {
    let points = [
        Vec3::new(3.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(4.0, 2.0, 0.0),
        Vec3::new(0.0, 3.0, 0.0),
        Vec3::new(2.0, 4.0, 0.0),
    ];
    let tree = SplitTree::build(2, &points).unwrap();
    let SplitNode::Internal { axis, split, low, high } = tree.root() else {
        panic!("root should be internal");
    };
    assert_eq!(*axis, Axis::X);
    // Sorted x: 0 1 2 3 4, midpoint index 2.
    assert_eq!(*split, 2.0);
    // Two points low, three high.
    assert!(low.is_leaf());
    let SplitNode::Internal { axis, .. } = high.as_ref() else {
        panic!("high side of five points should split again");
    };
    assert_eq!(*axis, Axis::Y);

    let mut sizes = Vec::new();
    leaf_sizes(tree.root(), &mut sizes);
    assert_eq!(sizes.iter().sum::<usize>(), 5);
}

#[test]
fn duplicates_at_split_go_high() {
    let points = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(2.0, 2.0, 0.0),
    ];
    let tree = SplitTree::build(1, &points).unwrap();
    let SplitNode::Internal { split, low, high, .. } = tree.root() else {
        panic!("root should be internal");
    };
    assert_eq!(*split, 2.0);
    match (low.as_ref(), high.as_ref()) {
        (SplitNode::Leaf { points: low }, SplitNode::Leaf { points: high }) => {
            assert_eq!(low, &vec![Vec3::new(1.0, 0.0, 0.0)]);
            assert_eq!(high.len(), 3);
            assert!(high.iter().all(|point| point.x == 2.0));
        }
        _ => panic!("depth 1 children should be leaves"),
    }
}

#[test]
fn nearest_crosses_split_plane() {
    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(4.9, 0.0, 0.0),
        Vec3::new(5.0, 9.0, 9.0),
        Vec3::new(9.0, 9.0, 9.0),
    ];
    let tree = SplitTree::build(3, &points).unwrap();
    // The query falls on the high side, the answer is on the low side.
    assert_eq!(tree.find_nearest_neighbour(Vec3::new(5.1, 0.0, 0.0)), Some(Vec3::new(4.9, 0.0, 0.0)));
}

#[test]
fn aabb_is_strict() {
    let points = [
        Vec3::splat(15.0),
        Vec3::splat(20.0),
        Vec3::splat(40.0),
        Vec3::new(20.0, 20.0, 41.0),
    ];
    let tree = SplitTree::build(4, &points).unwrap();
    assert_eq!(tree.find_points_in_aabb(Vec3::splat(15.0), Vec3::splat(40.0)), vec![Vec3::splat(20.0)]);
    assert!(tree.find_points_in_aabb(Vec3::splat(40.0), Vec3::splat(15.0)).is_empty());
}

#[test]
fn build_rejects_non_finite() {
    let bad = Vec3::new(1.0, f32::NAN, 0.0);
    assert!(matches!(
        SplitTree::build(4, &[Vec3::ZERO, bad]),
        Err(crate::TreeError::NonFinitePoint(_))
    ));
}

#[test]
fn queries_do_not_reorder_leaves() {
    let points = [
        Vec3::new(9.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, 0.0),
    ];
    let tree = SplitTree::build(0, &points).unwrap();
    let before = tree.dump(Vec3::ZERO).to_string();
    assert_eq!(tree.find_nearest_neighbour(Vec3::ZERO), Some(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(tree.dump(Vec3::ZERO).to_string(), before);
}

#[test]
fn dump_layout() {
    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(3.0, 4.0, 0.0),
        Vec3::new(6.0, 8.0, 0.0),
    ];
    let tree = SplitTree::build(1, &points).unwrap();
    let dump = tree.dump(Vec3::ZERO).to_string();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines[0], "[-] x 3");
    assert_eq!(lines[1], "    [leaf] (0, 0, 0) 0.0   ");
    assert_eq!(lines[2], "    [leaf] (3, 4, 0) 5.0   (6, 8, 0) 10.0   ");
}
