//! Two in-memory point indexes over 3D space, answering the same two
//! queries so their results can be checked against each other:
//!
//! - [`SplitTree`]: built once from a point set, splitting at the median
//!   of an axis that cycles x, y, z with depth.
//! - [`OctantTree`]: eight way subdivision of a fixed box, built up front,
//!   with points inserted afterwards.
//!
//! Both answer nearest neighbour and strict box containment queries
//! through [`SpatialIndex`].
#![warn(unused_extern_crates)]
use glam::Vec3;

pub use glam;

mod aabb;
pub use aabb::*;

mod error;
pub use error::{ Result, TreeError };

mod index;
pub use index::{ SpatialIndex, FAR_SENTINEL };

pub mod octant_tree;
pub use octant_tree::{ OctantIndex, OctantTree };

pub mod split_tree;
pub use split_tree::{ Axis, SplitTree };

pub mod utils;

/// Builds both indexes over `points`. The octant tree covers `bounds`.
pub fn build_both(max_depth: u8, points: &[Vec3], bounds: AABB) -> Result<(SplitTree, OctantTree)> {
    let split_tree = SplitTree::build(max_depth, points)?;
    let mut octant_tree = OctantTree::build(max_depth, bounds.start, bounds.end)?;
    for point in points {
        octant_tree.insert(*point)?;
    }
    Ok((split_tree, octant_tree))
}
