use glam::Vec3;
use crate::{
    error::{ Result, TreeError },
    octant_tree::OctantIndex,
};

/// Axis-aligned box given by its minimum (`start`) and maximum (`end`) corner.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AABB {
    pub start: Vec3,
    pub end: Vec3,
}

impl AABB {
    #[inline]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Like `new`, but rejects non-finite corners and boxes where
    /// `start` lies above `end` on any axis.
    pub fn try_new(start: Vec3, end: Vec3) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start.cmpgt(end).any() {
            return Err(TreeError::InvalidBounds { start, end });
        }
        Ok(Self { start, end })
    }

    /// Tightest box around `points`, or `None` if there are none.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        rest.iter().for_each(|point| aabb.expand(*point));
        Some(aabb)
    }

    pub fn expand(&mut self, vec: Vec3) {
        self.start = self.start.min(vec);
        self.end = self.end.max(vec);
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.end - self.start
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// True if the box has no volume.
    pub fn is_degenerate(&self) -> bool {
        self.size().cmple(Vec3::ZERO).any()
    }

    /// Closed containment, boundary included.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.start).all() && point.cmple(self.end).all()
    }

    /// Strict containment on every axis. Points on the boundary are outside.
    pub fn contains_strict(&self, point: Vec3) -> bool {
        point.cmpgt(self.start).all() && point.cmplt(self.end).all()
    }

    /// Closed interval overlap test, so boxes that only touch still intersect.
    pub fn intersects(&self, other: &AABB) -> bool {
        !(self.end.cmplt(other.start).any() || other.end.cmplt(self.start).any())
    }

    /// Squared distance from `point` to the nearest point of the box.
    /// Zero if the point is inside.
    pub fn min_distance_squared(&self, point: Vec3) -> f32 {
        (point - point.clamp(self.start, self.end)).length_squared()
    }

    /// The corner of the box on the side of each axis selected by `octant`.
    pub fn corner(&self, octant: OctantIndex) -> Vec3 {
        let mut corner = self.start;
        (0..3).filter(|axis| octant.is_high(*axis)).for_each(|axis| {
            corner[axis] = self.end[axis];
        });
        corner
    }

    /// Splits the box into eight boxes that meet at its center, indexed
    /// by `OctantIndex`.
    pub fn octant_subdivide(&self) -> [AABB; 8] {
        let center = self.center();
        OctantIndex::ALL.map(|octant| {
            let corner = self.corner(octant);
            AABB {
                start: center.min(corner),
                end: center.max(corner),
            }
        })
    }
}

#[test]
fn octant_subdivide_test() {
    let aabb = AABB::new(Vec3::ZERO, Vec3::splat(100.0));

    let subdiv = aabb.octant_subdivide();
    assert_eq!(subdiv[0], AABB::new(Vec3::ZERO, Vec3::splat(50.0)));
    assert_eq!(subdiv[7], AABB::new(Vec3::splat(50.0), Vec3::splat(100.0)));
    assert_eq!(subdiv[0b001], AABB::new(Vec3::new(50.0, 0.0, 0.0), Vec3::new(100.0, 50.0, 50.0)));
    assert_eq!(subdiv[0b110], AABB::new(Vec3::new(0.0, 50.0, 50.0), Vec3::new(50.0, 100.0, 100.0)));

    let volume: f32 = subdiv.iter().map(|child| child.size().x * child.size().y * child.size().z).sum();
    assert_eq!(volume, 100.0 * 100.0 * 100.0);
}

#[test]
fn try_new_rejects_bad_bounds() {
    assert!(AABB::try_new(Vec3::ZERO, Vec3::ONE).is_ok());
    assert!(AABB::try_new(Vec3::ONE, Vec3::ONE).is_ok());
    assert_eq!(
        AABB::try_new(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE),
        Err(TreeError::InvalidBounds { start: Vec3::new(0.0, 2.0, 0.0), end: Vec3::ONE })
    );
    assert!(AABB::try_new(Vec3::ZERO, Vec3::new(f32::NAN, 1.0, 1.0)).is_err());
    assert!(AABB::try_new(Vec3::splat(f32::NEG_INFINITY), Vec3::ONE).is_err());
}

#[test]
fn contains_strict_excludes_boundary() {
    let aabb = AABB::new(Vec3::splat(15.0), Vec3::splat(40.0));
    assert!(aabb.contains_strict(Vec3::splat(20.0)));
    assert!(!aabb.contains_strict(Vec3::new(15.0, 20.0, 20.0)));
    assert!(!aabb.contains_strict(Vec3::new(20.0, 40.0, 20.0)));
    assert!(!aabb.contains_strict(Vec3::new(20.0, 20.0, 41.0)));
}

#[test]
fn intersects_counts_touching() {
    let aabb = AABB::new(Vec3::ZERO, Vec3::ONE);
    assert!(aabb.intersects(&AABB::new(Vec3::splat(0.5), Vec3::splat(2.0))));
    assert!(aabb.intersects(&AABB::new(Vec3::ONE, Vec3::splat(2.0))));
    assert!(aabb.intersects(&AABB::new(Vec3::splat(0.25), Vec3::splat(0.75))));
    assert!(!aabb.intersects(&AABB::new(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(2.0))));
    assert!(!AABB::new(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(2.0)).intersects(&aabb));
}

#[test]
fn min_distance_to_box() {
    let aabb = AABB::new(Vec3::ZERO, Vec3::splat(10.0));
    assert_eq!(aabb.min_distance_squared(Vec3::splat(5.0)), 0.0);
    assert_eq!(aabb.min_distance_squared(Vec3::new(10.0, 0.0, 5.0)), 0.0);
    assert_eq!(aabb.min_distance_squared(Vec3::new(13.0, 14.0, 5.0)), 25.0);
    assert_eq!(aabb.min_distance_squared(Vec3::new(-1.0, -2.0, -2.0)), 9.0);
}

#[test]
fn from_points_bounds() {
    assert_eq!(AABB::from_points(&[]), None);
    let aabb = AABB::from_points(&[
        Vec3::new(1.0, 5.0, -2.0),
        Vec3::new(3.0, -1.0, 0.0),
        Vec3::new(2.0, 2.0, 7.0),
    ]).unwrap();
    assert_eq!(aabb, AABB::new(Vec3::new(1.0, -1.0, -2.0), Vec3::new(3.0, 5.0, 7.0)));
    assert!(!aabb.is_degenerate());
    assert!(AABB::new(Vec3::ONE, Vec3::new(2.0, 1.0, 2.0)).is_degenerate());
}
