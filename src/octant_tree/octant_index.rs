use bitvec::prelude::*;
use glam::Vec3;

/// 3 bit index of a child octant relative to its parent's center.
/// ```text
/// Bit layout
/// 00000 1 0 1
///   |   | | |
///   |   | | --X (0 = low half, 1 = high half)
///   |   | ----Y
///   |   ------Z
///   ----------Unused, always 0
/// ```
/// Building the geometry and routing inserted points both go through
/// this type, so a child's box and the points routed into it always
/// agree on which half of each axis they occupy.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OctantIndex(u8);

impl OctantIndex {
    pub const ALL: [OctantIndex; 8] = [
        OctantIndex(0),
        OctantIndex(1),
        OctantIndex(2),
        OctantIndex(3),
        OctantIndex(4),
        OctantIndex(5),
        OctantIndex(6),
        OctantIndex(7),
    ];

    pub fn from_halves(high: [bool; 3]) -> Self {
        let mut index = 0u8;
        let bits = index.view_bits_mut::<Lsb0>();
        high.into_iter().enumerate().for_each(|(axis, high)| bits.set(axis, high));
        Self(index)
    }

    /// Which octant of a cell centered at `center` the point falls into.
    /// A coordinate equal to the center counts as the high half.
    pub fn locate(point: Vec3, center: Vec3) -> Self {
        let offset = point - center;
        Self::from_halves([
            offset.x >= 0.0,
            offset.y >= 0.0,
            offset.z >= 0.0,
        ])
    }

    #[inline]
    pub fn is_high(&self, axis: usize) -> bool {
        assert!(axis < 3, "axis out of range");
        self.0.view_bits::<Lsb0>()[axis]
    }

    #[inline(always)]
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

#[test]
fn octant_index_bits() {
    assert_eq!(OctantIndex::from_halves([false, false, false]).as_usize(), 0);
    assert_eq!(OctantIndex::from_halves([true, false, false]).as_usize(), 0b001);
    assert_eq!(OctantIndex::from_halves([false, true, false]).as_usize(), 0b010);
    assert_eq!(OctantIndex::from_halves([false, false, true]).as_usize(), 0b100);
    assert_eq!(OctantIndex::from_halves([true, false, true]).as_usize(), 0b101);

    let index = OctantIndex::ALL[6];
    assert!(!index.is_high(0));
    assert!(index.is_high(1));
    assert!(index.is_high(2));
}

#[test]
fn octant_index_round_trips_halves() {
    for index in OctantIndex::ALL {
        let halves = [index.is_high(0), index.is_high(1), index.is_high(2)];
        assert_eq!(OctantIndex::from_halves(halves), index);
    }
}

#[test]
fn locate_ties_go_high() {
    let center = Vec3::splat(50.0);
    assert_eq!(OctantIndex::locate(center, center).as_usize(), 7);
    assert_eq!(OctantIndex::locate(Vec3::new(49.0, 50.0, 10.0), center).as_usize(), 0b010);
    assert_eq!(OctantIndex::locate(Vec3::ZERO, center).as_usize(), 0);
}
