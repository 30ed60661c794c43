use glam::Vec3;

/// Stand-in result for callers that want a point instead of an `Option`
/// when an index holds nothing.
pub const FAR_SENTINEL: Vec3 = Vec3::splat(1_000_000.0);

/// Query operations shared by both point indexes.
pub trait SpatialIndex {
    /// The indexed point closest to `point`, or `None` if nothing is indexed.
    fn nearest_neighbour(&self, point: Vec3) -> Option<Vec3>;

    /// Every indexed point strictly inside the box `(min, max)`, in no
    /// particular order.
    fn points_in_aabb(&self, min: Vec3, max: Vec3) -> Vec<Vec3>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn nearest_or_sentinel(&self, point: Vec3) -> Vec3 {
        self.nearest_neighbour(point).unwrap_or(FAR_SENTINEL)
    }
}

/// Best point found so far during a nearest neighbour search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub point: Vec3,
    pub distance_squared: f32,
}

/// Running best of a nearest neighbour search. Starts out infinitely far.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NearestSearch {
    pub target: Vec3,
    pub best: Option<Candidate>,
}

impl NearestSearch {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            best: None,
        }
    }

    /// Squared distance to the current best, infinite before any candidate.
    #[inline]
    pub fn bound_squared(&self) -> f32 {
        self.best.map_or(f32::INFINITY, |best| best.distance_squared)
    }

    /// Keeps `point` if it is the first candidate or strictly closer than
    /// the current best. The first candidate is always kept, even when its
    /// squared distance overflows to infinity.
    pub fn offer(&mut self, point: Vec3) {
        let distance_squared = (point - self.target).length_squared();
        if self.best.is_none() || distance_squared < self.bound_squared() {
            self.best = Some(Candidate { point, distance_squared });
        }
    }

    pub fn offer_all(&mut self, points: &[Vec3]) {
        points.iter().for_each(|point| self.offer(*point));
    }

    pub fn result(&self) -> Option<Vec3> {
        self.best.map(|best| best.point)
    }
}

#[test]
fn nearest_search_keeps_first_of_ties() {
    let mut search = NearestSearch::new(Vec3::ZERO);
    assert_eq!(search.bound_squared(), f32::INFINITY);
    assert_eq!(search.result(), None);

    search.offer_all(&[Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, -2.0)]);
    assert_eq!(search.result(), Some(Vec3::new(0.0, 2.0, 0.0)));
    assert_eq!(search.bound_squared(), 4.0);
}

#[test]
fn nearest_search_accepts_overflowing_distance() {
    let mut search = NearestSearch::new(Vec3::splat(3.0e19));
    search.offer(Vec3::ZERO);
    assert_eq!(search.bound_squared(), f32::INFINITY);
    assert_eq!(search.result(), Some(Vec3::ZERO));

    search.offer(Vec3::ONE);
    assert_eq!(search.result(), Some(Vec3::ZERO));
}
