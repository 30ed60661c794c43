use glam::Vec3;
use ordered_float::OrderedFloat;
use crate::AABB;

/// Evaluates an expression, logs how long it took, and returns its value.
#[macro_export]
macro_rules! time_test {
    ($expr:expr, $name:expr) => {{
        let start = ::std::time::Instant::now();
        let result = $expr;
        ::log::info!("{}: {:?}", $name, start.elapsed());
        result
    }};
}

pub use crate::time_test;

/// Linear scan for the point of `points` closest to `target`.
pub fn brute_force_nearest(points: &[Vec3], target: Vec3) -> Option<Vec3> {
    points.iter()
        .copied()
        .min_by_key(|point| OrderedFloat((*point - target).length_squared()))
}

/// Linear scan for the points of `points` strictly inside `(min, max)`.
pub fn brute_force_in_aabb(points: &[Vec3], min: Vec3, max: Vec3) -> Vec<Vec3> {
    let aabb = AABB::new(min, max);
    points.iter()
        .copied()
        .filter(|point| aabb.contains_strict(*point))
        .collect()
}

/// Total order on points, comparing x, then y, then z.
pub fn point_key(point: &Vec3) -> [OrderedFloat<f32>; 3] {
    point.to_array().map(OrderedFloat)
}

/// Sorts points by `point_key` so result sets from different indexes
/// can be compared element by element.
pub fn sort_points(points: &mut [Vec3]) {
    points.sort_by_key(point_key);
}

#[test]
fn brute_force_nearest_test() {
    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(4.0, 4.0, 4.0),
    ];
    assert_eq!(brute_force_nearest(&points, Vec3::new(9.0, 1.0, 0.0)), Some(points[1]));
    assert_eq!(brute_force_nearest(&points, Vec3::splat(3.0)), Some(points[2]));
    assert_eq!(brute_force_nearest(&[], Vec3::ZERO), None);
}

#[test]
fn sort_points_test() {
    let mut points = vec![
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(1.0, 5.0, 0.0),
        Vec3::new(1.0, 2.0, 9.0),
        Vec3::new(1.0, 2.0, 3.0),
    ];
    sort_points(&mut points);
    assert_eq!(points, vec![
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(1.0, 2.0, 9.0),
        Vec3::new(1.0, 5.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
    ]);
}
