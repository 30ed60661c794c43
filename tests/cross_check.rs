use pie_spatial::{
    glam::Vec3,
    utils::{ brute_force_in_aabb, brute_force_nearest, sort_points },
    build_both, OctantTree, SpatialIndex, SplitTree, AABB,
};
use rand::{ rngs::StdRng, Rng, SeedableRng };

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_whole_point(rng: &mut StdRng, extent: u32) -> Vec3 {
    Vec3::new(
        rng.random_range(0..extent) as f32,
        rng.random_range(0..extent) as f32,
        rng.random_range(0..extent) as f32,
    )
}

fn random_point(rng: &mut StdRng, min: f32, max: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(min..max),
        rng.random_range(min..max),
        rng.random_range(min..max),
    )
}

fn nearest_distance(index: &impl SpatialIndex, query: Vec3) -> Option<f32> {
    index.nearest_neighbour(query).map(|found| found.distance_squared(query))
}

fn sorted(mut points: Vec<Vec3>) -> Vec<Vec3> {
    sort_points(&mut points);
    points
}

#[test]
fn reference_workload() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(1987);
    let points: Vec<Vec3> = (0..300).map(|_| random_whole_point(&mut rng, 100)).collect();
    let queries: Vec<Vec3> = (0..10).map(|_| random_whole_point(&mut rng, 100)).collect();

    let split_tree = SplitTree::build(4, &points).unwrap();
    let mut octant_tree = OctantTree::build(4, Vec3::ZERO, Vec3::splat(100.0)).unwrap();
    for point in &points {
        octant_tree.insert(*point).unwrap();
    }
    assert_eq!(split_tree.len(), 300);
    assert_eq!(octant_tree.len(), 300);

    for query in queries {
        let expected = brute_force_nearest(&points, query).map(|found| found.distance_squared(query));
        assert!(expected.is_some());
        assert_eq!(nearest_distance(&split_tree, query), expected, "split tree, query {query}");
        assert_eq!(nearest_distance(&octant_tree, query), expected, "octant tree, query {query}");
    }

    let (min, max) = (Vec3::splat(15.0), Vec3::splat(40.0));
    let split_found = sorted(split_tree.find_points_in_aabb(min, max));
    let octant_found = sorted(octant_tree.find_points_in_aabb(min, max));
    assert_eq!(split_found, octant_found);
    assert_eq!(split_found, sorted(brute_force_in_aabb(&points, min, max)));
}

#[test]
fn nearest_matches_linear_scan() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(42);
    let bounds = AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0));

    for (count, depth) in [(0, 3), (1, 3), (2, 5), (17, 0), (64, 2), (500, 5), (1000, 6)] {
        let points: Vec<Vec3> = (0..count).map(|_| random_point(&mut rng, -50.0, 50.0)).collect();
        let (split_tree, octant_tree) = build_both(depth, &points, bounds).unwrap();

        for _ in 0..50 {
            // Some queries fall outside the indexed volume
            let query = random_point(&mut rng, -80.0, 80.0);
            let expected = brute_force_nearest(&points, query).map(|found| found.distance_squared(query));
            assert_eq!(nearest_distance(&split_tree, query), expected, "split tree, {count} points, depth {depth}");
            assert_eq!(nearest_distance(&octant_tree, query), expected, "octant tree, {count} points, depth {depth}");
        }
    }
}

#[test]
fn nearest_with_many_ties() {
    // Small integer grid so split values and octant centers collide with points
    let mut rng = StdRng::seed_from_u64(7);
    let points: Vec<Vec3> = (0..400).map(|_| random_whole_point(&mut rng, 8)).collect();
    let (split_tree, octant_tree) = build_both(5, &points, AABB::new(Vec3::ZERO, Vec3::splat(8.0))).unwrap();

    for _ in 0..100 {
        let query = random_whole_point(&mut rng, 8) + Vec3::splat(0.5);
        let expected = brute_force_nearest(&points, query).map(|found| found.distance_squared(query));
        assert_eq!(nearest_distance(&split_tree, query), expected);
        assert_eq!(nearest_distance(&octant_tree, query), expected);
    }

    let query = points[0];
    assert_eq!(split_tree.find_nearest_neighbour(query), Some(query));
    assert_eq!(octant_tree.find_nearest_neighbour(query), Some(query));
}

#[test]
fn range_matches_linear_scan() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(99);
    let points: Vec<Vec3> = (0..800).map(|_| random_whole_point(&mut rng, 100)).collect();
    let (split_tree, octant_tree) = build_both(5, &points, AABB::new(Vec3::ZERO, Vec3::splat(100.0))).unwrap();

    for _ in 0..100 {
        let a = random_whole_point(&mut rng, 110) - Vec3::splat(5.0);
        let b = random_whole_point(&mut rng, 110) - Vec3::splat(5.0);
        let (min, max) = (a.min(b), a.max(b));

        let expected = sorted(brute_force_in_aabb(&points, min, max));
        assert_eq!(sorted(split_tree.points_in_aabb(min, max)), expected, "split tree, box {min} {max}");
        assert_eq!(sorted(octant_tree.points_in_aabb(min, max)), expected, "octant tree, box {min} {max}");
    }

    // Whole volume, boundary points excluded
    let expected = sorted(brute_force_in_aabb(&points, Vec3::ZERO, Vec3::splat(99.0)));
    assert!(expected.iter().all(|point| point.cmpgt(Vec3::ZERO).all() && point.cmplt(Vec3::splat(99.0)).all()));
    assert_eq!(sorted(split_tree.points_in_aabb(Vec3::ZERO, Vec3::splat(99.0))), expected);
    assert_eq!(sorted(octant_tree.points_in_aabb(Vec3::ZERO, Vec3::splat(99.0))), expected);
}

#[test]
fn depth_zero_holds_everything() {
    let mut rng = StdRng::seed_from_u64(3);
    let points: Vec<Vec3> = (0..50).map(|_| random_whole_point(&mut rng, 10)).collect();
    let (split_tree, octant_tree) = build_both(0, &points, AABB::new(Vec3::ZERO, Vec3::splat(10.0))).unwrap();

    assert_eq!(split_tree.leaf_count(), 1);
    assert_eq!(octant_tree.leaf_count(), 1);
    assert_eq!(sorted(octant_tree.root().points().to_vec()), sorted(points.clone()));

    let query = Vec3::splat(4.2);
    let expected = brute_force_nearest(&points, query).map(|found| found.distance_squared(query));
    assert_eq!(nearest_distance(&split_tree, query), expected);
    assert_eq!(nearest_distance(&octant_tree, query), expected);
}

#[test]
fn every_point_lands_in_its_leaf() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut tree = OctantTree::build(3, Vec3::ZERO, Vec3::splat(64.0)).unwrap();
    for _ in 0..200 {
        let point = random_point(&mut rng, 0.0, 64.0);
        let leaf = tree.insert(point).unwrap();
        assert!(leaf.contains(point), "{point} routed to {leaf:?}");
        assert_eq!(tree.insert(point).unwrap(), leaf);
    }
    assert_eq!(tree.len(), 400);
    assert_eq!(tree.leaves().map(|leaf| leaf.points().len()).sum::<usize>(), 400);
}

#[test]
fn nearest_with_overflowing_distance() {
    // Squared distances to every point overflow f32
    let points = [
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(-4.0, 0.0, 2.0),
        Vec3::new(5.0, 5.0, -1.0),
    ];
    let (split_tree, octant_tree) = build_both(3, &points, AABB::new(Vec3::splat(-10.0), Vec3::splat(10.0))).unwrap();
    let query = Vec3::splat(3.0e19);

    assert!(brute_force_nearest(&points, query).is_some());
    let split = split_tree.find_nearest_neighbour(query);
    let octant = octant_tree.find_nearest_neighbour(query);
    assert!(split.is_some_and(|found| points.contains(&found)), "split tree found {split:?}");
    assert!(octant.is_some_and(|found| points.contains(&found)), "octant tree found {octant:?}");
    assert_ne!(split_tree.nearest_or_sentinel(query), pie_spatial::FAR_SENTINEL);
    assert_ne!(octant_tree.nearest_or_sentinel(query), pie_spatial::FAR_SENTINEL);
}
