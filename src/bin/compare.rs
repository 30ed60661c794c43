//! Builds both indexes over the same random point set and cross-checks
//! their answers against each other and against a linear scan.

use std::process::ExitCode;
use clap::Parser;
use pie_spatial::{
    glam::Vec3,
    utils::{ brute_force_in_aabb, brute_force_nearest, sort_points, time_test },
    OctantTree, SpatialIndex, SplitTree, TreeError, AABB,
};
use rand::{ rngs::StdRng, Rng, SeedableRng };

/// Split tree vs octant tree comparison.
#[derive(Parser, Debug)]
#[command(name = "compare")]
#[command(about = "Cross-checks the split tree and octant tree on random points")]
struct Args {
    /// Random seed.
    #[arg(long, default_value_t = 1987)]
    seed: u64,

    /// Number of indexed points.
    #[arg(short, long, default_value_t = 300)]
    points: usize,

    /// Number of nearest neighbour queries.
    #[arg(short, long, default_value_t = 10)]
    queries: usize,

    /// Maximum depth of both trees.
    #[arg(short, long, default_value_t = 4)]
    depth: u8,

    /// Points are drawn from [0, extent) on each axis, in whole numbers.
    #[arg(short, long, default_value_t = 100)]
    extent: u32,

    /// Minimum corner of the range query, on every axis.
    #[arg(long, default_value_t = 15.0)]
    box_min: f32,

    /// Maximum corner of the range query, on every axis.
    #[arg(long, default_value_t = 40.0)]
    box_max: f32,

    /// Print both trees with distances to the origin.
    #[arg(long)]
    dump: bool,
}

fn random_point(rng: &mut StdRng, extent: u32) -> Vec3 {
    Vec3::new(
        rng.random_range(0..extent) as f32,
        rng.random_range(0..extent) as f32,
        rng.random_range(0..extent) as f32,
    )
}

fn main() -> Result<ExitCode, TreeError> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let extent = args.extent.max(1);
    let points: Vec<Vec3> = (0..args.points).map(|_| random_point(&mut rng, extent)).collect();
    let queries: Vec<Vec3> = (0..args.queries).map(|_| random_point(&mut rng, extent)).collect();
    log::info!("Generated {} points spanning {:?}", points.len(), AABB::from_points(&points));

    let split_tree = time_test!(SplitTree::build(args.depth, &points)?, "SplitTree Build");
    let mut octant_tree = time_test!(
        OctantTree::build(args.depth, Vec3::ZERO, Vec3::splat(extent as f32))?,
        "OctantTree Build"
    );
    time_test!(
        points.iter().try_for_each(|point| octant_tree.insert(*point).map(|_| ()))?,
        "OctantTree Insert"
    );

    if args.dump {
        println!("{}", split_tree.dump(Vec3::ZERO));
        println!("{}", octant_tree.dump(Vec3::ZERO));
    }

    let mut failures = 0;
    for (idx, query) in queries.iter().enumerate() {
        let distance = |found: Option<Vec3>| found.map(|found| found.distance(*query));
        let split = distance(split_tree.nearest_neighbour(*query));
        let octant = distance(octant_tree.nearest_neighbour(*query));
        let expected = distance(brute_force_nearest(&points, *query));

        if split == expected && octant == expected {
            println!("{idx} pass");
        } else {
            println!("{idx} failed");
            log::error!(
                "Query {query}: split tree {:?}, octant tree {:?}, linear scan {:?}",
                split, octant, expected
            );
            failures += 1;
        }
    }

    let (min, max) = (Vec3::splat(args.box_min), Vec3::splat(args.box_max));
    let mut split_found = time_test!(split_tree.points_in_aabb(min, max), "SplitTree AABB Query");
    let mut octant_found = time_test!(octant_tree.points_in_aabb(min, max), "OctantTree AABB Query");
    let mut expected = brute_force_in_aabb(&points, min, max);
    sort_points(&mut split_found);
    sort_points(&mut octant_found);
    sort_points(&mut expected);

    if split_found == expected && octant_found == expected {
        println!("aabb passed ({} points)", expected.len());
    } else {
        println!("aabb failed");
        log::error!(
            "AABB query found {} (split tree), {} (octant tree), {} (linear scan) points",
            split_found.len(), octant_found.len(), expected.len()
        );
        failures += 1;
    }

    Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
