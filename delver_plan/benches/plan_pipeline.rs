// Benchmarks for the hot paths of plan generation: the descent A* search
// and a full `generate` + `expand` round on open rock.
//
// Run with `cargo bench -p delver_plan`.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use delver_plan::config::PlannerConfig;
use delver_plan::pathfinding::{DescentSpace, find_path};
use delver_plan::prng::seeded;
use delver_plan::safety::SafetyAnalyzer;
use delver_plan::{FortressPlanner, TileCoord, VoxelTerrain};

fn bench_descent_search(c: &mut Criterion) {
    let terrain = VoxelTerrain::with_surface(96, 96, 48, 40);
    let config = PlannerConfig::default();
    let analyzer = SafetyAnalyzer::new(&terrain, &config.safety);
    let start = TileCoord::new(48, 70, 40);
    let goal = TileCoord::new(48, 40, 22);
    let space = DescentSpace::new(&analyzer, &config.path, start, goal);

    c.bench_function("descent_search_30x18", |b| {
        b.iter(|| {
            find_path(
                black_box(start),
                black_box(goal),
                &space,
                config.path.max_explored_nodes,
            )
        })
    });
}

fn bench_generate(c: &mut Criterion) {
    let terrain = VoxelTerrain::with_surface(64, 64, 40, 30);
    let config = PlannerConfig::default();
    let planner = FortressPlanner::new(&terrain, &config);
    let anchor = TileCoord::new(32, 32, 30);

    c.bench_function("generate_64x64", |b| {
        b.iter(|| planner.generate(black_box(anchor), &mut seeded(1)))
    });

    c.bench_function("generate_and_expand_64x64", |b| {
        b.iter(|| {
            let Ok(plan) = planner.generate(anchor, &mut seeded(1)) else {
                return 0;
            };
            let mut graph = plan.into_graph();
            planner
                .expand(&mut graph, black_box(30), 10, &mut seeded(2))
                .tiles
                .len()
        })
    });
}

criterion_group!(benches, bench_descent_search, bench_generate);
criterion_main!(benches);
