use std::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use livegraph::{Graph, GraphConfig, Node, NodeType, QueryOptions};

const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_chain");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for nodes in [1_000usize, 10_000] {
        let ty = NodeType::new("Bench");
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, &nodes| {
            b.iter_batched(
                || (0..nodes).map(|_| Node::new(&ty)).collect::<Vec<_>>(),
                |handles| {
                    let config = GraphConfig::new()
                        .with_node_capacity(nodes)
                        .with_edge_capacity(nodes);
                    let graph = Graph::with_config(&config);
                    for pair in handles.windows(2) {
                        graph.add_edge(&pair[0], &pair[1], None).expect("edge");
                    }
                    graph
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_live_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("observer_recompute");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for nodes in [100usize, 1_000] {
        let graph = Graph::new();
        let ty = NodeType::new("Bench");
        let handles: Vec<Node> = (0..nodes).map(|_| Node::new(&ty)).collect();
        for pair in handles.windows(2) {
            graph.add_edge(&pair[0], &pair[1], None).expect("edge");
        }
        let observer = graph.observe(ty.to(&ty)).expect("observe");
        let cached = graph
            .query_with(&ty, QueryOptions::cached())
            .expect("query");
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| {
                let node = graph.add_node(&Node::new(&ty)).expect("add");
                graph.remove_node(&node).expect("remove");
                observer.added().len() + observer.removed().len() + cached.run().count()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_live_recompute);
criterion_main!(benches);
