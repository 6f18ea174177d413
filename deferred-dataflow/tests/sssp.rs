use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use rand::{Rng, SeedableRng, StdRng};

use deferred_dataflow::algorithms::graphs::sssp::{sssp, sssp_rounds, validate_edge};
use deferred_dataflow::operators::{Capture, CaptureHandle};
use deferred_dataflow::{Config, InputSession, TieBreak, Worker};

type Node = u32;
type Edge = (Node, (Node, u64));

/// Distances from `root` by Dijkstra's algorithm, in the form the dataflow accumulates to.
fn dijkstra(edges: &[Edge], root: Node) -> Vec<((Node, u64), isize)> {
    let mut adjacency: HashMap<Node, Vec<(Node, u64)>> = HashMap::new();
    for &(src, (dst, weight)) in edges.iter() {
        adjacency.entry(src).or_default().push((dst, weight));
    }

    let mut settled = BTreeMap::new();
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0u64, root)));
    while let Some(Reverse((dist, node))) = heap.pop() {
        if settled.contains_key(&node) {
            continue;
        }
        settled.insert(node, dist);
        for &(next, weight) in adjacency.get(&node).into_iter().flatten() {
            if !settled.contains_key(&next) {
                heap.push(Reverse((dist + weight, next)));
            }
        }
    }
    settled.into_iter().map(|(node, dist)| ((node, dist), 1)).collect()
}

struct Harness {
    worker: Worker<u64>,
    edges: InputSession<u64, Edge>,
    roots: InputSession<u64, Node>,
    ordered: CaptureHandle<u64, (Node, u64)>,
    rounds: CaptureHandle<u64, (Node, u64)>,
}

impl Harness {
    fn new(config: Config) -> Self {
        let mut worker = Worker::new(config).unwrap();
        let (edges, roots, ordered, rounds) = worker.dataflow(|scope| {
            let (edge_input, edges) = scope.new_collection();
            let (root_input, roots) = scope.new_collection();
            let ordered = sssp(&edges, &roots).capture();
            let rounds = sssp_rounds(&edges, &roots).capture();
            (edge_input, root_input, ordered, rounds)
        });
        Harness { worker, edges, roots, ordered, rounds }
    }

    /// Advances both inputs to `time` and runs all work before it.
    fn advance_to(&mut self, time: u64) {
        self.edges.advance_to(time).unwrap();
        self.roots.advance_to(time).unwrap();
        let ordered = self.ordered.probe().clone();
        let rounds = self.rounds.probe().clone();
        self.worker.step_while(|| ordered.less_than(&time) || rounds.less_than(&time));
        assert!(!ordered.less_than(&time));
        assert!(!rounds.less_than(&time));
    }
}

#[test]
fn scenario_with_edge_update() {
    let mut harness = Harness::new(Config::default());
    harness.edges.insert(('A' as Node, ('B' as Node, 1)));
    harness.edges.insert(('B' as Node, ('C' as Node, 1)));
    harness.edges.insert(('A' as Node, ('C' as Node, 5)));
    harness.roots.insert('A' as Node);
    harness.advance_to(1);

    let expected = vec![(('A' as Node, 0), 1), (('B' as Node, 1), 1), (('C' as Node, 2), 1)];
    assert_eq!(harness.ordered.accumulate_until(&0), expected);
    assert_eq!(harness.rounds.accumulate_until(&0), expected);

    harness.edges.remove(('B' as Node, ('C' as Node, 1)));
    harness.edges.insert(('B' as Node, ('C' as Node, 10)));
    harness.advance_to(2);

    let changes: Vec<_> = harness.ordered.updates().into_iter().filter(|(_, time, _)| *time == 1).collect();
    assert_eq!(changes, vec![(('C' as Node, 2), 1, -1), (('C' as Node, 5), 1, 1)]);
    assert!(harness.worker.take_errors().is_empty());
}

#[test]
fn unreachable_nodes_are_absent() {
    let mut harness = Harness::new(Config::default());
    harness.edges.insert((0, (1, 4)));
    harness.edges.insert((2, (3, 1)));
    harness.roots.insert(0);
    harness.advance_to(1);
    assert_eq!(harness.ordered.accumulate_until(&0), vec![((0, 0), 1), ((1, 4), 1)]);

    // connecting the second component brings it into reach.
    harness.edges.insert((1, (2, 2)));
    harness.advance_to(2);
    assert_eq!(harness.ordered.accumulate_until(&1), vec![((0, 0), 1), ((1, 4), 1), ((2, 6), 1), ((3, 7), 1)]);

    // and disconnecting it removes it again.
    harness.edges.remove((1, (2, 2)));
    harness.advance_to(3);
    assert_eq!(harness.ordered.accumulate_until(&2), vec![((0, 0), 1), ((1, 4), 1)]);
    assert_eq!(harness.rounds.accumulate_until(&2), vec![((0, 0), 1), ((1, 4), 1)]);
}

#[test]
fn matches_dijkstra_on_random_graphs() {
    let seed: &[_] = &[1, 2, 3, 4];
    let mut rng: StdRng = SeedableRng::from_seed(seed);

    for round in 0 .. 5 {
        let nodes = 10 + 10 * round;
        let mut harness = Harness::new(Config::default().shard_count(1 + round as usize));
        let mut edges = Vec::new();
        for _ in 0 .. 3 * nodes {
            let edge = (rng.gen_range(0, nodes), (rng.gen_range(0, nodes), rng.gen_range(1, 10)));
            assert!(validate_edge(&edge).is_ok());
            harness.edges.insert(edge);
            edges.push(edge);
        }
        harness.roots.insert(0);
        harness.advance_to(1);

        let expected = dijkstra(&edges, 0);
        assert_eq!(harness.ordered.accumulate_until(&0), expected);
        assert_eq!(harness.rounds.accumulate_until(&0), expected);
    }
}

#[test]
fn incremental_updates_match_recomputation() {
    let seed: &[_] = &[5, 6, 7, 8];
    let mut rng: StdRng = SeedableRng::from_seed(seed);

    let nodes: Node = 40;
    let mut harness = Harness::new(Config::default());
    let mut edges = Vec::new();
    for _ in 0 .. 100 {
        let edge = (rng.gen_range(0, nodes), (rng.gen_range(0, nodes), rng.gen_range(1, 10)));
        harness.edges.insert(edge);
        edges.push(edge);
    }
    harness.roots.insert(0);
    harness.advance_to(1);
    assert_eq!(harness.ordered.accumulate_until(&0), dijkstra(&edges, 0));

    // 100 batches of five removals and five insertions: 1,000 edge updates.
    for time in 1 .. 101 {
        for _ in 0 .. 5 {
            let index = rng.gen_range(0, edges.len());
            let removed = edges.swap_remove(index);
            harness.edges.remove(removed);
            let added = (rng.gen_range(0, nodes), (rng.gen_range(0, nodes), rng.gen_range(1, 10)));
            harness.edges.insert(added);
            edges.push(added);
        }
        harness.advance_to(time + 1);

        let expected = dijkstra(&edges, 0);
        assert_eq!(harness.ordered.accumulate_until(&time), expected, "at time {}", time);
        assert_eq!(harness.rounds.accumulate_until(&time), expected, "at time {}", time);
    }
    assert!(harness.worker.check_quiescence().is_ok());
}

#[test]
fn input_order_does_not_change_outputs() {
    let seed: &[_] = &[9, 9, 9, 9];
    let mut rng: StdRng = SeedableRng::from_seed(seed);
    let mut edges = Vec::new();
    for _ in 0 .. 60 {
        edges.push((rng.gen_range(0, 20), (rng.gen_range(0, 20), rng.gen_range(1, 5))));
    }

    let mut reversed = edges.clone();
    reversed.reverse();

    let mut outputs = Vec::new();
    for (order, tie_break) in vec![(edges, TieBreak::Deterministic), (reversed, TieBreak::Stable)] {
        let mut harness = Harness::new(Config::default().tie_break(tie_break));
        for edge in order {
            harness.edges.insert(edge);
        }
        harness.roots.insert(0);
        harness.advance_to(1);
        outputs.push(harness.ordered.updates());
    }
    assert_eq!(outputs[0], outputs[1]);
}
