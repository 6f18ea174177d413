use std::time::Instant;

use rand::{Rng, SeedableRng, StdRng};

use deferred_dataflow::algorithms::graphs::sssp::{sssp, sssp_rounds, validate_edge};
use deferred_dataflow::logging;
use deferred_dataflow::operators::Capture;
use deferred_dataflow::{Config, Worker};

type Node = u32;

fn main() {

    let nodes: u32 = std::env::args().nth(1).unwrap().parse().unwrap();
    let edges: u32 = std::env::args().nth(2).unwrap().parse().unwrap();
    let batch: u32 = std::env::args().nth(3).unwrap().parse().unwrap();
    let waves: u64 = std::env::args().nth(4).unwrap().parse().unwrap();
    let ordered: bool = std::env::args().nth(5).unwrap() == "ordered";

    // remaining arguments configure the worker, e.g. `--shards 4 --tie-break stable`.
    let config = Config::from_args(std::env::args().skip(6)).unwrap();
    let mut worker = Worker::<u64>::new(config).unwrap();
    if std::env::var("DEFERRED_LOG").is_ok() {
        logging::enable(&mut worker, std::io::stderr());
    }

    let timer = Instant::now();

    let (mut graph, mut roots, results) = worker.dataflow(|scope| {
        let (edge_input, graph) = scope.new_collection();
        let (root_input, roots) = scope.new_collection();
        let results = if ordered { sssp(&graph, &roots) } else { sssp_rounds(&graph, &roots) };
        (edge_input, root_input, results.map(|(_node, dist)| dist).capture())
    });

    let seed: &[_] = &[1, 2, 3, 4];
    let mut rng1: StdRng = SeedableRng::from_seed(seed);    // rng for edge additions
    let mut rng2: StdRng = SeedableRng::from_seed(seed);    // rng for edge deletions

    println!("performing {} sssp on {} nodes, {} edges:", if ordered { "ordered" } else { "round-robin" }, nodes, edges);

    for _ in 0 .. edges {
        let edge: (Node, (Node, u64)) = (rng1.gen_range(0, nodes), (rng1.gen_range(0, nodes), rng1.gen_range(1, 100)));
        validate_edge(&edge).unwrap();
        graph.insert(edge);
    }
    roots.insert(0);

    graph.advance_to(1).unwrap();
    roots.advance_to(1).unwrap();
    worker.step_while(|| results.probe().less_than(&1));

    let reached: isize = results.accumulate_until(&0).iter().map(|(_, count)| count).sum();
    println!("{:?}\tstable; {} nodes reached", timer.elapsed(), reached);

    for wave in 1 ..= waves {
        let start = Instant::now();
        for _ in 0 .. batch {
            graph.insert((rng1.gen_range(0, nodes), (rng1.gen_range(0, nodes), rng1.gen_range(1, 100))));
            graph.remove((rng2.gen_range(0, nodes), (rng2.gen_range(0, nodes), rng2.gen_range(1, 100))));
        }
        graph.advance_to(wave + 1).unwrap();
        roots.advance_to(wave + 1).unwrap();
        worker.step_while(|| results.probe().less_than(&(wave + 1)));

        println!("wave {}: {:?}", wave, start.elapsed());
    }

    for error in worker.take_errors() {
        eprintln!("error: {}", error);
    }
}
