use rand::{Rng, SeedableRng, StdRng};

use deferred_dataflow::operators::{Capture, Count, Reduce, Threshold};
use deferred_dataflow::{Config, TieBreak, Worker};

#[test]
fn reduce_first_value() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let captured = worker.dataflow(|scope| {
        scope.new_collection_from(1 .. 10).1
             .map(|x| (x / 3, x))
             .reduce(|_key, src, dst| dst.push((*src[0].0, 1)))
             .capture()
    });
    worker.run();
    assert_eq!(captured.accumulate(), vec![((0, 1), 1), ((1, 3), 1), ((2, 6), 1), ((3, 9), 1)]);
}

#[test]
fn count_tracks_changes() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, words) = scope.new_collection::<&'static str>();
        (input, words.count().capture())
    });

    input.insert("a");
    input.insert("a");
    input.insert("b");
    input.advance_to(1).unwrap();
    input.remove("a");
    input.remove("b");
    input.close();
    worker.run();

    assert_eq!(captured.updates(), vec![
        (("a", 2), 0, 1),
        (("b", 1), 0, 1),
        (("a", 1), 1, 1),
        (("a", 2), 1, -1),
        (("b", 1), 1, -1),
    ]);
    assert_eq!(captured.accumulate(), vec![(("a", 1), 1)]);
}

#[test]
fn cancelled_input_produces_nothing() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, data) = scope.new_collection::<(u8, u8)>();
        (input, data.min().capture())
    });
    input.insert((1, 5));
    input.remove((1, 5));
    input.advance_to(1).unwrap();
    input.insert((1, 7));
    input.advance_to(2).unwrap();
    input.remove((1, 7));
    input.close();
    worker.run();
    assert_eq!(captured.updates(), vec![((1, 7), 1, 1), ((1, 7), 2, -1)]);
    assert!(worker.check_quiescence().is_ok());
}

#[test]
fn threshold_transforms_counts() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let captured = worker.dataflow(|scope| {
        scope.new_collection_from(vec![1, 1, 2, 3, 3, 3]).1
             .threshold(|_key, count| if count >= 2 { 1 } else { 0 })
             .capture()
    });
    worker.run();
    assert_eq!(captured.accumulate(), vec![(1, 1), (3, 1)]);
}

/// Distinct counts computed incrementally match those computed from scratch.
#[test]
fn incremental_distinct_matches_recomputation() {
    let seed: &[_] = &[1, 2, 3, 4];
    let mut rng: StdRng = SeedableRng::from_seed(seed);

    for tie_break in [TieBreak::Deterministic, TieBreak::Stable] {
        let mut worker = Worker::<u64>::new(Config::default().tie_break(tie_break).shard_count(4)).unwrap();
        let (mut input, distinct, counts) = worker.dataflow(|scope| {
            let (input, data) = scope.new_collection::<u32>();
            (input, data.distinct().capture(), data.count().capture())
        });

        let mut present: Vec<u32> = Vec::new();
        for time in 0 .. 20u64 {
            for _ in 0 .. 10 {
                if !present.is_empty() && rng.gen_range(0, 3) == 0 {
                    let index = rng.gen_range(0, present.len());
                    input.remove(present.swap_remove(index));
                }
                else {
                    let value = rng.gen_range(0, 15);
                    input.insert(value);
                    present.push(value);
                }
            }
            input.advance_to(time + 1).unwrap();
            worker.run();

            let mut expected_counts: Vec<((u32, isize), isize)> = Vec::new();
            let mut sorted = present.clone();
            sorted.sort();
            for value in sorted.iter() {
                match expected_counts.last_mut() {
                    Some(((last, count), _)) if last == value => *count += 1,
                    _ => expected_counts.push(((*value, 1), 1)),
                }
            }
            sorted.dedup();
            let expected_distinct: Vec<(u32, isize)> = sorted.into_iter().map(|x| (x, 1)).collect();

            assert_eq!(distinct.accumulate_until(&time), expected_distinct);
            assert_eq!(counts.accumulate_until(&time), expected_counts);
        }
    }
}
