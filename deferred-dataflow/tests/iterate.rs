use deferred_dataflow::operators::{Capture, Iterate, Variable};
use deferred_dataflow::{Config, Error, Pair, Worker};

#[test]
fn iterate_to_fixed_point() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, numbers) = scope.new_collection::<u64>();
        let halved = numbers.iterate(|values| values.map(|x| if x % 2 == 0 { x / 2 } else { x }));
        (input, halved.capture())
    });

    input.insert(12);
    input.insert(40);
    input.advance_to(1).unwrap();
    worker.run();
    assert_eq!(captured.accumulate_until(&0), vec![(3, 1), (5, 1)]);

    // changes to the input only change the affected outputs.
    input.remove(40);
    input.insert(96);
    input.advance_to(2).unwrap();
    worker.run();
    assert_eq!(captured.accumulate_until(&1), vec![(3, 2)]);
    let changes: Vec<_> = captured.updates().into_iter().filter(|(_, time, _)| *time == 1).collect();
    assert_eq!(changes, vec![(3, 1, 1), (5, 1, -1)]);
}

#[test]
fn variable_with_larger_step() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let captured = worker.dataflow(|scope| {
        let numbers = scope.new_collection_from(vec![1u64]).1;
        scope
            .iterative(|child| {
                let variable = Variable::new_from(numbers.enter(child), 3);
                let rounds = variable.inspect_batch(|time: &Pair<u64, u64>, _| assert_eq!(time.inner % 3, 0));
                let result = rounds.map(|x| if x < 5 { x + 1 } else { x });
                variable.set(&result)
            })
            .capture()
    });
    worker.run();
    assert_eq!(captured.accumulate(), vec![(5, 1)]);
}

#[test]
fn nested_iterations() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let captured = worker.dataflow(|scope| {
        let numbers = scope.new_collection_from(vec![3u64, 10]).1;
        // the outer loop adds one to odd numbers; the inner loop halves even numbers.
        numbers
            .iterate(|outer| {
                outer
                    .map(|x| if x % 2 == 1 && x > 1 { x + 1 } else { x })
                    .iterate(|inner| inner.map(|x| if x % 2 == 0 { x / 2 } else { x }))
            })
            .capture()
    });
    worker.run();
    assert_eq!(captured.accumulate(), vec![(1, 2)]);
    assert!(worker.take_errors().is_empty());
}

#[test]
fn ceiling_abandons_only_the_diverging_time() {
    let mut worker = Worker::<u64>::new(Config::default().round_safety_ceiling(20)).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, numbers) = scope.new_collection::<u64>();
        let limits = numbers.iterate(|values| values.map(|x| if x < 1000 { x + 1 } else { x }));
        (input, limits.capture())
    });

    input.insert(990);
    input.advance_to(1).unwrap();
    input.insert(0);
    input.advance_to(2).unwrap();
    input.insert(995);
    input.close();
    worker.run();

    let times: Vec<u64> = captured.updates().into_iter().map(|(_, time, _)| time).collect();
    assert_eq!(times, vec![0, 2]);
    match &worker.take_errors()[..] {
        [Error::NonTermination { time, rounds }] => {
            assert_eq!(time, "1");
            assert_eq!(*rounds, 21);
        }
        other => panic!("unexpected errors: {:?}", other),
    }
}
