use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng, StdRng};

use deferred_dataflow::consolidation::consolidate_updates;
use deferred_dataflow::logging::EngineEvent;
use deferred_dataflow::operators::{Capture, Delay, DelayFn};
use deferred_dataflow::{Config, Error, Pair, Worker};

/// Delays each record by a pseudo-random, record-determined number of steps.
struct Scatter {
    spread: u64,
}

impl DelayFn<u64, u64> for Scatter {
    fn delay(&mut self, data: &u64, time: &u64) -> u64 {
        // some requests precede the record's own time.
        (data.wrapping_mul(2654435761) % self.spread).wrapping_add(*time / 2)
    }
}

#[test]
fn delayed_times_never_regress() {
    let seed: &[_] = &[1, 2, 3, 4];
    let mut rng: StdRng = SeedableRng::from_seed(seed);

    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let (mut input, original, delayed) = worker.dataflow(|scope| {
        let (input, data) = scope.new_collection::<u64>();
        (input, data.capture(), data.delay_core(Scatter { spread: 20 }).capture())
    });

    for time in 0 .. 10 {
        for _ in 0 .. 20 {
            input.insert(rng.gen_range(0, 1000));
        }
        input.advance_to(time + 1).unwrap();
    }
    input.close();
    worker.run();

    let mut scatter = Scatter { spread: 20 };
    // records from different times may share a delivery time, and are delivered together.
    let mut expected: Vec<(u64, u64, isize)> = original
        .updates()
        .into_iter()
        .map(|(data, time, diff)| {
            let requested = scatter.delay(&data, &time);
            (data, time.max(requested), diff)
        })
        .collect();
    consolidate_updates(&mut expected);

    let mut observed = delayed.updates();
    consolidate_updates(&mut observed);
    assert_eq!(observed, expected);
    assert_eq!(delayed.accumulate(), original.accumulate());
}

#[test]
fn delay_respects_partial_order() {
    let mut worker = Worker::<Pair<u64, u64>>::new(Config::default()).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, data) = scope.new_collection::<u64>();
        (input, data.delay(|x, time| Pair::new(time.outer, *x)).capture())
    });
    input.insert_at(3, Pair::new(1, 5)).unwrap();
    input.insert_at(7, Pair::new(2, 1)).unwrap();
    input.close();
    worker.run();
    assert_eq!(captured.updates(), vec![(3, Pair::new(1, 5), 1), (7, Pair::new(2, 7), 1)]);
}

#[test]
fn exact_delay_reports_regressions() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let (mut input, captured) = worker.dataflow(|scope| {
        let (input, data) = scope.new_collection::<u64>();
        (input, data.delay_exact(|x, _time| *x).capture())
    });
    input.advance_to(4).unwrap();
    for x in 0 .. 8 {
        input.insert(x);
    }
    input.close();
    worker.run();

    let delivered: Vec<_> = captured.updates().into_iter().map(|(x, t, _)| (x, t)).collect();
    assert_eq!(delivered, vec![(4, 4), (5, 5), (6, 6), (7, 7)]);
    let errors = worker.take_errors();
    assert_eq!(errors.len(), 4);
    assert!(errors.iter().all(|error| matches!(error, Error::Configuration(_))));
}

#[test]
fn reschedules_are_logged_per_distinct_time() {
    let mut worker = Worker::<u64>::new(Config::default()).unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    worker.log_register(move |_, event| {
        if let EngineEvent::Reschedule(reschedule) = event {
            sink.borrow_mut().push((reschedule.records, reschedule.times, reschedule.rejected));
        }
    });

    let mut input = worker.dataflow(|scope| {
        let (input, data) = scope.new_collection::<u64>();
        data.delay(|x, _time| *x % 4).probe();
        input
    });
    for x in 0 .. 100 {
        input.insert(x);
    }
    input.close();
    worker.run();

    assert_eq!(*events.borrow(), vec![(100, 4, 0)]);
}
