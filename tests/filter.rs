extern crate flo_reactive;
extern crate rand;

mod recorder;

use self::recorder::*;
use flo_reactive::*;

use std::sync::*;

fn is_even(num: &i32) -> bool {
    num % 2 == 0
}

#[test]
fn splits_evens_from_odds() {
    let filter      = FilterAction::filter(is_even, Arc::new(SynchronousDispatcher));
    let evens       = Recorder::new();
    let odds        = Recorder::new();

    filter.subscribe(evens.clone());
    filter.otherwise().subscribe(odds.clone());

    for num in 1..=5 {
        filter.on_next(num);
    }

    assert!(evens.messages() == vec![2, 4]);
    assert!(odds.messages() == vec![1, 3, 5]);
    assert!(filter.rejected_count() == 3);
}

#[test]
fn rejected_values_are_not_errors() {
    let filter      = FilterAction::filter(|_: &i32| false, Arc::new(SynchronousDispatcher));
    let matched     = Recorder::new();
    let rejected    = Recorder::new();

    filter.subscribe(matched.clone());
    filter.otherwise().subscribe(rejected.clone());

    filter.on_next(1);
    filter.on_next(2);

    assert!(matched.signals().is_empty());
    assert!(rejected.signals() == vec![Signal::Next(1), Signal::Next(2)]);
}

#[test]
fn random_input_is_partitioned() {
    let filter      = FilterAction::filter(|num: &u32| num % 3 == 0, Arc::new(SynchronousDispatcher));
    let matched     = Recorder::new();
    let rejected    = Recorder::new();

    filter.subscribe(matched.clone());
    filter.otherwise().subscribe(rejected.clone());

    let input = (0..500).map(|_| rand::random::<u32>() % 1000).collect::<Vec<_>>();
    input.iter().for_each(|num| filter.on_next(*num));

    let matched     = matched.messages();
    let rejected    = rejected.messages();

    // Every message goes to exactly one branch, in order
    assert!(matched == input.iter().cloned().filter(|num| num % 3 == 0).collect::<Vec<_>>());
    assert!(rejected == input.iter().cloned().filter(|num| num % 3 != 0).collect::<Vec<_>>());
    assert!(matched.len() + rejected.len() == input.len());
}

#[test]
fn completion_reaches_otherwise_first() {
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), secondary.clone());

    filter.subscribe(primary.clone());
    filter.on_complete();

    assert!(*log.lock().unwrap() == vec![("secondary", Signal::Complete), ("primary", Signal::Complete)]);
}

#[test]
fn errors_reach_both_branches_otherwise_first() {
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), secondary.clone());

    filter.subscribe(primary.clone());
    filter.on_error(StreamError::failed("upstream failed"));

    let failure = Signal::Error("upstream failed".to_string());
    assert!(*log.lock().unwrap() == vec![("secondary", failure.clone()), ("primary", failure)]);
}

#[test]
fn flush_reaches_otherwise_first() {
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), secondary.clone());

    filter.subscribe(primary.clone());
    filter.on_flush();

    assert!(*log.lock().unwrap() == vec![("secondary", Signal::Flush), ("primary", Signal::Flush)]);
}

#[test]
fn signals_keep_their_order_on_both_branches() {
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), secondary.clone());

    filter.subscribe(primary.clone());

    filter.on_next(1);
    filter.on_next(2);
    filter.on_flush();
    filter.on_next(3);
    filter.on_complete();

    assert!(primary.signals() == vec![Signal::Next(2), Signal::Flush, Signal::Complete]);
    assert!(secondary.signals() == vec![Signal::Next(1), Signal::Flush, Signal::Next(3), Signal::Complete]);
}

#[test]
fn panicking_predicate_fails_both_branches() {
    let filter      = FilterAction::filter(|num: &i32| if *num == 3 { panic!("cannot test 3") } else { true }, Arc::new(SynchronousDispatcher));
    let matched     = Recorder::new();
    let rejected    = Recorder::new();

    filter.subscribe(matched.clone());
    filter.otherwise().subscribe(rejected.clone());

    filter.on_next(1);
    filter.on_next(3);

    assert!(matched.messages() == vec![1]);
    assert!(matched.errors().len() == 1);
    assert!(matched.errors()[0].contains("cannot test 3"));
    assert!(rejected.errors() == matched.errors());
}

#[test]
fn filters_on_projection() {
    let filter      = FilterAction::filter_by(|word: &String| word.starts_with("a"), Arc::new(SynchronousDispatcher));
    let matched     = Recorder::new();
    let rejected    = Recorder::new();

    filter.subscribe(matched.clone());
    filter.otherwise().subscribe(rejected.clone());

    for word in vec!["apple", "banana", "avocado", "cherry"] {
        filter.on_next(word.to_string());
    }

    assert!(matched.messages() == vec!["apple".to_string(), "avocado".to_string()]);
    assert!(rejected.messages() == vec!["banana".to_string(), "cherry".to_string()]);
}

#[test]
fn simple_predicate_is_identity() {
    assert!(simple_predicate(&true));
    assert!(!simple_predicate(&false));
}

#[test]
fn default_otherwise_shares_dispatcher() {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(SynchronousDispatcher);
    let filter                          = FilterAction::filter(is_even, Arc::clone(&dispatcher));

    assert!(Arc::ptr_eq(filter.otherwise().dispatcher(), &dispatcher));
    assert!(filter.otherwise().count_subscribers() == 0);
}

#[test]
fn subscribing_wires_otherwise_to_same_upstream() {
    let filter      = FilterAction::filter(is_even, Arc::new(SynchronousDispatcher));
    let upstream    = RecordingSubscription::new();

    filter.prefetch(32);
    Subscribable::on_subscribe(&filter, upstream.clone());

    // The filter requests its batch, then the otherwise pipeline is subscribed with the same batch size
    assert!(filter.otherwise().batch_size() == 32);
    assert!(upstream.requests() == vec![32, 32]);
}

#[test]
fn subscribable_otherwise_is_given_upstream() {
    let otherwise   = Recorder::<i32>::subscribable();
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), otherwise.clone());
    let upstream    = RecordingSubscription::new();

    filter.prefetch(7);
    Subscribable::on_subscribe(&filter, upstream.clone());

    assert!(otherwise.prefetch_size() == Some(7));
    assert!(otherwise.count_subscriptions() == 1);
    assert!(upstream.requests() == vec![7]);
}

#[test]
fn plain_otherwise_is_not_subscribed() {
    let otherwise   = Recorder::<i32>::new();
    let filter      = Action::with_otherwise(is_even, Arc::new(SynchronousDispatcher), otherwise.clone());
    let upstream    = RecordingSubscription::new();

    filter.prefetch(7);
    Subscribable::on_subscribe(&filter, upstream.clone());

    assert!(otherwise.prefetch_size() == None);
    assert!(otherwise.count_subscriptions() == 0);
    assert!(upstream.requests() == vec![7]);
}

#[test]
fn filter_can_be_chained_on_otherwise() {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(SynchronousDispatcher);
    let multiple_of_three               = Arc::new(FilterAction::filter(|num: &i32| num % 3 == 0, Arc::clone(&dispatcher)));
    let evens                           = FilterAction::filter(is_even, Arc::clone(&dispatcher));

    let even        = Recorder::new();
    let threes      = Recorder::new();
    let remainder   = Recorder::new();

    evens.subscribe(even.clone());
    evens.otherwise().connect(Arc::clone(&multiple_of_three));
    multiple_of_three.subscribe(threes.clone());
    multiple_of_three.otherwise().subscribe(remainder.clone());

    for num in 1..=10 {
        evens.on_next(num);
    }
    evens.on_complete();

    assert!(even.messages() == vec![2, 4, 6, 8, 10]);
    assert!(threes.messages() == vec![3, 9]);
    assert!(remainder.messages() == vec![1, 5, 7]);

    assert!(even.count_complete() == 1);
    assert!(threes.count_complete() == 1);
    assert!(remainder.count_complete() == 1);
}

#[test]
fn completion_reaches_otherwise_first_on_queue() {
    let dispatcher  = Arc::new(QueueDispatcher::new());
    let filter      = FilterAction::filter(is_even, dispatcher.clone());
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);

    filter.subscribe(primary.clone());
    filter.otherwise().subscribe(secondary.clone());

    filter.on_next(1);
    filter.on_next(2);
    filter.on_complete();
    dispatcher.drain();

    assert!(*log.lock().unwrap() == vec![
        ("secondary", Signal::Next(1)),
        ("primary", Signal::Next(2)),
        ("secondary", Signal::Complete),
        ("primary", Signal::Complete)
    ]);
}

#[test]
fn errors_reach_both_branches_otherwise_first_on_queue() {
    let dispatcher  = Arc::new(QueueDispatcher::new());
    let filter      = FilterAction::filter(is_even, dispatcher.clone());
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);

    filter.subscribe(primary.clone());
    filter.otherwise().subscribe(secondary.clone());

    filter.on_next(3);
    filter.on_error(StreamError::failed("upstream failed"));
    dispatcher.drain();

    let failure = Signal::Error("upstream failed".to_string());
    assert!(*log.lock().unwrap() == vec![
        ("secondary", Signal::Next(3)),
        ("secondary", failure.clone()),
        ("primary", failure)
    ]);
}

#[test]
fn flush_reaches_otherwise_first_on_queue() {
    let dispatcher  = Arc::new(QueueDispatcher::new());
    let filter      = FilterAction::filter(is_even, dispatcher.clone());
    let log         = signal_log();
    let primary     = Recorder::shared("primary", &log);
    let secondary   = Recorder::shared("secondary", &log);

    filter.subscribe(primary.clone());
    filter.otherwise().subscribe(secondary.clone());

    filter.on_next(1);
    filter.on_flush();
    filter.on_next(2);
    dispatcher.drain();

    assert!(*log.lock().unwrap() == vec![
        ("secondary", Signal::Next(1)),
        ("secondary", Signal::Flush),
        ("primary", Signal::Flush),
        ("primary", Signal::Next(2))
    ]);
}

#[test]
fn otherwise_on_its_own_queue_still_sees_signals_first() {
    let dispatcher              = Arc::new(QueueDispatcher::new());
    let otherwise_dispatcher    = Arc::new(QueueDispatcher::new());
    let otherwise               = Arc::new(Action::<i32>::new(otherwise_dispatcher.clone()));
    let filter                  = Action::with_otherwise(is_even, dispatcher.clone(), otherwise);
    let log                     = signal_log();
    let primary                 = Recorder::shared("primary", &log);
    let secondary               = Recorder::shared("secondary", &log);

    filter.subscribe(primary.clone());
    filter.otherwise().subscribe(secondary.clone());

    filter.on_next(5);
    filter.on_complete();
    dispatcher.drain();
    otherwise_dispatcher.drain();

    assert!(*log.lock().unwrap() == vec![
        ("secondary", Signal::Next(5)),
        ("secondary", Signal::Complete),
        ("primary", Signal::Complete)
    ]);
}
