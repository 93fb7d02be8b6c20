use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use eventweave::handler::{CollectorHandler, HandlerError, failure_fn, handler_fn};
use eventweave::scheduler::{RunError, RunOptions, Scheduler, shutdown_channel};
use eventweave::source::{
    ChannelSource, EventSource, IterSource, PauseAfter, SourceConfig, SourceError, SourceEvent,
};

type Log = Arc<Mutex<Vec<String>>>;

fn fast_iter<T, C>(items: C) -> IterSource<C::IntoIter>
where
    C: IntoIterator<Item = T>,
    C::IntoIter: Iterator<Item = T>,
{
    IterSource::new(items).with_idle_wait(Duration::from_millis(5))
}

fn push_handler(
    log: Log,
    label: &'static str,
) -> impl Fn(
    &'static str,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), HandlerError>> + Send>> {
    move |item| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().push(format!("{label}({item})"));
            Ok(())
        })
    }
}

async fn run_briefly(scheduler: Scheduler, options: RunOptions, settle: Duration) {
    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(scheduler.run(options.with_shutdown(signal)));
    tokio::time::sleep(settle).await;
    stop.trigger();
    handle
        .await
        .expect("join run loop")
        .expect("run loop should stop cleanly");
}

#[tokio::test]
async fn fairness_interleaves_a_high_volume_source_with_a_trickle() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    let busy = scheduler.add_source_named(
        "busy",
        fast_iter(["a1", "a2", "a3", "a4", "a5"]),
        SourceConfig::default(),
    );
    let quiet = scheduler.add_source_named("quiet", fast_iter(["b1"]), SourceConfig::default());

    scheduler.register(&busy).bind(handler_fn(push_handler(log.clone(), "A")));
    scheduler.register(&quiet).bind(handler_fn(push_handler(log.clone(), "B")));

    run_briefly(scheduler, RunOptions::default(), Duration::from_millis(200)).await;

    // One item per source per round: the quiet source gets its turn right
    // after the busy source's first item, not after its fifth.
    assert_eq!(
        log.lock().clone(),
        vec![
            "A(a1)".to_string(),
            "B(b1)".to_string(),
            "A(a2)".to_string(),
            "A(a3)".to_string(),
            "A(a4)".to_string(),
            "A(a5)".to_string(),
        ]
    );
}

#[tokio::test]
async fn unfair_mode_drains_each_source_to_its_own_pause() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    let busy = scheduler.add_source_named(
        "busy",
        fast_iter(["a1", "a2", "a3"]),
        SourceConfig::default(),
    );
    let quiet = scheduler.add_source_named("quiet", fast_iter(["b1"]), SourceConfig::default());

    scheduler.register(&busy).bind(handler_fn(push_handler(log.clone(), "A")));
    scheduler.register(&quiet).bind(handler_fn(push_handler(log.clone(), "B")));

    run_briefly(
        scheduler,
        RunOptions::default().with_fairness(false),
        Duration::from_millis(200),
    )
    .await;

    assert_eq!(
        log.lock().clone(),
        vec![
            "A(a1)".to_string(),
            "A(a2)".to_string(),
            "A(a3)".to_string(),
            "B(b1)".to_string(),
        ]
    );
}

#[tokio::test]
async fn two_streams_of_different_item_types_share_one_loop() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    let numbers = scheduler.add_source_named("numbers", fast_iter([1, 2, 3]), SourceConfig::default());
    let letters = scheduler.add_source_named("letters", fast_iter(["a"]), SourceConfig::default());

    let log1 = Arc::clone(&log);
    scheduler.register(&numbers).bind(handler_fn(move |item: i32| {
        let log = Arc::clone(&log1);
        async move {
            log.lock().push(format!("H1({item})"));
            Ok::<(), HandlerError>(())
        }
    }));
    let log2 = Arc::clone(&log);
    scheduler
        .register(&letters)
        .bind(handler_fn(move |item: &'static str| {
            let log = Arc::clone(&log2);
            async move {
                log.lock().push(format!("H2({item})"));
                Ok::<(), HandlerError>(())
            }
        }));

    run_briefly(scheduler, RunOptions::default(), Duration::from_millis(200)).await;

    // After the letter stream is exhausted its pauses are skipped
    // silently; the number stream keeps its one-item-per-round cadence.
    assert_eq!(
        log.lock().clone(),
        vec![
            "H1(1)".to_string(),
            "H2(a)".to_string(),
            "H1(2)".to_string(),
            "H1(3)".to_string(),
        ]
    );
}

#[tokio::test]
async fn handlers_on_one_source_run_in_registration_order_for_every_item() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    let source = scheduler.add_source_named("items", fast_iter(["x", "y"]), SourceConfig::default());
    scheduler.register(&source).bind(handler_fn(push_handler(log.clone(), "h1")));
    scheduler.register(&source).bind(handler_fn(push_handler(log.clone(), "h2")));
    scheduler.register(&source).bind(handler_fn(push_handler(log.clone(), "h3")));

    run_briefly(scheduler, RunOptions::default(), Duration::from_millis(150)).await;

    assert_eq!(
        log.lock().clone(),
        vec![
            "h1(x)".to_string(),
            "h2(x)".to_string(),
            "h3(x)".to_string(),
            "h1(y)".to_string(),
            "h2(y)".to_string(),
            "h3(y)".to_string(),
        ]
    );
}

#[tokio::test]
async fn one_handler_stacked_on_two_sources_keeps_separate_failure_handlers() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let first_failures: Log = Arc::new(Mutex::new(Vec::new()));
    let second_failures: Log = Arc::new(Mutex::new(Vec::new()));

    let mut scheduler = Scheduler::new();
    let first = scheduler.add_source_named("first", fast_iter(["ok-1", "bad"]), SourceConfig::default());
    let second = scheduler.add_source_named("second", fast_iter(["bad", "ok-2"]), SourceConfig::default());

    let log_clone = Arc::clone(&log);
    let shared = scheduler
        .register(&first)
        .with_failure_handler(failure_fn({
            let first_failures = Arc::clone(&first_failures);
            move |err| first_failures.lock().push(err.to_string())
        }))
        .bind(handler_fn(move |item: &'static str| {
            let log = Arc::clone(&log_clone);
            async move {
                if item == "bad" {
                    return Err(HandlerError::msg(format!("rejected {item}")));
                }
                log.lock().push(item.to_string());
                Ok(())
            }
        }));
    scheduler
        .register(&second)
        .with_failure_handler(failure_fn({
            let second_failures = Arc::clone(&second_failures);
            move |err| second_failures.lock().push(err.to_string())
        }))
        .bind_shared(shared);

    run_briefly(scheduler, RunOptions::default(), Duration::from_millis(200)).await;

    assert_eq!(
        log.lock().clone(),
        vec!["ok-1".to_string(), "ok-2".to_string()]
    );
    assert_eq!(
        first_failures.lock().clone(),
        vec!["rejected bad".to_string()]
    );
    assert_eq!(
        second_failures.lock().clone(),
        vec!["rejected bad".to_string()]
    );
}

#[tokio::test]
async fn unrecovered_handler_error_terminates_the_whole_loop() {
    let after = CollectorHandler::<u32>::new();
    let after_probe = after.clone();

    let mut scheduler = Scheduler::new();
    let source = scheduler.add_source_named("numbers", fast_iter([1u32]), SourceConfig::default());

    scheduler
        .register(&source)
        .named("rejector")
        .bind(handler_fn(|_: u32| async move {
            Err::<(), _>(HandlerError::msg("boom"))
        }));
    scheduler.register(&source).bind(after);

    let err = scheduler
        .run(RunOptions::default())
        .await
        .expect_err("unhandled handler error must escape run");

    match err {
        RunError::Dispatch { source_label, source } => {
            assert_eq!(source_label, "numbers");
            assert_eq!(source.handler(), "rejector");
        }
        other => panic!("expected a dispatch error, got {other:?}"),
    }
    assert!(
        after_probe.is_empty(),
        "later handlers must not run for the failing item"
    );
}

#[tokio::test]
async fn source_error_terminates_the_loop_like_an_unhandled_failure() {
    struct FlakySource {
        polls: u32,
    }

    #[async_trait]
    impl EventSource for FlakySource {
        type Item = u32;

        async fn next_event(&mut self) -> Result<SourceEvent<u32>, SourceError> {
            self.polls += 1;
            match self.polls {
                1 => Ok(SourceEvent::Item(1)),
                _ => Err(SourceError::other("poller crashed")),
            }
        }
    }

    let seen = CollectorHandler::<u32>::new();
    let seen_probe = seen.clone();

    let mut scheduler = Scheduler::new();
    let source = scheduler.add_source_named("flaky", FlakySource { polls: 0 }, SourceConfig::default());
    scheduler.register(&source).bind(seen);

    let err = scheduler
        .run(RunOptions::default())
        .await
        .expect_err("source error must escape run");

    assert!(matches!(err, RunError::Source { ref source_label, .. } if source_label == "flaky"));
    assert_eq!(seen_probe.snapshot(), vec![1]);
}

#[tokio::test]
async fn shutdown_stops_a_loop_blocked_on_an_idle_source() {
    let (tx, rx) = flume::unbounded::<String>();
    let seen = CollectorHandler::<String>::new();
    let seen_probe = seen.clone();

    let mut scheduler = Scheduler::new();
    let source = scheduler.add_source_named("feed", ChannelSource::new(rx), SourceConfig::default());
    scheduler.register(&source).bind(seen);

    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(scheduler.run(RunOptions::default().with_shutdown(signal)));

    tx.send("delivered".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.trigger();

    handle
        .await
        .expect("join run loop")
        .expect("shutdown is a clean exit");
    assert_eq!(seen_probe.snapshot(), vec!["delivered".to_string()]);
}

#[tokio::test]
async fn dropping_the_trigger_also_stops_the_loop() {
    let (_tx, rx) = flume::unbounded::<u8>();
    let mut scheduler = Scheduler::new();
    let source = scheduler.add_source_named("feed", ChannelSource::new(rx), SourceConfig::default());
    scheduler.register(&source).bind(CollectorHandler::new());

    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(scheduler.run(RunOptions::default().with_shutdown(signal)));
    drop(stop);

    handle
        .await
        .expect("join run loop")
        .expect("dropped trigger is a clean exit");
}

#[tokio::test]
async fn running_an_empty_scheduler_is_an_error() {
    let scheduler = Scheduler::new();
    let err = scheduler.run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, RunError::NoSources));
}

#[tokio::test]
async fn handlers_see_exactly_the_items_sent_and_never_the_sentinel() {
    let (tx, rx) = flume::unbounded();
    let seen = CollectorHandler::<u32>::new();
    let seen_probe = seen.clone();

    let mut scheduler = Scheduler::new();
    let source = scheduler.add_source_named(
        "feed",
        ChannelSource::new(rx).with_poll_interval(Duration::from_millis(1)),
        SourceConfig::default().with_pause_after(PauseAfter::After(1)),
    );
    scheduler.register(&source).bind(seen);

    for n in [1u32, 2, 3] {
        tx.send(n).unwrap();
    }

    // The source pauses between and after the items many times while the
    // loop keeps spinning; none of those pauses may reach the handler.
    run_briefly(scheduler, RunOptions::default(), Duration::from_millis(150)).await;

    assert_eq!(seen_probe.snapshot(), vec![1, 2, 3]);
}
