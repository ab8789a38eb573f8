//! End-to-end scenarios for the scheduler: composition primitives, timeout
//! and defer semantics, pacing, retry, and the collaborator types, all
//! driven through the public API. Timings use millisecond scales with
//! generous margins.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use strand::{
    cleanup, current_task_id, current_token, defer, defer_task, join, repeat, retry, run, select,
    set_max_concurrent, set_max_steps_per_run, set_pacing_enabled, sleep, sleep_until, spawn,
    spawn_fn, timeout, watch, yield_now, BackoffPolicy, Channel, Event, EventKind, Observer,
    TaskError, TaskFuture,
};

type Log = Rc<RefCell<Vec<String>>>;

fn log_of(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

fn position(log: &Log, entry: &str) -> usize {
    log.borrow()
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("missing log entry '{entry}'"))
}

#[test]
fn watch_returns_value_after_sleep() {
    let start = Instant::now();
    let handle = watch(async {
        let work = watch(async {
            sleep(Duration::from_millis(30)).await;
            Ok("Work result".to_string())
        });
        work.await
    });

    assert_eq!(handle.unwrap(), "Work result");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[test]
fn join_interleaves_two_sleepers() {
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    // A shared absolute deadline makes both sleepers wake in the same tick.
    let wake_at = Instant::now() + Duration::from_millis(80);
    let sleeper = |name: &'static str, log: Log| async move {
        let deferred = Rc::clone(&log);
        defer(move || log_of(&deferred, format!("deferred {name}"))).await;
        log_of(&log, format!("start {name}"));
        sleep_until(wake_at).await;
        log_of(&log, format!("done {name}"));
        Ok(())
    };

    let start = Instant::now();
    join(vec![
        sleeper("a", Rc::clone(&log)),
        sleeper("b", Rc::clone(&log)),
    ])
    .unwrap();
    let elapsed = start.elapsed();

    // Both run concurrently: one sleep's worth of wall time, not two.
    assert!(elapsed >= Duration::from_millis(80), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(160), "elapsed {elapsed:?}");

    let starts = position(&log, "start a").max(position(&log, "start b"));
    let dones = position(&log, "done a").max(position(&log, "done b"));
    let first_done = position(&log, "done a").min(position(&log, "done b"));
    let first_deferred = position(&log, "deferred a").min(position(&log, "deferred b"));
    assert!(starts < first_done, "log: {:?}", log.borrow());
    assert!(dones < first_deferred, "log: {:?}", log.borrow());
}

#[test]
fn select_returns_on_first_and_losers_stay_queued() {
    let fast_done = Rc::new(Cell::new(false));
    let slow_done = Rc::new(Cell::new(false));

    let f = Rc::clone(&fast_done);
    let fast = async move {
        sleep(Duration::from_millis(20)).await;
        f.set(true);
        Ok(())
    };
    let s = Rc::clone(&slow_done);
    let slow = async move {
        sleep(Duration::from_millis(150)).await;
        s.set(true);
        Ok(())
    };

    let start = Instant::now();
    let winner = select(vec![
        Box::pin(fast) as TaskFuture,
        Box::pin(slow) as TaskFuture,
    ])
    .unwrap();

    assert_eq!(winner, 0);
    assert!(fast_done.get());
    assert!(!slow_done.get());
    assert!(start.elapsed() < Duration::from_millis(140));

    // The loser remains in the queue; a subsequent run completes it.
    run().unwrap();
    assert!(slow_done.get());
}

#[test]
fn select_cancels_losers_tokens() {
    let loser_canceled = Rc::new(Cell::new(false));

    let winner = async {
        sleep(Duration::from_millis(10)).await;
        Ok(())
    };
    let flag = Rc::clone(&loser_canceled);
    let loser = async move {
        loop {
            if current_token().is_some_and(|t| t.is_cancelled()) {
                flag.set(true);
                return Err(TaskError::Canceled);
            }
            sleep(Duration::from_millis(5)).await;
        }
    };

    let picked = select(vec![
        Box::pin(winner) as TaskFuture,
        Box::pin(loser) as TaskFuture,
    ])
    .unwrap();
    assert_eq!(picked, 0);

    // The loser observes cancellation at its next step and exits promptly.
    let start = Instant::now();
    run().unwrap();
    assert!(loser_canceled.get());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn timeout_fails_the_task_and_defer_still_runs() {
    let defer_runs = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&defer_runs);
    let start = Instant::now();
    let handle = watch(async move {
        defer(move || counter.set(counter.get() + 1)).await;
        timeout(Duration::from_millis(30)).await;
        sleep(Duration::from_millis(400)).await;
        Ok(())
    });

    let err = handle.wait().unwrap_err();
    let elapsed = start.elapsed();
    assert!(matches!(err, TaskError::Timeout { .. }), "got {err:?}");
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "elapsed {elapsed:?}");
    assert_eq!(defer_runs.get(), 1);
}

#[test]
fn pacing_caps_steps_per_run() {
    let started = Rc::new(Cell::new(0u32));

    for _ in 0..100 {
        let s = Rc::clone(&started);
        spawn(async move {
            s.set(s.get() + 1);
            Ok(())
        });
    }

    set_max_steps_per_run(10).unwrap();
    set_pacing_enabled(true);
    run().unwrap();
    assert_eq!(started.get(), 10);

    // Follow-up calls pick up the remainder.
    set_pacing_enabled(false);
    run().unwrap();
    assert_eq!(started.get(), 100);
}

#[test]
fn retry_issues_exact_attempts_with_backoff() {
    let attempts = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&attempts);
    let start = Instant::now();
    let handle = watch(async move {
        retry(
            move || {
                let counter = Rc::clone(&counter);
                async move {
                    counter.set(counter.get() + 1);
                    Err::<(), _>(TaskError::Fail {
                        reason: "still broken".into(),
                    })
                }
            },
            3,
            BackoffPolicy::exponential(Duration::from_millis(40), 2.0),
        )
        .await
    });

    let err = handle.wait().unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(attempts.get(), 3);
    // Delays between attempts: 40ms then 80ms.
    assert!(elapsed >= Duration::from_millis(120), "elapsed {elapsed:?}");
    match err {
        TaskError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, TaskError::Fail { .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[test]
fn sleeps_compose_monotonically() {
    let start = Instant::now();
    watch(async {
        sleep(Duration::from_millis(20)).await;
        sleep(Duration::from_millis(30)).await;
        Ok(())
    })
    .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn defer_runs_on_failure() {
    let cleaned = Rc::new(Cell::new(false));

    let flag = Rc::clone(&cleaned);
    let handle = watch(async move {
        defer(move || flag.set(true)).await;
        Err::<(), _>(TaskError::Fail {
            reason: "exploded".into(),
        })
    });

    assert!(handle.wait().is_err());
    assert!(cleaned.get());
}

#[test]
fn unwrap_or_falls_back_on_failure() {
    let handle = watch(async {
        Err::<&str, _>(TaskError::Fail {
            reason: "nope".into(),
        })
    });
    assert_eq!(handle.unwrap_or("fallback"), "fallback");
}

#[test]
#[should_panic(expected = "work should have succeeded")]
fn expect_panics_with_message_and_cause() {
    let handle = watch(async {
        Err::<(), _>(TaskError::Fail {
            reason: "root cause".into(),
        })
    });
    handle.expect("work should have succeeded");
}

#[test]
fn task_ids_are_unique_among_live_tasks() {
    let ids: Vec<_> = (0..32)
        .map(|_| {
            spawn(async {
                yield_now().await;
                Ok(())
            })
        })
        .collect();

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
    run().unwrap();
}

#[test]
fn repeater_fires_until_stopped() {
    let fired = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&fired);
    let handle = repeat(
        move || {
            let counter = Rc::clone(&counter);
            async move {
                counter.set(counter.get() + 1);
                Ok(())
            }
        },
        Duration::from_millis(15),
    );

    let stopper = handle.clone();
    spawn(async move {
        sleep(Duration::from_millis(50)).await;
        stopper.stop();
        Ok(())
    });

    // The stopped repeater is dropped on its next encounter, so the queue
    // drains and run() returns.
    run().unwrap();
    assert!(fired.get() >= 1, "fired {}", fired.get());
    assert!(fired.get() <= 6, "fired {}", fired.get());
    assert_eq!(handle.fired_count(), fired.get() as u64);
}

#[test]
fn cleanup_discards_pending_work_idempotently() {
    let ran = Rc::new(Cell::new(false));

    let flag = Rc::clone(&ran);
    spawn(async move {
        sleep(Duration::from_secs(60)).await;
        flag.set(true);
        Ok(())
    });
    repeat(|| async { Ok(()) }, Duration::from_secs(60));

    cleanup();
    cleanup();
    // Nothing left to drive.
    run().unwrap();
    assert!(!ran.get());
}

#[test]
fn spawn_fn_hands_the_task_its_token() {
    let observed = Rc::new(Cell::new(false));

    let flag = Rc::clone(&observed);
    spawn_fn(move |token| async move {
        flag.set(!token.is_cancelled());
        Ok(())
    });
    run().unwrap();
    assert!(observed.get());
}

#[test]
fn admission_still_drains_all_tasks() {
    let done = Rc::new(Cell::new(0u32));

    set_max_concurrent(2).unwrap();
    for _ in 0..10 {
        let d = Rc::clone(&done);
        spawn(async move {
            yield_now().await;
            d.set(d.get() + 1);
            Ok(())
        });
    }
    run().unwrap();
    assert_eq!(done.get(), 10);
}

#[test]
fn channel_backpressure_roundtrip() {
    let received: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
    let ch: Channel<u32> = Channel::open(42_000, 1);

    let producer = async move {
        for i in 0..5u32 {
            ch.send(i).await.map_err(|e| TaskError::Fail {
                reason: e.to_string(),
            })?;
        }
        Ok(())
    };
    let sink = Rc::clone(&received);
    let consumer = async move {
        for _ in 0..5 {
            let v = ch.recv().await.map_err(|e| TaskError::Fail {
                reason: e.to_string(),
            })?;
            sink.borrow_mut().push(v);
        }
        Ok(())
    };

    join(vec![
        Box::pin(producer) as TaskFuture,
        Box::pin(consumer) as TaskFuture,
    ])
    .unwrap();

    assert_eq!(*received.borrow(), vec![0, 1, 2, 3, 4]);
    ch.close();
}

#[test]
fn observers_see_lifecycle_events_in_seq_order() {
    struct Capture(RefCell<Vec<(u64, EventKind)>>);

    impl Observer for Capture {
        fn on_event(&self, e: &Event) {
            self.0.borrow_mut().push((e.seq, e.kind));
        }
    }

    let capture = Rc::new(Capture(RefCell::new(Vec::new())));
    strand::runtime().add_observer(capture.clone());

    spawn(async {
        yield_now().await;
        Ok(())
    });
    run().unwrap();

    let seen = capture.0.borrow();
    let kinds: Vec<EventKind> = seen.iter().map(|(_, k)| *k).collect();
    assert!(kinds.contains(&EventKind::TaskSpawned));
    assert!(kinds.contains(&EventKind::TaskCompleted));
    let spawned = kinds
        .iter()
        .position(|k| *k == EventKind::TaskSpawned)
        .unwrap();
    let completed = kinds
        .iter()
        .position(|k| *k == EventKind::TaskCompleted)
        .unwrap();
    assert!(spawned < completed);
    assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn defer_task_is_driven_to_completion_at_cleanup() {
    let swept = Rc::new(Cell::new(false));

    let flag = Rc::clone(&swept);
    let handle = watch(async move {
        defer_task(move || async move {
            sleep(Duration::from_millis(5)).await;
            flag.set(true);
            Ok(())
        })
        .await;
        Ok(())
    });

    handle.unwrap();
    assert!(swept.get());
}

#[test]
fn current_task_id_is_scoped_to_a_step() {
    assert!(current_task_id().is_none());

    let id = Rc::new(Cell::new(None));
    let seen = Rc::clone(&id);
    let spawned = spawn(async move {
        seen.set(current_task_id());
        Ok(())
    });
    run().unwrap();

    assert_eq!(id.get(), Some(spawned));
    assert!(current_task_id().is_none());
}

#[test]
fn non_awaited_failures_do_not_stop_the_loop() {
    let survivor = Rc::new(Cell::new(false));

    spawn(async {
        Err::<(), _>(TaskError::Fail {
            reason: "dropped on the floor".into(),
        })
    });
    let flag = Rc::clone(&survivor);
    spawn(async move {
        yield_now().await;
        flag.set(true);
        Ok(())
    });

    run().unwrap();
    assert!(survivor.get());
}
