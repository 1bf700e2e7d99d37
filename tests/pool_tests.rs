mod common;

use common::{Counts, RejectEven, Tree, TreeArgs, pool_config, sequential_counts};
use crawlpool::{Manager, Pipeline, PoolConfig, PoolError};
use crossbeam_channel::{Receiver, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

/// Start in the background; the receiver yields the final counts.
fn start_async(manager: &Manager<Tree>, reset: bool) -> Receiver<Result<Counts, PoolError>> {
    let (tx, rx) = unbounded();
    manager
        .start_with_callback(reset, move |outcome| {
            let _ = tx.send(outcome.map(|results| Counts::of(&results)));
        })
        .unwrap();
    rx
}

// --- work conservation ---

#[test]
fn test_counts_independent_of_worker_count() {
    let args = TreeArgs::new(3, 3000);
    let expected = sequential_counts(&args, &[0], Pipeline::new());
    assert!(expected.skipped > 0);
    for workers in 1..=4 {
        let manager = Manager::<Tree>::new([0], pool_config(workers, false), args.clone()).unwrap();
        let results = manager.start(true).unwrap();
        assert_eq!(Counts::of(&results), expected, "workers={workers}");
        assert_eq!(manager.batch_id(), 1);
    }
}

#[test]
fn test_no_job_lost_or_duplicated() {
    let args = TreeArgs::new(2, 2000);
    let manager = Manager::<Tree>::new([0], pool_config(3, false), args).unwrap();
    let results = manager.start(true).unwrap();
    let mut seen = results.links_followed();
    seen.extend(results.links_skipped());
    seen.sort_unstable();
    let before = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), before);
}

#[test]
fn test_many_initial_jobs_small_buffer() {
    let args = TreeArgs::new(2, 400);
    let roots: Vec<u64> = (0..50).collect();
    let expected = sequential_counts(&args, &roots, Pipeline::new());
    let config = PoolConfig {
        buffer_size: 1,
        ..pool_config(3, false)
    };
    let manager = Manager::<Tree>::new(roots, config, args).unwrap();
    let results = manager.start(true).unwrap();
    assert_eq!(Counts::of(&results), expected);
}

#[test]
fn test_failed_transform_drops_only_that_hit() {
    let args = TreeArgs::new(3, 500);
    let expected = sequential_counts(&args, &[0], Pipeline::new().with(RejectEven));
    let all = sequential_counts(&args, &[0], Pipeline::new());
    assert!(expected.hits < all.hits);
    assert_eq!(expected.followed, all.followed);

    let manager = Manager::<Tree>::new([0], pool_config(2, false), args)
        .unwrap()
        .with_pipeline(Pipeline::new().with(RejectEven));
    let results = manager.start(true).unwrap();
    assert_eq!(Counts::of(&results), expected);
    assert!(results.hits().iter().all(|h| h % 2 == 1));
}

// --- pause / resume ---

#[test]
fn test_pause_resume_does_not_change_results() {
    let args = TreeArgs::new(3, 600).with_delay(Duration::from_micros(200));
    let expected = sequential_counts(&TreeArgs::new(3, 600), &[0], Pipeline::new());
    for workers in [1, 3] {
        let manager = Manager::<Tree>::new([0], pool_config(workers, false), args.clone()).unwrap();
        let rx = start_async(&manager, true);
        for _ in 0..5 {
            manager.pause();
            assert!(manager.is_paused());
            thread::sleep(Duration::from_millis(5));
            manager.pause();
            manager.resume();
            assert!(!manager.is_paused());
            thread::sleep(Duration::from_millis(2));
        }
        let counts = rx.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(counts, expected, "workers={workers}");
        manager.join().unwrap();
    }
}

#[test]
fn test_paused_pool_makes_no_progress() {
    let args = TreeArgs::new(3, 100_000).with_delay(Duration::from_micros(500));
    let manager = Manager::<Tree>::new([0], pool_config(3, false), args).unwrap();
    let rx = start_async(&manager, true);
    thread::sleep(Duration::from_millis(20));
    manager.pause();
    // Paused workers neither crawl nor flush
    let results = manager.results();
    let before = results.links_followed_len() + results.links_skipped_len();
    thread::sleep(Duration::from_millis(50));
    let after = results.links_followed_len() + results.links_skipped_len();
    assert_eq!(before, after);
    manager.stop();
    assert!(rx.recv_timeout(WAIT).unwrap().is_ok());
    manager.join().unwrap();
}

// --- stop ---

#[test]
fn test_stop_is_bounded() {
    let args = TreeArgs::new(3, u64::MAX / 4).with_delay(Duration::from_millis(1));
    for workers in [1, 3] {
        let manager = Manager::<Tree>::new([0], pool_config(workers, true), args.clone()).unwrap();
        let rx = start_async(&manager, true);
        thread::sleep(Duration::from_millis(30));
        let stopped_at = Instant::now();
        manager.stop();
        let counts = rx.recv_timeout(WAIT).unwrap().unwrap();
        assert!(stopped_at.elapsed() < Duration::from_secs(2));
        assert!(counts.followed > 0);
        assert!(!manager.running());
        manager.join().unwrap();
    }
}

#[test]
fn test_stop_while_paused() {
    let args = TreeArgs::new(3, u64::MAX / 4).with_delay(Duration::from_millis(1));
    for workers in [1, 2] {
        let manager = Manager::<Tree>::new([0], pool_config(workers, true), args.clone()).unwrap();
        let rx = start_async(&manager, true);
        thread::sleep(Duration::from_millis(20));
        manager.pause();
        let stopped_at = Instant::now();
        manager.stop();
        assert!(rx.recv_timeout(WAIT).unwrap().is_ok());
        assert!(stopped_at.elapsed() < Duration::from_secs(2));
        assert!(!manager.is_paused());
        manager.join().unwrap();
    }
}

// --- keepalive batches ---

#[test]
fn test_keepalive_reopens_batch_on_append() {
    let args = TreeArgs::new(2, 300);
    let one = sequential_counts(&args, &[0], Pipeline::new());
    for workers in [1, 3] {
        let fired = Arc::new(AtomicU64::new(0));
        let (batch_tx, batch_rx) = unbounded();
        let counter = Arc::clone(&fired);
        let manager = Manager::<Tree>::new([0], pool_config(workers, true), args.clone())
            .unwrap()
            .with_on_batch_done(move |batch, results| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = batch_tx.send((batch, Counts::of(results)));
            });
        let done_rx = start_async(&manager, true);

        assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), (1, one));
        assert!(manager.running());
        // No new batch without new work
        thread::sleep(Duration::from_millis(50));
        assert_eq!(manager.batch_id(), 1);

        manager.append_links([0]).unwrap();
        assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), (2, one.times(2)));
        manager.append_links([0]).unwrap();
        assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), (3, one.times(3)));
        assert_eq!(manager.batch_id(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        manager.stop();
        assert_eq!(done_rx.recv_timeout(WAIT).unwrap().unwrap(), one.times(3));
        manager.join().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}

#[test]
fn test_append_mid_run_doubles_counts() {
    let args = TreeArgs::new(3, 600).with_delay(Duration::from_micros(300));
    let one = sequential_counts(&TreeArgs::new(3, 600), &[0], Pipeline::new());
    for workers in [1, 2, 3] {
        let manager = Manager::<Tree>::new([0], pool_config(workers, false), args.clone()).unwrap();
        let rx = start_async(&manager, true);
        manager.append_links([0]).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap().unwrap(), one.times(2), "workers={workers}");
        assert_eq!(manager.batch_id(), 1);
        manager.join().unwrap();
    }
}

#[test]
fn test_keepalive_restart_after_stop() {
    let args = TreeArgs::new(2, 100);
    let one = sequential_counts(&args, &[0], Pipeline::new());
    let (batch_tx, batch_rx) = unbounded();
    let manager = Manager::<Tree>::new([0], pool_config(2, true), args)
        .unwrap()
        .with_on_batch_done(move |batch, _| {
            let _ = batch_tx.send(batch);
        });

    let rx = start_async(&manager, true);
    assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), 1);
    manager.stop();
    rx.recv_timeout(WAIT).unwrap().unwrap();
    manager.join().unwrap();

    // Queue is empty now; a restart drains immediately and then accepts more work
    let rx = start_async(&manager, false);
    assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), 2);
    manager.append_links([0]).unwrap();
    assert_eq!(batch_rx.recv_timeout(WAIT).unwrap(), 3);
    manager.stop();
    assert_eq!(rx.recv_timeout(WAIT).unwrap().unwrap(), one.times(2));
    manager.join().unwrap();
}

// --- lifecycle and configuration errors ---

#[test]
fn test_start_twice_is_rejected() {
    let args = TreeArgs::new(2, 100);
    let manager = Manager::<Tree>::new([0], pool_config(2, true), args).unwrap();
    let rx = start_async(&manager, true);
    assert!(matches!(manager.start(true), Err(PoolError::AlreadyRunning)));
    assert!(matches!(
        manager.start_with_callback(true, |_| {}),
        Err(PoolError::AlreadyRunning)
    ));
    manager.stop();
    rx.recv_timeout(WAIT).unwrap().unwrap();
    manager.join().unwrap();
}

#[test]
fn test_append_when_not_running() {
    let args = TreeArgs::new(2, 100);
    let manager = Manager::<Tree>::new([0], pool_config(2, false), args).unwrap();
    assert!(matches!(manager.append_links([1]), Err(PoolError::NotRunning)));
    manager.start(true).unwrap();
    assert!(!manager.running());
    assert!(matches!(manager.append_links([1]), Err(PoolError::NotRunning)));
}

#[test]
fn test_invalid_config_fails_fast() {
    let args = TreeArgs::new(2, 100);
    let zero_workers = PoolConfig {
        worker_count: 0,
        ..PoolConfig::default()
    };
    assert!(matches!(
        Manager::<Tree>::new([0], zero_workers, args.clone()),
        Err(PoolError::Config(_))
    ));
    let zero_buffer = PoolConfig {
        buffer_size: 0,
        ..PoolConfig::default()
    };
    assert!(matches!(
        Manager::<Tree>::new([0], zero_buffer, args),
        Err(PoolError::Config(_))
    ));
    assert!(matches!(
        Manager::<Tree>::new([0], PoolConfig::default(), TreeArgs::new(0, 10)),
        Err(PoolError::Config(_))
    ));
}

#[test]
fn test_worker_panic_is_reported() {
    let args = TreeArgs::new(2, 1000).with_panic_on(5);
    let manager = Manager::<Tree>::new([0], pool_config(2, true), args).unwrap();
    assert!(matches!(manager.start(true), Err(PoolError::WorkerPanicked(_))));
    assert!(!manager.running());
    // The pool can be started again afterwards
    assert!(matches!(manager.start_with_callback(true, |_| {}), Ok(())));
    manager.stop();
    manager.join().unwrap();
}

#[test]
fn test_inline_panic_is_reported() {
    for keepalive in [false, true] {
        let args = TreeArgs::new(2, 1000).with_panic_on(5);
        let manager = Manager::<Tree>::new([0], pool_config(1, keepalive), args).unwrap();
        assert!(matches!(manager.start(true), Err(PoolError::WorkerPanicked(0))));
        assert!(!manager.running());
        assert!(manager.results().done_time().is_some());

        let (tx, rx) = unbounded();
        manager
            .start_with_callback(true, move |outcome| {
                let _ = tx.send(outcome.is_ok());
            })
            .unwrap();
        manager.stop();
        manager.join().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}

// --- results ---

#[test]
fn test_reset_results_on_restart() {
    let args = TreeArgs::new(2, 64);
    let one = sequential_counts(&args, &[0, 0], Pipeline::new());
    let manager = Manager::<Tree>::new([0, 0], pool_config(2, false), args).unwrap();
    let results = manager.start(true).unwrap();
    assert_eq!(Counts::of(&results), one);
    assert_eq!(results.hits_header()[0].name, "Node");
    assert!(results.done_time() >= results.start_time());

    // Nothing left in the queue: a reset run ends empty, a non-reset run keeps the old results
    manager.start(false).unwrap();
    assert_eq!(Counts::of(&manager.results()), one);
    manager.start(true).unwrap();
    let empty = Counts {
        hits: 0,
        followed: 0,
        skipped: 0,
    };
    assert_eq!(Counts::of(&manager.results()), empty);
}
