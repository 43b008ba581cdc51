//! Wall-clock runtime behavior, including settlement from another thread.

use franken_deferred::time::sleep;
use franken_deferred::{Deferred, LocalRuntime, ValueSource, delayed_resolve};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn settlement_from_another_thread_wakes_the_runtime() {
    let rt = LocalRuntime::new();
    let (value, completer) = Deferred::<u64, String>::new();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        completer.fulfill(42)
    });
    let out = rt.block_on(value.settled()).unwrap();
    assert_eq!(out, Ok(42));
    assert!(worker.join().unwrap());
}

#[test]
fn wall_sleeps_take_real_time() {
    let rt = LocalRuntime::new();
    let start = Instant::now();
    let out = rt
        .block_on(async {
            sleep(Duration::from_millis(15)).await;
            delayed_resolve::<_, ()>(Duration::from_millis(15), ValueSource::value(7)).await
        })
        .unwrap();
    assert_eq!(out, Ok(7));
    assert!(start.elapsed() >= Duration::from_millis(30));
}
