use super::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn ticks_at_the_target_rate() {
    let mut clock = FrameClock::start(Fps::whole(60).unwrap(), || {});
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let ticks = clock.ticks();
    assert!((59..=62).contains(&ticks), "ticks = {ticks}");
    clock.stop().await;
    assert!(!clock.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_halts_the_callback() {
    let calls = Arc::new(AtomicU64::new(0));
    let seen = calls.clone();
    let mut clock = FrameClock::start(Fps::whole(30).unwrap(), move || {
        seen.fetch_add(1, Ordering::Relaxed);
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    clock.stop().await;
    let after_stop = calls.load(Ordering::Relaxed);
    assert!(after_stop > 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::Relaxed), after_stop);

    // A second stop is a no-op.
    clock.stop().await;
}
