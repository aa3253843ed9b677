use super::*;

#[test]
fn estimate_uses_per_glyph_budget() {
    let timing = TimingConfig::default();
    // 300 + 2 * (300 + 2400 + 300) + 500
    assert_eq!(estimate_duration(&timing, 2), Duration::from_millis(6_800));
    // 300 + 2000 + 500
    assert_eq!(estimate_duration(&timing, 0), Duration::from_millis(2_800));
}

#[tokio::test(start_paused = true)]
async fn fraction_is_capped_until_finished() {
    let mut est = ProgressEstimator::new(Duration::from_secs(1));
    assert_eq!(est.fraction(), 0.0);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!((est.fraction() - 0.5).abs() < 1e-9);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(est.fraction(), PROGRESS_CAP);
    assert!(!est.is_finalized());
    assert_eq!(est.finish(), 1.0);
    assert_eq!(est.fraction(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn zero_estimate_reports_the_cap() {
    let mut est = ProgressEstimator::new(Duration::ZERO);
    assert_eq!(est.fraction(), PROGRESS_CAP);
}

#[tokio::test(start_paused = true)]
async fn reporter_emits_non_decreasing_values_then_one() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut reporter = ProgressReporter::start(
        Duration::from_millis(400),
        Duration::from_millis(50),
        Arc::new(move |f| sink.lock().unwrap().push(f)),
    );
    tokio::time::sleep(Duration::from_millis(600)).await;
    {
        let values = seen.lock().unwrap();
        assert!(values.len() >= 10);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|&f| f < 1.0));
    }
    reporter.finish().await;
    assert!(!reporter.is_running());
    let values = seen.lock().unwrap();
    assert_eq!(values.last().copied(), Some(1.0));
    assert_eq!(values.iter().filter(|&&f| f == 1.0).count(), 1);
}
