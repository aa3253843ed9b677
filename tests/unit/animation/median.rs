use super::*;
use crate::animation::strokes::DirStrokeSource;
use crate::render::surface::Surface;

const CROSS: &str = include_str!("../../fixtures/strokes/十.json");

fn cross() -> GlyphStrokes {
    GlyphStrokes::from_json('十', CROSS.as_bytes()).unwrap()
}

fn palette() -> StrokePalette {
    StrokePalette::from_theme(&ThemeConfig::default()).unwrap()
}

fn animator(dir: &std::path::Path, surface_size: u32) -> MedianAnimator {
    let cache = Arc::new(StrokeCache::new(Arc::new(DirStrokeSource::new(dir))));
    let cfg = StrokeConfig {
        surface_size,
        ..StrokeConfig::default()
    };
    MedianAnimator::new(cache, &cfg, &ThemeConfig::default(), FontBook::empty()).unwrap()
}

#[test]
fn stroke_duration_follows_median_length() {
    let dir = tempfile::tempdir().unwrap();
    let a = animator(dir.path(), 64);
    let close = |d: Duration, ms: u64| {
        d.abs_diff(Duration::from_millis(ms)) < Duration::from_micros(10)
    };
    assert!(close(a.stroke_duration(0.0), 200));
    assert!(close(a.stroke_duration(300.0), 300));

    // (784 + 600) / 3 + 50 + (910 + 600) / 3
    let total = a.glyph_duration(&cross());
    let expected =
        Duration::from_secs_f64((1384.0 + 1510.0) / 3000.0) + Duration::from_millis(50);
    assert!(total.abs_diff(expected) < Duration::from_micros(10));
}

#[test]
fn non_positive_speed_is_rejected() {
    let cache = Arc::new(StrokeCache::new(Arc::new(DirStrokeSource::new("."))));
    let cfg = StrokeConfig {
        speed: 0.0,
        ..StrokeConfig::default()
    };
    let res = MedianAnimator::new(cache, &cfg, &ThemeConfig::default(), FontBook::empty());
    assert!(matches!(res, Err(StrokeError::Validation(_))));
}

#[test]
fn frame_svg_reveals_the_active_stroke() {
    let canvas = Canvas::new(100, 100).unwrap();
    let active = ActiveStroke {
        index: 1,
        progress: 0.5,
    };
    let svg = glyph_frame_svg(&cross(), Some(active), &palette(), canvas, 0.0);
    assert!(svg.contains(r#"<clipPath id="active">"#));
    assert!(svg.contains(r#"clip-path="url(#active)""#));
    // Radical stroke uses the radical color, half revealed.
    assert!(svg.contains(r##"stroke="#168F16""##));
    assert!(svg.contains(r#"stroke-dashoffset="555.00""#));
    // Two outlines plus the completed first stroke.
    assert_eq!(svg.matches(r##"fill="#dddddd""##).count(), 2);
    assert_eq!(svg.matches(r##"fill="#000000""##).count(), 1);
}

#[test]
fn final_frame_fills_every_stroke() {
    let canvas = Canvas::new(100, 100).unwrap();
    let svg = glyph_frame_svg(&cross(), None, &palette(), canvas, 3.0);
    assert!(!svg.contains("clipPath"));
    assert_eq!(svg.matches(r##"fill="#000000""##).count(), 1);
    assert_eq!(svg.matches(r##"fill="#168F16""##).count(), 1);
    rasterize_svg(&svg, canvas, &FontBook::empty()).unwrap();
}

#[test]
fn outline_markup_is_escaped_in_frame_svg() {
    let mut data = cross();
    data.strokes[0] = r#"M 0 0 Z"/><rect width="9999" height="9999"/><path d="M 0 0"#.to_string();
    let canvas = Canvas::new(64, 64).unwrap();
    let active = ActiveStroke {
        index: 0,
        progress: 0.3,
    };
    let svg = glyph_frame_svg(&data, Some(active), &palette(), canvas, 0.0);
    assert!(!svg.contains("<rect"));
    assert!(svg.contains("&quot;/&gt;&lt;rect"));
    assert!(
        usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok(),
        "{svg}"
    );
}

#[tokio::test(start_paused = true)]
async fn animate_draws_the_whole_glyph_in_real_time() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("十.json"), CROSS).unwrap();
    let a = animator(dir.path(), 64);
    let surface = Surface::new(Canvas::new(64, 64).unwrap()).into_shared();

    let start = tokio::time::Instant::now();
    a.animate('十', &surface).await.unwrap();
    let elapsed = start.elapsed();
    let expected = a.glyph_duration(&cross());
    assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
    assert!(elapsed < expected + Duration::from_millis(100));

    let s = lock_surface(&surface);
    assert!(!s.is_blank());
    assert_eq!(s.pixel(0, 0), Some([0, 0, 0, 0]));
    let center = s.pixel(31, 30).unwrap();
    assert_eq!(center[3], 255);
    assert!(center[1] > center[0]);
}

#[tokio::test(start_paused = true)]
async fn missing_stroke_data_is_an_animation_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = animator(dir.path(), 64);
    let surface = Surface::new(Canvas::new(64, 64).unwrap()).into_shared();
    let err = a.animate('口', &surface).await.unwrap_err();
    assert!(matches!(err, StrokeError::Animation { .. }));
    assert!(lock_surface(&surface).is_blank());
}

#[tokio::test(start_paused = true)]
async fn draw_complete_takes_no_time() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("十.json"), CROSS).unwrap();
    let a = animator(dir.path(), 64);
    let surface = Surface::new(Canvas::new(64, 64).unwrap()).into_shared();

    let start = tokio::time::Instant::now();
    a.draw_complete('十', &surface).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(lock_surface(&surface).pixel(31, 30).map(|p| p[3]), Some(255));
}
