use super::*;

fn pcm(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Arc<AudioPcm> {
    Arc::new(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32: samples,
    })
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps = Fps {
        num: 30_000,
        den: 1001,
    };
    assert_eq!(frame_to_sample(0, fps, 48_000), 0);
    assert_eq!(frame_to_sample(1, fps, 48_000), 1602);
    assert_eq!(frame_to_sample(30, Fps::whole(30).unwrap(), 48_000), 48_000);
}

#[test]
fn renders_silence_without_voices() {
    let graph = AudioGraph::new(48_000, 2).unwrap();
    let out = graph.render(10);
    assert_eq!(out.len(), 20);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(graph.position(), 10);
}

#[test]
fn mono_voice_is_duplicated_to_both_channels() {
    let graph = AudioGraph::new(4, 2).unwrap();
    graph.render(2);
    let handle = graph.play(pcm(4, 1, vec![0.5, 0.25])).unwrap();
    assert!(handle.is_playing());

    let out = graph.render(4);
    assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0]);
    assert!(!handle.is_playing());
    assert_eq!(graph.active_voices(), 0);
}

#[test]
fn resamples_by_linear_interpolation() {
    let graph = AudioGraph::new(4, 1).unwrap();
    let _handle = graph.play(pcm(2, 1, vec![0.0, 1.0])).unwrap();
    let out = graph.render(4);
    assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
}

#[test]
fn dropping_the_handle_stops_the_voice() {
    let graph = AudioGraph::new(8, 2).unwrap();
    let handle = graph.play(pcm(8, 2, vec![0.3; 64])).unwrap();
    assert_eq!(graph.render(1), vec![0.3, 0.3]);
    drop(handle);
    assert_eq!(graph.active_voices(), 0);
    assert_eq!(graph.render(1), vec![0.0, 0.0]);
}

#[test]
fn voices_mix_and_clamp() {
    let graph = AudioGraph::new(8, 1).unwrap();
    let a = graph.play(pcm(8, 1, vec![0.75; 8])).unwrap();
    let b = graph.play(pcm(8, 1, vec![0.75; 8])).unwrap();
    assert_eq!(graph.render(1), vec![1.0]);
    b.stop();
    assert_eq!(graph.render(1), vec![0.75]);
    assert!(a.is_playing());
}

#[test]
fn closed_graph_refuses_playback() {
    let graph = AudioGraph::new(8, 1).unwrap();
    let handle = graph.play(pcm(8, 1, vec![0.5; 8])).unwrap();
    graph.close();
    graph.close();
    assert!(graph.is_closed());
    assert!(!handle.is_playing());
    assert_eq!(graph.render(2), vec![0.0, 0.0]);
    assert!(matches!(
        graph.play(pcm(8, 1, vec![0.5])),
        Err(StrokeError::Audio(_))
    ));
}

#[test]
fn rejects_zero_layout() {
    assert!(AudioGraph::new(0, 2).is_err());
    assert!(AudioGraph::new(48_000, 0).is_err());
}
