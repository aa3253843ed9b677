use super::*;

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &[0; 4], [0; 4]).is_err());
}

#[test]
fn codec_args_follow_the_container() {
    assert!(video_codec_args(VideoFormat::Webm).contains(&"libvpx-vp9"));
    assert!(audio_codec_args(VideoFormat::Webm).contains(&"libopus"));
    assert!(video_codec_args(VideoFormat::Mp4).contains(&"libx264"));
    assert!(audio_codec_args(VideoFormat::Mp4).contains(&"aac"));
}

#[test]
fn factory_reports_the_container_extension() {
    let factory = FfmpegSinkFactory::new(FfmpegSinkOpts::new(VideoFormat::Mp4));
    assert_eq!(factory.extension(), "mp4");
}

#[test]
fn odd_dimensions_are_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(VideoFormat::Webm));
    let err = sink
        .begin(SinkConfig {
            width: 3,
            height: 4,
            fps: Fps::whole(30).unwrap(),
            audio: None,
        })
        .unwrap_err();
    assert!(matches!(err, StrokeError::Validation(_)));
}

#[test]
fn end_before_begin_is_an_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(VideoFormat::Webm));
    assert!(sink.end().is_err());
    assert!(sink.take_chunk().is_none());
    assert!(sink.push_audio(&[0.0]).is_ok());
}

#[test]
fn raw_frame_len_does_not_wrap_for_large_canvases() {
    let cfg = |width, height| SinkConfig {
        width,
        height,
        fps: Fps::whole(30).unwrap(),
        audio: None,
    };
    assert_eq!(raw_frame_len(&cfg(1080, 1920)).unwrap(), 1080 * 1920 * 4);
    // 65536 * 65536 * 4 is 2^34, past u32::MAX.
    #[cfg(target_pointer_width = "64")]
    assert_eq!(raw_frame_len(&cfg(65_536, 65_536)).unwrap(), 1usize << 34);
    assert!(raw_frame_len(&cfg(0, 2)).is_err());
}
