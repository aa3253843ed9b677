use super::*;

fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

#[test]
fn detects_riff_wave_headers() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    assert!(is_wav(&wav_bytes(spec, &[0, 1])));
    assert!(!is_wav(b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00"));
    assert!(!is_wav(b"RIFF"));
}

#[test]
fn decodes_int_wav_to_normalized_f32() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let pcm = decode_wav(&wav_bytes(spec, &[i16::MAX, i16::MIN, 0, 16_384])).unwrap();
    assert_eq!(pcm.sample_rate, 16_000);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames(), 2);
    assert!((pcm.interleaved_f32[0] - 1.0).abs() < 1e-4);
    assert_eq!(pcm.interleaved_f32[1], -1.0);
    assert_eq!(pcm.interleaved_f32[2], 0.0);
    assert_eq!(pcm.interleaved_f32[3], 0.5);
}

#[test]
fn duration_counts_frames_not_samples() {
    let pcm = AudioPcm {
        sample_rate: 1_000,
        channels: 2,
        interleaved_f32: vec![0.0; 1_000],
    };
    assert_eq!(pcm.duration(), Duration::from_millis(500));
    assert!(!pcm.is_empty());
}

#[test]
fn garbage_wav_is_an_audio_error() {
    let err = decode_wav(b"RIFF\x00\x00\x00\x00WAVEjunk").unwrap_err();
    assert!(matches!(err, StrokeError::Audio(_)));
}

#[tokio::test]
async fn empty_payload_is_rejected_without_ffmpeg() {
    let err = decode_audio(Vec::new(), 48_000, 2).await.unwrap_err();
    assert!(matches!(err, StrokeError::Audio(_)));
}

#[test]
fn f32le_writer_emits_little_endian_floats() {
    let mut out = Vec::new();
    write_f32le(&mut out, &[1.0, -0.5]).unwrap();
    assert_eq!(out.len(), 8);
    assert_eq!(&out[0..4], &1.0f32.to_le_bytes());
    assert_eq!(&out[4..8], &(-0.5f32).to_le_bytes());
}
