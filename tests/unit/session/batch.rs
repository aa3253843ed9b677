use super::*;
use std::io::Read as _;

fn spec(word: &str, pinyin: &str) -> RenderSpec {
    RenderSpec {
        word: word.to_string(),
        pinyin: pinyin.to_string(),
        thai: String::new(),
        meaning: String::new(),
        output_width: 8,
        output_height: 8,
    }
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Arc::new(move |f| sink.lock().unwrap().push(f)), seen)
}

fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            assert_eq!(file.compression(), zip::CompressionMethod::Stored);
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

#[test]
fn unique_names_get_numeric_suffixes() {
    let mut taken = HashSet::new();
    assert_eq!(unique_name("a", "webm", &taken), "a.webm");
    taken.insert("a.webm".to_string());
    assert_eq!(unique_name("a", "webm", &taken), "a_2.webm");
    taken.insert("a_2.webm".to_string());
    assert_eq!(unique_name("a", "webm", &taken), "a_3.webm");
}

#[test]
fn overall_fraction_combines_completed_and_current() {
    let mut st = BatchState::new(4);
    st.completed = 1;
    st.current_fraction = 0.5;
    assert!((st.overall() - 0.375).abs() < 1e-12);
    assert_eq!(BatchState::new(0).overall(), 1.0);
}

#[tokio::test]
async fn skip_policy_archives_the_survivors() {
    let specs = vec![spec("一", "yī"), spec("二", "èr"), spec("三", "sān")];
    let (cb, seen) = recorder();
    let archive = run_batch(
        &specs,
        "webm",
        BatchFailurePolicy::Skip,
        &BatchCancel::new(),
        cb,
        |s, progress| async move {
            progress(0.5);
            if s.word == "二" {
                Err(StrokeError::animation("boom"))
            } else {
                Ok(s.word.into_bytes())
            }
        },
    )
    .await
    .unwrap();

    assert_eq!(archive.entries, vec!["一_yī.webm", "三_sān.webm"]);
    assert_eq!(archive.skipped.len(), 1);
    assert_eq!(archive.skipped[0].index, 1);
    assert_eq!(archive.skipped[0].word, "二");

    let files = read_archive(&archive.bytes);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0], ("一_yī.webm".to_string(), "一".as_bytes().to_vec()));

    let values = seen.lock().unwrap();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(values.last().copied(), Some(1.0));
    assert_eq!(values.iter().filter(|&&f| f == 1.0).count(), 1);
}

#[tokio::test]
async fn completion_is_reported_once_after_the_archive_is_written() {
    let specs = vec![spec("一", "yī"), spec("二", "èr")];
    let (cb, seen) = recorder();
    let archive = run_batch(
        &specs,
        "webm",
        BatchFailurePolicy::Skip,
        &BatchCancel::new(),
        cb,
        |s, progress| async move {
            progress(0.5);
            progress(1.0);
            Ok(s.word.into_bytes())
        },
    )
    .await
    .unwrap();
    assert_eq!(archive.entries.len(), 2);

    let values = seen.lock().unwrap();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    let (last, before) = values.split_last().unwrap();
    assert_eq!(*last, 1.0);
    assert!(before.iter().all(|&f| f <= PROGRESS_CAP), "{before:?}");
    assert!(before.contains(&PROGRESS_CAP));
}

#[tokio::test]
async fn abort_policy_returns_the_first_error() {
    let specs = vec![spec("一", "yī"), spec("二", "èr"), spec("三", "sān")];
    let (cb, seen) = recorder();
    let mut ran = Vec::new();
    let err = run_batch(
        &specs,
        "webm",
        BatchFailurePolicy::Abort,
        &BatchCancel::new(),
        cb,
        |s, _progress| {
            ran.push(s.word.clone());
            async move {
                if s.word == "二" {
                    Err(StrokeError::animation("boom"))
                } else {
                    Ok(vec![1])
                }
            }
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StrokeError::Animation { .. }));
    assert_eq!(ran, vec!["一", "二"]);
    assert!(seen.lock().unwrap().iter().all(|&f| f < 1.0));
}

#[tokio::test]
async fn duplicate_words_do_not_collide() {
    let specs = vec![spec("好", "hǎo"), spec("好", "hǎo")];
    let (cb, _) = recorder();
    let archive = run_batch(
        &specs,
        "mp4",
        BatchFailurePolicy::Skip,
        &BatchCancel::new(),
        cb,
        |_, _| async { Ok(vec![0]) },
    )
    .await
    .unwrap();
    assert_eq!(archive.entries, vec!["好_hǎo.mp4", "好_hǎo_2.mp4"]);
}

#[tokio::test]
async fn cancel_stops_before_the_next_entry() {
    let specs = vec![spec("一", "yī"), spec("二", "èr")];
    let cancel = BatchCancel::new();
    let (cb, seen) = recorder();
    let archive = run_batch(
        &specs,
        "webm",
        BatchFailurePolicy::Skip,
        &cancel,
        cb,
        |_, _| {
            let cancel = cancel.clone();
            async move {
                cancel.cancel();
                Ok(vec![7])
            }
        },
    )
    .await
    .unwrap();
    assert!(cancel.is_cancelled());
    assert_eq!(archive.entries.len(), 1);
    assert_eq!(seen.lock().unwrap().last().copied(), Some(1.0));
}

#[tokio::test]
async fn empty_batch_is_an_empty_archive() {
    let (cb, seen) = recorder();
    let archive = run_batch(
        &[],
        "webm",
        BatchFailurePolicy::Skip,
        &BatchCancel::new(),
        cb,
        |_, _| async { Ok(Vec::new()) },
    )
    .await
    .unwrap();
    assert!(archive.entries.is_empty());
    assert!(read_archive(&archive.bytes).is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![1.0]);
}
