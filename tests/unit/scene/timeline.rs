use super::*;

#[test]
fn punctuation_and_latin_are_filtered() {
    let t = AnimationTimeline::from_word("你好！ hi，世界");
    assert_eq!(t.glyphs(), &['你', '好', '世', '界']);
    assert_eq!(t.len(), 4);
}

#[test]
fn empty_and_non_drawable_words_give_empty_timelines() {
    assert!(AnimationTimeline::from_word("").is_empty());
    assert!(AnimationTimeline::from_word("。？ abc 123").is_empty());
}

#[test]
fn extension_a_is_drawable() {
    assert!(is_drawable('\u{3400}'));
    assert!(is_drawable('龍'));
    assert!(!is_drawable('ก'));
    assert!(!is_drawable('、'));
}
