/// Ordered glyphs scheduled for sequential stroke-order playback within one job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnimationTimeline {
    glyphs: Vec<char>,
}

impl AnimationTimeline {
    /// Extract the drawable glyphs of `word`, in order. Everything else is dropped.
    pub fn from_word(word: &str) -> Self {
        Self {
            glyphs: word.chars().filter(|&c| is_drawable(c)).collect(),
        }
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Empty timelines get the fixed minimum pause instead of animation.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// `true` for code points that have stroke-order data: the CJK unified ideograph blocks
/// and the compatibility ideographs.
pub fn is_drawable(c: char) -> bool {
    matches!(
        u32::from(c),
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF
    )
}

#[cfg(test)]
#[path = "../../tests/unit/scene/timeline.rs"]
mod tests;
