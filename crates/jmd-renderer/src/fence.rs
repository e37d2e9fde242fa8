//! Code fence tracking.
//!
//! Fenced code is opaque to extensions: the block lexer hands it straight to
//! the baseline grammar and file inclusion skips `[[...]]` inside it.

/// Tracks code fence state during line-by-line processing.
///
/// Fences use three or more backticks or tildes. The closing fence must use
/// the same character and be at least as long as the opening one.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    fence_char: Option<char>,
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Feed one line. Returns `true` if the line opened or closed a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();

        if let Some(fence_char) = self.fence_char {
            if is_closing_fence(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return true;
            }
            false
        } else if let Some((ch, len)) = detect_fence(trimmed) {
            self.fence_char = Some(ch);
            self.fence_len = len;
            true
        } else {
            false
        }
    }
}

/// Whether `line` opens a fenced code block.
pub(crate) fn opens_fence(line: &str) -> bool {
    detect_fence(line.trim_start()).is_some()
}

/// Byte length of the fenced block starting at the beginning of `src`,
/// including the closing fence line. An unclosed fence runs to the end.
pub(crate) fn fenced_block_len(src: &str) -> Option<usize> {
    let mut lines = src.split_inclusive('\n');
    let first = lines.next()?;
    let mut tracker = FenceTracker::new();
    if !tracker.update(first) {
        return None;
    }

    let mut len = first.len();
    for line in lines {
        len += line.len();
        if tracker.update(line) {
            return Some(len);
        }
    }
    Some(len)
}

fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    // A backtick fence's info string cannot contain backticks.
    if count < 3 || (first == '`' && trimmed[count..].contains('`')) {
        return None;
    }
    Some((first, count))
}

fn is_closing_fence(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    count >= min_len && trimmed[count..].chars().all(char::is_whitespace)
}
