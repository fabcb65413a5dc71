//! Greedy text fitting for fixed pixel boxes.
//!
//! Lines are cut on characters, not words: a line grows one character at a time
//! until the measured width overflows, and the overflowing character starts the
//! next line. `'\n'` always ends a line. Measurement is supplied by the caller so
//! the same rules apply to any font.

/// One laid-out line, borrowed from the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaidOutLine<'a> {
    pub text: &'a str,
    /// Offset of the line top from the box top.
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBoxLayout<'a> {
    pub lines: Vec<LaidOutLine<'a>>,
    /// Bytes of input placed in the box. The rest did not fit vertically.
    pub consumed: usize,
}

/// Fit `text` into a `width` x `height` box.
///
/// Stops before any line whose bottom would pass `height`. A single glyph wider
/// than the box is placed alone on its line so layout always makes progress.
pub fn layout_text_box<'a, F>(
    text: &'a str,
    width: u32,
    height: u32,
    line_height: u32,
    measure: F,
) -> TextBoxLayout<'a>
where
    F: Fn(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut start = 0;
    let mut y = 0;

    while start < text.len() {
        if line_height == 0 || y + line_height > height {
            break;
        }
        let (line_end, resume) = fit_line(text, start, width, &measure);
        lines.push(LaidOutLine {
            text: &text[start..line_end],
            y,
        });
        y += line_height;
        start = resume;
    }

    TextBoxLayout {
        lines,
        consumed: start,
    }
}

/// Returns the end of the line starting at `start` and where the next one starts.
fn fit_line<F>(text: &str, start: usize, width: u32, measure: &F) -> (usize, usize)
where
    F: Fn(&str) -> u32,
{
    let mut end = start;
    for (offset, ch) in text[start..].char_indices() {
        let next = start + offset + ch.len_utf8();
        if ch == '\n' {
            return (start + offset, next);
        }
        if measure(&text[start..next]) > width {
            if end == start {
                return (next, next);
            }
            return (end, end);
        }
        end = next;
    }
    (end, end)
}

pub const ELLIPSIS: &str = "...";
/// Characters removed per truncation step.
pub const TITLE_TRIM_CHARS: usize = 8;

/// Shorten `title` until it fits in `available` pixels.
///
/// Each step drops the last [`TITLE_TRIM_CHARS`] characters (including a
/// previously added ellipsis) and appends [`ELLIPSIS`]. Returns an empty string
/// when not even the ellipsis fits.
pub fn truncate_title<F>(title: &str, available: u32, measure: F) -> String
where
    F: Fn(&str) -> u32,
{
    let mut current = title.to_string();
    while measure(&current) > available {
        let keep = current.chars().count().saturating_sub(TITLE_TRIM_CHARS);
        let mut shorter: String = current.chars().take(keep).collect();
        shorter.push_str(ELLIPSIS);
        if shorter == current {
            return String::new();
        }
        current = shorter;
    }
    current
}
