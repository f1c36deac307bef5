//! Width-aware text helpers for the transcript viewport.

use unicode_width::UnicodeWidthChar;

/// Wraps `text` to display-cell `width`, honoring embedded newlines.
///
/// Greedy word wrap; a word wider than the viewport is hard-broken so a
/// pasted URL cannot push the layout sideways.
pub fn wrap_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            lines.push(String::new());
            continue;
        }
        wrap_single(raw_line, width, &mut lines);
    }
    lines
}

fn wrap_single(line: &str, width: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split_inclusive(' ') {
        let word_width = display_width(word);
        if current_width + word_width <= width {
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= width {
            current.push_str(word);
            current_width = word_width;
        } else {
            // Hard-break an overlong word.
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if current_width + ch_width > width && !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
}

/// Display-cell width of a string.
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_line_is_untouched() {
        assert_eq!(wrap_width("hello", 10), vec!["hello"]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_width("the quick brown fox", 10),
            vec!["the quick ", "brown fox"]
        );
    }

    #[test]
    fn hard_breaks_overlong_words() {
        assert_eq!(wrap_width("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn keeps_embedded_newlines() {
        assert_eq!(wrap_width("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn wide_chars_count_double() {
        // Each CJK cell is two columns wide.
        assert_eq!(wrap_width("日本語テキスト", 6), vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn zero_width_is_a_no_op() {
        assert_eq!(wrap_width("anything", 0), vec!["anything"]);
    }
}
