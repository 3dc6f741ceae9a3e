// SPDX-License-Identifier: Apache-2.0

/// Escapes `%`, `_`, and `\` so a user term matches literally inside a
/// `LIKE ... ESCAPE '\'` pattern.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn chars_eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of `term` matched case-insensitively at the start of
/// `hay`, or None when it does not match there.
fn match_len_at(hay: &str, term: &[char]) -> Option<usize> {
    let mut consumed = 0;
    let mut hay_chars = hay.chars();
    for &tc in term {
        let hc = hay_chars.next()?;
        if !chars_eq_ci(hc, tc) {
            return None;
        }
        consumed += hc.len_utf8();
    }
    Some(consumed)
}

/// Wraps every case-insensitive, non-overlapping occurrence of `term`
/// in `<mark>` tags, preserving the original casing of the text.
#[must_use]
pub fn highlight(text: &str, term: &str) -> String {
    if text.is_empty() || term.is_empty() {
        return text.to_string();
    }
    let term_chars: Vec<char> = term.chars().collect();
    let mut out = String::with_capacity(text.len() + 32);
    let mut i = 0;
    while i < text.len() {
        if let Some(len) = match_len_at(&text[i..], &term_chars) {
            out.push_str("<mark>");
            out.push_str(&text[i..i + len]);
            out.push_str("</mark>");
            i += len;
            continue;
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_like_metacharacters() {
        assert_eq!(escape_like("50%_\\done"), "50\\%\\_\\\\done");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn highlight_preserves_original_casing() {
        assert_eq!(
            highlight("Rust and RUST and rust", "rust"),
            "<mark>Rust</mark> and <mark>RUST</mark> and <mark>rust</mark>"
        );
    }

    #[test]
    fn highlight_is_non_overlapping() {
        assert_eq!(highlight("aaa", "aa"), "<mark>aa</mark>a");
    }

    #[test]
    fn highlight_handles_multibyte_text() {
        assert_eq!(highlight("甜宝塔的博客", "宝塔"), "甜<mark>宝塔</mark>的博客");
    }

    #[test]
    fn empty_term_is_identity() {
        assert_eq!(highlight("anything", ""), "anything");
    }
}
