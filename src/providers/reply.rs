//! Reply normalization shared by every backend.

/// Appended to replies that were cut at the length limit.
pub const TRUNCATION_MARKER: &str = "\n\n[Response truncated]";

/// Trim a reply and cap it at `max_chars` characters.
///
/// The cut always lands on a char boundary and never inside an ANSI escape
/// sequence, so the kept prefix stays valid text for the JSON writer.
pub fn normalize_reply(raw: &str, max_chars: usize) -> String {
    let reply = raw.trim();
    if max_chars == 0 || reply.chars().count() <= max_chars {
        return reply.to_string();
    }

    let cut = reply
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(reply.len());
    let kept = strip_partial_escape(&reply[..cut]);

    format!("{}{}", kept.trim_end(), TRUNCATION_MARKER)
}

/// Drop a trailing escape sequence that lost its final byte.
fn strip_partial_escape(text: &str) -> &str {
    let Some(esc) = text.rfind('\x1b') else {
        return text;
    };

    let tail = &text[esc + 1..];
    let complete = match tail.chars().next() {
        // CSI: ESC [ params... final byte in 0x40..=0x7e
        Some('[') => tail[1..].chars().any(|c| ('\x40'..='\x7e').contains(&c)),
        // OSC: terminated by BEL or ESC \
        Some(']') => tail.contains('\x07'),
        Some(_) => true,
        None => false,
    };

    if complete {
        text
    } else {
        &text[..esc]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_replies_are_trimmed_only() {
        assert_eq!(normalize_reply("  hello \n", 10), "hello");
    }

    #[test]
    fn long_replies_get_the_marker() {
        let reply = normalize_reply(&"a".repeat(20), 10);
        assert_eq!(reply, format!("{}{}", "a".repeat(10), TRUNCATION_MARKER));
    }

    #[test]
    fn cut_respects_char_boundaries() {
        let reply = normalize_reply("héllo wörld", 4);
        assert!(reply.starts_with("héll"));
        assert!(reply.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn cut_never_splits_an_escape_sequence() {
        let raw = format!("ok \x1b[31mred\x1b[0m {}", "x".repeat(40));
        // Limit lands inside the first CSI sequence.
        let reply = normalize_reply(&raw, 6);
        assert_eq!(reply, format!("ok{}", TRUNCATION_MARKER));

        // A complete sequence before the cut is kept.
        let reply = normalize_reply(&raw, 10);
        assert!(reply.starts_with("ok \x1b[31mre"));
    }
}
