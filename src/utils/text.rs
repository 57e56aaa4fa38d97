/// Compact follower/viewer counts the way the channel list shows them (`1.2K`, `3.4M`).
pub fn format_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

/// Render untrusted text as inert plain text for the terminal.
///
/// Control characters (ESC, BEL, CR, ...) are replaced by their escaped
/// representation so chat content can never move the cursor, recolor the
/// screen or otherwise inject terminal sequences.
pub fn escape_control(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1.0K");
        assert_eq!(format_number(1_500), "1.5K");
        assert_eq!(format_number(2_500_000), "2.5M");
    }

    #[test]
    fn test_escape_control_neutralizes_terminal_sequences() {
        let hostile = "\u{1b}[2Jgotcha\u{7}";
        let escaped = escape_control(hostile);
        assert!(!escaped.chars().any(|c| c.is_control()));
        assert_eq!(escaped, "\\u{1b}[2Jgotcha\\u{7}");
    }

    #[test]
    fn test_escape_control_keeps_printable_text() {
        assert_eq!(escape_control("<b>hi</b> ünïcödé Kappa"), "<b>hi</b> ünïcödé Kappa");
    }
}
