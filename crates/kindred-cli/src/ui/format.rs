//! Text helpers for the results table.

/// Shorten `s` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some(_) if max_chars <= 3 => ".".repeat(max_chars),
        Some(_) => {
            let cut = s
                .char_indices()
                .nth(max_chars - 3)
                .map_or(s.len(), |(i, _)| i);
            format!("{}...", &s[..cut])
        }
    }
}

/// Titles can contain newlines; a table cell cannot.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// View counts with `,` between groups of three digits.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Tidewater", 9), "Tidewater");
        assert_eq!(truncate_str("Salt and Ash", 8), "Salt ...");
        assert_eq!(truncate_str("Salt", 3), "...");
        assert_eq!(truncate_str("등대지기 이야기", 6), "등대지...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("A lighthouse\n  keeper\t"), "A lighthouse keeper");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }
}
