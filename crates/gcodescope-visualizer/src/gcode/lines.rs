//! Line splitting with progress annotation

use serde::{Deserialize, Serialize};

/// One raw source line and how far into the file it ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeLine {
    pub line: String,
    /// Cumulative bytes through this line's terminator, as a percentage
    pub percentage: f64,
}

/// Split text into lines annotated with cumulative byte percentages
///
/// Every line counts its byte length plus one terminator. A final line
/// without a terminator is counted as if it had one, so the last line always
/// ends on exactly 100. Carriage returns are stripped from the line text but
/// still count as bytes.
pub fn split_lines(text: &str) -> Vec<GcodeLine> {
    if text.is_empty() {
        return Vec::new();
    }

    let body = text.strip_suffix('\n').unwrap_or(text);
    let total = body.len() + 1;

    let mut consumed = 0usize;
    body.split('\n')
        .map(|raw| {
            consumed += raw.len() + 1;
            GcodeLine {
                line: raw.strip_suffix('\r').unwrap_or(raw).to_string(),
                percentage: consumed as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_reach_one_hundred() {
        let lines = split_lines("G1 X10 Y10 E1\nG1 X20\nG1 Z0.2\n");
        assert_eq!(lines.len(), 3);
        assert!(lines
            .windows(2)
            .all(|pair| pair[0].percentage <= pair[1].percentage));
        assert_eq!(lines[2].percentage, 100.0);
        assert!((lines[0].percentage - 14.0 / 29.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let lines = split_lines("G1 X1\nG1 X2");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].line, "G1 X2");
        assert_eq!(lines[1].percentage, 100.0);
    }

    #[test]
    fn test_crlf_counts_bytes_but_strips_text() {
        let lines = split_lines("G1 X1\r\nG1 X2\r\n");
        assert_eq!(lines[0].line, "G1 X1");
        assert!((lines[0].percentage - 50.0).abs() < 1e-9);
        assert_eq!(lines[1].percentage, 100.0);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let lines = split_lines("\n\nG1 X1\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, "");
        assert_eq!(lines[2].percentage, 100.0);
    }
}
