//! Indented outline import.
//!
//! One step per non-blank line. Two spaces or one tab make one level of
//! nesting, and a leading `-` or `*` bullet is dropped:
//!
//! ```text
//! Design
//!   - Sketch
//!   - Review
//! Build
//! \tBackend
//! ```

use crate::error::{Result, TrackerError};

/// One outline line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Nesting level, 0 for the outermost lines
    pub depth: usize,
    pub name: String,
}

/// Parse outline text into entries with consistent depths.
///
/// A line indented more than one level below its predecessor is attached
/// one level below it, so every entry has a parent to go under.
pub fn parse_outline(text: &str) -> Result<Vec<OutlineEntry>> {
    let mut entries: Vec<OutlineEntry> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let expanded = line.replace('\t', "  ");
        let content = expanded.trim_start();
        let indent = expanded.len() - content.len();

        let name = content
            .strip_prefix(['-', '*'])
            .unwrap_or(content)
            .trim();
        if name.is_empty() {
            continue;
        }

        let max_depth = entries.last().map_or(0, |prev| prev.depth + 1);
        entries.push(OutlineEntry {
            depth: (indent / 2).min(max_depth),
            name: name.to_string(),
        });
    }

    if entries.is_empty() {
        return Err(TrackerError::invalid_input("outline").with_reason("Outline has no steps"));
    }
    log::debug!("Parsed outline with {} entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(entries: &[OutlineEntry]) -> Vec<(usize, &str)> {
        entries.iter().map(|e| (e.depth, e.name.as_str())).collect()
    }

    #[test]
    fn test_parse_nested_outline() {
        let entries = parse_outline("Design\n  - Sketch\n  * Review\n\nBuild\n\tBackend\n\t\tSchema\n").unwrap();
        assert_eq!(
            shape(&entries),
            vec![
                (0, "Design"),
                (1, "Sketch"),
                (1, "Review"),
                (0, "Build"),
                (1, "Backend"),
                (2, "Schema"),
            ]
        );
    }

    #[test]
    fn test_over_indented_lines_attach_to_previous() {
        let entries = parse_outline("      Deep first\nTop\n        Too deep").unwrap();
        assert_eq!(shape(&entries), vec![(0, "Deep first"), (0, "Top"), (1, "Too deep")]);
    }

    #[test]
    fn test_odd_indentation_rounds_down() {
        let entries = parse_outline("A\n   B\n     C").unwrap();
        assert_eq!(shape(&entries), vec![(0, "A"), (1, "B"), (2, "C")]);
    }

    #[test]
    fn test_empty_outline_is_rejected() {
        assert!(parse_outline("  \n\t\n - \n").is_err());
    }
}
