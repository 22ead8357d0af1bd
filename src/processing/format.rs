//! Structural markup for heading-like and label-like lines.
//!
//! Upper-case lines become `### HEADING ###` blocks and `Label:` lines become `**Label:**`
//! blocks, both on their own lines. Everything else is flowed into running text.

use super::types::{PipelineError, TextStage};
use regex::Regex;
use std::sync::LazyLock;

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z\s]+$").expect("heading pattern is valid"));
static LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+:$").expect("label pattern is valid"));

/// Shape of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    /// Entirely upper-case letters and spaces.
    Heading,
    /// Letters and spaces followed by a trailing colon.
    Label,
    /// Anything else.
    Body,
}

/// Classify a trimmed line; heading wins over label.
pub fn classify_line(line: &str) -> LineShape {
    if HEADING_LINE.is_match(line) {
        LineShape::Heading
    } else if LABEL_LINE.is_match(line) {
        LineShape::Label
    } else {
        LineShape::Body
    }
}

/// Rewrite lines into one string carrying heading and bold-label markers.
pub fn format_text<S: AsRef<str>>(lines: &[S]) -> Result<String, PipelineError> {
    if lines.is_empty() {
        return Err(PipelineError::EmptyInput(TextStage::Format));
    }

    let mut formatted = String::new();
    let mut headings = 0usize;
    let mut labels = 0usize;

    for line in lines {
        let line = line.as_ref().trim();
        match classify_line(line) {
            LineShape::Heading => {
                headings += 1;
                formatted.push_str(&format!("\n### {line} ###\n"));
            }
            LineShape::Label => {
                labels += 1;
                formatted.push_str(&format!("\n**{line}**\n"));
            }
            LineShape::Body => {
                formatted.push_str(line);
                formatted.push(' ');
            }
        }
    }

    tracing::debug!(headings, labels, "Text formatted");
    Ok(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_headings_and_labels() {
        let formatted = format_text(&["ALL CAPS LINE", "Label:"]).unwrap();
        assert!(formatted.contains("### ALL CAPS LINE ###"));
        assert!(formatted.contains("**Label:**"));
    }

    #[test]
    fn body_lines_are_flowed_with_trailing_space() {
        let formatted = format_text(&["  Revenue rose 8%.  ", "Costs fell."]).unwrap();
        assert_eq!(formatted, "Revenue rose 8%. Costs fell. ");
    }

    #[test]
    fn label_with_value_is_body_text() {
        assert_eq!(classify_line("Company: XYZ Corp"), LineShape::Body);
        assert_eq!(classify_line("Key Risks:"), LineShape::Label);
        assert_eq!(classify_line("BUSINESS OVERVIEW"), LineShape::Heading);
        assert_eq!(classify_line("Q3 2024"), LineShape::Body);
    }

    #[test]
    fn upper_case_label_is_treated_as_heading_only_without_colon() {
        assert_eq!(classify_line("RISK FACTORS:"), LineShape::Label);
        assert_eq!(classify_line("RISK FACTORS"), LineShape::Heading);
    }

    #[test]
    fn rejects_empty_line_sequence() {
        let lines: Vec<String> = Vec::new();
        assert!(matches!(
            format_text(&lines),
            Err(PipelineError::EmptyInput(TextStage::Format))
        ));
    }
}
