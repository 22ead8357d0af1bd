//! Whitespace normalization and line splitting.

use super::types::{PipelineError, TextStage};

/// Split raw text into normalized logical lines.
///
/// Line boundaries of the source are kept; inside each line every whitespace run collapses to a
/// single space. Lines left blank after collapsing are dropped as extraction noise.
pub fn preprocess_text(text: &str) -> Result<Vec<String>, PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyInput(TextStage::Normalize));
    }

    let lines: Vec<String> = text
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect();

    tracing::debug!(lines = lines.len(), "Text preprocessed");
    Ok(lines)
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_input_yields_one_line() {
        let lines = preprocess_text("Revenue   grew\tstrongly.").unwrap();
        assert_eq!(lines, vec!["Revenue grew strongly."]);
    }

    #[test]
    fn keeps_line_boundaries_and_drops_blank_lines() {
        let lines =
            preprocess_text("BUSINESS OVERVIEW\n\n   \nCompany:  XYZ\r\nSales rose.\n").unwrap();
        assert_eq!(lines, vec!["BUSINESS OVERVIEW", "Company: XYZ", "Sales rose."]);
    }

    #[test]
    fn rejects_blank_input() {
        assert!(matches!(
            preprocess_text(""),
            Err(PipelineError::EmptyInput(TextStage::Normalize))
        ));
        assert!(matches!(
            preprocess_text(" \n\t "),
            Err(PipelineError::EmptyInput(TextStage::Normalize))
        ));
    }
}
