//! Spreadsheet cell sanitization.
//!
//! Goal text is written with `USER_ENTERED` semantics, so a leading
//! `=`, `+`, `-` or `@` would turn the cell into a formula. Such values get
//! a leading apostrophe, which spreadsheets treat as a literal-text marker.
//! Control characters below 0x20 are stripped, except tab and newline.

/// Prefix that forces a cell to be read as text.
pub const TEXT_ESCAPE: char = '\'';

const FORMULA_SENTINELS: [char; 4] = ['=', '+', '-', '@'];

/// Result of sanitizing a cell value.
#[derive(Debug)]
pub struct SanitizeResult {
    /// The cleaned text.
    pub text: String,
    /// Whether anything was changed.
    pub was_modified: bool,
    /// Descriptions of what was changed.
    pub warnings: Vec<String>,
}

/// Sanitize a user-supplied value before it is written to a cell.
pub fn sanitize_cell(input: &str) -> SanitizeResult {
    let mut warnings = Vec::new();

    let mut text = strip_control_chars(input);
    if text.len() != input.len() {
        warnings.push("stripped control characters".to_string());
    }

    if let Some(first) = text.chars().next() {
        if FORMULA_SENTINELS.contains(&first) {
            text.insert(0, TEXT_ESCAPE);
            warnings.push(format!("escaped leading formula sentinel '{first}'"));
        }
    }

    SanitizeResult {
        was_modified: !warnings.is_empty(),
        text,
        warnings,
    }
}

/// Drop control characters below 0x20, keeping tab and newline.
pub fn strip_control_chars(input: &str) -> String {
    input.chars().filter(|c| !is_stripped_control(*c)).collect()
}

fn is_stripped_control(c: char) -> bool {
    (c as u32) < 0x20 && c != '\t' && c != '\n'
}
