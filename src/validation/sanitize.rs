//! Free-text and path hygiene helpers

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::McpError;

const STRIPPED_CHARACTERS: [char; 5] = ['<', '>', '"', '\'', ';'];

static DISALLOWED_PATH_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"|?*;\x00-\x1f]"#).expect("Invalid regex: path character pattern")
});

static DRIVE_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:").expect("Invalid regex: drive root pattern"));

/// Removes markup and statement delimiters, then trims surrounding whitespace.
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|character| !STRIPPED_CHARACTERS.contains(character))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Accepts only relative paths without parent segments and returns them cleaned.
///
/// Both the raw path and the cleaned path must pass, so stripping punctuation
/// can never assemble a traversal or an absolute root.
pub fn validate_file_path(path: &str) -> Result<String, McpError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(McpError::validation("File path must not be empty"));
    }

    let cleaned = DISALLOWED_PATH_CHARACTERS.replace_all(trimmed, "").into_owned();
    if cleaned.is_empty() {
        return Err(McpError::validation("File path is empty after cleaning"));
    }

    check_relative(trimmed, path)?;
    check_relative(&cleaned, path)?;
    Ok(cleaned)
}

fn check_relative(candidate: &str, original: &str) -> Result<(), McpError> {
    if candidate.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(McpError::validation_with_details(
            "Invalid file path: parent directory segments are not allowed",
            serde_json::json!({ "path": original }),
        ));
    }

    if candidate.starts_with('/') || candidate.starts_with('\\') || DRIVE_ROOT.is_match(candidate) {
        return Err(McpError::validation_with_details(
            "Invalid file path: absolute paths are not allowed",
            serde_json::json!({ "path": original }),
        ));
    }
    Ok(())
}
