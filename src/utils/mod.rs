/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Split a string on whitespace, the way an unquoted shell expansion would
pub fn split_words(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}
