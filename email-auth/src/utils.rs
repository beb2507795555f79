/// Loose email format check, enough to catch typos before a round trip
pub struct EmailUtils;

impl EmailUtils {
    /// At least three characters, contains `@`, and neither starts nor ends
    /// with `@` or `.`.
    pub fn is_email_valid(value: &str) -> bool {
        let is_edge = |c: char| c == '@' || c == '.';
        let (Some(first), Some(last)) = (value.chars().next(), value.chars().last()) else {
            return false;
        };
        value.chars().count() >= 3 && value.contains('@') && !is_edge(first) && !is_edge(last)
    }

    /// Same check for untyped input; anything but a JSON string is invalid
    pub fn is_email_value_valid(value: &serde_json::Value) -> bool {
        value.as_str().is_some_and(Self::is_email_valid)
    }
}
