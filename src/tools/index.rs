use serde_json::Value;

use super::ToolError;

/// Parse an element index that might be `12`, `"12"`, `"i_12"` or `"[i_12]"`.
///
/// Range is not checked here; negative or unknown numbers fail at map lookup.
pub fn parse_index(index: &Value) -> Result<i64, ToolError> {
    let invalid = || ToolError::InvalidArgument(format!("Invalid index format: {}", index));

    match index {
        Value::Number(n) => n.as_i64().ok_or_else(invalid),
        Value::String(s) => {
            // Remove common artifacts
            let clean = s.replace(['[', ']'], "").replace("i_", "");
            let clean = clean.trim();
            if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) {
                clean.parse::<i64>().map_err(|_| invalid())
            } else {
                Err(invalid())
            }
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_integer_numeral_and_markers() {
        assert_eq!(parse_index(&json!(5)).unwrap(), 5);
        assert_eq!(parse_index(&json!("5")).unwrap(), 5);
        assert_eq!(parse_index(&json!("i_5")).unwrap(), 5);
        assert_eq!(parse_index(&json!("[i_5]")).unwrap(), 5);
        assert_eq!(parse_index(&json!(" [i_42] ")).unwrap(), 42);
    }

    #[test]
    fn rejects_non_numerals() {
        for bad in [json!("abc"), json!("[x_5]"), json!(null), json!(""), json!(2.5), json!([1])] {
            let err = parse_index(&bad).unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgument(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn negative_numbers_pass_through_to_lookup() {
        assert_eq!(parse_index(&json!(-3)).unwrap(), -3);
    }
}
