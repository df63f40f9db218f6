use serde_json::Value;

use crate::models::ClassificationResult;

/// Accepts a candidate record if it has a non-blank string `filename` and,
/// when `category` is present, a string category. `null` counts as absent.
///
/// Both provider transports go through this one function so the acceptance
/// policy is the same whichever endpoint produced the record.
pub fn validate_record(candidate: &Value) -> Option<ClassificationResult> {
    let object = candidate.as_object()?;

    let filename = object.get("filename")?.as_str()?;
    if filename.trim().is_empty() {
        return None;
    }

    let category = match object.get("category") {
        None | Some(Value::Null) => None,
        Some(Value::String(category)) => Some(category.clone()),
        Some(_) => return None,
    };

    Some(ClassificationResult::new(category, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_record_passes_through_unchanged() {
        let result = validate_record(&json!({"category": "web", "filename": "login-page"})).unwrap();
        assert_eq!(result, ClassificationResult::new(Some("web".into()), "login-page"));

        let padded = validate_record(&json!({"filename": "  spaced  "})).unwrap();
        assert_eq!(padded.filename, "  spaced  ");
    }

    #[test]
    fn test_category_is_optional() {
        let result = validate_record(&json!({"filename": "dashboard"})).unwrap();
        assert_eq!(result.category, None);

        let result = validate_record(&json!({"category": null, "filename": "dashboard"})).unwrap();
        assert_eq!(result.category, None);
    }

    #[test]
    fn test_rejects_bad_filename() {
        assert!(validate_record(&json!({"category": "web"})).is_none());
        assert!(validate_record(&json!({"filename": ""})).is_none());
        assert!(validate_record(&json!({"filename": "   \n"})).is_none());
        assert!(validate_record(&json!({"filename": 42})).is_none());
        assert!(validate_record(&json!({"filename": null})).is_none());
    }

    #[test]
    fn test_rejects_non_string_category() {
        assert!(validate_record(&json!({"category": 3, "filename": "x"})).is_none());
        assert!(validate_record(&json!({"category": ["web"], "filename": "x"})).is_none());
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(validate_record(&json!("login-page")).is_none());
        assert!(validate_record(&json!([{"filename": "x"}])).is_none());
        assert!(validate_record(&Value::Null).is_none());
    }
}
