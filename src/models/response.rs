use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// The single outbound contract. Every request terminates in exactly this
/// shape; absent data is the empty value of the field's type, never an
/// omitted field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertResponse {
    pub status: String,
    pub success: bool,
    pub markdown: String,
    pub images: BTreeMap<String, String>,
    pub error: String,
    pub page_count: usize,
}

impl ConvertResponse {
    pub fn success(
        markdown: String,
        images: BTreeMap<String, String>,
        page_count: usize,
    ) -> Self {
        Self {
            status: "success".to_string(),
            success: true,
            markdown,
            images,
            error: String::new(),
            page_count,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            success: false,
            markdown: String::new(),
            images: BTreeMap::new(),
            error: message.into(),
            page_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(response: &ConvertResponse) -> Vec<String> {
        let value = serde_json::to_value(response).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn success_envelope_shape() {
        let response = ConvertResponse::success(
            "# Title".to_string(),
            BTreeMap::from([("figure_1".to_string(), "aGVsbG8=".to_string())]),
            4,
        );
        assert_eq!(response.status, "success");
        assert!(response.success);
        assert_eq!(response.error, "");
        assert_eq!(response.page_count, 4);
    }

    #[test]
    fn error_envelope_shape() {
        let response = ConvertResponse::error("Allowed file types are PDF");
        assert_eq!(response.status, "error");
        assert!(!response.success);
        assert_eq!(response.markdown, "");
        assert!(response.images.is_empty());
        assert_eq!(response.error, "Allowed file types are PDF");
        assert_eq!(response.page_count, 0);
    }

    #[test]
    fn both_outcomes_serialize_the_same_fields() {
        let success = ConvertResponse::success("text".into(), BTreeMap::new(), 1);
        let error = ConvertResponse::error("boom");
        assert_eq!(field_names(&success), field_names(&error));
        assert_eq!(field_names(&success).len(), 6);
    }
}
