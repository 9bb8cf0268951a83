use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification returned by `POST /detect`.
///
/// `detected_items` and `missing_items` are kept exactly as the backend sent
/// them. Depending on the backend version they arrive as a JSON array, as a
/// JSON-encoded string holding an array, or not at all. Use
/// [`crate::presenter::normalize_item_list`] to turn them into display lists.
///
/// A result is never patched after it is received; a new submission replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub is_safe: bool,

    /// Confidence score in the range 0-100
    pub confidence: f64,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub detected_items: Value,

    #[serde(default)]
    pub missing_items: Value,

    // Echo fields sent by backends that persist the detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// One row of `GET /detections`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: i64,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub file_type: String,

    pub is_safe: bool,
    pub confidence: f64,

    #[serde(default)]
    pub detected_items: Value,

    #[serde(default)]
    pub missing_items: Value,

    #[serde(default)]
    pub reason: String,

    /// ISO-8601 timestamp, usually without an offset
    pub created_at: String,
}

/// Aggregate counters from `GET /dashboard`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_detections: u64,
    pub total_accepted: u64,
    pub total_denied: u64,

    #[serde(default)]
    pub recent_detections: Vec<DetectionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_with_encoded_item_lists() {
        let result: DetectionResult = serde_json::from_value(json!({
            "is_safe": true,
            "confidence": 97,
            "reason": "All PPE detected",
            "detected_items": "[\"helmet\",\"vest\"]",
            "missing_items": "[]"
        }))
        .unwrap();

        assert!(result.is_safe);
        assert_eq!(result.confidence, 97.0);
        assert_eq!(result.detected_items, json!("[\"helmet\",\"vest\"]"));
        assert!(result.id.is_none());
    }

    #[test]
    fn test_result_missing_item_fields_default_to_null() {
        let result: DetectionResult =
            serde_json::from_value(json!({"is_safe": false, "confidence": 12.5})).unwrap();

        assert_eq!(result.detected_items, Value::Null);
        assert_eq!(result.missing_items, Value::Null);
        assert!(result.reason.is_empty());
    }

    #[test]
    fn test_persisted_result_echo_fields() {
        let result: DetectionResult = serde_json::from_value(json!({
            "id": 42,
            "file_path": "uploads/1_gate.jpg",
            "file_type": "image",
            "is_safe": false,
            "confidence": 64,
            "detected_items": ["helmet"],
            "missing_items": ["vest"],
            "reason": "Missing: vest",
            "created_at": "2026-03-01T08:15:00"
        }))
        .unwrap();

        assert_eq!(result.id, Some(42));
        assert_eq!(result.file_type.as_deref(), Some("image"));
        assert_eq!(result.missing_items, json!(["vest"]));
    }

    #[test]
    fn test_dashboard_stats_without_recent() {
        let stats: DashboardStats = serde_json::from_value(json!({
            "total_detections": 3,
            "total_accepted": 2,
            "total_denied": 1
        }))
        .unwrap();

        assert_eq!(stats.total_detections, 3);
        assert!(stats.recent_detections.is_empty());
    }
}
