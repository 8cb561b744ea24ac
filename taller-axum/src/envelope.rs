//! Response bodies.
//!
//! Success: `{"success": true, "data": ..., "count": n}` where `count` is
//! present exactly when `data` is a list. Failure:
//! `{"success": false, "error": "..."}`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> Envelope<T> {
    pub fn one(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
        }
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn many(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            count: Some(count),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn count_only_accompanies_lists() {
        let one = serde_json::to_value(Envelope::one(json!({"id": 1}))).unwrap();
        assert_eq!(one, json!({"success": true, "data": {"id": 1}}));

        let many = serde_json::to_value(Envelope::many(vec![json!(1), json!(2)])).unwrap();
        assert_eq!(many, json!({"success": true, "data": [1, 2], "count": 2}));

        let empty = serde_json::to_value(Envelope::<Vec<u8>>::many(vec![])).unwrap();
        assert_eq!(empty["count"], json!(0));
    }

    #[test]
    fn failures_carry_only_the_message() {
        let v = serde_json::to_value(ErrorEnvelope::new("Cita no encontrada")).unwrap();
        assert_eq!(v, json!({"success": false, "error": "Cita no encontrada"}));
    }
}
