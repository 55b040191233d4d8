//! Request DTOs for the image CDN API
//!
//! Defines the structure of incoming query parameters.

use crate::transform::TransformSpec;

/// Query string of the upload operation (POST /upload)
///
/// Values are kept as raw strings so that malformed numbers normalize to
/// "absent" instead of failing extraction. A parameter given more than once
/// is treated as malformed.
///
/// # Fields
/// - `width`: Optional target width
/// - `height`: Optional target height
/// - `quality`: Optional JPEG quality
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformQuery {
    pub width: Option<String>,
    pub height: Option<String>,
    pub quality: Option<String>,
}

impl TransformQuery {
    /// Builds the query from decoded `key=value` pairs. Unknown keys are
    /// ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            width: single(pairs, "width"),
            height: single(pairs, "height"),
            quality: single(pairs, "quality"),
        }
    }

    /// Normalizes the raw values into a [`TransformSpec`].
    pub fn to_spec(&self) -> TransformSpec {
        TransformSpec::normalize(
            self.width.as_deref(),
            self.height.as_deref(),
            self.quality.as_deref(),
        )
    }
}

/// Returns the value of `name` if it occurs exactly once.
fn single(pairs: &[(String, String)], name: &str) -> Option<String> {
    let mut values = pairs.iter().filter(|(k, _)| k == name).map(|(_, v)| v);
    match (values.next(), values.next()) {
        (Some(value), None) => Some(value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_from_pairs() {
        let query = TransformQuery::from_pairs(&pairs(&[("width", "50"), ("quality", "90"), ("fit", "x")]));
        assert_eq!(query.width.as_deref(), Some("50"));
        assert!(query.height.is_none());

        let spec = query.to_spec();
        assert_eq!(spec.width, Some(50));
        assert_eq!(spec.height, None);
        assert_eq!(spec.quality, 90);
    }

    #[test]
    fn test_repeated_parameter_is_absent() {
        let query = TransformQuery::from_pairs(&pairs(&[
            ("width", "10"),
            ("height", "30"),
            ("width", "20"),
            ("quality", "50"),
            ("quality", "50"),
        ]));
        assert_eq!(query.width, None);
        assert_eq!(query.height.as_deref(), Some("30"));

        let spec = query.to_spec();
        assert_eq!(spec.width, None);
        assert_eq!(spec.quality, crate::config::DEFAULT_QUALITY);
    }

    #[test]
    fn test_malformed_values_normalize() {
        let query = TransformQuery {
            width: Some("wide".to_string()),
            height: Some("9000".to_string()),
            quality: Some("0".to_string()),
        };
        assert_eq!(query.to_spec(), TransformSpec::default());
    }
}
