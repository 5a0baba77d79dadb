use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One untrusted prediction record as returned by a backend.
///
/// The wrapped value may be any JSON shape; only the normalizer looks inside.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawDetection(Value);

impl RawDetection {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub(crate) fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Image dimensions reported by the backend alongside its predictions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageDims {
    pub width: u32,
    pub height: u32,
}

/// Parsed body of a successful detection response.
///
/// ```json
/// { "predictions": [ { "x": 320, "y": 240, "width": 150, "height": 200,
///                      "confidence": 0.95, "class": "person" } ],
///   "image": { "width": 640, "height": 480 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BackendResponse {
    pub predictions: Vec<RawDetection>,
    #[serde(default, deserialize_with = "lenient_dims")]
    pub image: Option<ImageDims>,
}

impl BackendResponse {
    pub fn from_predictions(predictions: Vec<Value>) -> Self {
        Self {
            predictions: predictions.into_iter().map(RawDetection::new).collect(),
            image: None,
        }
    }

    pub fn with_image(mut self, width: u32, height: u32) -> Self {
        self.image = Some(ImageDims { width, height });
        self
    }

    /// Parse a response body. A body without a `predictions` array is unusable.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

// Malformed `image` metadata must not reject an otherwise usable response.
fn lenient_dims<'de, D>(deserializer: D) -> Result<Option<ImageDims>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_predictions_and_image_dims() {
        let body = json!({
            "predictions": [
                {"x": 320, "y": 240, "width": 150, "height": 200,
                 "confidence": 0.95, "class": "person", "class_id": 0,
                 "detection_id": "a1"},
                "garbage"
            ],
            "image": {"width": 640, "height": 480}
        })
        .to_string();

        let response = BackendResponse::parse(&body).unwrap();
        assert_eq!(response.predictions.len(), 2);
        assert_eq!(response.predictions[1].as_value(), &json!("garbage"));
        assert_eq!(
            response.image,
            Some(ImageDims {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn missing_predictions_is_an_error() {
        assert!(BackendResponse::parse(r#"{"image": {"width": 1, "height": 1}}"#).is_err());
        assert!(BackendResponse::parse(r#"{"predictions": {}}"#).is_err());
        assert!(BackendResponse::parse("<html>bad gateway</html>").is_err());
    }

    #[test]
    fn malformed_image_dims_are_ignored() {
        let response =
            BackendResponse::parse(r#"{"predictions": [], "image": {"width": "wide"}}"#).unwrap();
        assert!(response.predictions.is_empty());
        assert_eq!(response.image, None);
    }
}
