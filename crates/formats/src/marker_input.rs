use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw marker as supplied by a caller.
///
/// Either a bare `[lat, lng]` pair or a structured record. Both shapes
/// deserialize from the JSON a host page would hand over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerInput {
    Position([f64; 2]),
    Spec(MarkerSpec),
}

/// Structured marker record. `position` is `[lat, lng]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconInput>,
}

/// Icon as given: a bare URL or a full icon options object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IconInput {
    Url(String),
    Options(Map<String, Value>),
}

impl MarkerSpec {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            position: Some(vec![lat, lng]),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_description_selector(mut self, selector: impl Into<String>) -> Self {
        self.description_selector = Some(selector.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.country = Some(code.into());
        self
    }

    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon = Some(IconInput::Url(url.into()));
        self
    }
}

impl From<[f64; 2]> for MarkerInput {
    fn from(lat_lng: [f64; 2]) -> Self {
        MarkerInput::Position(lat_lng)
    }
}

impl From<MarkerSpec> for MarkerInput {
    fn from(spec: MarkerSpec) -> Self {
        MarkerInput::Spec(spec)
    }
}

/// Marker reference accepted by removal: a position or a stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerRef {
    Index(usize),
    Id(String),
}

impl From<usize> for MarkerRef {
    fn from(index: usize) -> Self {
        MarkerRef::Index(index)
    }
}

impl From<&str> for MarkerRef {
    fn from(id: &str) -> Self {
        MarkerRef::Id(id.to_string())
    }
}

impl From<String> for MarkerRef {
    fn from(id: String) -> Self {
        MarkerRef::Id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{IconInput, MarkerInput, MarkerSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bare_pair_deserializes_as_position() {
        let input: MarkerInput = serde_json::from_value(json!([12.0, 34.0])).expect("parse");
        assert_eq!(input, MarkerInput::Position([12.0, 34.0]));
    }

    #[test]
    fn record_deserializes_with_camel_case_fields() {
        let input: MarkerInput = serde_json::from_value(json!({
            "position": [45, 2],
            "country": "FRA",
            "descriptionSelector": ".sample_content",
            "icon": "marker2.gif"
        }))
        .expect("parse");

        let MarkerInput::Spec(spec) = input else {
            panic!("expected structured marker");
        };
        assert_eq!(spec.position, Some(vec![45.0, 2.0]));
        assert_eq!(spec.country.as_deref(), Some("FRA"));
        assert_eq!(spec.description_selector.as_deref(), Some(".sample_content"));
        assert_eq!(spec.icon, Some(IconInput::Url("marker2.gif".to_string())));
    }

    #[test]
    fn icon_object_is_kept_as_options() {
        let spec: MarkerSpec = serde_json::from_value(json!({
            "position": [1, 2],
            "icon": {"iconUrl": "a.png", "iconSize": [10, 10]}
        }))
        .expect("parse");
        assert!(matches!(spec.icon, Some(IconInput::Options(ref m)) if m.len() == 2));
    }
}
