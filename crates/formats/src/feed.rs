//! Marker feed records as published by the venue directory service.
//!
//! The feed is `{"popovers": [{"coordinates": {"lat", "lng"}, "iocCode", "name"}]}`.
//! Each popover becomes a structured marker whose index is its feed position.

use serde::Deserialize;

use crate::marker_input::{MarkerInput, MarkerSpec};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedCoordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Popover {
    pub coordinates: FeedCoordinates,
    #[serde(default)]
    pub ioc_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PopoverFeed {
    #[serde(default)]
    pub popovers: Vec<Popover>,
}

impl PopoverFeed {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn into_markers(self) -> Vec<MarkerInput> {
        self.popovers
            .into_iter()
            .enumerate()
            .map(|(index, p)| {
                MarkerInput::Spec(MarkerSpec {
                    position: Some(vec![p.coordinates.lat, p.coordinates.lng]),
                    description: p.name,
                    index: Some(index),
                    country: p.ioc_code,
                    ..MarkerSpec::default()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::PopoverFeed;
    use crate::marker_input::MarkerInput;

    #[test]
    fn popovers_become_indexed_markers() {
        let feed = PopoverFeed::from_json_str(
            r#"{"popovers": [
                {"coordinates": {"lat": 52.5, "lng": 13.4}, "iocCode": "GER", "name": "Berlin"},
                {"coordinates": {"lat": 48.8, "lng": 2.3}, "name": "Paris"}
            ]}"#,
        )
        .expect("parse");

        let markers = feed.into_markers();
        assert_eq!(markers.len(), 2);
        let MarkerInput::Spec(second) = &markers[1] else {
            panic!("expected structured marker");
        };
        assert_eq!(second.index, Some(1));
        assert_eq!(second.position, Some(vec![48.8, 2.3]));
        assert_eq!(second.country, None);
        assert_eq!(second.description.as_deref(), Some("Paris"));
    }
}
