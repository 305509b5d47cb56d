use std::collections::{BTreeMap, HashMap};

use foundation::LatLng;
use serde_json::{Map, Value};

use crate::marker_input::{IconInput, MarkerInput, MarkerSpec};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FeatureError {
    #[error("marker has no position; expected [lat, lng] or {{position: [lat, lng]}}")]
    MissingGeometry,
    #[error("invalid marker position {0:?}; expected two finite numbers [lat, lng]")]
    InvalidPosition(Vec<f64>),
}

/// Point geometry in GeoJSON order: `[lon, lat]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointGeometry {
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn from_lat_lng(at: LatLng) -> Self {
        Self {
            coordinates: at.to_lon_lat(),
        }
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::from_lon_lat(self.coordinates)
    }
}

/// Icon options handed to the renderer. Always carries whatever the caller
/// supplied; a bare URL becomes `{"iconUrl": url}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon(pub Map<String, Value>);

impl Icon {
    pub fn from_url(url: impl Into<String>) -> Self {
        let mut options = Map::new();
        options.insert("iconUrl".to_string(), Value::String(url.into()));
        Icon(options)
    }

    pub fn url(&self) -> Option<&str> {
        self.0.get("iconUrl").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerProperties {
    pub id: Option<String>,
    /// Position in the authoritative marker sequence.
    pub index: usize,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<Icon>,
    pub country: Option<String>,
}

/// Canonical marker feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFeature {
    pub geometry: Option<PointGeometry>,
    pub properties: MarkerProperties,
}

impl MarkerFeature {
    pub fn lat_lng(&self) -> Option<LatLng> {
        self.geometry.map(|g| g.lat_lng())
    }

    /// GeoJSON `Feature` object. Absent properties are omitted, never `null`.
    pub fn to_geojson_value(&self) -> Value {
        let mut props = Map::new();
        if let Some(id) = &self.properties.id {
            props.insert("id".to_string(), Value::String(id.clone()));
        }
        props.insert("index".to_string(), Value::from(self.properties.index));
        if let Some(title) = &self.properties.title {
            props.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(description) = &self.properties.description {
            props.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        if let Some(icon) = &self.properties.icon {
            props.insert("icon".to_string(), Value::Object(icon.0.clone()));
        }
        if let Some(country) = &self.properties.country {
            props.insert("country".to_string(), Value::String(country.clone()));
        }

        let geometry = match self.geometry {
            Some(g) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), Value::String("Point".to_string()));
                obj.insert(
                    "coordinates".to_string(),
                    Value::Array(vec![
                        Value::from(g.coordinates[0]),
                        Value::from(g.coordinates[1]),
                    ]),
                );
                Value::Object(obj)
            }
            None => Value::Null,
        };

        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        obj.insert("geometry".to_string(), geometry);
        obj.insert("properties".to_string(), Value::Object(props));
        Value::Object(obj)
    }
}

/// Wraps features into a GeoJSON `FeatureCollection`.
pub fn marker_collection_value(features: &[MarkerFeature]) -> Value {
    let mut root = Map::new();
    root.insert(
        "type".to_string(),
        Value::String("FeatureCollection".to_string()),
    );
    root.insert(
        "features".to_string(),
        Value::Array(features.iter().map(MarkerFeature::to_geojson_value).collect()),
    );
    Value::Object(root)
}

/// Looks up description markup for a `descriptionSelector`.
///
/// In a browser host this is a DOM query; elsewhere any keyed store works.
pub trait DescriptionResolver {
    fn resolve(&self, selector: &str) -> Option<String>;
}

/// Resolver for hosts without a document: every selector misses.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoDescriptions;

impl DescriptionResolver for NoDescriptions {
    fn resolve(&self, _selector: &str) -> Option<String> {
        None
    }
}

impl DescriptionResolver for HashMap<String, String> {
    fn resolve(&self, selector: &str) -> Option<String> {
        self.get(selector).cloned()
    }
}

impl DescriptionResolver for BTreeMap<String, String> {
    fn resolve(&self, selector: &str) -> Option<String> {
        self.get(selector).cloned()
    }
}

/// Normalizes raw marker input into a canonical feature.
///
/// A literal `description` wins over `descriptionSelector`. The returned
/// `index` is the caller's value or 0; the marker layer renumbers it to the
/// feature's position when the feature joins the list.
pub fn normalize(
    input: &MarkerInput,
    resolver: &dyn DescriptionResolver,
) -> Result<MarkerFeature, FeatureError> {
    match input {
        MarkerInput::Position(pair) => {
            let at = lat_lng_from(pair)?;
            Ok(MarkerFeature {
                geometry: Some(PointGeometry::from_lat_lng(at)),
                properties: MarkerProperties::default(),
            })
        }
        MarkerInput::Spec(spec) => normalize_spec(spec, resolver),
    }
}

fn normalize_spec(
    spec: &MarkerSpec,
    resolver: &dyn DescriptionResolver,
) -> Result<MarkerFeature, FeatureError> {
    let position = spec
        .position
        .as_deref()
        .ok_or(FeatureError::MissingGeometry)?;
    let at = lat_lng_from(position)?;

    let description = match (&spec.description, &spec.description_selector) {
        (Some(literal), _) => Some(literal.clone()),
        (None, Some(selector)) => {
            let resolved = resolver.resolve(selector);
            if resolved.is_none() {
                tracing::warn!(selector = %selector, "description selector matched nothing");
            }
            resolved
        }
        (None, None) => None,
    };

    let icon = spec.icon.as_ref().map(|icon| match icon {
        IconInput::Url(url) => Icon::from_url(url.clone()),
        IconInput::Options(options) => Icon(options.clone()),
    });

    Ok(MarkerFeature {
        geometry: Some(PointGeometry::from_lat_lng(at)),
        properties: MarkerProperties {
            id: spec.id.clone(),
            index: spec.index.unwrap_or_default(),
            title: spec.title.clone(),
            description,
            icon,
            country: spec.country.clone(),
        },
    })
}

fn lat_lng_from(position: &[f64]) -> Result<LatLng, FeatureError> {
    match position {
        [lat, lng] if lat.is_finite() && lng.is_finite() => Ok(LatLng::new(*lat, *lng)),
        other => Err(FeatureError::InvalidPosition(other.to_vec())),
    }
}
