use foundation::{LatLng, LatLngBounds};
use serde_json::{Map, Value};

/// Ring of positions. Stored as `LatLng`; GeoJSON order is handled at the edges.
pub type Ring = Vec<LatLng>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LatLng),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        match self {
            Geometry::Point(p) => Some(LatLngBounds::from_point(*p)),
            Geometry::Polygon(rings) => LatLngBounds::from_points(rings.iter().flatten().copied()),
            Geometry::MultiPolygon(polys) => {
                LatLngBounds::from_points(polys.iter().flatten().flatten().copied())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

/// Parsed GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<GeoFeature>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoJsonError {
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value
            .as_object()
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let feature = parse_feature(feat_val)
                .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;
            features.push(feature);
        }

        Ok(Self { features })
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        root.insert(
            "features".to_string(),
            Value::Array(self.features.iter().map(GeoFeature::to_geojson_value).collect()),
        );
        Value::Object(root)
    }
}

impl GeoFeature {
    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        obj.insert("geometry".to_string(), geometry_to_value(&self.geometry));
        Value::Object(obj)
    }
}

fn parse_feature(value: &Value) -> Result<GeoFeature, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    match obj.get("type").and_then(Value::as_str) {
        Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
        None => return Err("feature missing type".to_string()),
    }

    // Country files key features by ISO code; numeric ids are accepted too.
    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let geometry = parse_geometry(
        obj.get("geometry")
            .ok_or("feature missing geometry".to_string())?,
    )?;

    Ok(GeoFeature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            polys
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>, _>>()
                .map(Geometry::MultiPolygon)
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<LatLng, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    match arr.as_slice() {
        [lon, lat, ..] => {
            let lon = lon.as_f64().ok_or("lon must be a number".to_string())?;
            let lat = lat.as_f64().ok_or("lat must be a number".to_string())?;
            Ok(LatLng::new(lat, lon))
        }
        _ => Err("position must have [lon, lat]".to_string()),
    }
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        let points = ring
            .as_array()
            .ok_or("ring must be an array of positions".to_string())?;
        out.push(
            points
                .iter()
                .map(parse_position)
                .collect::<Result<Vec<_>, _>>()?,
        );
    }
    Ok(out)
}

fn geometry_to_value(geom: &Geometry) -> Value {
    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_name().to_string()),
    );
    let coords = match geom {
        Geometry::Point(p) => position_value(p),
        Geometry::Polygon(rings) => polygon_value(rings),
        Geometry::MultiPolygon(polys) => {
            Value::Array(polys.iter().map(|poly| polygon_value(poly)).collect())
        }
    };
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn polygon_value(rings: &[Ring]) -> Value {
    Value::Array(
        rings
            .iter()
            .map(|ring| Value::Array(ring.iter().map(position_value).collect()))
            .collect(),
    )
}

fn position_value(p: &LatLng) -> Value {
    Value::Array(vec![Value::from(p.lng), Value::from(p.lat)])
}
