use std::collections::{BTreeMap, BTreeSet};

use formats::{FeatureCollection, GeoFeature, Geometry};
use foundation::{LatLngBounds, union_all};

use crate::layer::{Layer, LayerId, LayerKind};
use crate::symbology::{PathStyle, StyleKey, StyleTable};
use crate::view::MapView;

pub const COUNTRY_CLASS: &str = "inmap-country";
pub const GOAL_CLASS: &str = "inmap-country inmap-country--goal";
pub const BASE_CLASS: &str = "inmap-country inmap-country--base";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CountryState {
    Base,
    Hover,
    Goal,
}

/// Where a country layer keeps its path options.
///
/// A polygon is one path with its own options. A multi-polygon renders one
/// path per part and is styled through a [`StyleGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum CountryShape {
    Polygon { options: PathStyle },
    Multi { parts: Vec<PathStyle> },
}

impl CountryShape {
    fn for_geometry(geometry: &Geometry, style: &PathStyle) -> Option<Self> {
        match geometry {
            Geometry::Polygon(_) => Some(CountryShape::Polygon {
                options: style.clone(),
            }),
            Geometry::MultiPolygon(polys) => Some(CountryShape::Multi {
                parts: vec![style.clone(); polys.len().max(1)],
            }),
            Geometry::Point(_) => None,
        }
    }
}

/// Temporary group wrapping a single multi-polygon layer so one style call
/// reaches every part.
pub struct StyleGroup<'a> {
    members: Vec<&'a mut [PathStyle]>,
}

impl<'a> StyleGroup<'a> {
    pub fn of(parts: &'a mut [PathStyle]) -> Self {
        Self {
            members: vec![parts],
        }
    }

    pub fn set_style(&mut self, style: &PathStyle) {
        for parts in &mut self.members {
            for part in parts.iter_mut() {
                part.merge(style);
            }
        }
    }
}

/// Rendered sub-layer of one country feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryLayer {
    id: LayerId,
    feature: GeoFeature,
    shape: CountryShape,
    class_name: String,
    state: CountryState,
    is_goal: bool,
}

impl CountryLayer {
    pub fn code(&self) -> Option<&str> {
        self.feature.id.as_deref()
    }

    pub fn feature(&self) -> &GeoFeature {
        &self.feature
    }

    pub fn shape(&self) -> &CountryShape {
        &self.shape
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn state(&self) -> CountryState {
        self.state
    }

    pub fn is_goal(&self) -> bool {
        self.is_goal
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.feature.geometry.bounds()
    }

    /// Style as drawn: a multi-polygon shows the style shared by its parts.
    pub fn effective_style(&self) -> PathStyle {
        match &self.shape {
            CountryShape::Polygon { options } => options.clone(),
            CountryShape::Multi { parts } => parts.first().cloned().unwrap_or_default(),
        }
    }

    fn set_style(&mut self, style: &PathStyle) {
        match &mut self.shape {
            CountryShape::Polygon { options } => options.merge(style),
            CountryShape::Multi { parts } => StyleGroup::of(parts).set_style(style),
        }
    }
}

impl Layer for CountryLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Country
    }
}

/// Goal flag and class name carried over when the layers are rebuilt.
struct KeptState {
    is_goal: bool,
    class_name: String,
}

/// Owns the country polygons and their per-code render state.
#[derive(Debug, Default)]
pub struct CountryLayerManager {
    features: Vec<GeoFeature>,
    layers: Vec<CountryLayer>,
    by_code: BTreeMap<String, usize>,
    highlighted: BTreeSet<String>,
    group: Option<LayerId>,
    loaded: bool,
    styles: StyleTable,
}

impl CountryLayerManager {
    pub fn new(styles: StyleTable) -> Self {
        Self {
            styles,
            ..Self::default()
        }
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Whether country data has been loaded (and not cleared since).
    pub fn has_data(&self) -> bool {
        self.loaded
    }

    pub fn group_id(&self) -> Option<LayerId> {
        self.group
    }

    pub fn layers(&self) -> &[CountryLayer] {
        &self.layers
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &str> {
        self.highlighted.iter().map(String::as_str)
    }

    /// Merges `data` into the accumulated features and rebuilds every layer.
    ///
    /// A feature whose code is already present replaces the old one in place.
    /// Non-polygonal features are skipped.
    pub fn add_country_data(&mut self, data: FeatureCollection, view: &mut dyn MapView) {
        for feature in data.features {
            if !feature.geometry.is_polygonal() {
                tracing::warn!(
                    id = feature.id.as_deref().unwrap_or("-"),
                    geometry = feature.geometry.type_name(),
                    "skipping non-polygonal country feature"
                );
                continue;
            }
            let existing = feature.id.as_ref().and_then(|code| {
                self.features
                    .iter()
                    .position(|f| f.id.as_ref() == Some(code))
            });
            match existing {
                Some(i) => self.features[i] = feature,
                None => self.features.push(feature),
            }
        }
        self.loaded = true;
        self.rebuild(view);
    }

    fn rebuild(&mut self, view: &mut dyn MapView) {
        let mut kept: BTreeMap<String, KeptState> = BTreeMap::new();
        for layer in self.layers.drain(..) {
            view.remove_layer(layer.id);
            if let Some(code) = layer.feature.id {
                kept.insert(
                    code,
                    KeptState {
                        is_goal: layer.is_goal,
                        class_name: layer.class_name,
                    },
                );
            }
        }
        self.by_code.clear();

        let group = match self.group {
            Some(id) => id,
            None => {
                let id = view.create_layer(LayerKind::CountryGroup);
                view.add_layer(id);
                self.group = Some(id);
                id
            }
        };

        for feature in &self.features {
            let Some(shape) = CountryShape::for_geometry(&feature.geometry, &self.styles.base)
            else {
                continue;
            };
            let id = view.create_layer(LayerKind::Country);
            view.add_layer(id);
            let mut layer = CountryLayer {
                id,
                feature: feature.clone(),
                shape,
                class_name: COUNTRY_CLASS.to_string(),
                state: CountryState::Base,
                is_goal: false,
            };

            if let Some(code) = feature.id.clone() {
                if let Some(state) = kept.remove(&code) {
                    layer.class_name = state.class_name;
                    if state.is_goal {
                        layer.is_goal = true;
                        layer.state = CountryState::Goal;
                        layer.set_style(&self.styles.goal);
                    }
                }
                if self.highlighted.contains(&code) {
                    layer.set_style(&self.styles.highlight);
                }
                self.by_code.insert(code, self.layers.len());
            }
            self.layers.push(layer);
        }

        self.highlighted.retain(|code| self.by_code.contains_key(code));
        view.layer_changed(group);
        tracing::debug!(
            countries = self.layers.len(),
            codes = self.by_code.len(),
            "country layers rebuilt"
        );
    }

    /// Sub-layer whose feature id equals `code`, by scanning every rendered layer.
    pub fn get_country(&self, code: &str) -> Option<&CountryLayer> {
        self.layers.iter().find(|l| l.code() == Some(code))
    }

    fn position_of(&self, code: &str, op: &str) -> Option<usize> {
        let found = self.layers.iter().position(|l| l.code() == Some(code));
        if found.is_none() {
            tracing::warn!(code, op, "unknown country code");
        }
        found
    }

    /// Removes the country's sub-layer and its accumulated feature.
    pub fn remove_country_code(
        &mut self,
        code: &str,
        view: &mut dyn MapView,
    ) -> Option<GeoFeature> {
        let Some(&pos) = self.by_code.get(code) else {
            tracing::warn!(code, op = "remove_country_code", "unknown country code");
            return None;
        };
        let layer = self.layers.remove(pos);
        view.remove_layer(layer.id);
        self.highlighted.remove(code);
        self.reindex();
        if let Some(group) = self.group {
            view.layer_changed(group);
        }

        let removed = self
            .features
            .iter()
            .position(|f| f.id.as_deref() == Some(code))
            .map(|i| self.features.remove(i));
        tracing::debug!(code, "country removed");
        removed.or(Some(layer.feature))
    }

    /// Removes every layer and forgets all accumulated data.
    pub fn remove_all_countries(&mut self, view: &mut dyn MapView) {
        for layer in self.layers.drain(..) {
            view.remove_layer(layer.id);
        }
        self.by_code.clear();
        self.highlighted.clear();
        self.features.clear();
        self.loaded = false;
        if let Some(group) = self.group {
            view.layer_changed(group);
        }
    }

    fn reindex(&mut self) {
        self.by_code = self
            .layers
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.code().map(|c| (c.to_string(), i)))
            .collect();
    }

    /// Marks the country as a goal. Returns `false` for an unknown code.
    pub fn set_goal(&mut self, code: &str) -> bool {
        self.set_idle(code, true, "set_goal")
    }

    pub fn set_base(&mut self, code: &str) -> bool {
        self.set_idle(code, false, "set_base")
    }

    fn set_idle(&mut self, code: &str, goal: bool, op: &str) -> bool {
        let Some(pos) = self.position_of(code, op) else {
            return false;
        };
        let (class, key, state) = if goal {
            (GOAL_CLASS, StyleKey::Goal, CountryState::Goal)
        } else {
            (BASE_CLASS, StyleKey::Base, CountryState::Base)
        };
        let style = self.styles.get(key).clone();
        let layer = &mut self.layers[pos];
        layer.class_name = class.to_string();
        layer.set_style(&style);
        layer.is_goal = goal;
        layer.state = state;
        true
    }

    /// Adds the country to the highlight group and applies the highlight style.
    pub fn highlight_country(&mut self, code: &str) -> bool {
        let Some(pos) = self.position_of(code, "highlight_country") else {
            return false;
        };
        let style = self.styles.highlight.clone();
        self.layers[pos].set_style(&style);
        self.highlighted.insert(code.to_string());
        true
    }

    pub fn is_highlighted(&self, code: &str) -> bool {
        self.highlighted.contains(code)
    }

    /// Pointer entered the country: applies the hover style.
    pub fn mouse_over(&mut self, code: &str) -> bool {
        let Some(&pos) = self.by_code.get(code) else {
            return false;
        };
        let style = self.styles.hover.clone();
        let layer = &mut self.layers[pos];
        layer.set_style(&style);
        layer.state = CountryState::Hover;
        true
    }

    /// Pointer left the country: restores the goal or base style.
    pub fn mouse_out(&mut self, code: &str) -> bool {
        let Some(&pos) = self.by_code.get(code) else {
            return false;
        };
        let layer = &mut self.layers[pos];
        let (key, state) = if layer.is_goal {
            (StyleKey::Goal, CountryState::Goal)
        } else {
            (StyleKey::Base, CountryState::Base)
        };
        layer.set_style(self.styles.get(key));
        layer.state = state;
        true
    }

    pub fn country_bounds(&self, code: &str) -> Option<LatLngBounds> {
        self.get_country(code)?.bounds()
    }

    /// Bounds of every rendered country.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        union_all(self.layers.iter().filter_map(CountryLayer::bounds))
    }

    pub fn highlighted_bounds(&self) -> Option<LatLngBounds> {
        union_all(
            self.highlighted
                .iter()
                .filter_map(|code| self.country_bounds(code)),
        )
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            features: self.features.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BASE_CLASS, COUNTRY_CLASS, CountryLayerManager, CountryState, GOAL_CLASS};
    use crate::headless::HeadlessView;
    use crate::symbology::StyleTable;
    use formats::FeatureCollection;
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn square(lng: f64, lat: f64) -> serde_json::Value {
        json!([[[lng, lat], [lng + 1.0, lat], [lng + 1.0, lat + 1.0], [lng, lat + 1.0], [lng, lat]]])
    }

    fn countries() -> FeatureCollection {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": "DEU", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": square(10.0, 50.0) } },
                { "type": "Feature", "id": "GBR", "properties": {},
                  "geometry": { "type": "MultiPolygon",
                                "coordinates": [square(-2.0, 52.0), square(-7.0, 54.0)] } },
                { "type": "Feature", "id": "PIN", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } }
            ]
        });
        FeatureCollection::from_geojson_value(&value).expect("geojson")
    }

    fn loaded() -> (CountryLayerManager, HeadlessView) {
        let mut view = HeadlessView::new(800.0, 600.0);
        let mut countries_mgr = CountryLayerManager::default();
        countries_mgr.add_country_data(countries(), &mut view);
        (countries_mgr, view)
    }

    #[test]
    fn add_registers_polygonal_codes() {
        let (mgr, view) = loaded();
        assert!(mgr.has_data());
        assert_eq!(mgr.codes().collect::<Vec<_>>(), vec!["DEU", "GBR"]);
        assert!(mgr.get_country("PIN").is_none());
        // Group plus one sub-layer per country.
        assert_eq!(view.attached_count(), 3);
        assert_eq!(mgr.get_country("DEU").map(|l| l.class_name()), Some(COUNTRY_CLASS));
    }

    #[test]
    fn re_adding_a_code_replaces_it() {
        let (mut mgr, mut view) = loaded();
        mgr.add_country_data(countries(), &mut view);
        assert_eq!(mgr.layers().len(), 2);
        assert_eq!(mgr.to_feature_collection().features.len(), 2);
        assert_eq!(view.attached_count(), 3);
    }

    #[test]
    fn hover_out_restores_goal_after_set_goal() {
        let (mut mgr, _view) = loaded();
        let styles = StyleTable::default();
        for code in ["DEU", "GBR"] {
            assert!(mgr.set_goal(code));
            let goal = mgr.get_country(code).expect("layer").effective_style();

            assert!(mgr.mouse_over(code));
            assert_eq!(mgr.get_country(code).map(|l| l.state()), Some(CountryState::Hover));
            assert_eq!(
                mgr.get_country(code).expect("layer").effective_style().fill_opacity,
                styles.hover.fill_opacity
            );

            assert!(mgr.mouse_out(code));
            let layer = mgr.get_country(code).expect("layer");
            assert_eq!(layer.state(), CountryState::Goal);
            assert_eq!(layer.effective_style(), goal);
            assert_eq!(layer.class_name(), GOAL_CLASS);
        }
    }

    #[test]
    fn hover_out_restores_base_after_set_base() {
        let (mut mgr, _view) = loaded();
        mgr.set_goal("DEU");
        assert!(mgr.set_base("DEU"));
        let base = mgr.get_country("DEU").expect("layer").effective_style();

        mgr.mouse_over("DEU");
        mgr.mouse_out("DEU");
        let layer = mgr.get_country("DEU").expect("layer");
        assert_eq!(layer.state(), CountryState::Base);
        assert!(!layer.is_goal());
        assert_eq!(layer.effective_style(), base);
        assert_eq!(layer.class_name(), BASE_CLASS);
    }

    #[test]
    fn polygon_and_multipolygon_style_identically() {
        let (mut mgr, _view) = loaded();
        mgr.set_goal("DEU");
        mgr.set_goal("GBR");
        mgr.highlight_country("DEU");
        mgr.highlight_country("GBR");
        assert_eq!(
            mgr.get_country("DEU").expect("deu").effective_style(),
            mgr.get_country("GBR").expect("gbr").effective_style()
        );
    }

    #[test]
    fn unknown_codes_are_no_ops() {
        let (mut mgr, mut view) = loaded();
        assert!(!mgr.set_goal("XXX"));
        assert!(!mgr.highlight_country("XXX"));
        assert_eq!(mgr.remove_country_code("XXX", &mut view), None);
        assert_eq!(mgr.layers().len(), 2);
    }

    #[test]
    fn remove_country_code_drops_layer_and_feature() {
        let (mut mgr, mut view) = loaded();
        mgr.highlight_country("DEU");
        let removed = mgr.remove_country_code("DEU", &mut view).expect("removed");
        assert_eq!(removed.id.as_deref(), Some("DEU"));
        assert!(mgr.get_country("DEU").is_none());
        assert!(!mgr.is_highlighted("DEU"));
        assert_eq!(mgr.to_feature_collection().features.len(), 1);
        assert!(mgr.set_goal("GBR"));
        assert_eq!(view.attached_count(), 2);
    }

    #[test]
    fn remove_all_clears_data() {
        let (mut mgr, mut view) = loaded();
        mgr.remove_all_countries(&mut view);
        assert!(!mgr.has_data());
        assert!(mgr.layers().is_empty());
        assert_eq!(mgr.bounds(), None);
        assert_eq!(view.attached_count(), 1);
    }

    #[test]
    fn rebuild_keeps_goal_and_highlight() {
        let (mut mgr, mut view) = loaded();
        mgr.set_goal("GBR");
        mgr.highlight_country("DEU");
        mgr.add_country_data(FeatureCollection::default(), &mut view);

        assert!(mgr.get_country("GBR").is_some_and(|l| l.is_goal()));
        assert!(mgr.is_highlighted("DEU"));
        assert_eq!(
            mgr.get_country("DEU").expect("deu").effective_style().fill_color,
            mgr.styles().highlight.fill_color
        );
    }

    #[test]
    fn bounds_cover_countries() {
        let (mut mgr, _view) = loaded();
        let all = mgr.bounds().expect("bounds");
        assert!(all.contains(LatLng::new(50.5, 10.5)));
        assert!(all.contains(LatLng::new(54.5, -6.5)));

        assert_eq!(mgr.highlighted_bounds(), None);
        mgr.highlight_country("DEU");
        let hl = mgr.highlighted_bounds().expect("highlighted");
        assert!(hl.contains(LatLng::new(50.5, 10.5)));
        assert!(!hl.contains(LatLng::new(54.5, -6.5)));
    }
}
