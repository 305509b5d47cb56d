use std::collections::VecDeque;
use std::ops::Range;

use formats::{
    DescriptionResolver, FeatureCollection, GeoFeature, MarkerFeature, MarkerInput, MarkerRef,
    NoDescriptions,
};
use foundation::LatLng;
use layers::{
    CountryLayer, CountryLayerManager, MARKER_CLICK, MapView, MarkerLayerManager, NativeEvent,
    PanOptions, StyleTable, ViewOptions,
};
use navigation::{CameraTarget, Completion, NavContext, Navigator, OpenPopup};
use runtime::{Channel, Event, EventBus, Scheduler};
use serde_json::Value;

use crate::error::AnnotatorError;
use crate::input::AnnotatorInput;
use crate::options::AnnotatorOptions;

/// Data carried by events delivered through [`MapAnnotator::on`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `zoomnext` / `zoomprev`: the newly selected marker.
    Marker(MarkerFeature),
    /// `hoverstart` / `hoverend`.
    Country { code: String },
    /// Anything forwarded from the rendering engine.
    Native(NativeEvent),
}

/// Configuration phase of a [`MapAnnotator`].
pub struct AnnotatorBuilder {
    options: AnnotatorOptions,
    clustering: bool,
    markers: Vec<MarkerInput>,
    resolver: Box<dyn DescriptionResolver>,
    styles: StyleTable,
}

impl std::fmt::Debug for AnnotatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotatorBuilder")
            .field("options", &self.options)
            .field("clustering", &self.clustering)
            .field("markers", &self.markers.len())
            .finish_non_exhaustive()
    }
}

impl Default for AnnotatorBuilder {
    fn default() -> Self {
        Self {
            options: AnnotatorOptions::default(),
            clustering: false,
            markers: Vec::new(),
            resolver: Box::new(NoDescriptions),
            styles: StyleTable::default(),
        }
    }
}

impl AnnotatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: AnnotatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Selects the clustered marker layer. Allowed once.
    pub fn enable_clustering(mut self) -> Result<Self, AnnotatorError> {
        if self.clustering {
            return Err(layers::MarkerError::ClusteringAlreadyInitialized.into());
        }
        self.clustering = true;
        Ok(self)
    }

    /// Initial markers, added right after the annotator is built. Options
    /// carried by the input replace the current ones.
    pub fn input(mut self, input: impl Into<AnnotatorInput>) -> Self {
        let (markers, options) = input.into().into_parts();
        self.markers.extend(markers);
        if let Some(options) = options {
            self.options = options;
        }
        self
    }

    pub fn description_resolver(mut self, resolver: impl DescriptionResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn styles(mut self, styles: StyleTable) -> Self {
        self.styles = styles;
        self
    }

    pub fn build<V: MapView>(self, mut view: V) -> Result<MapAnnotator<V>, AnnotatorError> {
        let mut markers = MarkerLayerManager::new(
            self.options.marker_clustering_options.clone(),
            self.options.popup_options.clone(),
        );
        if self.clustering {
            markers.enable_clustering()?;
        }
        if !self.options.mouse_scroll {
            view.set_scroll_wheel_zoom(false);
        }

        let mut annotator = MapAnnotator {
            navigator: Navigator::new(self.options.camera_settings()),
            countries: CountryLayerManager::new(self.styles),
            bus: EventBus::new(),
            popups: Scheduler::new(),
            resolver: self.resolver,
            options: self.options,
            markers,
            view,
        };
        if !self.markers.is_empty() {
            annotator.add_markers(&self.markers)?;
        }
        tracing::debug!(
            clustering = annotator.markers.clustering_enabled(),
            markers = annotator.markers.len(),
            "annotator built"
        );
        Ok(annotator)
    }
}

/// Markers, country overlays and navigation bound to one map view.
///
/// Every mutating call leaves the rendered layers in sync before it returns.
/// Popups opened by navigation appear on the following [`tick`](Self::tick).
pub struct MapAnnotator<V: MapView> {
    view: V,
    markers: MarkerLayerManager,
    countries: CountryLayerManager,
    navigator: Navigator,
    bus: EventBus<Payload>,
    popups: Scheduler<OpenPopup>,
    resolver: Box<dyn DescriptionResolver>,
    options: AnnotatorOptions,
}

impl<V: MapView + std::fmt::Debug> std::fmt::Debug for MapAnnotator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapAnnotator")
            .field("view", &self.view)
            .field("markers", &self.markers)
            .field("countries", &self.countries)
            .field("navigator", &self.navigator)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl<V: MapView> MapAnnotator<V> {
    pub fn new(view: V) -> Self {
        let options = AnnotatorOptions::default();
        Self {
            view,
            markers: MarkerLayerManager::new(
                options.marker_clustering_options.clone(),
                options.popup_options.clone(),
            ),
            countries: CountryLayerManager::default(),
            navigator: Navigator::new(options.camera_settings()),
            bus: EventBus::new(),
            popups: Scheduler::new(),
            resolver: Box::new(NoDescriptions),
            options,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn options(&self) -> &AnnotatorOptions {
        &self.options
    }

    pub fn marker_layer(&self) -> &MarkerLayerManager {
        &self.markers
    }

    pub fn country_layer(&self) -> &CountryLayerManager {
        &self.countries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.navigator.cursor()
    }

    // --- events ---

    /// Subscribes to `event`. Semantic channels (`zoomnext`, `zoomprev`,
    /// `hoverstart`, `hoverend`) are handled here; other names go to the view.
    pub fn on(&mut self, event: &str, mut handler: impl FnMut(&Payload) + 'static) {
        match Channel::from_name(event) {
            Some(channel) => self.bus.on(channel, handler),
            None => self.view.on(
                event,
                Box::new(move |e: &NativeEvent| handler(&Payload::Native(e.clone()))),
            ),
        }
    }

    pub fn fire(&mut self, event: &str, payload: Payload) {
        match Channel::from_name(event) {
            Some(channel) => {
                self.bus.fire(self.popups.now(), channel, payload);
            }
            None => {
                let native = match payload {
                    Payload::Native(native) => native,
                    _ => NativeEvent::named(event),
                };
                self.view.fire(native);
            }
        }
    }

    /// Most recent semantic events, oldest first. The log is bounded.
    pub fn events(&self) -> &VecDeque<Event<Payload>> {
        self.bus.events()
    }

    /// Takes the recorded semantic events, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<Event<Payload>> {
        self.bus.drain()
    }

    /// Runs work deferred to this tick (popup opens). Returns how many popups opened.
    ///
    /// A popup whose marker was removed in the meantime is dropped.
    pub fn tick(&mut self) -> usize {
        let due = self.popups.advance();
        let mut opened = 0;
        for OpenPopup { marker } in due {
            let Some(index) = self.markers.position_of_serial(marker) else {
                tracing::debug!(?marker, "marker gone, popup dropped");
                continue;
            };
            if self.markers.open_popup(index) {
                opened += 1;
            } else {
                tracing::debug!(index, "no popup to open");
            }
        }
        opened
    }

    // --- markers ---

    pub fn enable_marker_clustering(&mut self) -> Result<(), AnnotatorError> {
        Ok(self.markers.enable_clustering()?)
    }

    /// Appends markers in order. A marker naming a country highlights it
    /// when country data is loaded.
    pub fn add_markers(&mut self, inputs: &[MarkerInput]) -> Result<Range<usize>, AnnotatorError> {
        let range = self
            .markers
            .add_markers(inputs, &*self.resolver, &mut self.view)?;

        if self.countries.has_data() {
            let codes: Vec<String> = self.markers.features()[range.clone()]
                .iter()
                .filter_map(|f| f.properties.country.clone())
                .collect();
            for code in codes {
                self.countries.highlight_country(&code);
            }
        }
        Ok(range)
    }

    pub fn add_marker(&mut self, input: impl Into<MarkerInput>) -> Result<usize, AnnotatorError> {
        let range = self.add_markers(&[input.into()])?;
        Ok(range.start)
    }

    pub fn remove_marker(
        &mut self,
        target: impl Into<MarkerRef>,
    ) -> Result<Option<MarkerFeature>, AnnotatorError> {
        Ok(self.markers.remove_marker(&target.into(), &mut self.view)?)
    }

    pub fn edit_marker(
        &mut self,
        index: usize,
        input: impl Into<MarkerInput>,
    ) -> Result<(), AnnotatorError> {
        let input = input.into();
        Ok(self
            .markers
            .edit_marker(index, &input, &*self.resolver, &mut self.view)?)
    }

    pub fn markers(&self) -> &[MarkerFeature] {
        self.markers.features()
    }

    pub fn find_by_index(&self, index: usize) -> Option<&MarkerFeature> {
        self.markers.find_by_index(index)
    }

    pub fn add_marker_listener(
        &mut self,
        index: usize,
        event: &str,
        handler: impl FnMut(&MarkerFeature) + 'static,
    ) -> Result<(), AnnotatorError> {
        Ok(self.markers.add_listener(index, event, handler)?)
    }

    pub fn dispatch_marker_event(&mut self, index: usize, event: &str) -> usize {
        self.markers.dispatch(index, event)
    }

    /// A rendered marker was clicked.
    pub fn marker_click(&mut self, index: usize) -> usize {
        self.dispatch_marker_event(index, MARKER_CLICK)
    }

    // --- countries ---

    pub fn add_country_data(&mut self, data: FeatureCollection) {
        self.countries.add_country_data(data, &mut self.view);
    }

    /// Same as [`add_country_data`](Self::add_country_data) for a parsed GeoJSON value.
    pub fn add_country_geojson(&mut self, value: &Value) -> Result<(), AnnotatorError> {
        let data = FeatureCollection::from_geojson_value(value)?;
        self.add_country_data(data);
        Ok(())
    }

    pub fn remove_country_code(&mut self, code: &str) -> Option<GeoFeature> {
        self.countries.remove_country_code(code, &mut self.view)
    }

    pub fn remove_all_countries(&mut self) {
        self.countries.remove_all_countries(&mut self.view);
    }

    pub fn get_country(&self, code: &str) -> Option<&CountryLayer> {
        self.countries.get_country(code)
    }

    pub fn set_goal(&mut self, code: &str) -> bool {
        self.countries.set_goal(code)
    }

    pub fn set_base(&mut self, code: &str) -> bool {
        self.countries.set_base(code)
    }

    pub fn highlight_country(&mut self, code: &str) -> bool {
        self.countries.highlight_country(code)
    }

    /// Pointer entered a country: `hoverstart`, then the hover style.
    pub fn country_mouse_over(&mut self, code: &str) -> bool {
        if self.countries.get_country(code).is_none() {
            return false;
        }
        self.bus.fire(
            self.popups.now(),
            Channel::HoverStart,
            Payload::Country {
                code: code.to_string(),
            },
        );
        self.countries.mouse_over(code)
    }

    /// Pointer left a country: `hoverend`, then the goal or base style.
    pub fn country_mouse_out(&mut self, code: &str) -> bool {
        if self.countries.get_country(code).is_none() {
            return false;
        }
        self.bus.fire(
            self.popups.now(),
            Channel::HoverEnd,
            Payload::Country {
                code: code.to_string(),
            },
        );
        self.countries.mouse_out(code)
    }

    /// Double-click on the country group zooms in one level at `at`.
    pub fn country_double_click(&mut self, at: LatLng) {
        let zoom = self.view.zoom() + 1.0;
        let options = ViewOptions {
            animate_zoom: true,
            pan: PanOptions {
                animate: true,
                duration_s: self.options.pan_duration,
            },
        };
        self.view.set_view(at, zoom, options);
    }

    // --- navigation ---

    pub fn zoom_at(
        &mut self,
        index: usize,
        completion: Option<Completion>,
    ) -> Result<CameraTarget, AnnotatorError> {
        let ctx = NavContext {
            markers: &self.markers,
            countries: &self.countries,
            view: &mut self.view,
            popups: &mut self.popups,
        };
        Ok(self.navigator.zoom_at(index, ctx, completion)?)
    }

    /// Moves to the next marker, firing `zoomnext` with it first.
    pub fn zoom_next(&mut self, completion: Option<Completion>) -> Result<usize, AnnotatorError> {
        self.step(Channel::ZoomNext, completion)
    }

    /// Moves to the previous marker, firing `zoomprev` with it first.
    pub fn zoom_prev(&mut self, completion: Option<Completion>) -> Result<usize, AnnotatorError> {
        self.step(Channel::ZoomPrev, completion)
    }

    fn step(
        &mut self,
        channel: Channel,
        completion: Option<Completion>,
    ) -> Result<usize, AnnotatorError> {
        let tick = self.popups.now();
        let bus = &mut self.bus;
        let ctx = NavContext {
            markers: &self.markers,
            countries: &self.countries,
            view: &mut self.view,
            popups: &mut self.popups,
        };
        let emit = |feature: &MarkerFeature| {
            bus.fire(tick, channel, Payload::Marker(feature.clone()));
        };
        let index = match channel {
            Channel::ZoomPrev => self.navigator.zoom_prev(ctx, completion, emit)?,
            _ => self.navigator.zoom_next(ctx, completion, emit)?,
        };
        Ok(index)
    }

    pub fn set_camera_target(&mut self, position: LatLng, completion: Option<Completion>) -> bool {
        self.navigator
            .set_camera_target(position, &mut self.view, completion)
    }

    pub fn zoom_all(&mut self) -> bool {
        self.navigator.zoom_all(&self.markers, &mut self.view)
    }

    pub fn zoom_to_countries(&mut self) -> bool {
        self.navigator.zoom_to_countries(&self.countries, &mut self.view)
    }

    pub fn zoom_to_highlighted(&mut self) -> bool {
        self.navigator
            .zoom_to_highlighted(&self.countries, &mut self.view)
    }
}
