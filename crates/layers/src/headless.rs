//! In-memory [`MapView`] for tests, tools and server-side use.
//!
//! Camera commands take effect immediately but their animations stay
//! "in flight" until [`HeadlessView::finish_animations`] is called, which
//! fires `zoomend`/`moveend` the way an animated renderer would.

use std::collections::{BTreeMap, BTreeSet};

use foundation::math::Vec2;
use foundation::{LatLng, LatLngBounds};

use crate::layer::{LayerId, LayerKind};
use crate::view::{
    FitBoundsOptions, MOVE_END, MapView, NativeEvent, NativeHandler, OnceHandler, ViewOptions,
    ZOOM_END,
};

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 18.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    SetView {
        center: LatLng,
        zoom: f64,
        options: ViewOptions,
    },
    FitBounds {
        bounds: LatLngBounds,
        options: FitBoundsOptions,
    },
}

pub struct HeadlessView {
    size: Vec2,
    center: Option<LatLng>,
    zoom: f64,
    scroll_wheel_zoom: bool,
    next_layer: u64,
    layers: BTreeMap<LayerId, LayerKind>,
    attached: BTreeSet<LayerId>,
    layer_changes: BTreeMap<LayerId, u64>,
    commands: Vec<CameraCommand>,
    zoom_in_flight: bool,
    move_in_flight: bool,
    handlers: BTreeMap<String, Vec<NativeHandler>>,
    once_handlers: BTreeMap<String, Vec<OnceHandler>>,
    fired: Vec<NativeEvent>,
}

impl std::fmt::Debug for HeadlessView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessView")
            .field("size", &self.size)
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("layers", &self.layers.len())
            .field("attached", &self.attached.len())
            .field("commands", &self.commands.len())
            .finish()
    }
}

impl HeadlessView {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Vec2::new(width.max(1.0), height.max(1.0)),
            center: None,
            zoom: MIN_ZOOM,
            scroll_wheel_zoom: true,
            next_layer: 1,
            layers: BTreeMap::new(),
            attached: BTreeSet::new(),
            layer_changes: BTreeMap::new(),
            commands: Vec::new(),
            zoom_in_flight: false,
            move_in_flight: false,
            handlers: BTreeMap::new(),
            once_handlers: BTreeMap::new(),
            fired: Vec::new(),
        }
    }

    /// Positions the camera without animation or events.
    pub fn with_view(mut self, center: LatLng, zoom: f64) -> Self {
        self.center = Some(center);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn commands(&self) -> &[CameraCommand] {
        &self.commands
    }

    pub fn last_command(&self) -> Option<&CameraCommand> {
        self.commands.last()
    }

    pub fn scroll_wheel_zoom(&self) -> bool {
        self.scroll_wheel_zoom
    }

    pub fn layer_kind(&self, layer: LayerId) -> Option<LayerKind> {
        self.layers.get(&layer).copied()
    }

    pub fn is_attached(&self, layer: LayerId) -> bool {
        self.attached.contains(&layer)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn change_count(&self, layer: LayerId) -> u64 {
        self.layer_changes.get(&layer).copied().unwrap_or(0)
    }

    pub fn fired(&self) -> &[NativeEvent] {
        &self.fired
    }

    pub fn animating(&self) -> bool {
        self.move_in_flight
    }

    /// Completes in-flight camera animations, firing their end events.
    pub fn finish_animations(&mut self) {
        if self.zoom_in_flight {
            self.zoom_in_flight = false;
            self.fire(NativeEvent::named(ZOOM_END));
        }
        if self.move_in_flight {
            self.move_in_flight = false;
            self.fire(NativeEvent::named(MOVE_END));
        }
    }

    /// Largest zoom at which `bounds` fits inside the padded viewport.
    pub fn bounds_zoom(&self, bounds: LatLngBounds, padding: Vec2) -> f64 {
        let avail = Vec2::new(
            (self.size.x - padding.x).max(1.0),
            (self.size.y - padding.y).max(1.0),
        );
        let mut zoom = MAX_ZOOM;
        while zoom > MIN_ZOOM {
            let nw = self.project(bounds.north_west(), zoom);
            let se = self.project(bounds.south_east(), zoom);
            if (se.x - nw.x).abs() <= avail.x && (se.y - nw.y).abs() <= avail.y {
                break;
            }
            zoom -= 1.0;
        }
        zoom
    }

    fn move_to(&mut self, center: LatLng, zoom: f64) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom != self.zoom {
            self.zoom_in_flight = true;
        }
        self.center = Some(center);
        self.zoom = zoom;
        self.move_in_flight = true;
    }
}

impl MapView for HeadlessView {
    fn center(&self) -> Option<LatLng> {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        let center = self.center?;
        let c = self.project(center, self.zoom);
        let half = Vec2::new(self.size.x / 2.0, self.size.y / 2.0);
        let nw = self.unproject(c - half, self.zoom);
        let se = self.unproject(c + half, self.zoom);
        LatLngBounds::from_points([nw, se])
    }

    fn set_view(&mut self, center: LatLng, zoom: f64, options: ViewOptions) {
        self.commands.push(CameraCommand::SetView {
            center,
            zoom,
            options,
        });
        self.move_to(center, zoom);
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds, options: FitBoundsOptions) {
        self.commands.push(CameraCommand::FitBounds { bounds, options });

        let padding = options.padding_top_left + options.padding_bottom_right;
        let zoom = self.bounds_zoom(bounds, padding);
        let offset = Vec2::new(
            (options.padding_bottom_right.x - options.padding_top_left.x) / 2.0,
            (options.padding_bottom_right.y - options.padding_top_left.y) / 2.0,
        );
        let sw = self.project(bounds.south_west, zoom);
        let ne = self.project(bounds.north_east, zoom);
        let mid = Vec2::new((sw.x + ne.x) / 2.0, (sw.y + ne.y) / 2.0) + offset;
        let center = self.unproject(mid, zoom);
        self.move_to(center, zoom);
    }

    fn set_scroll_wheel_zoom(&mut self, enabled: bool) {
        self.scroll_wheel_zoom = enabled;
    }

    fn create_layer(&mut self, kind: LayerKind) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(id, kind);
        id
    }

    fn add_layer(&mut self, layer: LayerId) {
        self.attached.insert(layer);
    }

    fn remove_layer(&mut self, layer: LayerId) {
        self.attached.remove(&layer);
    }

    fn layer_changed(&mut self, layer: LayerId) {
        *self.layer_changes.entry(layer).or_default() += 1;
    }

    fn on(&mut self, event: &str, handler: NativeHandler) {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn once(&mut self, event: &str, handler: OnceHandler) {
        self.once_handlers
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn fire(&mut self, event: NativeEvent) {
        if let Some(handlers) = self.handlers.get_mut(&event.name) {
            for handler in handlers.iter_mut() {
                handler(&event);
            }
        }
        if let Some(once) = self.once_handlers.remove(&event.name) {
            for handler in once {
                handler(&event);
            }
        }
        self.fired.push(event);
    }
}
