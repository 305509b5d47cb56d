use foundation::math::{Vec2, project, unproject};
use foundation::{LatLng, LatLngBounds};

use crate::layer::{LayerId, LayerKind};

/// Event raised by the rendering engine (`moveend`, `zoomend`, `click`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    pub name: String,
    pub latlng: Option<LatLng>,
}

impl NativeEvent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latlng: None,
        }
    }

    pub fn at(name: impl Into<String>, latlng: LatLng) -> Self {
        Self {
            name: name.into(),
            latlng: Some(latlng),
        }
    }
}

pub type NativeHandler = Box<dyn FnMut(&NativeEvent)>;
pub type OnceHandler = Box<dyn FnOnce(&NativeEvent)>;

/// Event that signals the end of a camera animation.
pub const MOVE_END: &str = "moveend";
pub const ZOOM_END: &str = "zoomend";

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PanOptions {
    pub animate: bool,
    pub duration_s: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewOptions {
    pub animate_zoom: bool,
    pub pan: PanOptions,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitBoundsOptions {
    pub padding_top_left: Vec2,
    pub padding_bottom_right: Vec2,
    pub pan: PanOptions,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding_top_left: Vec2::new(0.0, 0.0),
            padding_bottom_right: Vec2::new(0.0, 0.0),
            pan: PanOptions {
                animate: true,
                duration_s: 0.25,
            },
        }
    }
}

/// Capabilities this crate needs from the map rendering engine.
///
/// Camera commands are fire-and-forget: completion is reported through the
/// engine's own events (`moveend`), never through a return value.
pub trait MapView {
    /// Absolute pixel position of `at` at `zoom`.
    fn project(&self, at: LatLng, zoom: f64) -> Vec2 {
        project(at, zoom)
    }

    fn unproject(&self, point: Vec2, zoom: f64) -> LatLng {
        unproject(point, zoom)
    }

    /// Current camera center; `None` until the view has been positioned once.
    fn center(&self) -> Option<LatLng>;
    fn zoom(&self) -> f64;
    /// Visible area; `None` until the view has been positioned once.
    fn bounds(&self) -> Option<LatLngBounds>;

    fn set_view(&mut self, center: LatLng, zoom: f64, options: ViewOptions);
    fn fit_bounds(&mut self, bounds: LatLngBounds, options: FitBoundsOptions);
    fn set_scroll_wheel_zoom(&mut self, enabled: bool);

    fn create_layer(&mut self, kind: LayerKind) -> LayerId;
    fn add_layer(&mut self, layer: LayerId);
    fn remove_layer(&mut self, layer: LayerId);
    /// Content of `layer` changed and should be redrawn.
    fn layer_changed(&mut self, _layer: LayerId) {}

    fn on(&mut self, event: &str, handler: NativeHandler);
    fn once(&mut self, event: &str, handler: OnceHandler);
    fn fire(&mut self, event: NativeEvent);
}
