use foundation::math::Vec2;
use foundation::{LatLng, LatLngBounds};
use layers::{FitBoundsOptions, MOVE_END, NativeEvent, OnceHandler, PanOptions, ViewOptions};

/// Camera parameters shared by every navigation move.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSettings {
    pub zoom_level: f64,
    /// Screen offset (px) keeping the target clear of fixed UI chrome.
    pub padding_top_left: Vec2,
    pub pan_duration: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            zoom_level: 5.0,
            padding_top_left: Vec2::new(0.0, 0.0),
            pan_duration: 0.25,
        }
    }
}

impl CameraSettings {
    pub fn pan(&self, animate: bool) -> PanOptions {
        PanOptions {
            animate,
            duration_s: self.pan_duration,
        }
    }

    pub fn fit_options(&self, animate: bool) -> FitBoundsOptions {
        FitBoundsOptions {
            padding_top_left: self.padding_top_left,
            pan: self.pan(animate),
            ..FitBoundsOptions::default()
        }
    }

    /// Zoom animates only when the view already sits at the target level.
    pub fn view_options(&self, current_zoom: f64) -> ViewOptions {
        ViewOptions {
            animate_zoom: current_zoom == self.zoom_level,
            pan: self.pan(true),
        }
    }
}

/// Where a navigation step points the camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraTarget {
    Point(LatLng),
    Bounds(LatLngBounds),
}

/// One-shot callback run when the camera finishes moving.
pub struct Completion {
    handler: OnceHandler,
    event: String,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

impl Completion {
    /// Fires on the next `moveend`.
    pub fn new(handler: impl FnOnce(&NativeEvent) + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            event: MOVE_END.to_string(),
        }
    }

    /// Fires on the next `event` instead.
    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub(crate) fn into_parts(self) -> (String, OnceHandler) {
        (self.event, self.handler)
    }

    /// Runs the handler now, as if its event had fired.
    pub(crate) fn run_now(self) {
        let event = NativeEvent::named(self.event);
        (self.handler)(&event);
    }
}
