use foundation::math::Vec2;
use layers::{ClusterOptions, PopupOptions};
use navigation::CameraSettings;
use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;

/// Annotator configuration. Field names follow the plugin's option object,
/// so existing JSON configs load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotatorOptions {
    /// Pan animation length in seconds.
    pub pan_duration: f64,
    /// `[x, y]` pixels kept clear at the top-left when centering a marker.
    pub padding_top_left: [f64; 2],
    pub zoom_level: f64,
    pub mouse_scroll: bool,
    pub marker_clustering_options: ClusterOptions,
    pub popup_options: PopupOptions,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            pan_duration: 0.25,
            padding_top_left: [0.0, 0.0],
            zoom_level: 5.0,
            mouse_scroll: true,
            marker_clustering_options: ClusterOptions::default(),
            popup_options: PopupOptions::default(),
        }
    }
}

impl AnnotatorOptions {
    pub fn from_json_str(payload: &str) -> Result<Self, AnnotatorError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            zoom_level: self.zoom_level,
            padding_top_left: Vec2::new(self.padding_top_left[0], self.padding_top_left[1]),
            pan_duration: self.pan_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnnotatorOptions;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = AnnotatorOptions::from_json_str(
            r#"{ "zoomLevel": 7, "paddingTopLeft": [120, 0],
                 "markerClusteringOptions": { "maxClusterRadius": 40 } }"#,
        )
        .expect("options");

        assert_eq!(opts.zoom_level, 7.0);
        assert_eq!(opts.pan_duration, 0.25);
        assert!(opts.mouse_scroll);
        assert_eq!(opts.marker_clustering_options.max_cluster_radius, 40.0);
        assert!(opts.marker_clustering_options.show_coverage_on_hover);
        assert_eq!(opts.popup_options.max_width, 300);
        assert_eq!(opts.camera_settings().padding_top_left.x, 120.0);
    }

    #[test]
    fn malformed_json_is_an_options_error() {
        let err = AnnotatorOptions::from_json_str("{ \"zoomLevel\": \"far\" }").unwrap_err();
        assert!(err.to_string().starts_with("invalid options"));
    }
}
