use formats::MarkerFeature;
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId, LayerKind};
use crate::marker_layer::{MarkerElement, Popup, PopupOptions};

/// Options handed to the renderer's cluster engine, which does the grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterOptions {
    /// Screen radius (px) within which markers merge into one cluster.
    pub max_cluster_radius: f64,
    pub show_coverage_on_hover: bool,
    pub chunked_loading: bool,
    /// From this zoom level on, every marker is drawn on its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_clustering_at_zoom: Option<f64>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_cluster_radius: 80.0,
            show_coverage_on_hover: true,
            chunked_loading: false,
            disable_clustering_at_zoom: None,
        }
    }
}

/// Clustered marker layer.
///
/// The cluster engine only supports bulk appends, so every sync clears the
/// layer and re-adds the surviving features.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayer {
    id: LayerId,
    options: ClusterOptions,
    elements: Vec<MarkerElement>,
}

impl ClusterLayer {
    pub fn new(id: LayerId, options: ClusterOptions) -> Self {
        Self {
            id,
            options,
            elements: Vec::new(),
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn clear_layers(&mut self) {
        self.elements.clear();
    }

    pub fn add_sublayers(&mut self, sublayers: Vec<MarkerElement>) {
        self.elements.extend(sublayers);
    }

    /// Rebuilds from `features`: attach first, then bind popups and icons.
    pub fn rebuild(&mut self, features: &[MarkerFeature]) {
        self.clear_layers();
        self.add_sublayers(features.iter().cloned().map(MarkerElement::new).collect());

        // Clustered popups never show a close button.
        let popups = PopupOptions {
            close_button: false,
            ..PopupOptions::default()
        };
        for el in &mut self.elements {
            el.popup = el
                .feature
                .properties
                .description
                .as_ref()
                .map(|d| Popup::new(d.clone(), &popups));
            el.on_added();
        }
    }

    pub fn elements(&self) -> &[MarkerElement] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [MarkerElement] {
        &mut self.elements
    }
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Cluster
    }
}
