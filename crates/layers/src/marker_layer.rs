use formats::{Icon, MarkerFeature};
use foundation::LatLngBounds;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterLayer;
use crate::layer::{Layer, LayerId, LayerKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupOptions {
    pub close_button: bool,
    pub max_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            close_button: true,
            max_width: 300,
            class_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub content: String,
    pub close_button: bool,
    pub max_width: u32,
    pub class_name: Option<String>,
}

impl Popup {
    pub fn new(content: impl Into<String>, options: &PopupOptions) -> Self {
        Self {
            content: content.into(),
            close_button: options.close_button,
            max_width: options.max_width,
            class_name: options.class_name.clone(),
        }
    }
}

/// One marker as drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerElement {
    pub feature: MarkerFeature,
    pub icon: Option<Icon>,
    pub popup: Option<Popup>,
    pub popup_open: bool,
}

impl MarkerElement {
    pub fn new(feature: MarkerFeature) -> Self {
        Self {
            feature,
            icon: None,
            popup: None,
            popup_open: false,
        }
    }

    /// "Element added" hook: the icon follows `properties.icon`.
    pub(crate) fn on_added(&mut self) {
        if let Some(icon) = &self.feature.properties.icon {
            self.icon = Some(icon.clone());
        }
    }

    pub fn index(&self) -> usize {
        self.feature.properties.index
    }
}

/// Popup markup for the plain layer: title block followed by description block.
pub fn popup_content(feature: &MarkerFeature) -> Option<String> {
    let props = &feature.properties;
    let mut out = String::new();
    if let Some(title) = &props.title {
        out.push_str(&format!("<div class=\"marker-title\">{title}</div>"));
    }
    if let Some(description) = &props.description {
        out.push_str(&format!(
            "<div class=\"marker-description\">{description}</div>"
        ));
    }
    (!out.is_empty()).then_some(out)
}

/// Non-clustered marker layer. Its data is always replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    id: LayerId,
    elements: Vec<MarkerElement>,
}

impl FeatureLayer {
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            elements: Vec::new(),
        }
    }

    pub fn set_data(&mut self, features: &[MarkerFeature], popups: &PopupOptions) {
        self.elements = features
            .iter()
            .cloned()
            .map(|feature| {
                let mut el = MarkerElement::new(feature);
                el.popup = popup_content(&el.feature).map(|c| Popup::new(c, popups));
                el.on_added();
                el
            })
            .collect();
    }

    pub fn elements(&self) -> &[MarkerElement] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [MarkerElement] {
        &mut self.elements
    }
}

impl Layer for FeatureLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Features
    }
}

/// The marker set's projection, in whichever mode was chosen at build time.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerRenderLayer {
    Features(FeatureLayer),
    Cluster(ClusterLayer),
}

impl MarkerRenderLayer {
    pub fn id(&self) -> LayerId {
        match self {
            MarkerRenderLayer::Features(l) => l.id(),
            MarkerRenderLayer::Cluster(l) => l.id(),
        }
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self, MarkerRenderLayer::Cluster(_))
    }

    pub fn elements(&self) -> &[MarkerElement] {
        match self {
            MarkerRenderLayer::Features(l) => l.elements(),
            MarkerRenderLayer::Cluster(l) => l.elements(),
        }
    }

    fn elements_mut(&mut self) -> &mut [MarkerElement] {
        match self {
            MarkerRenderLayer::Features(l) => l.elements_mut(),
            MarkerRenderLayer::Cluster(l) => l.elements_mut(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }

    /// Feature whose `index` property equals `index`, in layer order.
    pub fn find_by_index(&self, index: usize) -> Option<&MarkerFeature> {
        self.elements()
            .iter()
            .find(|el| el.index() == index)
            .map(|el| &el.feature)
    }

    /// Closes every popup, then opens the one bound to `index`.
    ///
    /// Returns `false` when no element with that index carries a popup.
    pub fn open_popup(&mut self, index: usize) -> bool {
        let mut opened = false;
        for el in self.elements_mut() {
            el.popup_open = false;
            if el.index() == index && el.popup.is_some() {
                el.popup_open = true;
                opened = true;
            }
        }
        opened
    }

    pub fn open_popup_index(&self) -> Option<usize> {
        self.elements()
            .iter()
            .find(|el| el.popup_open)
            .map(MarkerElement::index)
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.elements().iter().filter_map(|el| el.feature.lat_lng()))
    }
}
