use std::collections::HashMap;
use std::ops::Range;

use formats::{DescriptionResolver, MarkerFeature, MarkerInput, MarkerRef, normalize};
use foundation::LatLngBounds;

use crate::cluster::{ClusterLayer, ClusterOptions};
use crate::error::MarkerError;
use crate::layer::{LayerId, LayerKind};
use crate::marker_layer::{FeatureLayer, MarkerRenderLayer, PopupOptions};
use crate::view::MapView;

/// Event name used for marker clicks in the listener registry.
pub const MARKER_CLICK: &str = "marker:click";

pub type MarkerHandler = Box<dyn FnMut(&MarkerFeature)>;

/// Identity of a marker that survives renumbering. Never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MarkerSerial(pub u64);

/// Per-marker bookkeeping kept parallel to the feature list.
struct MarkerSlot {
    serial: MarkerSerial,
    listeners: HashMap<String, Vec<MarkerHandler>>,
}

impl MarkerSlot {
    fn new(serial: MarkerSerial) -> Self {
        Self {
            serial,
            listeners: HashMap::new(),
        }
    }
}

/// Two-phase lifecycle of the render layer.
///
/// While `Configuring`, the clustering mode can still change. `Built` is final.
#[derive(Debug, Clone, PartialEq)]
enum LayerState {
    Configuring { clustering: bool },
    Built(MarkerRenderLayer),
}

/// Owns the authoritative ordered marker list and keeps its render layer in
/// step with it. Every mutating call re-syncs before returning.
pub struct MarkerLayerManager {
    features: Vec<MarkerFeature>,
    slots: Vec<MarkerSlot>,
    next_serial: u64,
    state: LayerState,
    cluster_options: ClusterOptions,
    popup_options: PopupOptions,
}

impl std::fmt::Debug for MarkerLayerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerLayerManager")
            .field("features", &self.features.len())
            .field("state", &self.state)
            .field("cluster_options", &self.cluster_options)
            .finish()
    }
}

impl Default for MarkerLayerManager {
    fn default() -> Self {
        Self::new(ClusterOptions::default(), PopupOptions::default())
    }
}

impl MarkerLayerManager {
    pub fn new(cluster_options: ClusterOptions, popup_options: PopupOptions) -> Self {
        Self {
            features: Vec::new(),
            slots: Vec::new(),
            next_serial: 0,
            state: LayerState::Configuring { clustering: false },
            cluster_options,
            popup_options,
        }
    }

    pub fn clustering_enabled(&self) -> bool {
        match &self.state {
            LayerState::Configuring { clustering } => *clustering,
            LayerState::Built(layer) => layer.is_clustered(),
        }
    }

    /// Switches the not-yet-built layer to clustered mode.
    ///
    /// Fails once the render layer exists, and when clustering is already on.
    pub fn enable_clustering(&mut self) -> Result<(), MarkerError> {
        match &mut self.state {
            LayerState::Configuring { clustering } if !*clustering => {
                *clustering = true;
                Ok(())
            }
            _ => Err(MarkerError::ClusteringAlreadyInitialized),
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, LayerState::Built(_))
    }

    /// Creates the render layer in the configured mode and attaches it.
    /// Idempotent once built.
    pub fn build(&mut self, view: &mut dyn MapView) -> LayerId {
        let clustering = match &self.state {
            LayerState::Built(layer) => return layer.id(),
            LayerState::Configuring { clustering } => *clustering,
        };

        let layer = if clustering {
            let id = view.create_layer(LayerKind::Cluster);
            MarkerRenderLayer::Cluster(ClusterLayer::new(id, self.cluster_options.clone()))
        } else {
            let id = view.create_layer(LayerKind::Features);
            MarkerRenderLayer::Features(FeatureLayer::new(id))
        };
        let id = layer.id();
        view.add_layer(id);
        tracing::debug!(layer = id.0, clustering, "marker layer built");
        self.state = LayerState::Built(layer);
        id
    }

    pub fn layer(&self) -> Option<&MarkerRenderLayer> {
        match &self.state {
            LayerState::Built(layer) => Some(layer),
            LayerState::Configuring { .. } => None,
        }
    }

    pub fn features(&self) -> &[MarkerFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of markers currently in the render layer.
    pub fn rendered_len(&self) -> usize {
        self.layer().map_or(0, MarkerRenderLayer::len)
    }

    /// Normalizes and appends `inputs` in order, then re-syncs.
    ///
    /// All inputs are normalized before anything is appended, so an invalid
    /// item leaves the list untouched. Returns the positions of the new markers.
    pub fn add_markers(
        &mut self,
        inputs: &[MarkerInput],
        resolver: &dyn DescriptionResolver,
        view: &mut dyn MapView,
    ) -> Result<Range<usize>, MarkerError> {
        let normalized = inputs
            .iter()
            .map(|input| normalize(input, resolver))
            .collect::<Result<Vec<_>, _>>()?;

        self.build(view);
        let start = self.features.len();
        for feature in normalized {
            self.features.push(feature);
            self.slots.push(MarkerSlot::new(MarkerSerial(self.next_serial)));
            self.next_serial += 1;
        }
        self.resync(view);
        Ok(start..self.features.len())
    }

    pub fn add_marker(
        &mut self,
        input: &MarkerInput,
        resolver: &dyn DescriptionResolver,
        view: &mut dyn MapView,
    ) -> Result<usize, MarkerError> {
        let range = self.add_markers(std::slice::from_ref(input), resolver, view)?;
        Ok(range.start)
    }

    /// First marker whose `id` matches.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.properties.id.as_deref() == Some(id))
    }

    pub fn serial_of(&self, index: usize) -> Option<MarkerSerial> {
        self.slots.get(index).map(|slot| slot.serial)
    }

    /// Current position of the marker holding `serial`; `None` once removed.
    pub fn position_of_serial(&self, serial: MarkerSerial) -> Option<usize> {
        self.slots.iter().position(|slot| slot.serial == serial)
    }

    /// Removes a marker by position or id.
    ///
    /// An unknown id is a no-op (`Ok(None)`); an out-of-range position is an error.
    pub fn remove_marker(
        &mut self,
        target: &MarkerRef,
        view: &mut dyn MapView,
    ) -> Result<Option<MarkerFeature>, MarkerError> {
        let index = match target {
            MarkerRef::Index(index) => *index,
            MarkerRef::Id(id) => match self.position_of(id) {
                Some(index) => index,
                None => {
                    tracing::debug!(id = %id, "remove_marker: no marker with this id");
                    return Ok(None);
                }
            },
        };
        self.check_index(index)?;

        let removed = self.features.remove(index);
        self.slots.remove(index);
        self.resync(view);
        Ok(Some(removed))
    }

    /// Replaces the marker at `index` with a freshly normalized one.
    /// The slot keeps its serial and listeners.
    pub fn edit_marker(
        &mut self,
        index: usize,
        input: &MarkerInput,
        resolver: &dyn DescriptionResolver,
        view: &mut dyn MapView,
    ) -> Result<(), MarkerError> {
        self.check_index(index)?;
        self.features[index] = normalize(input, resolver)?;
        self.resync(view);
        Ok(())
    }

    /// Looks the marker up in the render layer, by `index` property.
    pub fn find_by_index(&self, index: usize) -> Option<&MarkerFeature> {
        self.layer()?.find_by_index(index)
    }

    pub fn open_popup(&mut self, index: usize) -> bool {
        match &mut self.state {
            LayerState::Built(layer) => layer.open_popup(index),
            LayerState::Configuring { .. } => false,
        }
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.layer()?.bounds()
    }

    pub fn add_listener(
        &mut self,
        index: usize,
        event: &str,
        handler: impl FnMut(&MarkerFeature) + 'static,
    ) -> Result<(), MarkerError> {
        self.check_index(index)?;
        self.slots[index]
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(Box::new(handler));
        Ok(())
    }

    /// Runs the listeners registered for `event` on marker `index`.
    /// Returns how many ran.
    pub fn dispatch(&mut self, index: usize, event: &str) -> usize {
        let (Some(feature), Some(slot)) = (self.features.get(index), self.slots.get_mut(index))
        else {
            return 0;
        };
        let Some(handlers) = slot.listeners.get_mut(event) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(feature);
        }
        handlers.len()
    }

    fn check_index(&self, index: usize) -> Result<(), MarkerError> {
        if index < self.features.len() {
            Ok(())
        } else {
            Err(MarkerError::IndexOutOfRange {
                index,
                len: self.features.len(),
            })
        }
    }

    /// Pushes the canonical list into the render layer.
    fn resync(&mut self, view: &mut dyn MapView) {
        for (position, feature) in self.features.iter_mut().enumerate() {
            feature.properties.index = position;
        }

        let LayerState::Built(layer) = &mut self.state else {
            return;
        };
        match layer {
            MarkerRenderLayer::Features(l) => l.set_data(&self.features, &self.popup_options),
            MarkerRenderLayer::Cluster(l) => l.rebuild(&self.features),
        }
        view.layer_changed(layer.id());
        tracing::debug!(
            markers = self.features.len(),
            clustered = layer.is_clustered(),
            "marker layer synced"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{MARKER_CLICK, MarkerLayerManager};
    use crate::error::MarkerError;
    use crate::headless::HeadlessView;
    use crate::layer::LayerKind;
    use formats::{FeatureError, MarkerInput, MarkerRef, MarkerSpec, NoDescriptions, normalize};
    use pretty_assertions::assert_eq;

    fn inputs() -> Vec<MarkerInput> {
        vec![
            MarkerSpec::at(53.0, 10.0).with_title("First Marker").into(),
            MarkerSpec::at(52.0, -1.0).with_id("gbr").into(),
            MarkerInput::Position([45.0, 2.0]),
        ]
    }

    fn view() -> HeadlessView {
        HeadlessView::new(800.0, 600.0)
    }

    #[test]
    fn add_markers_preserves_order_and_normal_form() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        let range = markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");
        assert_eq!(range, 0..3);

        for (position, (got, input)) in markers.features().iter().zip(inputs()).enumerate() {
            let mut expected = normalize(&input, &NoDescriptions).expect("normalize");
            expected.properties.index = position;
            assert_eq!(got, &expected);
        }
        assert_eq!(markers.rendered_len(), 3);
    }

    #[test]
    fn every_mutation_resyncs_the_layer() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");
        let id = markers.layer().expect("built").id();
        assert_eq!(view.change_count(id), 1);

        markers
            .edit_marker(0, &MarkerSpec::at(1.0, 1.0).into(), &NoDescriptions, &mut view)
            .expect("edit");
        markers
            .remove_marker(&MarkerRef::Index(2), &mut view)
            .expect("remove");
        assert_eq!(view.change_count(id), 3);
        assert_eq!(markers.rendered_len(), markers.len());
        assert!(view.is_attached(id));
    }

    #[test]
    fn invalid_item_rejects_whole_batch() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        let mut batch = inputs();
        batch.push(MarkerSpec::default().into());

        let err = markers.add_markers(&batch, &NoDescriptions, &mut view);
        assert_eq!(
            err,
            Err(MarkerError::InvalidFeature(FeatureError::MissingGeometry))
        );
        assert!(markers.is_empty());
    }

    #[test]
    fn remove_by_id_twice_is_a_no_op() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");

        let removed = markers
            .remove_marker(&MarkerRef::from("gbr"), &mut view)
            .expect("remove");
        assert_eq!(removed.and_then(|f| f.properties.id).as_deref(), Some("gbr"));
        assert_eq!(markers.len(), 2);

        let again = markers
            .remove_marker(&MarkerRef::from("gbr"), &mut view)
            .expect("remove");
        assert_eq!(again, None);
        assert_eq!(markers.len(), 2);
    }

    #[test]
    fn indices_follow_positions_after_removal() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");
        markers
            .remove_marker(&MarkerRef::Index(0), &mut view)
            .expect("remove");

        let found = markers.find_by_index(1).expect("found");
        assert_eq!(found.geometry.expect("geometry").coordinates, [2.0, 45.0]);
        assert!(markers.find_by_index(2).is_none());
    }

    #[test]
    fn out_of_range_edit_and_remove_fail() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");

        assert_eq!(
            markers.edit_marker(3, &MarkerInput::Position([0.0, 0.0]), &NoDescriptions, &mut view),
            Err(MarkerError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            markers.remove_marker(&MarkerRef::Index(9), &mut view),
            Err(MarkerError::IndexOutOfRange { index: 9, len: 3 })
        );
    }

    #[test]
    fn clustering_locks_after_first_marker() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_marker(&MarkerInput::Position([1.0, 1.0]), &NoDescriptions, &mut view)
            .expect("add");
        assert_eq!(
            markers.enable_clustering(),
            Err(MarkerError::ClusteringAlreadyInitialized)
        );
        assert!(!markers.clustering_enabled());
    }

    #[test]
    fn clustering_cannot_be_enabled_twice() {
        let mut markers = MarkerLayerManager::default();
        assert_eq!(markers.enable_clustering(), Ok(()));
        assert_eq!(
            markers.enable_clustering(),
            Err(MarkerError::ClusteringAlreadyInitialized)
        );
    }

    #[test]
    fn clustered_build_uses_cluster_layer() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers.enable_clustering().expect("enable");
        let id = markers.build(&mut view);
        assert_eq!(view.layer_kind(id), Some(LayerKind::Cluster));
        assert_eq!(markers.build(&mut view), id);

        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");
        markers
            .remove_marker(&MarkerRef::Index(0), &mut view)
            .expect("remove");
        assert_eq!(markers.rendered_len(), 2);
        assert!(markers.layer().is_some_and(|l| l.is_clustered()));
    }

    #[test]
    fn listeners_follow_their_marker() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        markers
            .add_listener(2, MARKER_CLICK, move |f| s.borrow_mut().push(f.properties.index))
            .expect("listen");

        markers
            .remove_marker(&MarkerRef::Index(0), &mut view)
            .expect("remove");
        assert_eq!(markers.dispatch(1, MARKER_CLICK), 1);
        assert_eq!(markers.dispatch(0, MARKER_CLICK), 0);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn serials_survive_renumbering() {
        let mut view = view();
        let mut markers = MarkerLayerManager::default();
        markers
            .add_markers(&inputs(), &NoDescriptions, &mut view)
            .expect("add");
        let second = markers.serial_of(1).expect("serial");
        let first = markers.serial_of(0).expect("serial");

        markers
            .remove_marker(&MarkerRef::Index(0), &mut view)
            .expect("remove");
        assert_eq!(markers.position_of_serial(second), Some(0));
        assert_eq!(markers.position_of_serial(first), None);

        markers
            .add_marker(&MarkerInput::Position([1.0, 1.0]), &NoDescriptions, &mut view)
            .expect("add");
        assert_ne!(markers.serial_of(2), Some(first));
    }
}
