/// Opaque handle to a renderer-side layer. Handles are minted by the
/// [`MapView`](crate::view::MapView) that will draw the layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// What a handle projects onto the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Plain marker feature layer; data is replaced wholesale.
    Features,
    /// Marker cluster layer; elements are appended in bulk.
    Cluster,
    /// Aggregate of all country polygons.
    CountryGroup,
    /// One country polygon.
    Country,
}

pub trait Layer {
    fn id(&self) -> LayerId;
    fn kind(&self) -> LayerKind;
}
