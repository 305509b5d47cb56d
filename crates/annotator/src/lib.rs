//! Map annotation facade: markers, country overlays and marker-to-marker
//! navigation behind one handle bound to a [`layers::MapView`].

pub mod annotator;
pub mod error;
pub mod input;
pub mod options;

pub use annotator::*;
pub use error::*;
pub use input::*;
pub use options::*;
