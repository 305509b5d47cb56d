pub mod cluster;
pub mod countries;
pub mod error;
pub mod headless;
pub mod layer;
pub mod marker_layer;
pub mod markers;
pub mod symbology;
pub mod view;

pub use cluster::*;
pub use countries::*;
pub use error::*;
pub use headless::*;
pub use layer::*;
pub use marker_layer::*;
pub use markers::*;
pub use symbology::*;
pub use view::*;
