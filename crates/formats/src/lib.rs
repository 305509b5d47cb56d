pub mod feature;
pub mod feed;
pub mod geojson;
pub mod marker_input;

pub use feature::*;
pub use feed::*;
pub use geojson::*;
pub use marker_input::*;
