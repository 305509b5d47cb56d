use formats::GeoJsonError;
use layers::MarkerError;

#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error(transparent)]
    Marker(#[from] MarkerError),
    #[error("country data: {0}")]
    GeoJson(#[from] GeoJsonError),
    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),
}
