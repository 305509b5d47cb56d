use formats::FeatureError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MarkerError {
    #[error(transparent)]
    InvalidFeature(#[from] FeatureError),
    #[error("marker index {index} out of range ({len} markers)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cannot enable clustering after marker layer initialization")]
    ClusteringAlreadyInitialized,
}
