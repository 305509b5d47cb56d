use formats::MarkerInput;
use serde::Deserialize;

use crate::error::AnnotatorError;
use crate::options::AnnotatorOptions;

/// What the annotator can be constructed from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnnotatorInput {
    // Variant order matters: a marker record accepts any object, and a
    // one-element list would also read as a record in sequence form.
    MarkerListWithOptions {
        markers: Vec<MarkerInput>,
        #[serde(default)]
        options: AnnotatorOptions,
    },
    MarkerList(Vec<MarkerInput>),
    SingleMarker(MarkerInput),
}

impl AnnotatorInput {
    pub fn from_json_str(payload: &str) -> Result<Self, AnnotatorError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn into_parts(self) -> (Vec<MarkerInput>, Option<AnnotatorOptions>) {
        match self {
            AnnotatorInput::SingleMarker(marker) => (vec![marker], None),
            AnnotatorInput::MarkerList(markers) => (markers, None),
            AnnotatorInput::MarkerListWithOptions { markers, options } => (markers, Some(options)),
        }
    }
}

impl From<MarkerInput> for AnnotatorInput {
    fn from(marker: MarkerInput) -> Self {
        AnnotatorInput::SingleMarker(marker)
    }
}

impl From<Vec<MarkerInput>> for AnnotatorInput {
    fn from(markers: Vec<MarkerInput>) -> Self {
        AnnotatorInput::MarkerList(markers)
    }
}

#[cfg(test)]
mod tests {
    use super::AnnotatorInput;
    use formats::MarkerInput;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_each_shape() {
        let single = AnnotatorInput::from_json_str("[12, 34]").expect("single");
        assert_eq!(single, AnnotatorInput::SingleMarker(MarkerInput::Position([12.0, 34.0])));

        let list = AnnotatorInput::from_json_str(r#"[[12, 34], {"position": [1, 2]}]"#)
            .expect("list");
        assert!(matches!(&list, AnnotatorInput::MarkerList(m) if m.len() == 2));

        let one = AnnotatorInput::from_json_str("[[12, 34]]").expect("one");
        assert_eq!(
            one,
            AnnotatorInput::MarkerList(vec![MarkerInput::Position([12.0, 34.0])])
        );

        let with_opts = AnnotatorInput::from_json_str(
            r#"{"markers": [[1, 2]], "options": {"zoomLevel": 9}}"#,
        )
        .expect("with options");
        let (markers, options) = with_opts.into_parts();
        assert_eq!(markers.len(), 1);
        assert_eq!(options.map(|o| o.zoom_level), Some(9.0));
    }

    #[test]
    fn structured_object_is_a_single_marker() {
        let input = AnnotatorInput::from_json_str(r#"{"position": [53, 10], "title": "x"}"#)
            .expect("single");
        assert!(matches!(input, AnnotatorInput::SingleMarker(MarkerInput::Spec(_))));
    }
}
