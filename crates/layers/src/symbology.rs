use serde::{Deserialize, Serialize};

/// Path style options. Unset fields leave the current value untouched when
/// a style is applied on top of another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl PathStyle {
    pub fn merge(&mut self, other: &PathStyle) {
        if let Some(v) = &other.fill_color {
            self.fill_color = Some(v.clone());
        }
        if let Some(v) = other.fill_opacity {
            self.fill_opacity = Some(v);
        }
        if let Some(v) = other.opacity {
            self.opacity = Some(v);
        }
        if let Some(v) = &other.color {
            self.color = Some(v.clone());
        }
        if let Some(v) = other.weight {
            self.weight = Some(v);
        }
    }
}

fn style(
    fill_color: Option<&str>,
    fill_opacity: f32,
    opacity: Option<f32>,
    color: &str,
    weight: f32,
) -> PathStyle {
    PathStyle {
        fill_color: fill_color.map(str::to_string),
        fill_opacity: Some(fill_opacity),
        opacity,
        color: Some(color.to_string()),
        weight: Some(weight),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StyleKey {
    Base,
    Hover,
    Goal,
    GoalHover,
    Highlight,
}

/// Fixed style table for country polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTable {
    pub base: PathStyle,
    pub hover: PathStyle,
    pub goal: PathStyle,
    pub goal_hover: PathStyle,
    pub highlight: PathStyle,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            base: style(Some("#cae6bd"), 0.25, Some(1.0), "#203047", 2.0),
            hover: style(None, 0.5, None, "#203047", 2.0),
            goal: style(Some("#aaaaaa"), 0.5, None, "#aaaaaa", 2.0),
            goal_hover: style(Some("#cae6bd"), 0.25, Some(1.0), "#203047", 2.0),
            highlight: style(Some("#9fd48a"), 0.45, Some(1.0), "#203047", 2.0),
        }
    }
}

impl StyleTable {
    pub fn get(&self, key: StyleKey) -> &PathStyle {
        match key {
            StyleKey::Base => &self.base,
            StyleKey::Hover => &self.hover,
            StyleKey::Goal => &self.goal,
            StyleKey::GoalHover => &self.goal_hover,
            StyleKey::Highlight => &self.highlight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PathStyle, StyleKey, StyleTable};

    #[test]
    fn merge_keeps_unset_fields() {
        let table = StyleTable::default();
        let mut current = table.base.clone();
        current.merge(table.get(StyleKey::Hover));

        assert_eq!(current.fill_opacity, Some(0.5));
        // Hover has no fill color of its own.
        assert_eq!(current.fill_color.as_deref(), Some("#cae6bd"));
        assert_eq!(current.opacity, Some(1.0));
    }

    #[test]
    fn every_key_resolves() {
        let table = StyleTable::default();
        for key in [
            StyleKey::Base,
            StyleKey::Hover,
            StyleKey::Goal,
            StyleKey::GoalHover,
            StyleKey::Highlight,
        ] {
            assert_ne!(table.get(key), &PathStyle::default());
        }
    }
}
