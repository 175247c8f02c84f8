//! Plot annotations (data only, no drawing)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::series::LineStyle;

/// Annotation geometry, tagged by `type` in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    #[serde(rename = "vline")]
    VerticalLine { x_pos: f64 },
    #[serde(rename = "hline")]
    HorizontalLine { y_pos: f64 },
    Region { x_start: f64, x_end: f64 },
    Text {
        x_pos: f64,
        y_pos: f64,
        text: String,
        #[serde(default = "default_fontsize")]
        fontsize: f64,
    },
    Point {
        x_pos: f64,
        y_pos: f64,
        #[serde(default = "default_point_marker")]
        marker: String,
        #[serde(default = "default_point_size")]
        size: f64,
    },
    Arrow {
        x_start: f64,
        y_start: f64,
        x_end: f64,
        y_end: f64,
        #[serde(default = "default_arrow_style")]
        arrow_style: String,
    },
}

fn default_fontsize() -> f64 {
    12.0
}

fn default_point_marker() -> String {
    "o".to_string()
}

fn default_point_size() -> f64 {
    100.0
}

fn default_arrow_style() -> String {
    "->".to_string()
}

impl AnnotationKind {
    pub fn text(x_pos: f64, y_pos: f64, text: impl Into<String>) -> Self {
        AnnotationKind::Text {
            x_pos,
            y_pos,
            text: text.into(),
            fontsize: default_fontsize(),
        }
    }

    pub fn point(x_pos: f64, y_pos: f64) -> Self {
        AnnotationKind::Point {
            x_pos,
            y_pos,
            marker: default_point_marker(),
            size: default_point_size(),
        }
    }

    pub fn arrow(x_start: f64, y_start: f64, x_end: f64, y_end: f64) -> Self {
        AnnotationKind::Arrow {
            x_start,
            y_start,
            x_end,
            y_end,
            arrow_style: default_arrow_style(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnnotationKind::VerticalLine { .. } => "vline",
            AnnotationKind::HorizontalLine { .. } => "hline",
            AnnotationKind::Region { .. } => "region",
            AnnotationKind::Text { .. } => "text",
            AnnotationKind::Point { .. } => "point",
            AnnotationKind::Arrow { .. } => "arrow",
        }
    }

    /// Move by `(dx, dy)`; lines and regions ignore the axis they span
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            AnnotationKind::VerticalLine { x_pos } => *x_pos += dx,
            AnnotationKind::HorizontalLine { y_pos } => *y_pos += dy,
            AnnotationKind::Region { x_start, x_end } => {
                *x_start += dx;
                *x_end += dx;
            }
            AnnotationKind::Text { x_pos, y_pos, .. } | AnnotationKind::Point { x_pos, y_pos, .. } => {
                *x_pos += dx;
                *y_pos += dy;
            }
            AnnotationKind::Arrow {
                x_start,
                y_start,
                x_end,
                y_end,
                ..
            } => {
                *x_start += dx;
                *x_end += dx;
                *y_start += dy;
                *y_end += dy;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    pub id: String,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub editable: bool,
}

fn default_color() -> String {
    "red".to_string()
}

fn default_alpha() -> f64 {
    0.8
}

fn default_line_width() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl AnnotationConfig {
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: String::new(),
            color: default_color(),
            alpha: default_alpha(),
            line_width: default_line_width(),
            line_style: LineStyle::default(),
            visible: true,
            editable: true,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let ann = AnnotationConfig::new(AnnotationKind::VerticalLine { x_pos: 12.5 }).with_label("vent");
        let json = serde_json::to_value(&ann).unwrap();

        assert_eq!(json["type"], "vline");
        assert_eq!(json["x_pos"], 12.5);
        assert_eq!(json["label"], "vent");
        assert_eq!(json["color"], "red");

        let back: AnnotationConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, ann);
    }

    #[test]
    fn test_defaults_fill_sparse_json() {
        let json = r#"{"id": "a1", "type": "point", "x_pos": 1.0, "y_pos": 2.0}"#;
        let ann: AnnotationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(ann.kind, AnnotationKind::point(1.0, 2.0));
        assert_eq!(ann.alpha, 0.8);
        assert_eq!(ann.line_width, 2.0);
        assert!(ann.visible && ann.editable);
    }

    #[test]
    fn test_translate() {
        let mut region = AnnotationKind::Region { x_start: 0.0, x_end: 1.0 };
        region.translate(2.0, 5.0);
        assert_eq!(region, AnnotationKind::Region { x_start: 2.0, x_end: 3.0 });

        let mut arrow = AnnotationKind::arrow(0.0, 0.0, 1.0, 1.0);
        arrow.translate(1.0, -1.0);
        assert_eq!(arrow, AnnotationKind::arrow(1.0, -1.0, 2.0, 0.0));
        assert_eq!(arrow.type_name(), "arrow");
    }
}
