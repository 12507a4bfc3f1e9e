use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::aggregate::{GroupKey, GroupStats};

/// Common metadata for every figure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotMeta {
    /// Title displayed at the top of the figure
    pub title: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
    pub const fn with_a(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 0.5, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
    pub const PURPLE: Self = Self::rgb(0.5, 0.0, 0.5);
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub size: f32, // marker diameter / line width
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            size: 6.0,
        }
    }
}

impl Style {
    #[inline]
    pub const fn color(mut self, c: Color) -> Self {
        self.color = c;
        self
    }

    #[inline]
    pub const fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

/// Survey batch a measurement came from.
///
/// Closed set: declaration order is the layer order of every scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "dep47")]
    Dep47,
    #[serde(rename = "dep73")]
    Dep73,
    #[serde(rename = "dep82_bb")]
    Dep82Bb,
    #[serde(rename = "dep82_sp")]
    Dep82Sp,
    #[serde(rename = "dep10")]
    Dep10,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Dep47,
        Source::Dep73,
        Source::Dep82Bb,
        Source::Dep82Sp,
        Source::Dep10,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Source::Dep47 => "dep47",
            Source::Dep73 => "dep73",
            Source::Dep82Bb => "dep82_bb",
            Source::Dep82Sp => "dep82_sp",
            Source::Dep10 => "dep10",
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which axis slot a column was selected for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    PrimaryY,
    SecondaryY,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::PrimaryY => "primary y",
            Axis::SecondaryY => "secondary y",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    #[default]
    SimpleWhite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAnchor {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAnchor {
    Top,
    Middle,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxStyle {
    pub fill: Color,
    pub notched: bool,
    /// Draw points beyond the whiskers on the box itself
    pub show_outliers: bool,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            fill: Color::GRAY,
            notched: true,
            show_outliers: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    pub font_size: f32,
    pub background: Color,
    pub border: Color,
    pub x_anchor: XAnchor,
    pub y_anchor: YAnchor,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            background: Color::WHITE.with_a(0.7),
            border: Color::BLACK,
            x_anchor: XAnchor::Center,
            y_anchor: YAnchor::Top,
        }
    }
}

/// Fixed styling table handed to the scene composer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneStyle {
    /// Indexed by [`Source::index`]
    pub source_colors: [Color; 5],
    pub marker_size: f32,
    pub boxes: BoxStyle,
    pub annotation: AnnotationStyle,
    /// Shown in annotation text where a statistic is undefined
    pub missing_placeholder: String,
    pub template: Template,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            source_colors: [
                Color::YELLOW,
                Color::BLUE,
                Color::GREEN,
                Color::RED,
                Color::PURPLE,
            ],
            marker_size: 6.0,
            boxes: BoxStyle::default(),
            annotation: AnnotationStyle::default(),
            missing_placeholder: "n/a".to_string(),
            template: Template::default(),
        }
    }
}

impl SceneStyle {
    #[inline]
    pub fn color_of(&self, source: Source) -> Color {
        self.source_colors[source.index()]
    }

    pub fn with_source_color(mut self, source: Source, color: Color) -> Self {
        self.source_colors[source.index()] = color;
        self
    }

    pub fn point_style(&self, source: Source) -> Style {
        Style::default()
            .color(self.color_of(source))
            .size(self.marker_size)
    }
}

/// How X values map to plot positions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisKind {
    #[default]
    Numeric,
    /// Positions are indices into `categories`
    Categorical { categories: Vec<String> },
}

impl AxisKind {
    /// Plot position of a group key, if the key lives on this axis.
    pub fn position(&self, key: &GroupKey) -> Option<f64> {
        match (self, key) {
            (AxisKind::Numeric, GroupKey::Num(v)) => Some(*v),
            (AxisKind::Categorical { categories }, GroupKey::Cat(c)) => categories
                .binary_search(c)
                .ok()
                .map(|i| i as f64),
            _ => None,
        }
    }
}

/// Notched box summary for one X group of one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub group: GroupKey,
    pub x: f64,
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub notch_low: f64,
    pub notch_high: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxLayer {
    pub name: String,
    pub source: Source,
    pub boxes: Vec<BoxSummary>,
    pub style: BoxStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLayer {
    pub name: String,
    pub source: Source,
    pub xy: Vec<DVec2>,
    pub style: Style,
}

/// Per-group statistics text anchored above the data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub group: GroupKey,
    pub anchor: DVec2,
    pub text: String,
    pub stats: GroupStats,
    pub style: AnnotationStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum SceneLayer {
    Box(BoxLayer),
    Points(PointLayer),
    Annotation(Annotation),
}

/// Non-fatal conditions met while composing a scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum SceneWarning {
    /// No plottable rows; `source` is `None` when the whole figure is empty
    EmptyResult { source: Option<Source> },
    /// Fewer than two values, so the standard deviation is undefined
    InsufficientSample { group: GroupKey, count: usize },
}

/// Renderer-agnostic description of one figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FigureScene {
    pub meta: PlotMeta,
    pub layers: Vec<SceneLayer>,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: AxisKind,
    pub template: Template,
    pub warnings: Vec<SceneWarning>,
}

impl FigureScene {
    pub fn box_layers(&self) -> impl Iterator<Item = &BoxLayer> {
        self.layers.iter().filter_map(|l| match l {
            SceneLayer::Box(b) => Some(b),
            _ => None,
        })
    }

    pub fn point_layers(&self) -> impl Iterator<Item = &PointLayer> {
        self.layers.iter().filter_map(|l| match l {
            SceneLayer::Points(p) => Some(p),
            _ => None,
        })
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.layers.iter().filter_map(|l| match l {
            SceneLayer::Annotation(a) => Some(a),
            _ => None,
        })
    }

    /// Extent of all point and whisker geometry.
    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        let mut any = false;
        let mut include = |p: DVec2| {
            if p.is_finite() {
                min = min.min(p);
                max = max.max(p);
                any = true;
            }
        };
        for l in &self.layers {
            match l {
                SceneLayer::Points(p) => p.xy.iter().copied().for_each(&mut include),
                SceneLayer::Box(b) => {
                    for s in &b.boxes {
                        include(DVec2::new(s.x, s.lower_whisker));
                        include(DVec2::new(s.x, s.upper_whisker));
                    }
                }
                SceneLayer::Annotation(_) => {}
            }
        }
        any.then_some((min, max))
    }
}
