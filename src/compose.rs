use glam::DVec2;

use crate::aggregate::{GroupStats, GroupedStats, group_values};
use crate::core::{
    Annotation, Axis, AxisKind, BoxLayer, BoxSummary, FigureScene, PlotMeta, PointLayer,
    SceneLayer, SceneStyle, SceneWarning, Source,
};
use crate::dataset::{Column, RowSet};
use crate::layout::{FixedOffset, PlacedPoint, PointLayout, axis_for};
use crate::Result;

/// Builds figure scenes from filtered rows using a fixed styling table.
#[derive(Clone, Debug)]
pub struct SceneComposer<L = FixedOffset> {
    style: SceneStyle,
    layout: L,
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new(SceneStyle::default())
    }
}

impl SceneComposer {
    pub fn new(style: SceneStyle) -> Self {
        Self {
            style,
            layout: FixedOffset::default(),
        }
    }
}

impl<L: PointLayout> SceneComposer<L> {
    /// Swap the point layout strategy.
    pub fn with_layout<M: PointLayout>(self, layout: M) -> SceneComposer<M> {
        SceneComposer {
            style: self.style,
            layout,
        }
    }

    pub fn style(&self) -> &SceneStyle {
        &self.style
    }

    /// Compose the figure for `(x, y)`, annotating groups when `stats` is given.
    ///
    /// Fails without producing a scene when either name is not a plottable column.
    pub fn compose(
        &self,
        rows: &RowSet<'_>,
        x: &str,
        y: &str,
        stats: Option<&GroupedStats>,
    ) -> Result<FigureScene> {
        let x_col = rows.schema().resolve(x, Axis::X)?;
        let y_col = rows.schema().resolve_numeric(y, Axis::Y)?;
        Ok(self.compose_columns(rows, (x, &x_col), (y, &y_col), stats))
    }

    /// Compose from columns already resolved against the schema.
    ///
    /// `x` and `y` pair the name as selected (used verbatim for titles) with its column.
    pub(crate) fn compose_columns(
        &self,
        rows: &RowSet<'_>,
        (x_name, x): (&str, &Column),
        (y_name, y): (&str, &Column),
        stats: Option<&GroupedStats>,
    ) -> FigureScene {
        let x_axis = axis_for(rows, x);
        let points = self.layout.place(rows, x, &x_axis, y);

        let mut layers = Vec::new();
        let mut warnings = Vec::new();

        for source in Source::ALL {
            let boxes = self.source_boxes(rows, source, x, &x_axis, y);
            let xy: Vec<DVec2> = points
                .iter()
                .filter(|p| p.source == source)
                .map(PlacedPoint::xy)
                .collect();
            if boxes.is_empty() && xy.is_empty() {
                warnings.push(SceneWarning::EmptyResult {
                    source: Some(source),
                });
                continue;
            }
            layers.push(SceneLayer::Box(BoxLayer {
                name: format!("Box {source}"),
                source,
                boxes,
                style: self.style.boxes,
            }));
            layers.push(SceneLayer::Points(PointLayer {
                name: format!("Points {source}"),
                source,
                xy,
                style: self.style.point_style(source),
            }));
        }

        if layers.is_empty() {
            warnings.push(SceneWarning::EmptyResult { source: None });
        }

        if let Some(stats) = stats {
            let top = rows
                .iter()
                .filter_map(|r| r.number(y))
                .max_by(f64::total_cmp);
            if let Some(top) = top {
                for (group, s) in stats.iter().filter(|(_, s)| s.count > 0) {
                    let Some(gx) = x_axis.position(group) else {
                        continue;
                    };
                    if s.count < 2 {
                        warnings.push(SceneWarning::InsufficientSample {
                            group: group.clone(),
                            count: s.count,
                        });
                    }
                    layers.push(SceneLayer::Annotation(Annotation {
                        group: group.clone(),
                        anchor: DVec2::new(gx, top),
                        text: self.annotation_text(s),
                        stats: *s,
                        style: self.style.annotation,
                    }));
                }
            }
        }

        FigureScene {
            meta: PlotMeta {
                title: Some(format!("{y_name} by {x_name}")),
            },
            layers,
            x_label: x_name.to_string(),
            y_label: y_name.to_string(),
            x_axis,
            template: self.style.template,
            warnings,
        }
    }

    fn source_boxes(
        &self,
        rows: &RowSet<'_>,
        source: Source,
        x: &Column,
        x_axis: &AxisKind,
        y: &Column,
    ) -> Vec<BoxSummary> {
        group_values(rows.iter().filter(|r| r.source == source), x, y)
            .into_iter()
            .filter_map(|(group, values)| {
                let pos = x_axis.position(&group)?;
                BoxSummary::from_sorted(group, pos, &values)
            })
            .collect()
    }

    fn annotation_text(&self, s: &GroupStats) -> String {
        let fmt = |v: Option<f64>| match v {
            Some(v) => format!("{v:.2}"),
            None => self.style.missing_placeholder.clone(),
        };
        format!(
            "N: {}\nMean: {}\nStd: {}",
            s.count,
            fmt(s.mean),
            fmt(s.stddev)
        )
    }
}

/// Compose one figure with the default styling and layout.
pub fn compose(
    rows: &RowSet<'_>,
    x: &str,
    y: &str,
    stats: Option<&GroupedStats>,
) -> Result<FigureScene> {
    SceneComposer::new(SceneStyle::default()).compose(rows, x, y, stats)
}

/// Resolve every axis of a figure pair before composing either figure.
pub(crate) fn resolve_axes(
    rows: &RowSet<'_>,
    x: &str,
    ys: [(&str, Axis); 2],
) -> Result<(Column, [Column; 2])> {
    let schema = rows.schema();
    let x_col = schema.resolve(x, Axis::X)?;
    let [(y1, a1), (y2, a2)] = ys;
    let y1_col = schema.resolve_numeric(y1, a1)?;
    let y2_col = schema.resolve_numeric(y2, a2)?;
    Ok((x_col, [y1_col, y2_col]))
}
