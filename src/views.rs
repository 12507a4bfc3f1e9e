//! The two synchronized figures driven by one selection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::aggregate;
use crate::compose::{SceneComposer, resolve_axes};
use crate::core::{Axis, FigureScene, SceneStyle};
use crate::dataset::{Dataset, FilterSpec};
use crate::layout::{FixedOffset, PointLayout};
use crate::Result;

/// Everything a user can change in the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub cultivars: FilterSpec,
    pub x: String,
    pub y1: String,
    pub y2: String,
}

impl Selection {
    pub fn new(x: impl Into<String>, y1: impl Into<String>, y2: impl Into<String>) -> Self {
        Self {
            cultivars: FilterSpec::all(),
            x: x.into(),
            y1: y1.into(),
            y2: y2.into(),
        }
    }

    pub fn with_cultivars<S: Into<String>>(mut self, cultivars: impl IntoIterator<Item = S>) -> Self {
        self.cultivars = cultivars.into_iter().collect();
        self
    }
}

/// Which of the two figures carry per-group statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewOptions {
    pub annotate_primary: bool,
    pub annotate_secondary: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            annotate_primary: false,
            annotate_secondary: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewPair {
    /// `(x, y1)`
    pub primary: FigureScene,
    /// `(x, y2)`
    pub secondary: FigureScene,
}

/// Maps a selection to both figures. Holds no state besides the dataset.
#[derive(Clone, Debug)]
pub struct ViewController<L = FixedOffset> {
    dataset: Arc<Dataset>,
    composer: SceneComposer<L>,
    options: ViewOptions,
}

impl ViewController {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            composer: SceneComposer::default(),
            options: ViewOptions::default(),
        }
    }
}

impl<L: PointLayout> ViewController<L> {
    pub fn with_composer<M: PointLayout>(self, composer: SceneComposer<M>) -> ViewController<M> {
        ViewController {
            dataset: self.dataset,
            composer,
            options: self.options,
        }
    }

    pub fn with_style(self, style: SceneStyle) -> ViewController<FixedOffset> {
        self.with_composer(SceneComposer::new(style))
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn options(&self) -> ViewOptions {
        self.options
    }

    pub fn compute_views(&self, selection: &Selection) -> Result<ViewPair> {
        self.compute_views_with(selection, self.options)
    }

    pub fn compute_views_with(&self, selection: &Selection, options: ViewOptions) -> Result<ViewPair> {
        compose_pair(&self.dataset, &self.composer, selection, options)
    }
}

/// Filter once, then compose both figures from the same rows.
///
/// All three axis names are checked before either figure is built.
fn compose_pair<L: PointLayout>(
    dataset: &Dataset,
    composer: &SceneComposer<L>,
    selection: &Selection,
    options: ViewOptions,
) -> Result<ViewPair> {
    let rows = dataset.filter(&selection.cultivars);
    let (x, [y1, y2]) = resolve_axes(
        &rows,
        &selection.x,
        [
            (selection.y1.as_str(), Axis::PrimaryY),
            (selection.y2.as_str(), Axis::SecondaryY),
        ],
    )?;

    let stats1 = options.annotate_primary.then(|| aggregate(&rows, &x, &y1));
    let stats2 = options.annotate_secondary.then(|| aggregate(&rows, &x, &y2));

    let primary = composer.compose_columns(
        &rows,
        (selection.x.as_str(), &x),
        (selection.y1.as_str(), &y1),
        stats1.as_ref(),
    );
    let secondary = composer.compose_columns(
        &rows,
        (selection.x.as_str(), &x),
        (selection.y2.as_str(), &y2),
        stats2.as_ref(),
    );

    debug!(
        rows = rows.len(),
        cultivars = selection.cultivars.cultivars().count(),
        x = %selection.x,
        y1 = %selection.y1,
        y2 = %selection.y2,
        primary_layers = primary.layers.len(),
        secondary_layers = secondary.layers.len(),
        "computed views"
    );
    Ok(ViewPair { primary, secondary })
}

/// Compute both figures with default styling: the second figure is annotated.
pub fn compute_views(
    dataset: &Dataset,
    filter: &FilterSpec,
    x: &str,
    y1: &str,
    y2: &str,
) -> Result<ViewPair> {
    let selection = Selection {
        cultivars: filter.clone(),
        x: x.to_string(),
        y1: y1.to_string(),
        y2: y2.to_string(),
    };
    compose_pair(
        dataset,
        &SceneComposer::new(SceneStyle::default()),
        &selection,
        ViewOptions::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Source, SceneWarning};
    use crate::dataset::Row;

    fn controller() -> ViewController {
        ViewController::new(Arc::new(Dataset::new(vec![
            Row::new(Source::Dep10, "I-214").with_age(5).with_measure("grid_PAI", 1.0).with_measure("grid_CC", 0.3),
            Row::new(Source::Dep10, "I-214").with_age(6).with_measure("grid_PAI", 2.0).with_measure("grid_CC", 0.5),
            Row::new(Source::Dep73, "Koster").with_age(6).with_measure("grid_PAI", 3.0),
        ])))
    }

    #[test]
    fn only_the_secondary_figure_is_annotated_by_default() {
        let views = controller()
            .compute_views(&Selection::new("age_plan", "grid_PAI", "grid_CC"))
            .unwrap();
        assert_eq!(views.primary.annotations().count(), 0);
        assert_eq!(views.secondary.annotations().count(), 2);
        assert_eq!(views.primary.y_label, "grid_PAI");
        assert_eq!(views.secondary.y_label, "grid_CC");
    }

    #[test]
    fn annotation_can_be_enabled_on_both_figures() {
        let ctl = controller().with_options(ViewOptions {
            annotate_primary: true,
            annotate_secondary: true,
        });
        let views = ctl
            .compute_views(&Selection::new("age_plan", "grid_PAI", "grid_PAI"))
            .unwrap();
        assert_eq!(views.primary, views.secondary);
    }

    #[test]
    fn bad_secondary_axis_fails_the_whole_pair() {
        let err = controller()
            .compute_views(&Selection::new("age_plan", "grid_PAI", "biomass_mean"))
            .unwrap_err();
        assert_eq!(err.current_context().axis, Axis::SecondaryY);
        assert_eq!(err.current_context().column, "biomass_mean");
    }

    #[test]
    fn cultivar_selection_narrows_both_figures() {
        let views = controller()
            .compute_views(&Selection::new("age_plan", "grid_PAI", "grid_CC").with_cultivars(["Koster"]))
            .unwrap();
        let sources: Vec<Source> = views.primary.point_layers().map(|p| p.source).collect();
        assert_eq!(sources, [Source::Dep73]);
        // Koster rows carry no grid_CC at all
        assert!(views.secondary.layers.is_empty());
        assert!(views
            .secondary
            .warnings
            .contains(&SceneWarning::EmptyResult { source: None }));
    }
}
