//! Horizontal placement of raw points next to their box summary.

use std::collections::BTreeSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::aggregate::GroupKey;
use crate::core::{AxisKind, Source};
use crate::dataset::{Column, RowSet, Value};

/// Shift applied to every point's X position, in X-axis units.
///
/// A fixed constant, not derived from data.
pub const POINT_OFFSET: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedPoint {
    pub x: f64,
    pub y: f64,
    pub source: Source,
}

impl PlacedPoint {
    #[inline]
    pub fn xy(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }
}

/// Places raw points for one figure.
pub trait PointLayout {
    fn place(&self, rows: &RowSet<'_>, x: &Column, x_axis: &AxisKind, y: &Column) -> Vec<PlacedPoint>;
}

/// Adds a constant to each point's X position. No collision handling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedOffset {
    pub offset: f64,
}

impl Default for FixedOffset {
    fn default() -> Self {
        Self {
            offset: POINT_OFFSET,
        }
    }
}

impl FixedOffset {
    pub const fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl PointLayout for FixedOffset {
    fn place(&self, rows: &RowSet<'_>, x: &Column, x_axis: &AxisKind, y: &Column) -> Vec<PlacedPoint> {
        rows.iter()
            .filter_map(|row| {
                let pos = x_axis.position(&GroupKey::from_value(row.value(x)?))?;
                let y = row.number(y)?;
                Some(PlacedPoint {
                    x: pos + self.offset,
                    y,
                    source: row.source,
                })
            })
            .collect()
    }
}

/// Axis for `column` over `rows`: categorical columns get their sorted distinct values.
pub fn axis_for(rows: &RowSet<'_>, column: &Column) -> AxisKind {
    if !column.is_categorical() {
        return AxisKind::Numeric;
    }
    let categories: BTreeSet<&str> = rows
        .iter()
        .filter_map(|r| match r.value(column)? {
            Value::Cat(c) => Some(c),
            Value::Num(_) => None,
        })
        .collect();
    AxisKind::Categorical {
        categories: categories.into_iter().map(str::to_string).collect(),
    }
}

/// Points for `(x, y)` with the default fixed offset.
pub fn layout_points(rows: &RowSet<'_>, x: &Column, y: &Column) -> Vec<PlacedPoint> {
    FixedOffset::default().place(rows, x, &axis_for(rows, x), y)
}
