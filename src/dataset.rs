//! The measurement table and the cultivar filter over it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::core::{Axis, Source};
use crate::{ConfigurationError, Result};

/// Plantation ages outside this range are treated as missing.
pub const AGE_DOMAIN: RangeInclusive<i64> = 1..=12;

/// One pixel measurement joined with its plantation metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub source: Source,
    #[serde(alias = "cultivar_n")]
    pub cultivar: String,
    #[serde(default)]
    pub age_plan: Option<i64>,
    /// Acquisition year of the raster
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub lidar_year: Option<i32>,
    #[serde(default, alias = "annee_plan")]
    pub planting_year: Option<i32>,
    #[serde(default)]
    pub measures: BTreeMap<String, Option<f64>>,
}

impl Row {
    pub fn new(source: Source, cultivar: impl Into<String>) -> Self {
        Self {
            source,
            cultivar: cultivar.into(),
            age_plan: None,
            year: None,
            lidar_year: None,
            planting_year: None,
            measures: BTreeMap::new(),
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age_plan = Some(age);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_planting_year(mut self, year: i32) -> Self {
        self.planting_year = Some(year);
        self
    }

    pub fn with_measure(mut self, name: impl Into<String>, value: f64) -> Self {
        self.measures.insert(name.into(), Some(value));
        self
    }

    /// Value of `column`, or `None` when missing, non-finite or out of domain.
    pub fn value(&self, column: &Column) -> Option<Value<'_>> {
        match column {
            Column::Source => Some(Value::Cat(self.source.as_str())),
            Column::Cultivar => Some(Value::Cat(&self.cultivar)),
            Column::AgePlan => self
                .age_plan
                .filter(|age| AGE_DOMAIN.contains(age))
                .map(|age| Value::Num(age as f64)),
            Column::Year => self.year.map(|y| Value::Num(y.into())),
            Column::LidarYear => self.lidar_year.map(|y| Value::Num(y.into())),
            Column::PlantingYear => self.planting_year.map(|y| Value::Num(y.into())),
            Column::Measure(name) => self
                .measures
                .get(name)
                .copied()
                .flatten()
                .filter(|v| v.is_finite())
                .map(Value::Num),
        }
    }

    /// Numeric value of `column`; categorical columns yield `None`.
    #[inline]
    pub fn number(&self, column: &Column) -> Option<f64> {
        match self.value(column)? {
            Value::Num(v) => Some(v),
            Value::Cat(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    Num(f64),
    Cat(&'a str),
}

/// A resolved column of the row schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Source,
    Cultivar,
    AgePlan,
    Year,
    LidarYear,
    PlantingYear,
    Measure(String),
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Source => "source",
            Column::Cultivar => "cultivar",
            Column::AgePlan => "age_plan",
            Column::Year => "year",
            Column::LidarYear => "lidar_year",
            Column::PlantingYear => "annee_plan",
            Column::Measure(name) => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Column::Source => "Source",
            Column::Cultivar => "Cultivar",
            Column::AgePlan => "Plantation age",
            Column::Year => "Raster year",
            Column::LidarYear => "LiDAR year",
            Column::PlantingYear => "Plantation year",
            Column::Measure(name) => name,
        }
    }

    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Column::Source | Column::Cultivar)
    }
}

/// Column names a dataset can be queried by.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    measures: Vec<String>,
}

impl Schema {
    pub fn new(measures: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let measures: BTreeSet<String> = measures.into_iter().map(Into::into).collect();
        Self {
            measures: measures.into_iter().collect(),
        }
    }

    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    /// Resolve a column name selected for `axis`.
    pub fn resolve(&self, name: &str, axis: Axis) -> Result<Column> {
        let column = match name {
            "source" => Column::Source,
            "cultivar" | "cultivar_n" => Column::Cultivar,
            "age_plan" => Column::AgePlan,
            "year" => Column::Year,
            "lidar_year" => Column::LidarYear,
            "annee_plan" | "planting_year" => Column::PlantingYear,
            _ if self.measures.binary_search_by(|m| m.as_str().cmp(name)).is_ok() => {
                Column::Measure(name.to_string())
            }
            _ => return Err(Report::new(ConfigurationError::unknown_column(axis, name))),
        };
        Ok(column)
    }

    /// Resolve a column that must hold numbers, as every Y measure does.
    pub fn resolve_numeric(&self, name: &str, axis: Axis) -> Result<Column> {
        let column = self.resolve(name, axis)?;
        if column.is_categorical() {
            return Err(Report::new(ConfigurationError::not_numeric(axis, name)));
        }
        Ok(column)
    }
}

/// A selectable axis column with its display label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisOption {
    pub value: String,
    pub label: String,
}

impl From<&Column> for AxisOption {
    fn from(column: &Column) -> Self {
        Self {
            value: column.name().to_string(),
            label: column.label().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisOptions {
    pub x: Vec<AxisOption>,
    pub y: Vec<AxisOption>,
}

/// Immutable, already-cleaned measurement table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset whose measure columns are every name seen in `rows`.
    pub fn new(rows: Vec<Row>) -> Self {
        let schema = Schema::new(rows.iter().flat_map(|r| r.measures.keys().cloned()));
        Self { schema, rows }
    }

    /// Build a dataset with an explicit measure list; names seen in rows are added.
    pub fn with_measures(measures: impl IntoIterator<Item = impl Into<String>>, rows: Vec<Row>) -> Self {
        let declared: Vec<String> = measures.into_iter().map(Into::into).collect();
        let schema = Schema::new(
            declared
                .into_iter()
                .chain(rows.iter().flat_map(|r| r.measures.keys().cloned())),
        );
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn all(&self) -> RowSet<'_> {
        RowSet {
            schema: &self.schema,
            rows: Selected::All(&self.rows),
        }
    }

    pub fn filter(&self, spec: &FilterSpec) -> RowSet<'_> {
        filter(self, spec)
    }

    /// Distinct cultivars by descending row count, ties broken by name.
    pub fn cultivars_by_count(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            *counts.entry(row.cultivar.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(c, n)| (c.to_string(), n))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Columns offered for the X axis and for the Y measures.
    pub fn axis_options(&self) -> AxisOptions {
        let measures: Vec<Column> = self
            .schema
            .measures()
            .iter()
            .map(|m| Column::Measure(m.clone()))
            .collect();

        let x = std::iter::once(Column::AgePlan)
            .chain(measures.iter().cloned())
            .chain([Column::Year, Column::PlantingYear])
            .map(|c| AxisOption::from(&c))
            .collect();
        let y = measures.iter().map(AxisOption::from).collect();
        AxisOptions { x, y }
    }
}

/// Selected cultivars. Empty means every row passes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    cultivars: BTreeSet<String>,
}

impl FilterSpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cultivars.is_empty()
    }

    pub fn contains(&self, cultivar: &str) -> bool {
        self.cultivars.contains(cultivar)
    }

    pub fn cultivars(&self) -> impl Iterator<Item = &str> {
        self.cultivars.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            cultivars: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug)]
enum Selected<'a> {
    All(&'a [Row]),
    Subset(Vec<&'a Row>),
}

/// Borrowed view of the rows that passed a filter, in dataset order.
#[derive(Clone, Debug)]
pub struct RowSet<'a> {
    schema: &'a Schema,
    rows: Selected<'a>,
}

impl<'a> RowSet<'a> {
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn len(&self) -> usize {
        match &self.rows {
            Selected::All(rows) => rows.len(),
            Selected::Subset(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when this view is the whole dataset without copying.
    pub fn is_unfiltered(&self) -> bool {
        matches!(self.rows, Selected::All(_))
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &'a Row> + '_> {
        match &self.rows {
            Selected::All(rows) => Box::new(rows.iter()),
            Selected::Subset(rows) => Box::new(rows.iter().copied()),
        }
    }

    /// Narrow this view further; applying the same spec twice is a no-op.
    pub fn filter(&self, spec: &FilterSpec) -> RowSet<'a> {
        if spec.is_empty() {
            return self.clone();
        }
        RowSet {
            schema: self.schema,
            rows: Selected::Subset(self.iter().filter(|r| spec.contains(&r.cultivar)).collect()),
        }
    }
}

/// Rows whose cultivar is selected. An empty spec returns the dataset as-is.
pub fn filter<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> RowSet<'a> {
    dataset.all().filter(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Row::new(Source::Dep10, "I-214").with_age(5).with_measure("grid_PAI", 1.0),
            Row::new(Source::Dep47, "Koster").with_age(13).with_measure("grid_PAI", 2.0),
            Row::new(Source::Dep73, "I-214").with_age(0),
            Row::new(Source::Dep10, "Raspalje").with_age(3).with_measure("grid_CC", 0.4),
        ])
    }

    #[test]
    fn empty_filter_is_the_whole_dataset() {
        let ds = sample();
        let all = ds.filter(&FilterSpec::all());
        assert!(all.is_unfiltered());
        assert_eq!(all.len(), ds.len());
        assert!(all.iter().zip(ds.rows()).all(|(a, b)| std::ptr::eq(a, b)));
    }

    #[test]
    fn filter_keeps_order_and_is_idempotent() {
        let ds = sample();
        let spec: FilterSpec = ["I-214", "Raspalje"].into_iter().collect();
        let once = ds.filter(&spec);
        let twice = once.filter(&spec);

        let cultivars: Vec<&str> = once.iter().map(|r| r.cultivar.as_str()).collect();
        assert_eq!(cultivars, ["I-214", "I-214", "Raspalje"]);
        assert_eq!(
            once.iter().collect::<Vec<_>>(),
            twice.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_cultivar_matches_nothing() {
        let ds = sample();
        let spec: FilterSpec = ["Nope"].into_iter().collect();
        assert!(ds.filter(&spec).is_empty());
    }

    #[test]
    fn out_of_domain_age_reads_as_missing() {
        let ds = sample();
        let ages: Vec<Option<f64>> = ds.rows().iter().map(|r| r.number(&Column::AgePlan)).collect();
        assert_eq!(ages, [Some(5.0), None, None, Some(3.0)]);
        // the rows themselves stay in the dataset
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn resolve_rejects_unknown_and_categorical_measures() {
        let ds = sample();
        let schema = ds.schema();
        assert_eq!(schema.resolve("grid_CC", Axis::X).unwrap(), Column::Measure("grid_CC".into()));
        assert_eq!(schema.resolve("annee_plan", Axis::X).unwrap(), Column::PlantingYear);
        assert_eq!(schema.resolve("cultivar_n", Axis::X).unwrap(), Column::Cultivar);

        let err = schema.resolve("grid_VCI", Axis::PrimaryY).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ConfigurationError::unknown_column(Axis::PrimaryY, "grid_VCI")
        );

        let err = schema.resolve_numeric("source", Axis::Y).unwrap_err();
        assert_eq!(err.current_context().kind, crate::ConfigurationKind::NotNumeric);
    }

    #[test]
    fn cultivars_ranked_by_pixel_count() {
        let ds = sample();
        assert_eq!(
            ds.cultivars_by_count(),
            vec![
                ("I-214".to_string(), 2),
                ("Koster".to_string(), 1),
                ("Raspalje".to_string(), 1),
            ]
        );
    }

    #[test]
    fn axis_options_list_measures_on_both_axes() {
        let opts = sample().axis_options();
        let x: Vec<&str> = opts.x.iter().map(|o| o.value.as_str()).collect();
        let y: Vec<&str> = opts.y.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(x, ["age_plan", "grid_CC", "grid_PAI", "year", "annee_plan"]);
        assert_eq!(y, ["grid_CC", "grid_PAI"]);
    }

    #[test]
    fn rows_accept_original_column_names() {
        let json = r#"{"source":"dep82_bb","cultivar_n":"I-214","age_plan":4,"annee_plan":2016,
                       "measures":{"grid_PAI":1.5,"grid_CC":null}}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        assert_eq!(row.source, Source::Dep82Bb);
        assert_eq!(row.planting_year, Some(2016));
        assert_eq!(row.number(&Column::Measure("grid_PAI".into())), Some(1.5));
        assert_eq!(row.number(&Column::Measure("grid_CC".into())), None);
    }
}
