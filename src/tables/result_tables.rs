//! The computed result tables: ranked statistics, distributions per
//! group value, aligned snapshot bands, and objective-space ranges.

use std::borrow::Cow;

use kstring::KString;

use crate::{
    aggregate::{DistributionCell, GroupingDimension},
    bounds::DisplayRange,
    metric::MetricDescriptor,
    rank::RankedCell,
    snapshot::AlignedCurve,
    tables::table_view::{
        format_float, ColumnFormatting, Highlight, TableHeader, TableView, TableViewRow,
    },
};

fn group_value_columns(dimension: GroupingDimension) -> TableHeader {
    dimension
        .attribute()
        .map(|title| (Cow::Borrowed(title), ColumnFormatting::Number))
        .into_iter()
        .collect()
}

/// Context: the grouping dimension (adds its value column if not
/// `None`).
impl TableViewRow<GroupingDimension> for RankedCell {
    fn table_view_header(dimension: GroupingDimension) -> TableHeader {
        let mut header = group_value_columns(dimension);
        header.extend([
            ("solver".into(), ColumnFormatting::String),
            ("mean".into(), ColumnFormatting::Number),
            ("std".into(), ColumnFormatting::Number),
            ("rank".into(), ColumnFormatting::Number),
        ]);
        header
    }

    fn table_view_row<'s>(&'s self, out: &mut Vec<(Cow<'s, str>, Highlight)>) {
        let highlight = if self.rank == 1 {
            Highlight::Best
        } else {
            Highlight::Neutral
        };
        let RankedCell { cell, rank } = self;
        for value in &cell.key.group_values {
            out.push((value.to_string().into(), highlight));
        }
        out.push((cell.key.solver.as_str().into(), highlight));
        out.push((format_float(cell.mean), highlight));
        out.push((format_float(cell.stddev), highlight));
        out.push((rank.to_string().into(), highlight));
    }
}

/// Solvers ranked by mean per group value, for one metric.
#[derive(Debug, Clone)]
pub struct RankedTable {
    pub metric: MetricDescriptor,
    pub dimension: GroupingDimension,
    pub rows: Vec<RankedCell>,
}

impl RankedTable {
    pub fn name_for(metric_code: &str, dimension: GroupingDimension) -> String {
        match dimension.file_tag() {
            None => format!("{metric_code}_stats"),
            Some(tag) => format!("{metric_code}_by_{tag}_stats"),
        }
    }
}

impl TableView for RankedTable {
    fn table_name(&self) -> Cow<'_, str> {
        Self::name_for(&self.metric.code, self.dimension).into()
    }

    fn table_view_header(&self) -> TableHeader {
        RankedCell::table_view_header(self.dimension)
    }

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Vec<(Cow<'s, str>, Highlight)>> + 's> {
        Box::new(self.rows.iter().map(|row| {
            let mut out = Vec::new();
            row.table_view_row(&mut out);
            out
        }))
    }
}

impl TableViewRow<GroupingDimension> for DistributionCell {
    fn table_view_header(dimension: GroupingDimension) -> TableHeader {
        let mut header = group_value_columns(dimension);
        header.extend([
            ("solver".into(), ColumnFormatting::String),
            ("mean".into(), ColumnFormatting::Number),
            ("q0".into(), ColumnFormatting::Number),
            ("q1".into(), ColumnFormatting::Number),
            ("q2".into(), ColumnFormatting::Number),
            ("min".into(), ColumnFormatting::Number),
            ("max".into(), ColumnFormatting::Number),
            ("count".into(), ColumnFormatting::Number),
        ]);
        header
    }

    fn table_view_row<'s>(&'s self, out: &mut Vec<(Cow<'s, str>, Highlight)>) {
        let DistributionCell {
            key,
            mean,
            quartiles,
            min,
            max,
            sample_count,
        } = self;
        let n = Highlight::Neutral;
        for value in &key.group_values {
            out.push((value.to_string().into(), n));
        }
        out.push((key.solver.as_str().into(), n));
        for x in [*mean, quartiles.q0, quartiles.q1, quartiles.q2, *min, *max] {
            out.push((format_float(x), n));
        }
        out.push((sample_count.to_string().into(), n));
    }
}

/// Mean, quartiles and extremes per group value and solver, for one
/// metric.
#[derive(Debug, Clone)]
pub struct DistributionTable {
    pub metric: MetricDescriptor,
    pub dimension: GroupingDimension,
    pub rows: Vec<DistributionCell>,
}

impl DistributionTable {
    pub fn name_for(metric_code: &str, dimension: GroupingDimension) -> String {
        match dimension.file_tag() {
            None => format!("{metric_code}_distribution"),
            Some(tag) => format!("{metric_code}_{tag}_distribution"),
        }
    }
}

impl TableView for DistributionTable {
    fn table_name(&self) -> Cow<'_, str> {
        Self::name_for(&self.metric.code, self.dimension).into()
    }

    fn table_view_header(&self) -> TableHeader {
        DistributionCell::table_view_header(self.dimension)
    }

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Vec<(Cow<'s, str>, Highlight)>> + 's> {
        Box::new(self.rows.iter().map(|row| {
            let mut out = Vec::new();
            row.table_view_row(&mut out);
            out
        }))
    }
}

/// The aligned snapshot bands of all solvers, for one metric.
#[derive(Debug, Clone)]
pub struct BandsTable {
    pub metric: MetricDescriptor,
    pub curves: Vec<AlignedCurve>,
}

impl BandsTable {
    pub fn name_for(metric_code: &str) -> String {
        format!("{metric_code}_snapshot_bands")
    }
}

impl TableView for BandsTable {
    fn table_name(&self) -> Cow<'_, str> {
        Self::name_for(&self.metric.code).into()
    }

    fn table_view_header(&self) -> TableHeader {
        let mut header: TableHeader = vec![("solver".into(), ColumnFormatting::String)];
        for title in [
            "snapshot index",
            "mean time",
            "mean value",
            "q0",
            "q1",
            "q2",
        ] {
            header.push((title.into(), ColumnFormatting::Number));
        }
        header
    }

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Vec<(Cow<'s, str>, Highlight)>> + 's> {
        let n = Highlight::Neutral;
        Box::new(self.curves.iter().flat_map(move |curve| {
            curve.bands.iter().map(move |band| {
                vec![
                    (curve.solver.as_str().into(), n),
                    (band.index.to_string().into(), n),
                    (format_float(band.mean_time), n),
                    (format_float(band.mean_value), n),
                    (format_float(band.quartiles.q0), n),
                    (format_float(band.quartiles.q1), n),
                    (format_float(band.quartiles.q2), n),
                ]
            })
        }))
    }
}

/// Display ranges per objective over the fronts of all solvers for one
/// instance and front version.
#[derive(Debug, Clone)]
pub struct ObjectiveBoundsTable {
    pub instance: KString,
    pub version: KString,
    pub num_points: usize,
    /// Indexed by objective
    pub ranges: Vec<DisplayRange>,
}

impl ObjectiveBoundsTable {
    pub fn name_for(instance: &str, version: &str) -> String {
        format!("{instance}_{version}_objective_bounds")
    }
}

impl TableView for ObjectiveBoundsTable {
    fn table_name(&self) -> Cow<'_, str> {
        Self::name_for(&self.instance, &self.version).into()
    }

    fn table_view_header(&self) -> TableHeader {
        vec![
            ("objective".into(), ColumnFormatting::String),
            ("low".into(), ColumnFormatting::Number),
            ("high".into(), ColumnFormatting::Number),
        ]
    }

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Vec<(Cow<'s, str>, Highlight)>> + 's> {
        let n = Highlight::Neutral;
        Box::new(self.ranges.iter().enumerate().map(move |(i, range)| {
            vec![
                (format!("f{}", i + 1).into(), n),
                (format_float(range.low), n),
                (format_float(range.high), n),
            ]
        }))
    }
}
