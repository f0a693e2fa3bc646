//! Competition ranking ("1224") of solvers by their mean metric value,
//! within each group value and metric separately.

use itertools::Itertools;

use crate::{
    aggregate::AggregateCell,
    metric::{Direction, DirectionLookupError, DirectionRegistry},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCell {
    pub cell: AggregateCell,
    /// 1 plus the number of cells in the same partition with a
    /// strictly better mean
    pub rank: usize,
}

/// Rank the cells of a single partition. Cells with equal means get
/// the same rank. The result is sorted by rank, then solver.
pub fn rank_by_direction(cells: Vec<AggregateCell>, direction: Direction) -> Vec<RankedCell> {
    let means: Vec<f64> = cells.iter().map(|c| c.mean).collect();
    let mut ranked: Vec<RankedCell> = cells
        .into_iter()
        .map(|cell| {
            let num_better = means
                .iter()
                .filter(|other| direction.is_better(**other, cell.mean))
                .count();
            RankedCell {
                cell,
                rank: num_better + 1,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| a.cell.key.solver.cmp(&b.cell.key.solver))
    });
    ranked
}

/// Rank `cells` (as returned by `aggregate`) per partition of group
/// values and metric; ranks never carry over between partitions. The
/// result is ordered by partition, then rank, then solver. Fails if
/// any metric has no registered direction.
pub fn rank(
    cells: Vec<AggregateCell>,
    registry: &DirectionRegistry,
) -> Result<Vec<RankedCell>, DirectionLookupError> {
    let mut cells = cells;
    cells.sort_by(|a, b| a.key.cmp(&b.key));
    let mut ranked = Vec::with_capacity(cells.len());
    for (_, partition) in &cells
        .into_iter()
        .group_by(|c| (c.key.group_values.clone(), c.key.metric_name.clone()))
    {
        let partition: Vec<AggregateCell> = partition.collect();
        let direction = registry.direction(&partition[0].key.metric_name)?;
        ranked.extend(rank_by_direction(partition, direction));
    }
    Ok(ranked)
}
