//! Writing `TableView`s as CSV files.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::{info, tables::table_view::TableView, utillib::tempfile_utils::write_atomically};

/// Write `table` as CSV with a header row.
pub fn write_csv(table: &dyn TableView, out: impl Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.table_view_header().iter().map(|(title, _)| title.as_bytes()))?;
    for row in table.table_view_body() {
        writer.write_record(row.iter().map(|(value, _)| value.as_bytes()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `table` to `<dir>/<table name>.csv`, atomically, returning
/// the path.
pub fn write_csv_file(dir: &Path, table: &dyn TableView) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", table.table_name()));
    write_atomically(&path, |out| write_csv(table, out))
        .with_context(|| anyhow!("writing table to {path:?}"))?;
    info!("wrote {path:?}");
    Ok(path)
}
