//! Printing `TableView`s to a terminal in human-readable format (with
//! spaces for padding, and ANSI sequences for formatting), or as TSV.

//! Does not escape anything in the fields. Thus TSV output is not safe
//! if values contain tabs or newlines.

use std::{borrow::Cow, io::Write};

use anyhow::{bail, Result};
use yansi::{Paint, Style};

use crate::tables::table_view::{ColumnFormatting, Highlight, TableView};

const TITLE_STYLE: Style = Style::new().bold().italic();
const BEST_STYLE: Style = Style::new().green().bold();

/// Column widths are fixed at construction. If a value is wider than
/// its column, a single space is still printed between it and the
/// next value. The last column is not padded.
pub struct TerminalTable {
    widths: Vec<usize>,
    formattings: Vec<ColumnFormatting>,
    titles: Vec<String>,
    /// Print as TSV, without ANSI codes and padding.
    pub tsv_mode: bool,
}

impl TerminalTable {
    /// Appends a space to each title, to make sure italic text is not
    /// clipped on terminals.
    pub fn new(
        widths: &[usize],
        header: &[(Cow<'static, str>, ColumnFormatting)],
        tsv_mode: bool,
    ) -> Result<Self> {
        if widths.len() != header.len() {
            bail!(
                "need one width per column, got {} widths for {} columns",
                widths.len(),
                header.len()
            )
        }
        Ok(Self {
            widths: widths.to_owned(),
            formattings: header.iter().map(|(_, f)| *f).collect(),
            titles: header.iter().map(|(title, _)| format!("{title} ")).collect(),
            tsv_mode,
        })
    }

    /// Widths fitting the titles and all `rows`.
    pub fn fitting_widths<'r>(
        header: &[(Cow<'static, str>, ColumnFormatting)],
        rows: impl IntoIterator<Item = &'r [(Cow<'r, str>, Highlight)]>,
    ) -> Vec<usize> {
        let mut widths: Vec<usize> = header.iter().map(|(t, _)| t.len() + 2).collect();
        for row in rows {
            for (width, (value, _)) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.len() + 2);
            }
        }
        widths
    }

    fn write_row(&self, row: &[(&str, Option<Style>)], out: &mut impl Write) -> Result<()> {
        if row.len() != self.widths.len() {
            bail!(
                "row has {} values, table has {} columns",
                row.len(),
                self.widths.len()
            )
        }
        let last = row.len() - 1;
        for (i, ((value, style), (width, formatting))) in row
            .iter()
            .zip(self.widths.iter().zip(&self.formattings))
            .enumerate()
        {
            if self.tsv_mode {
                if i > 0 {
                    out.write_all(b"\t")?;
                }
                out.write_all(value.as_bytes())?;
                continue;
            }
            let padding = width.saturating_sub(value.len()).max(1);
            let painted = match style {
                Some(style) => value.paint(*style).to_string(),
                None => value.to_string(),
            };
            match formatting {
                ColumnFormatting::Number => {
                    // right-adjusted, one space kept as separator
                    write!(out, "{}{painted} ", " ".repeat(padding - 1))?;
                }
                ColumnFormatting::String => {
                    out.write_all(painted.as_bytes())?;
                    if i < last {
                        out.write_all(" ".repeat(padding).as_bytes())?;
                    }
                }
            }
        }
        out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_title_row(&self, out: &mut impl Write) -> Result<()> {
        let style = if self.tsv_mode {
            None
        } else {
            Some(TITLE_STYLE)
        };
        let row: Vec<(&str, Option<Style>)> =
            self.titles.iter().map(|t| (t.as_str(), style)).collect();
        self.write_row(&row, out)
    }

    pub fn write_data_row(
        &self,
        data: &[(Cow<'_, str>, Highlight)],
        out: &mut impl Write,
    ) -> Result<()> {
        let row: Vec<(&str, Option<Style>)> = data
            .iter()
            .map(|(value, highlight)| {
                let style = match highlight {
                    Highlight::Best if !self.tsv_mode => Some(BEST_STYLE),
                    _ => None,
                };
                (value.as_ref(), style)
            })
            .collect();
        self.write_row(&row, out)
    }
}

/// Print the whole `table`, preceded by its name unless in TSV mode.
pub fn print_table(table: &dyn TableView, tsv_mode: bool, out: &mut impl Write) -> Result<()> {
    let header = table.table_view_header();
    let rows: Vec<_> = table.table_view_body().collect();
    let widths = TerminalTable::fitting_widths(&header, rows.iter().map(|r| r.as_slice()));
    let terminal_table = TerminalTable::new(&widths, &header, tsv_mode)?;
    if !tsv_mode {
        writeln!(out, "{}:", table.table_name().bold())?;
    }
    terminal_table.write_title_row(out)?;
    for row in &rows {
        terminal_table.write_data_row(row, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<(Cow<'static, str>, ColumnFormatting)> {
        vec![
            ("solver".into(), ColumnFormatting::String),
            ("rank".into(), ColumnFormatting::Number),
        ]
    }

    #[test]
    fn t_tsv() -> Result<()> {
        let table = TerminalTable::new(&[10, 6], &header(), true)?;
        let mut out = Vec::new();
        table.write_title_row(&mut out)?;
        table.write_data_row(
            &[("NSGA-II".into(), Highlight::Best), ("1".into(), Highlight::Best)],
            &mut out,
        )?;
        assert_eq!(String::from_utf8(out)?, "solver \trank \nNSGA-II\t1\n");
        Ok(())
    }

    #[test]
    fn t_padding() -> Result<()> {
        yansi::disable();
        let table = TerminalTable::new(&[10, 6], &header(), false)?;
        let mut out = Vec::new();
        table.write_data_row(
            &[("IHS".into(), Highlight::Neutral), ("12".into(), Highlight::Neutral)],
            &mut out,
        )?;
        assert_eq!(String::from_utf8(out)?, "IHS          12 \n");
        assert!(table
            .write_data_row(&[("IHS".into(), Highlight::Neutral)], &mut Vec::new())
            .is_err());
        Ok(())
    }

    #[test]
    fn t_fitting_widths() {
        let rows: Vec<Vec<(Cow<'_, str>, Highlight)>> = vec![vec![
            ("MOEA/D-DE".into(), Highlight::Neutral),
            ("3".into(), Highlight::Neutral),
        ]];
        let widths =
            TerminalTable::fitting_widths(&header(), rows.iter().map(|r| r.as_slice()));
        assert_eq!(widths, [11, 6]);
    }
}
