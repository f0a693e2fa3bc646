//! A representation of tables (and individual rows) as title row and
//! body rows of strings and formatting instructions, independent of
//! serialisation format.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Highlight {
    /// No special formatting
    Neutral,
    /// The best value of its partition (rank 1)
    Best,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnFormatting {
    /// Values are numbers: right-adjusted on the terminal
    Number,
    /// Values are strings, left-adjusted
    String,
}

pub type TableHeader = Vec<(Cow<'static, str>, ColumnFormatting)>;

pub trait TableViewRow<Context> {
    /// Column names and formatting. Static because it needs to be
    /// available for tables in the absense of rows, but takes a
    /// context argument for columns that depend on the table (which
    /// could be ()).
    fn table_view_header(ctx: Context) -> TableHeader;

    /// Write the given row to `out`, matching the columns in the
    /// header. Do *not* clear out inside this method!
    fn table_view_row<'s>(&'s self, out: &mut Vec<(Cow<'s, str>, Highlight)>);
}

/// A full table. dyn compatible.
pub trait TableView {
    /// Used as file name stem.
    fn table_name(&self) -> Cow<'_, str>;

    fn table_view_header(&self) -> TableHeader;

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Vec<(Cow<'s, str>, Highlight)>> + 's>;
}

/// Format a float for tables: the shortest representation that
/// parses back to the same value.
pub fn format_float(x: f64) -> Cow<'static, str> {
    Cow::Owned(x.to_string())
}
