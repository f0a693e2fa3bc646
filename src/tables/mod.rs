//! Tabular data, and the files and terminal output made from it.
//!
//! [`table_view`](table_view.rs) defines the `TableViewRow` and
//! `TableView` traits that declare a tabular data representation,
//! independent of the output format.
//!
//! [`result_tables`](result_tables.rs): the computed tables (ranked
//! statistics, distributions, snapshot bands) as `TableView`s.
//!
//! [`csv_table`](csv_table.rs) and
//! [`terminal_table`](terminal_table.rs) write any `TableView` as CSV
//! file or to the terminal.
//!
//! [`long_table`](long_table.rs): the flat one-row-per-sample tables
//! that are the exchange format between collecting and evaluating;
//! these are read back, too, thus they don't go through `TableView`.

pub mod csv_table;
pub mod long_table;
pub mod result_tables;
pub mod table_view;
pub mod terminal_table;
