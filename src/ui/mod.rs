//! Terminal output for the CLI

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, phase, section, success, summary_row, warn};
pub use progress::Spinner;
pub use table::{failures_table, outcome_table, stats_table, summary_table, TableBuilder};
pub use theme::{theme, Theme};
