pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, health_check, status, status_change, success, summary_row, warn};
pub use table::TableBuilder;
pub use theme::{theme, Theme};
