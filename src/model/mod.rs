//! Domain model - one module per entity family
//!
//! Every enum maps to a `TEXT` column guarded by a `CHECK` constraint; the
//! strings returned by `as_str` are the literals stored in the database.

mod daily_report;
mod document;
mod message;
mod milestone;
mod notification;
mod organization;
mod project;
mod stats;
mod task;
mod user;

pub use daily_report::*;
pub use document::*;
pub use message::*;
pub use milestone::*;
pub use notification::*;
pub use organization::*;
pub use project::*;
pub use stats::*;
pub use task::*;
pub use user::*;
