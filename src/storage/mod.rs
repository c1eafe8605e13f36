//! Storage Layer - SQLite-backed persistence
//!
//! System of record is one SQLite database. `Store` owns the connection;
//! each entity family adds its operations in its own module:
//! - organizations, users
//! - projects (status machine), team, visibility
//! - milestones, tasks (with comments)
//! - messages, notifications
//! - reports (daily reports, modules, hour entries)
//! - documents (versions, permissions)
//! - stats (dashboards, project, user and organization reports)

pub mod schema;
pub mod sqlite;

mod documents;
mod messages;
mod milestones;
mod notifications;
mod organizations;
mod projects;
mod reports;
mod stats;
mod tasks;
mod team;
mod users;
mod visibility;


pub use sqlite::{DbStats, HealthReport, Store};
