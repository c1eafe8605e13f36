use crate::model::ProjectStatus;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// One line of `health` output
pub fn health_check(ok: bool, label: &str, detail: &str) {
    let icon = if ok { Icons::CHECK } else { Icons::CROSS };
    let style = if ok { theme().success.clone() } else { theme().error.clone() };
    println!("{} {} {}", icon, label.style(style), dim(detail));
}

/// Report a project status change and any team members it removed
pub fn status_change(project: &str, from: ProjectStatus, to: ProjectStatus, unassigned: usize) {
    println!(
        "{} {} {} {} {}",
        Icons::PROJECT,
        project.style(theme().header.clone()),
        from.as_str().style(theme().status(from)),
        Icons::RIGHT,
        to.as_str().style(theme().status(to))
    );
    if unassigned > 0 {
        println!(
            "  {} {}",
            Icons::TEAM,
            format!("{} team members unassigned", unassigned).style(theme().warn.clone())
        );
    }
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
