//! Demo organization for first runs
//!
//! Loaded by `workboard seed`, or by `init` when `create_demo_data` is set.
//! Nothing is written unless the database has no organizations yet.

use crate::model::*;
use crate::{Result, Store};
use chrono::NaiveDate;

/// What `seed_demo_data` created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub organization_id: i64,
    pub users: usize,
    pub projects: usize,
    pub tasks: usize,
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Seed the demo organization. Returns `None` when data already exists.
pub fn seed_demo_data(store: &mut Store) -> Result<Option<SeedSummary>> {
    if !store.list_organizations()?.is_empty() {
        tracing::debug!("Skipping demo data: organizations already present");
        return Ok(None);
    }

    let mut org = NewOrganization::named("Demo Organization");
    org.description = Some("Demo organization for Workboard".into());
    let org = store.create_organization(&org)?.id;

    let admin = store
        .create_user(&NewUser::new(org, "Admin User", "admin@demo.com", UserRole::Admin))?
        .id;
    let manager = store
        .create_user(&NewUser::new(org, "Manager User", "manager@demo.com", UserRole::Manager))?
        .id;
    let member = store
        .create_user(&NewUser::new(org, "Member User", "member@demo.com", UserRole::Member))?
        .id;

    let mut shop = NewProject::new(org, "E-Commerce Platform", admin);
    shop.description = Some("Build a comprehensive e-commerce platform".into());
    shop.status = ProjectStatus::Active;
    shop.start_date = date(2025, 1, 1);
    shop.end_date = date(2025, 6, 30);
    shop.assigned_manager_id = Some(manager);
    let shop = store.create_project(&shop)?.id;

    let mut mobile = NewProject::new(org, "Mobile App Development", manager);
    mobile.description = Some("Create mobile applications for iOS and Android".into());
    mobile.start_date = date(2025, 2, 1);
    mobile.end_date = date(2025, 8, 31);
    store.create_project(&mobile)?;

    store.add_project_member(shop, manager, ProjectRole::Manager)?;
    store.add_project_member(shop, member, ProjectRole::Member)?;

    let mut design = NewMilestone::new(shop, "Design Phase", admin);
    design.description = Some("Complete UI/UX design".into());
    design.due_date = date(2025, 3, 1);
    design.status = MilestoneStatus::InProgress;
    let design = store.create_milestone(&design)?.id;

    let tasks = [
        (
            Some(design),
            "Create wireframes",
            "Design initial wireframes for all pages",
            TaskStatus::InProgress,
            TaskPriority::High,
            manager,
            date(2025, 2, 15),
        ),
        (
            Some(design),
            "Design homepage",
            "Create homepage design mockup",
            TaskStatus::Pending,
            TaskPriority::Medium,
            member,
            date(2025, 2, 20),
        ),
        (
            None,
            "Setup development environment",
            "Configure development tools and environment",
            TaskStatus::Completed,
            TaskPriority::Low,
            manager,
            date(2025, 1, 15),
        ),
    ];
    let task_count = tasks.len();
    for (milestone, title, description, status, priority, assignee, due) in tasks {
        let mut task = NewTask::new(shop, title, admin);
        task.milestone_id = milestone;
        task.description = Some(description.into());
        task.status = status;
        task.priority = priority;
        task.assigned_to = Some(assignee);
        task.due_date = due;
        store.create_task(&task)?;
    }

    store.send_message(&NewMessage {
        sender_id: admin,
        recipient_id: manager,
        project_id: Some(shop),
        subject: "Project Update".into(),
        content: "Please update the project status when you complete the wireframes.".into(),
    })?;

    tracing::info!("Seeded demo organization {}", org);
    Ok(Some(SeedSummary {
        organization_id: org,
        users: 3,
        projects: 2,
        tasks: task_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_once() {
        let mut store = Store::open_in_memory().unwrap();
        let summary = seed_demo_data(&mut store).unwrap().unwrap();
        assert_eq!(summary.tasks, 3);

        let stats = store.stats().unwrap();
        assert_eq!(stats.get("users"), Some(3));
        assert_eq!(stats.get("projects"), Some(2));
        assert_eq!(stats.get("project_members"), Some(2));
        assert_eq!(stats.get("messages"), Some(1));

        assert_eq!(seed_demo_data(&mut store).unwrap(), None);
        assert_eq!(store.stats().unwrap().get("users"), Some(3));
    }

    #[test]
    fn test_seeded_completed_task_has_completion_date() {
        let mut store = Store::open_in_memory().unwrap();
        let summary = seed_demo_data(&mut store).unwrap().unwrap();
        let project = store.list_organization_projects(summary.organization_id).unwrap();
        let shop = project
            .iter()
            .find(|p| p.name == "E-Commerce Platform")
            .unwrap();
        let tasks = store.list_project_tasks(shop.id).unwrap();
        let setup = tasks
            .iter()
            .find(|t| t.status == TaskStatus::Completed)
            .unwrap();
        assert!(setup.completion_date.is_some());
        assert!(setup.milestone_id.is_none());
    }
}
