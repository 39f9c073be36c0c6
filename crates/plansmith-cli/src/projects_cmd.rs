//! `plansmith projects` command: list the projects recorded for a user.

use anyhow::Result;
use sqlx::PgPool;

use plansmith_db::queries::projects;

pub async fn run_projects(pool: &PgPool, username: &str) -> Result<()> {
    let records = projects::list_projects_for_user(pool, username).await?;

    if records.is_empty() {
        println!("No projects found for {username}.");
        return Ok(());
    }

    println!("{:<38} {:<30} {:<20} LINK", "ID", "TITLE", "CREATED");
    println!("{}", "-".repeat(110));

    for record in &records {
        let title = if record.title.chars().count() > 28 {
            format!("{}...", record.title.chars().take(25).collect::<String>())
        } else {
            record.title.clone()
        };
        println!(
            "{:<38} {:<30} {:<20} {}",
            record.id,
            title,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.link
        );
    }

    Ok(())
}
