//! `plansmith materialize` command: create a repository from a plan file and
//! record the project.

use anyhow::{Context, Result};
use sqlx::PgPool;

use plansmith_core::plan::{
    ItemOutcome, MaterializeReport, MaterializeRequest, Plan, ServiceError, materialize_and_record,
};
use plansmith_core::tracker::{Credential, Tracker};

/// Environment variable holding the GitHub personal access token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Read a plan JSON file as produced by `plansmith generate`.
pub fn read_plan(path: &str) -> Result<Plan> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("cannot read plan file: {path}"))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid plan file: {path}"))
}

pub fn credential_from_env() -> Result<Credential> {
    let token = std::env::var(GITHUB_TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .with_context(|| format!("{GITHUB_TOKEN_ENV} is not set"))?;
    Ok(Credential::new(token.trim()))
}

pub async fn run_materialize(
    pool: &PgPool,
    tracker: &dyn Tracker,
    credential: &Credential,
    plan_path: &str,
    request: &MaterializeRequest,
) -> Result<()> {
    let plan = read_plan(plan_path)?;
    println!(
        "Materializing {} milestones and {} issues into {}...",
        plan.milestones.len(),
        plan.issue_count(),
        request.repo_name
    );

    let done = match materialize_and_record(pool, tracker, credential, request, &plan).await {
        Ok(done) => done,
        Err(err) => {
            if let ServiceError::Store { report, .. } = &err {
                print_report(report);
                println!();
            }
            return Err(err.into());
        }
    };

    print_report(&done.report);
    println!();
    println!(
        "Recorded project {} for {}.",
        done.project.id, done.project.username
    );
    Ok(())
}

fn print_report(report: &MaterializeReport) {
    println!("Repository: {}", report.repo_url);
    for milestone in &report.milestones {
        match &milestone.outcome {
            ItemOutcome::Created { number } => {
                println!("  [+] {} (milestone #{number})", milestone.title);
            }
            ItemOutcome::Failed { error } => {
                println!(
                    "  [!] {}: {error} ({} issues skipped)",
                    milestone.title, milestone.skipped_issues
                );
            }
        }
        for issue in &milestone.issues {
            match &issue.outcome {
                ItemOutcome::Created { number } => println!("      [+] {} (#{number})", issue.title),
                ItemOutcome::Failed { error } => println!("      [!] {}: {error}", issue.title),
            }
        }
    }
    println!(
        "Created {} milestones and {} issues; {} failed or skipped.",
        report.milestones_created(),
        report.issues_created(),
        report.failures()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_plan_parses_generated_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"summary":"s","milestones":[{"title":"MVP","description":"d","due_date":"2025-03-01","issues":[]}]}"#,
        )
        .unwrap();

        let plan = read_plan(path.to_str().unwrap()).unwrap();
        assert_eq!(plan.milestones[0].title, "MVP");
    }

    #[test]
    fn read_plan_rejects_milestone_without_issues() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"summary":"s","milestones":[{"title":"MVP","description":"d"}]}"#,
        )
        .unwrap();

        let err = read_plan(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid plan file"));
    }

    #[test]
    fn credential_requires_token() {
        let _lock = crate::test_util::lock_env();
        let saved = std::env::var(GITHUB_TOKEN_ENV).ok();

        unsafe { std::env::remove_var(GITHUB_TOKEN_ENV) };
        let missing = credential_from_env();
        unsafe { std::env::set_var(GITHUB_TOKEN_ENV, " ghp_abc \n") };
        let present = credential_from_env();

        match saved {
            Some(v) => unsafe { std::env::set_var(GITHUB_TOKEN_ENV, v) },
            None => unsafe { std::env::remove_var(GITHUB_TOKEN_ENV) },
        }

        assert!(missing.is_err());
        assert_eq!(present.unwrap().expose(), "ghp_abc");
    }
}
