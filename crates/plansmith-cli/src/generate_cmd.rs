//! `plansmith generate` command: ask the model for a plan and print it.

use anyhow::{Context, Result};

use plansmith_core::llm::ToolCaller;
use plansmith_core::plan::{GenerationRequest, generate_plan};

/// Generate a plan and write it as pretty JSON to `output`, or stdout.
///
/// The file is meant to be reviewed or edited, then fed to
/// `plansmith materialize`.
pub async fn run_generate(
    model: &dyn ToolCaller,
    request: &GenerationRequest,
    output: Option<&str>,
) -> Result<()> {
    let plan = generate_plan(model, request)
        .await
        .context("plan generation failed")?;
    let json = serde_json::to_string_pretty(&plan)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("cannot write plan file: {path}"))?;
            println!(
                "Plan with {} milestones and {} issues written to {path}",
                plan.milestones.len(),
                plan.issue_count()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
