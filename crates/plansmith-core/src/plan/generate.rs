//! Plan generation: prompt construction, the output schema, and parsing of
//! the model's forced tool call into a [`Plan`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::llm::{ChatMessage, LlmError, ToolCallRequest, ToolCaller, ToolDefinition};

use super::Plan;

/// Name of the single tool the model is forced to call.
pub const PLAN_TOOL_NAME: &str = "generate_project_summary";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parameters describing the project to plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    pub features: String,
    /// Expected duration in weeks, as the user phrased it.
    pub duration: String,
    pub hours_per_day: u32,
    #[serde(default)]
    pub tech_stack: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("model answered without calling generate_project_summary")]
    NoToolCall,

    #[error("model called unexpected tool {actual:?} (expected \"generate_project_summary\")")]
    UnexpectedTool { actual: String },

    #[error("model output does not match the plan schema: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error("generated plan contains no milestones")]
    NoMilestones,
}

// ---------------------------------------------------------------------------
// Prompt and schema
// ---------------------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are an AI product manager. Generate a project summary, \
milestones, and issues with step-by-step instructions.";

fn user_prompt(request: &GenerationRequest) -> String {
    let tech_stack = request
        .tech_stack
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No preference");

    format!(
        "### Project Description:\n{}\n\n\
         ### Features:\n{}\n\n\
         ### Expected Project Duration (in weeks):\n{}\n\n\
         ### Number of Hours Per Day the User Will Work:\n{}\n\n\
         ### Tech Stack (optional):\n{}\n",
        request.description.trim(),
        request.features.trim(),
        request.duration.trim(),
        request.hours_per_day,
        tech_stack,
    )
}

/// JSON Schema for the plan tool's arguments.
pub fn plan_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["summary", "milestones"],
        "properties": {
            "summary": {
                "type": "string",
                "description": "Summary of the user's project description and features"
            },
            "milestones": {
                "type": "array",
                "minItems": 1,
                "description": "List of GitHub milestones with their issues",
                "items": {
                    "type": "object",
                    "required": ["title", "description", "due_date", "issues"],
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Title of the milestone"
                        },
                        "description": {
                            "type": "string",
                            "description": "Brief description of the milestone"
                        },
                        "due_date": {
                            "type": "string",
                            "description": "Estimated due date (YYYY-MM-DD)"
                        },
                        "issues": {
                            "type": "array",
                            "description": "List of GitHub issues under this milestone",
                            "items": {
                                "type": "object",
                                "required": ["title", "description"],
                                "properties": {
                                    "title": {
                                        "type": "string",
                                        "description": "Title of the issue/task"
                                    },
                                    "description": {
                                        "type": "string",
                                        "description": "Step-by-step instructions on how to complete this issue"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Build the model request for `request`: system prompt, user prompt, and
/// the plan tool.
pub fn build_tool_request(request: &GenerationRequest) -> ToolCallRequest {
    ToolCallRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(request)),
        ],
        tool: ToolDefinition {
            name: PLAN_TOOL_NAME.to_string(),
            description: "Takes project details and generates a summary, milestones, and \
                          detailed issues with step-by-step instructions."
                .to_string(),
            parameters: plan_schema(),
        },
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Ask the model for a plan and parse its tool call.
///
/// The first tool call must be [`PLAN_TOOL_NAME`] and its arguments must
/// deserialize into a [`Plan`] with at least one milestone. There is no
/// retry: any deviation is returned as a [`GenerateError`].
pub async fn generate_plan(
    model: &dyn ToolCaller,
    request: &GenerationRequest,
) -> Result<Plan, GenerateError> {
    let calls = model.call_tool(&build_tool_request(request)).await?;
    let call = calls.into_iter().next().ok_or(GenerateError::NoToolCall)?;

    if call.name != PLAN_TOOL_NAME {
        return Err(GenerateError::UnexpectedTool { actual: call.name });
    }

    let plan = parse_plan_arguments(&call.arguments)?;
    info!(
        milestones = plan.milestones.len(),
        issues = plan.issue_count(),
        "plan generated"
    );
    Ok(plan)
}

/// Parse the raw tool-call arguments into a [`Plan`].
pub fn parse_plan_arguments(arguments: &str) -> Result<Plan, GenerateError> {
    let plan: Plan = serde_json::from_str(arguments).map_err(GenerateError::InvalidArguments)?;
    if plan.milestones.is_empty() {
        return Err(GenerateError::NoMilestones);
    }
    Ok(plan)
}
