//! Sprint prioritization over a completed task's findings

use llm::TextGenerator;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::store::{TaskStatus, TaskStore};
use crate::{OrchestratorError, Result};

const PRIORITIZE_PROMPT: &str = r#"You are a senior product manager planning the next sprint.

We categorized user feedback into the TOON table at the end of this message.
Choose and schedule the work for the sprint.

INPUTS:
1. FRAMEWORK: {method}
   - MoSCoW: group tasks into Must Have, Should Have, Could Have and Won't Have.
   - Lean: group tasks into High Impact/Low Effort, High Impact/High Effort and Low Impact/Low Effort.
2. SPRINT LENGTH: {duration} days
3. BUDGET: {budget} developer hours
4. BUSINESS GOAL: "{goal}"

INSTRUCTIONS:
1. Read the table.
2. Pick the items that best serve the business goal under the {method} framework.
3. Estimate developer hours per task from its severity and complexity.
4. Keep the hours of the top category within the {budget} hour budget.

OUTPUT:
Reply with one raw JSON object and nothing else. No markdown fences, no commentary.
It must follow this schema:
{
  "plan_metadata": {
    "method": "{method}",
    "goal": "{goal}",
    "budget_hours": {budget},
    "sprint_duration_days": {duration}
  },
  "prioritized_categories": [
    {
      "category_name": "Must Have",
      "tasks": [
        {
          "title": "Task title",
          "type": "bug",
          "impact_reasoning": "Why this task was chosen",
          "estimated_hours": 8
        }
      ]
    }
  ],
  "summary": {
    "total_estimated_hours": 120,
    "budget_utilization_percentage": 75.0,
    "key_risks": ["risk one", "risk two"]
  }
}

TOON DATA:
{toon}"#;

pub const DEFAULT_METHOD: &str = "MoSCoW";
pub const MAX_DURATION_DAYS: u32 = 90;

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn default_duration_days() -> u32 {
    14
}

fn default_budget_hours() -> u32 {
    160
}

/// Request to plan a sprint from a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizeRequest {
    pub task_id: String,
    /// `MoSCoW` or `Lean`
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_duration_days", alias = "duration")]
    pub duration_days: u32,
    #[serde(default = "default_budget_hours", alias = "budget")]
    pub budget_hours: u32,
    pub business_goal: String,
}

impl PrioritizeRequest {
    pub fn new(task_id: impl Into<String>, business_goal: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            method: default_method(),
            duration_days: default_duration_days(),
            budget_hours: default_budget_hours(),
            business_goal: business_goal.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.task_id.trim().is_empty() {
            return Err(OrchestratorError::Configuration("task_id is required".into()));
        }
        if self.method.trim().is_empty() {
            return Err(OrchestratorError::Configuration("method is required".into()));
        }
        if !(1..=MAX_DURATION_DAYS).contains(&self.duration_days) {
            return Err(OrchestratorError::Configuration(format!(
                "duration_days must be between 1 and {}",
                MAX_DURATION_DAYS
            )));
        }
        if self.budget_hours < 1 {
            return Err(OrchestratorError::Configuration(
                "budget_hours must be at least 1".into(),
            ));
        }
        if self.business_goal.trim().is_empty() {
            return Err(OrchestratorError::Configuration(
                "business_goal is required".into(),
            ));
        }
        Ok(())
    }

    fn prompt(&self, toon: &str) -> String {
        let duration = self.duration_days.to_string();
        let budget = self.budget_hours.to_string();
        fill_placeholders(
            PRIORITIZE_PROMPT,
            &[
                ("method", self.method.as_str()),
                ("duration", duration.as_str()),
                ("budget", budget.as_str()),
                ("goal", self.business_goal.as_str()),
                ("toon", toon),
            ],
        )
    }
}

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Inserted values are never scanned again, and braces that do not name a
/// known placeholder are copied through.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let matched = values.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub budget_hours: f64,
    #[serde(default)]
    pub sprint_duration_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub impact_reasoning: String,
    #[serde(default)]
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCategory {
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    #[serde(default)]
    pub total_estimated_hours: f64,
    #[serde(default)]
    pub budget_utilization_percentage: f64,
    #[serde(default)]
    pub key_risks: Vec<String>,
}

/// Sprint plan returned by the prioritization call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritizationPlan {
    #[serde(default)]
    pub plan_metadata: PlanMetadata,
    #[serde(default)]
    pub prioritized_categories: Vec<PlanCategory>,
    #[serde(default)]
    pub summary: PlanSummary,
}

/// Pull a JSON object out of a model reply.
///
/// Control characters other than `\n`, `\r` and `\t` are removed, a fenced
/// block is unwrapped if present, and the text is then narrowed to the span
/// from the first `{` to the last `}`.
pub fn clean_json_response(reply: &str) -> String {
    let mut text: String = reply
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    if let Some(body) = fenced_body(&text) {
        text = body;
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            text = text[start..=end].to_string();
        }
    }
    text.trim().to_string()
}

fn fenced_body(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").ok()?;
    let body = re.captures(text)?.get(1)?.as_str();
    Some(body.to_string())
}

/// Plan a sprint from the table text of a completed task.
///
/// # Errors
///
/// `TaskNotFound`, `TaskNotCompleted` or `MissingResultText` when the task
/// cannot be used, `Generation` when the call fails, and `Parse` when the
/// reply is not a plan.
pub async fn prioritize(
    store: &TaskStore,
    generator: &dyn TextGenerator,
    request: &PrioritizeRequest,
) -> Result<PrioritizationPlan> {
    request.validate()?;

    let record = store.get(&request.task_id).await?;
    if record.status != TaskStatus::Completed {
        return Err(OrchestratorError::TaskNotCompleted {
            task_id: request.task_id.clone(),
            status: record.status.to_string(),
        });
    }
    let toon = record
        .result
        .as_ref()
        .map(|r| r.toon_text.trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OrchestratorError::MissingResultText(request.task_id.clone()))?;

    info!(
        task_id = %request.task_id,
        method = %request.method,
        budget_hours = request.budget_hours,
        "Starting prioritization"
    );

    let reply = generator.generate(&request.prompt(toon)).await?;
    if reply.trim().is_empty() {
        return Err(OrchestratorError::Generation("empty reply".into()));
    }

    let cleaned = clean_json_response(&reply);
    serde_json::from_str::<PrioritizationPlan>(&cleaned).map_err(|e| {
        let preview: String = cleaned.chars().take(200).collect();
        error!(task_id = %request.task_id, error = %e, preview = %preview, "Unreadable plan");
        OrchestratorError::Parse(format!("plan is not valid JSON: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_object() {
        assert_eq!(clean_json_response("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_fenced_block() {
        let reply = "Sure!\n```json\n{\"a\": {\"b\": 2}}\n```\nHope this helps.";
        assert_eq!(clean_json_response(reply), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_clean_surrounding_prose_and_control_chars() {
        let reply = "Plan follows: {\"a\":\u{0007} 1}\u{0000} done";
        assert_eq!(clean_json_response(reply), "{\"a\": 1}");
        assert_eq!(clean_json_response("no json here"), "no json here");
    }

    #[test]
    fn test_plan_defaults() {
        let plan: PrioritizationPlan = serde_json::from_str(
            r#"{"prioritized_categories":[{"category_name":"Must Have","tasks":[{"title":"Fix crash","type":"bug","estimated_hours":12}]}]}"#,
        )
        .unwrap();
        assert_eq!(plan.prioritized_categories[0].tasks[0].task_type, "bug");
        assert_eq!(plan.prioritized_categories[0].tasks[0].estimated_hours, 12.0);
        assert_eq!(plan.summary, PlanSummary::default());
    }

    #[test]
    fn test_request_defaults_and_aliases() {
        let req: PrioritizeRequest = serde_json::from_str(
            r#"{"task_id":"t1","business_goal":"Retention","duration":30,"budget":80}"#,
        )
        .unwrap();
        assert_eq!(req.method, "MoSCoW");
        assert_eq!(req.duration_days, 30);
        assert_eq!(req.budget_hours, 80);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let mut req = PrioritizeRequest::new("t1", "Retention");
        req.duration_days = 91;
        assert!(req.validate().is_err());
        req.duration_days = 1;
        req.budget_hours = 0;
        assert!(req.validate().is_err());
        req.budget_hours = 1;
        req.business_goal = " ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_prompt_embeds_inputs() {
        let req = PrioritizeRequest::new("t1", "Grow revenue");
        let prompt = req.prompt("type | category | title\nbug | ui | x");
        assert!(prompt.contains("FRAMEWORK: MoSCoW"));
        assert!(prompt.contains("\"budget_hours\": 160"));
        assert!(prompt.contains("\"goal\": \"Grow revenue\""));
        assert!(prompt.ends_with("bug | ui | x"));
    }

    #[test]
    fn test_prompt_inputs_are_not_substituted_again() {
        let mut req = PrioritizeRequest::new("t1", "Ship {toon} before {budget}");
        req.method = "Lean {goal}".into();
        let prompt = req.prompt("bug | ui | x");

        assert!(prompt.contains("FRAMEWORK: Lean {goal}"));
        assert!(prompt.contains("\"goal\": \"Ship {toon} before {budget}\""));
        assert_eq!(prompt.matches("bug | ui | x").count(), 1);
    }

    #[test]
    fn test_fill_placeholders_keeps_unknown_braces() {
        let filled = fill_placeholders("{\"a\": {x}, \"b\": {y}}", &[("x", "1")]);
        assert_eq!(filled, "{\"a\": 1, \"b\": {y}}");
    }
}
