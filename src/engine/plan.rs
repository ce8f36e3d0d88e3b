//! Dry-run plans
//!
//! Describes what a workflow would do with a given payload without touching
//! a session. Templates are rendered with the payload values; placeholders
//! that only get a value mid-run (captures) are shown as written.

use serde::Serialize;

use crate::workflow::template::{compose, render, TemplateVars};
use crate::workflow::{Action, FailurePolicy, Payload, ScriptArg, Workflow, WorkflowStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub step_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<String>,
    pub on_failure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<PlannedStep>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub platform: String,
    pub post: String,
    pub steps: Vec<PlannedStep>,
    pub success: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Plan `workflow` for `payload`
pub fn plan(workflow: &Workflow, payload: &Payload) -> Plan {
    let mut vars = payload.vars();
    let post = compose(&workflow.post_template, &vars, &workflow.compose)
        .unwrap_or_else(|_| workflow.post_template.clone());
    vars.insert("post".to_string(), post.clone());

    Plan {
        platform: workflow.name.clone(),
        post,
        steps: workflow
            .steps
            .iter()
            .map(|step| plan_step(workflow, step, &vars))
            .collect(),
        success: workflow.success.describe(),
        result: workflow.result.as_ref().map(|r| {
            let mut rule = format!("{:?}", r.from);
            if let Some(pattern) = &r.pattern {
                rule.push_str(&format!(" =~ /{}/", pattern));
            }
            if let Some(format) = &r.format {
                rule.push_str(&format!(" -> {}", format));
            }
            rule
        }),
    }
}

fn plan_step(workflow: &Workflow, step: &WorkflowStep, vars: &TemplateVars) -> PlannedStep {
    let element = step
        .element_locator()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "<no element>".to_string());

    let action = step.action.as_ref().map(|action| match action {
        Action::Navigate { url } => format!("navigate to {}", shown(url, vars)),
        Action::Click => format!("click {}", element),
        Action::TypeText { text, clear } => format!(
            "{}type {:?} into {}",
            if *clear { "clear and " } else { "" },
            shown(text, vars),
            element
        ),
        Action::ComposeText { template } => {
            let text = match template {
                Some(t) => compose(t, vars, &workflow.compose).unwrap_or_else(|_| t.clone()),
                None => vars.get("post").cloned().unwrap_or_default(),
            };
            format!("type {:?} into {}", text, element)
        }
        Action::UploadFile { path } => {
            let path = match path {
                Some(p) => shown(p, vars),
                None => vars.get("file").cloned().unwrap_or_default(),
            };
            format!("set file {} on {}", path, element)
        }
        Action::RunScript { script, args } => {
            let args: Vec<String> = args
                .iter()
                .map(|arg| match arg {
                    ScriptArg::Element => element.clone(),
                    ScriptArg::Text(t) => format!("{:?}", shown(t, vars)),
                })
                .collect();
            format!("run script {:?} with [{}]", script, args.join(", "))
        }
        Action::Capture { name, .. } => format!("capture {{{}}}", name),
    });

    let on_failure = match &step.on_failure {
        FailurePolicy::Abort => "abort".to_string(),
        FailurePolicy::ContinueDegraded => "continue".to_string(),
        FailurePolicy::Retry(policy) => format!(
            "retry up to {} time(s), starting after {:?}",
            policy.max_retries, policy.backoff
        ),
        FailurePolicy::Fallback(_) => "fallback".to_string(),
    };

    PlannedStep {
        step_id: step.id.clone(),
        wait: step.wait.as_ref().map(|w| w.describe()),
        action,
        verify: step.verify.as_ref().map(|v| v.describe()),
        on_failure,
        fallback: step
            .fallback()
            .map(|alt| Box::new(plan_step(workflow, alt, vars))),
    }
}

fn shown(template: &str, vars: &TemplateVars) -> String {
    render(template, vars).unwrap_or_else(|_| template.to_string())
}
