use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use codecrew_agent::agent::agent::AgentKind;
use codecrew_common::error::error::{Error, Result};

use crate::orchestrator::core::{Orchestrator, WorkflowRun};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum WorkflowKind {
    Standard,
    CodeOnly,
    ReviewOnly,
    DocsOnly,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::Standard,
        WorkflowKind::CodeOnly,
        WorkflowKind::ReviewOnly,
        WorkflowKind::DocsOnly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::Standard => "standard",
            WorkflowKind::CodeOnly => "code_only",
            WorkflowKind::ReviewOnly => "review_only",
            WorkflowKind::DocsOnly => "docs_only",
        }
    }

    pub fn from_name(name: &str) -> Option<WorkflowKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name.trim())
    }

    pub fn title(&self) -> &'static str {
        match self {
            WorkflowKind::Standard => "Standard process",
            WorkflowKind::CodeOnly => "Code only",
            WorkflowKind::ReviewOnly => "Review only",
            WorkflowKind::DocsOnly => "Documentation only",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkflowKind::Standard => {
                "Full development cycle: planning, architecture, code, review, tests, documentation"
            }
            WorkflowKind::CodeOnly => "Code generation: planning, architecture, code",
            WorkflowKind::ReviewOnly => "Review and test existing code",
            WorkflowKind::DocsOnly => "Write documentation for existing code",
        }
    }

    pub fn agents(&self) -> Vec<AgentKind> {
        match self {
            WorkflowKind::Standard => AgentKind::PIPELINE.to_vec(),
            WorkflowKind::CodeOnly => {
                vec![AgentKind::Planner, AgentKind::Architect, AgentKind::Coder]
            }
            WorkflowKind::ReviewOnly => vec![AgentKind::Reviewer, AgentKind::Tester],
            WorkflowKind::DocsOnly => vec![AgentKind::Documenter],
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub agents: Vec<String>,
}

/// Runs named agent pipelines against the orchestrator, swapping the
/// active-agent set in for the duration of the run and restoring it
/// afterwards.
pub struct WorkflowManager {
    orchestrator: Orchestrator,
}

impl WorkflowManager {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    pub async fn execute_workflow(&mut self, name: &str, user_input: &str) -> Result<WorkflowRun> {
        let kind = WorkflowKind::from_name(name)
            .ok_or_else(|| Error::UnknownWorkflow { name: name.to_string() })?;
        info!(workflow = kind.name(), "executing workflow");
        self.execute(kind.agents(), user_input).await
    }

    /// Caller-supplied agent sequence; unknown entries have been
    /// resolved by the caller, duplicates collapse into one activation.
    pub async fn execute_custom(
        &mut self,
        sequence: &[AgentKind],
        user_input: &str,
    ) -> Result<WorkflowRun> {
        self.execute(sequence.to_vec(), user_input).await
    }

    async fn execute(&mut self, agents: Vec<AgentKind>, user_input: &str) -> Result<WorkflowRun> {
        let original = self.orchestrator.active_agents_map().clone();

        let mut active: HashMap<AgentKind, bool> =
            AgentKind::PIPELINE.into_iter().map(|kind| (kind, false)).collect();
        for kind in agents {
            active.insert(kind, true);
        }
        self.orchestrator.configure_agents(active);

        let result = self.orchestrator.process_request(user_input).await;

        // Restore whatever was configured before, error or not.
        self.orchestrator.configure_agents(original);

        result
    }

    pub fn get_workflow_info() -> Vec<WorkflowInfo> {
        WorkflowKind::ALL
            .into_iter()
            .map(|kind| WorkflowInfo {
                name: kind.name().to_string(),
                title: kind.title().to_string(),
                description: kind.description().to_string(),
                agents: kind.agents().iter().map(|a| a.to_string()).collect(),
            })
            .collect()
    }
}
