use serde::{Deserialize, Serialize};

use codecrew_common::error::error::Result;

use crate::agent::architect_agent::ArchitectAgent;
use crate::agent::coder_agent::CoderAgent;
use crate::agent::documenter_agent::DocumenterAgent;
use crate::agent::planner_agent::PlannerAgent;
use crate::agent::reviewer_agent::ReviewerAgent;
use crate::agent::tester_agent::TesterAgent;
use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
pub enum AgentKind {
    Planner,
    Architect,
    Coder,
    Reviewer,
    Tester,
    Documenter,
}

impl AgentKind {
    /// Canonical execution order of the full pipeline.
    pub const PIPELINE: [AgentKind; 6] = [
        AgentKind::Planner,
        AgentKind::Architect,
        AgentKind::Coder,
        AgentKind::Reviewer,
        AgentKind::Tester,
        AgentKind::Documenter,
    ];

    pub fn from_name(name: &str) -> Option<AgentKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "planner" => Some(AgentKind::Planner),
            "architect" => Some(AgentKind::Architect),
            "coder" => Some(AgentKind::Coder),
            "reviewer" => Some(AgentKind::Reviewer),
            "tester" => Some(AgentKind::Tester),
            "documenter" => Some(AgentKind::Documenter),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Planner => "analyses the task and produces an execution plan",
            AgentKind::Architect => "designs the component architecture",
            AgentKind::Coder => "writes the code for the designed architecture",
            AgentKind::Reviewer => "reviews the code and reports problems",
            AgentKind::Tester => "writes tests for the code",
            AgentKind::Documenter => "writes the documentation",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Agent {
    Planner(PlannerAgent),
    Architect(ArchitectAgent),
    Coder(CoderAgent),
    Reviewer(ReviewerAgent),
    Tester(TesterAgent),
    Documenter(DocumenterAgent),
}

impl Agent {
    pub fn kind(&self) -> AgentKind {
        match self {
            Agent::Planner(_) => AgentKind::Planner,
            Agent::Architect(_) => AgentKind::Architect,
            Agent::Coder(_) => AgentKind::Coder,
            Agent::Reviewer(_) => AgentKind::Reviewer,
            Agent::Tester(_) => AgentKind::Tester,
            Agent::Documenter(_) => AgentKind::Documenter,
        }
    }

    pub fn llm(&self) -> &LLM {
        match self {
            Agent::Planner(a) => a.llm(),
            Agent::Architect(a) => a.llm(),
            Agent::Coder(a) => a.llm(),
            Agent::Reviewer(a) => a.llm(),
            Agent::Tester(a) => a.llm(),
            Agent::Documenter(a) => a.llm(),
        }
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        match self {
            Agent::Planner(a) => a.process(input, context).await,
            Agent::Architect(a) => a.process(input, context).await,
            Agent::Coder(a) => a.process(input, context).await,
            Agent::Reviewer(a) => a.process(input, context).await,
            Agent::Tester(a) => a.process(input, context).await,
            Agent::Documenter(a) => a.process(input, context).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(AgentKind::Planner.to_string(), "Planner");
        assert_eq!(AgentKind::Documenter.as_ref(), "Documenter");
        assert_eq!(AgentKind::from_name("reviewer"), Some(AgentKind::Reviewer));
        assert_eq!(AgentKind::from_name(" CODER "), Some(AgentKind::Coder));
        assert_eq!(AgentKind::from_name("manager"), None);
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(AgentKind::PIPELINE[0], AgentKind::Planner);
        assert_eq!(AgentKind::PIPELINE[5], AgentKind::Documenter);
        assert_eq!(AgentKind::PIPELINE.len(), 6);
    }
}
