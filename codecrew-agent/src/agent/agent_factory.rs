use codecrew_common::config::config::Config;

use crate::agent::agent::{Agent, AgentKind};
use crate::agent::architect_agent::ArchitectAgent;
use crate::agent::coder_agent::CoderAgent;
use crate::agent::documenter_agent::DocumenterAgent;
use crate::agent::planner_agent::PlannerAgent;
use crate::agent::reviewer_agent::ReviewerAgent;
use crate::agent::tester_agent::TesterAgent;
use crate::llm::llm_factory::LLM;

pub struct AgentFactory {
    config: Config,
}

impl AgentFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn agent(&self, kind: AgentKind, llm: LLM) -> Agent {
        match kind {
            AgentKind::Planner => Agent::Planner(PlannerAgent::new(llm)),
            AgentKind::Architect => Agent::Architect(ArchitectAgent::new(llm)),
            AgentKind::Coder => Agent::Coder(CoderAgent::new(llm)),
            AgentKind::Reviewer => Agent::Reviewer(ReviewerAgent::new(llm)),
            AgentKind::Tester => Agent::Tester(TesterAgent::new(llm)),
            AgentKind::Documenter => Agent::Documenter(DocumenterAgent::new(llm)),
        }
    }

    /// Whether the runtime config enables this role at all.
    pub fn enabled(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Planner => self.config.agents.planner,
            AgentKind::Architect => self.config.agents.architect,
            AgentKind::Coder => self.config.agents.coder,
            AgentKind::Reviewer => self.config.agents.reviewer,
            AgentKind::Tester => self.config.agents.tester,
            AgentKind::Documenter => self.config.agents.documenter,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::llm::static_llm::StaticLLM;

    #[test]
    fn test_builds_every_role() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        let factory = AgentFactory::new(config);

        for kind in AgentKind::PIPELINE {
            let agent = factory.agent(kind, LLM::StaticLLM(StaticLLM::new("x")));
            assert_eq!(agent.kind(), kind);
            assert!(factory.enabled(kind));
        }
    }

    #[test]
    fn test_respects_toggles() {
        let vars: HashMap<String, String> =
            [("ENABLE_TESTER".to_string(), "false".to_string())].into_iter().collect();
        let factory = AgentFactory::new(Config::from_vars(&vars).unwrap());

        assert!(!factory.enabled(AgentKind::Tester));
        assert!(factory.enabled(AgentKind::Coder));
    }
}
