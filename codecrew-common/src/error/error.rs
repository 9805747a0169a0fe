use serde::Serialize;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, Serialize, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
    // Config
    ConfigError { key: String, message: String },

    // Provider
    ProviderNotConfigured { provider: String },
    ProviderTransportError { provider: String, message: String },
    ProviderStatusError { provider: String, status: u16, message: String },
    ProviderDecodeError { provider: String, message: String },
    UnknownProvider { name: String },

    // Agent
    AgentError { agent: String, message: String },
    AgentDisabled { agent: String },
    UnknownAgent { name: String },

    // Orchestrator
    EmptyInput,
    NoActiveAgents,
    UnknownWorkflow { name: String },

    // Context
    StorageError { message: String },

    // Bootstrap
    BootstrapError { step: String, message: String },
    ProjectError { message: String },
}

// region:    --- Error Boilerplate
impl core::fmt::Display for Error {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
// endregion: --- Error Boilerplate

impl Error {
    pub fn storage(err: impl core::fmt::Display) -> Self {
        Error::StorageError { message: err.to_string() }
    }

    pub fn agent(agent: impl Into<String>, err: impl core::fmt::Display) -> Self {
        Error::AgentError { agent: agent.into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_name() {
        let err = Error::ProviderNotConfigured { provider: "claude".to_string() };
        assert_eq!(err.as_ref(), "ProviderNotConfigured");
    }

    #[test]
    fn test_serialize_tagged() {
        let err = Error::ProviderStatusError {
            provider: "gpt".to_string(),
            status: 429,
            message: "rate limited".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "ProviderStatusError");
        assert_eq!(json["data"]["status"], 429);
    }
}
