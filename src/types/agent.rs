use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key of a specialist agent in the fixed catalog.
///
/// The selected agent labels the conversation and picks the canned stub
/// answer; it does not change backend routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKey {
    /// General purpose assistant.
    #[default]
    General,

    /// Human resources and Chilean labour law.
    Hr,

    /// Legal compliance.
    Legal,

    /// Technical support and development.
    Technical,

    /// Training and professional development.
    Training,
}

impl AgentKey {
    /// Every key, in catalog order.
    pub const ALL: [AgentKey; 5] = [
        AgentKey::General,
        AgentKey::Hr,
        AgentKey::Legal,
        AgentKey::Technical,
        AgentKey::Training,
    ];

    /// The wire/storage representation of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKey::General => "general",
            AgentKey::Hr => "hr",
            AgentKey::Legal => "legal",
            AgentKey::Technical => "technical",
            AgentKey::Training => "training",
        }
    }

    /// The catalog entry for this key.
    pub fn agent(&self) -> &'static Agent {
        &AGENTS[*self as usize]
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        AgentKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == lowered)
            .ok_or_else(|| {
                format!(
                    "Unknown agent: {s}. Valid options: general, hr, legal, technical, training"
                )
            })
    }
}

/// A static catalog entry describing a specialist persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    /// Key used for selection and storage.
    pub key: AgentKey,
    /// Label shown next to the agent's messages.
    pub display_name: &'static str,
    /// Model the persona is configured for.
    pub model: &'static str,
    /// System prompt describing the persona.
    pub system_prompt: &'static str,
}

impl Agent {
    /// Looks up a catalog entry by its exact stored key.
    ///
    /// Unlike parsing an [`AgentKey`], this does not fold case or trim.
    pub fn lookup(key: &str) -> Option<&'static Agent> {
        AGENTS.iter().find(|agent| agent.key.as_str() == key)
    }
}

/// The fixed agent catalog, indexed by [`AgentKey`] discriminant.
pub static AGENTS: [Agent; 5] = [
    Agent {
        key: AgentKey::General,
        display_name: "General Assistant",
        model: "gpt-4",
        system_prompt: "Eres un asistente general útil.",
    },
    Agent {
        key: AgentKey::Hr,
        display_name: "HR Specialist",
        model: "gpt-4",
        system_prompt: "Eres un experto en recursos humanos y legislación laboral chilena.",
    },
    Agent {
        key: AgentKey::Legal,
        display_name: "Legal Compliance",
        model: "gpt-4",
        system_prompt: "Eres un experto en cumplimiento legal y normativas.",
    },
    Agent {
        key: AgentKey::Technical,
        display_name: "Technical Support",
        model: "gpt-4",
        system_prompt: "Eres un experto técnico en soporte y desarrollo.",
    },
    Agent {
        key: AgentKey::Training,
        display_name: "Training Expert",
        model: "gpt-4",
        system_prompt: "Eres un experto en capacitación y desarrollo profesional.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_indexed_by_key() {
        for key in AgentKey::ALL {
            assert_eq!(key.agent().key, key);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HR".parse::<AgentKey>(), Ok(AgentKey::Hr));
        assert_eq!(" technical ".parse::<AgentKey>(), Ok(AgentKey::Technical));
        assert!("finance".parse::<AgentKey>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&AgentKey::Training).unwrap();
        assert_eq!(json, r#""training""#);
        let key: AgentKey = serde_json::from_str(r#""legal""#).unwrap();
        assert_eq!(key, AgentKey::Legal);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(
            Agent::lookup("hr").map(|a| a.display_name),
            Some("HR Specialist")
        );
        assert!(Agent::lookup("rag").is_none());
        assert!(Agent::lookup("HR").is_none());
        assert!(Agent::lookup(" hr").is_none());
    }
}
