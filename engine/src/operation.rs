//! Operation vocabulary and tool-name resolution.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;
use crate::stack::FrameId;

/// A request delivered by the tool-invocation transport.
///
/// `Other` never carries a gated tool name: deserialization and
/// [`Operation::other`] map those names onto their own variant, and the
/// engine resolves a hand-built `Other { tool: "fly" }` through
/// [`Operation::canonical`] before gating.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Flight-config entry marker. Never deniable.
    StartFlight {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<String>,
    },
    /// Flight-config exit for a specific frame.
    ExitFlight { frame: FrameId },
    Check,
    Orient,
    StartStarlog,
    Fly,
    UpdateDebugDiary,
    EndStarlog,
    /// Any other tool; only permitted once the session is unlocked.
    Other { tool: String },
}

/// Wire shape of [`Operation`], before `Other` names are resolved.
#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireOperation {
    StartFlight {
        #[serde(default)]
        config: Option<String>,
    },
    ExitFlight {
        frame: FrameId,
    },
    Check,
    Orient,
    StartStarlog,
    Fly,
    UpdateDebugDiary,
    EndStarlog,
    Other {
        tool: String,
    },
}

impl From<WireOperation> for Operation {
    fn from(wire: WireOperation) -> Self {
        match wire {
            WireOperation::StartFlight { config } => Self::StartFlight { config },
            WireOperation::ExitFlight { frame } => Self::ExitFlight { frame },
            WireOperation::Check => Self::Check,
            WireOperation::Orient => Self::Orient,
            WireOperation::StartStarlog => Self::StartStarlog,
            WireOperation::Fly => Self::Fly,
            WireOperation::UpdateDebugDiary => Self::UpdateDebugDiary,
            WireOperation::EndStarlog => Self::EndStarlog,
            WireOperation::Other { tool } => Self::other(tool),
        }
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        WireOperation::deserialize(deserializer).map(Self::from)
    }
}

impl Operation {
    /// An opaque tool call. Gated names resolve to their own variant.
    pub fn other(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self::from_gated_name(&tool).unwrap_or(Self::Other { tool })
    }

    /// The operation the gates should see: an `Other` holding a gated name
    /// becomes that gated operation.
    pub fn canonical(&self) -> Cow<'_, Self> {
        match self {
            Self::Other { tool } => match Self::from_gated_name(tool) {
                Some(gated) => Cow::Owned(gated),
                None => Cow::Borrowed(self),
            },
            _ => Cow::Borrowed(self),
        }
    }

    /// Canonical tool name, used in messages and logs.
    pub fn tool_name(&self) -> &str {
        match self {
            Self::StartFlight { .. } => "start",
            Self::ExitFlight { .. } => "exit",
            Self::Check => "check",
            Self::Orient => "orient",
            Self::StartStarlog => "start_starlog",
            Self::Fly => "fly",
            Self::UpdateDebugDiary => "update_debug_diary",
            Self::EndStarlog => "end_starlog",
            Self::Other { tool } => tool,
        }
    }

    /// Look up one of the gated operations by its canonical name.
    pub fn from_gated_name(name: &str) -> Option<Self> {
        match name {
            "check" => Some(Self::Check),
            "orient" => Some(Self::Orient),
            "start_starlog" => Some(Self::StartStarlog),
            "fly" => Some(Self::Fly),
            "update_debug_diary" => Some(Self::UpdateDebugDiary),
            "end_starlog" => Some(Self::EndStarlog),
            _ => None,
        }
    }

    /// Flight entry/exit: handled by the nesting coordinator, not the gates.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StartFlight { .. } | Self::ExitFlight { .. })
    }

    /// Waypoint setup operations.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Check | Self::Orient | Self::StartStarlog)
    }

    /// Operations that count as tracked work for the phase gate.
    pub fn is_work(&self) -> bool {
        matches!(self, Self::Fly | Self::UpdateDebugDiary)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// A flight-config name that breaks the naming convention.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("flight config `{name}` must end with `{suffix}`")]
pub struct InvalidFlightConfig {
    pub name: String,
    pub suffix: String,
}

/// Maps raw transport tool names onto [`Operation`]s.
///
/// Tool servers usually namespace their tools (`mcp__starlog__check`); the
/// configured prefixes are stripped before matching. `ExitFlight` is never
/// produced here because it needs a frame id.
///
/// The starship server's own tools (`launch_routine`, `landing_routine`,
/// `add_flight_config`, `update_flight_config`, `delete_flight_config`,
/// `populate_default_flight_configs`,
/// `read_starlog_flight_config_instruction_manual`) are not gated by name
/// and resolve to `Other`, so they are only permitted once the session is
/// unlocked. Its `fly` browser is the gated [`Operation::Fly`].
#[derive(Clone, Debug)]
pub struct ToolResolver {
    strip_prefixes: Vec<String>,
    flight_entry: Vec<String>,
    flight_config_suffix: String,
}

impl ToolResolver {
    pub fn new(tools: &ToolsConfig) -> Self {
        // Longest prefix first so nested namespaces strip fully.
        let mut strip_prefixes = tools.strip_prefixes.clone();
        strip_prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        Self {
            strip_prefixes,
            flight_entry: tools.flight_entry.clone(),
            flight_config_suffix: tools.flight_config_suffix.clone(),
        }
    }

    pub fn resolve(&self, raw: &str) -> Operation {
        let trimmed = raw.trim();
        let name = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix.as_str()))
            .unwrap_or(trimmed);

        if self.flight_entry.iter().any(|entry| entry == name) {
            return Operation::StartFlight { config: None };
        }

        Operation::other(name)
    }

    /// Flight entry for `config`, checked against the naming convention.
    pub fn start_flight(&self, config: Option<&str>) -> Result<Operation, InvalidFlightConfig> {
        if let Some(name) = config {
            self.check_flight_config(name)?;
        }
        Ok(Operation::StartFlight {
            config: config.map(str::to_string),
        })
    }

    /// Config names must carry a non-empty stem before the suffix. An empty
    /// suffix disables the check.
    pub fn check_flight_config(&self, name: &str) -> Result<(), InvalidFlightConfig> {
        let suffix = self.flight_config_suffix.as_str();
        if suffix.is_empty() || (name.len() > suffix.len() && name.ends_with(suffix)) {
            Ok(())
        } else {
            Err(InvalidFlightConfig {
                name: name.to_string(),
                suffix: suffix.to_string(),
            })
        }
    }
}

impl Default for ToolResolver {
    fn default() -> Self {
        Self::new(&ToolsConfig::default())
    }
}
