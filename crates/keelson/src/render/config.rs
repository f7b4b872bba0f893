//! Machine configuration for hierarchical state machine runtimes
//!
//! Children are listed by bare name, the way such runtimes nest them.
//! Transition endpoints and the root initial use full scoped ids.

use crate::core::ScopedId;
use crate::machine::{HierarchicalModel, RegionNode, StateNode, Transition};
use serde::{Deserialize, Serialize};

/// A node in the nested `states` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigState {
    /// Simple state or history pseudostate
    Name(String),
    Composite {
        name: String,
        children: Vec<ConfigState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
    },
    Parallel {
        name: String,
        parallel: Vec<ConfigState>,
    },
}

impl ConfigState {
    pub fn name(&self) -> &str {
        match self {
            ConfigState::Name(name) => name,
            ConfigState::Composite { name, .. } | ConfigState::Parallel { name, .. } => name,
        }
    }

    fn from_node(node: &StateNode) -> Self {
        match node {
            StateNode::Simple { name, .. } | StateNode::History { name, .. } => {
                ConfigState::Name(name.clone())
            }
            StateNode::Composite {
                name,
                initial,
                children,
                ..
            } => ConfigState::Composite {
                name: name.clone(),
                children: children.iter().map(Self::from_node).collect(),
                initial: initial.as_ref().map(|id| id.bare_name().to_string()),
            },
            StateNode::Concurrent { name, regions, .. } => ConfigState::Parallel {
                name: name.clone(),
                parallel: regions.iter().map(Self::from_region).collect(),
            },
        }
    }

    fn from_region(region: &RegionNode) -> Self {
        ConfigState::Composite {
            name: region.name.clone(),
            children: region.children.iter().map(Self::from_node).collect(),
            initial: region
                .initial
                .as_ref()
                .map(|id| id.bare_name().to_string()),
        }
    }
}

/// One transition record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTransition {
    /// `None` for an automatic transition
    pub trigger: Option<String>,
    pub source: String,
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl From<&Transition> for ConfigTransition {
    fn from(transition: &Transition) -> Self {
        Self {
            trigger: transition.trigger.clone(),
            source: transition.source.to_string(),
            dest: transition.dest.to_string(),
            conditions: transition.guard.clone().map(|guard| vec![guard]),
            before: transition.action.clone(),
        }
    }
}

/// Everything a runtime needs to instantiate the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub states: Vec<ConfigState>,
    pub transitions: Vec<ConfigTransition>,
    pub initial: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub final_states: Vec<String>,
}

impl MachineConfig {
    pub fn from_model(model: &HierarchicalModel) -> Self {
        Self {
            states: model.root_states().iter().map(ConfigState::from_node).collect(),
            transitions: model.transitions().iter().map(ConfigTransition::from).collect(),
            initial: model.root_initial().to_string(),
            final_states: model.final_states().iter().map(ScopedId::to_string).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
