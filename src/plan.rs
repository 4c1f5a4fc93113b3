use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::registry::{DmaRegion, MemRegion};

/// How build flags of folded modules reach the component that absorbs them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlagPolicy {
    /// Only the component's own flags.
    #[default]
    Local,
    /// Own flags, then those of folded dependencies in pre-order.
    Transitive,
}

impl std::fmt::Display for FlagPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FlagPolicy::Local => "local",
            FlagPolicy::Transitive => "transitive",
        };
        f.write_str(s)
    }
}

/// One standalone service with everything it must own at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub name: String,
    pub source: String,
    pub memory: Vec<MemRegion>,
    pub dma: Vec<DmaRegion>,
    pub flags: Vec<String>,
}

/// Result of one resolution run, ready for the emitters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub components: Vec<Component>,
}

impl Plan {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Flags of every component in component order; repeats are dropped.
    pub fn all_flags(&self) -> Vec<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut out = Vec::new();
        for c in self.components.iter() {
            for f in c.flags.iter() {
                if seen.insert(f.as_str()) {
                    out.push(f.clone());
                }
            }
        }
        out
    }
}
