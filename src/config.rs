use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::Path;

use crate::{plan::FlagPolicy, registry::ModuleDescriptor};

pub const DEFAULT_MANIFEST: &str = "apps.toml";

/// The module manifest (`apps.toml`).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub emit: EmitConfig,

    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

impl Manifest {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        Ok(cfg)
    }

    /// Task entries in manifest order, ready for [`crate::Registry::load`].
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.tasks.iter().map(TaskEntry::to_descriptor).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    #[serde(default)]
    pub flag_policy: FlagPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmitConfig {
    /// Rust service table output path (tokens allowed).
    #[serde(default)]
    pub rust: Option<String>,

    /// Makefile fragment output path (tokens allowed).
    #[serde(default)]
    pub make: Option<String>,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_item_type")]
    pub item_type: String,

    #[serde(default = "default_item_macro")]
    pub item_macro: String,

    #[serde(default = "default_cfg_prefix")]
    pub cfg_prefix: String,

    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            rust: None,
            make: None,
            table: default_table(),
            item_type: default_item_type(),
            item_macro: default_item_macro(),
            cfg_prefix: default_cfg_prefix(),
            templates: Vec::new(),
        }
    }
}

fn default_table() -> String {
    "TASK_FILES".to_string()
}

fn default_item_type() -> String {
    "KernelServices".to_string()
}

fn default_item_macro() -> String {
    "service".to_string()
}

fn default_cfg_prefix() -> String {
    "--cfg=".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateEntry {
    pub name: String,
    pub source: String,
    pub output: String,
}

/// One `[[tasks]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub name: String,

    pub file: String,

    /// (virtual address, physical address, size)
    #[serde(default)]
    pub mem: Vec<(u64, u64, u64)>,

    /// (address, size)
    #[serde(default)]
    pub dma: Vec<(u64, u64)>,

    #[serde(default)]
    pub deps: Vec<String>,

    #[serde(default)]
    pub cfg: Vec<String>,
}

impl TaskEntry {
    pub fn to_descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            name: self.name.clone(),
            source: self.file.clone(),
            memory: self.mem.iter().copied().map(Into::into).collect(),
            dma: self.dma.iter().copied().map(Into::into).collect(),
            dependencies: self.deps.clone(),
            flags: self.cfg.clone(),
        }
    }
}

/// The per-build selection file.
#[derive(Debug, Default, Deserialize)]
pub struct Selection {
    #[serde(rename = "module-selected", default)]
    pub module_selected: Vec<String>,
}

impl Selection {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read selection file {}", path.display()))?;
        let sel: Self = toml::from_str(&text)
            .with_context(|| format!("invalid selection file {}", path.display()))?;
        Ok(sel)
    }
}
