use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Index of a module inside a [`Registry`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Memory window owned by a module: (virtual address, physical address, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemRegion {
    pub virt: u64,
    pub phys: u64,
    pub size: u64,
}

impl From<(u64, u64, u64)> for MemRegion {
    fn from((virt, phys, size): (u64, u64, u64)) -> Self {
        Self { virt, phys, size }
    }
}

/// DMA window owned by a module: (address, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DmaRegion {
    pub addr: u64,
    pub size: u64,
}

impl From<(u64, u64)> for DmaRegion {
    fn from((addr, size): (u64, u64)) -> Self {
        Self { addr, size }
    }
}

/// A module as handed over by whoever parsed the manifest.
/// Dependencies are still plain names here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub source: String,
    pub memory: Vec<MemRegion>,
    pub dma: Vec<DmaRegion>,
    pub dependencies: Vec<String>,
    pub flags: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn memory(mut self, region: impl Into<MemRegion>) -> Self {
        self.memory.push(region.into());
        self
    }

    pub fn dma(mut self, region: impl Into<DmaRegion>) -> Self {
        self.dma.push(region.into());
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }
}

/// A loaded module. Immutable; per-run state lives in [`crate::Resolution`].
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub source: String,
    pub memory: Vec<MemRegion>,
    pub dma: Vec<DmaRegion>,
    pub flags: Vec<String>,
    deps: Vec<ModuleId>,
}

impl Module {
    /// Resolved dependencies, in declared order.
    pub fn dependencies(&self) -> &[ModuleId] {
        &self.deps
    }
}

/// Arena of modules with dependency edges resolved to indices.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: Vec<Module>,
    by_name: BTreeMap<String, ModuleId>,
}

impl Registry {
    /// Builds the arena and resolves every dependency name.
    ///
    /// Duplicate names are rejected before any dependency is looked up, so a
    /// manifest with both problems reports the duplicate. Acyclicity is not
    /// checked.
    pub fn load<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let descriptors: Vec<ModuleDescriptor> = descriptors.into_iter().collect();

        let mut by_name: BTreeMap<String, ModuleId> = BTreeMap::new();
        for (idx, d) in descriptors.iter().enumerate() {
            if by_name.insert(d.name.clone(), ModuleId(idx)).is_some() {
                return Err(Error::DuplicateModule {
                    name: d.name.clone(),
                });
            }
        }

        let mut modules = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            let mut deps = Vec::with_capacity(d.dependencies.len());

            for dep in d.dependencies.iter() {
                let Some(&id) = by_name.get(dep) else {
                    return Err(Error::UnresolvedDependency {
                        module: d.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                if !seen.insert(dep.as_str()) {
                    tracing::debug!(module = %d.name, dependency = %dep, "ignoring repeated dependency");
                    continue;
                }
                deps.push(id);
            }

            modules.push(Module {
                name: d.name,
                source: d.source,
                memory: d.memory,
                dma: d.dma,
                flags: d.flags,
                deps,
            });
        }

        tracing::debug!(modules = modules.len(), "module registry loaded");

        Ok(Self { modules, by_name })
    }

    pub fn id(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.get(id).name
    }

    /// Modules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> + '_ {
        self.modules
            .iter()
            .enumerate()
            .map(|(idx, m)| (ModuleId(idx), m))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_dependencies_to_ids_in_declared_order() {
        let reg = Registry::load([
            ModuleDescriptor::new("app").depends_on("uart").depends_on("blk"),
            ModuleDescriptor::new("blk"),
            ModuleDescriptor::new("uart"),
        ])
        .unwrap();

        let app = reg.get(reg.id("app").unwrap());
        let names: Vec<&str> = app.dependencies().iter().map(|&d| reg.name(d)).collect();
        assert_eq!(names, ["uart", "blk"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn unknown_dependency_is_fatal() {
        let err = Registry::load([ModuleDescriptor::new("app").depends_on("missing")]).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedDependency {
                module: "app".into(),
                dependency: "missing".into(),
            }
        );
    }

    #[test]
    fn duplicate_name_is_fatal_and_reported_first() {
        let err = Registry::load([
            ModuleDescriptor::new("a").depends_on("nowhere"),
            ModuleDescriptor::new("a"),
        ])
        .unwrap_err();
        assert_eq!(err, Error::DuplicateModule { name: "a".into() });
    }

    #[test]
    fn ids_follow_declaration_order() {
        let reg = Registry::load([ModuleDescriptor::new("x"), ModuleDescriptor::new("y")]).unwrap();
        let ids: Vec<usize> = reg.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(ids, [0, 1]);
        assert_eq!(reg.id("y").map(ModuleId::index), Some(1));
    }

    #[test]
    fn repeated_dependency_names_collapse() {
        let reg = Registry::load([
            ModuleDescriptor::new("a").depends_on("b").depends_on("b"),
            ModuleDescriptor::new("b"),
        ])
        .unwrap();
        assert_eq!(reg.get(reg.id("a").unwrap()).dependencies().len(), 1);
    }

    #[test]
    fn descriptor_source_defaults_to_name() {
        let d = ModuleDescriptor::new("fat-thread");
        assert_eq!(d.source, "fat-thread");
        assert_eq!(d.source("fat.elf").source, "fat.elf");
    }
}
