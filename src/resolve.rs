use std::collections::BTreeSet;

use crate::{
    error::{Error, Result},
    plan::{Component, FlagPolicy, Plan},
    registry::{DmaRegion, MemRegion, ModuleId, Registry},
};

/// Where a module ends up after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Built and run as its own service.
    Standalone,
    /// Reached by exactly one path; absorbed into its standalone ancestor.
    Folded,
    /// Not reachable from any selected root.
    Unused,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Standalone => "standalone",
            Role::Folded => "folded",
            Role::Unused => "unused",
        };
        f.write_str(s)
    }
}

/// Resources collected for one standalone module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    pub memory: Vec<MemRegion>,
    pub dma: Vec<DmaRegion>,
}

/// One resolution run over a borrowed registry.
///
/// The per-module visit counters live here, not in the registry, so a
/// registry can serve any number of independent runs. Creating a new
/// `Resolution` (or calling [`Resolution::reset`]) starts from zero.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    registry: &'a Registry,
    visits: Vec<u32>,
    roots: Vec<ModuleId>,
}

impl<'a> Resolution<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            visits: vec![0; registry.len()],
            roots: Vec::new(),
        }
    }

    /// Selects every root, then marks the roots themselves as standalone.
    ///
    /// All names are checked before any counter moves, so a failed run
    /// leaves nothing half-propagated.
    pub fn run<S: AsRef<str>>(registry: &'a Registry, roots: &[S]) -> Result<Self> {
        if roots.is_empty() {
            return Err(Error::EmptySelection);
        }

        let mut ids = Vec::with_capacity(roots.len());
        for r in roots {
            let name = r.as_ref();
            let id = registry.id(name).ok_or_else(|| Error::UnknownRootName {
                name: name.to_string(),
            })?;
            ids.push(id);
        }

        let mut run = Self::new(registry);
        for &id in ids.iter() {
            run.select(id);
        }
        run.force_roots(&ids);

        tracing::debug!(
            roots = ids.len(),
            standalone = run.standalone_modules().len(),
            "resolution finished"
        );

        Ok(run)
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Zeroes every counter and forgets the roots.
    pub fn reset(&mut self) {
        self.visits.iter_mut().for_each(|v| *v = 0);
        self.roots.clear();
    }

    /// One propagation event reaching `id`.
    ///
    /// The first visit walks on into the dependencies in declared order; any
    /// later visit only bumps the counter, so the subtree below a converging
    /// module is propagated exactly once.
    pub fn select(&mut self, id: ModuleId) {
        let mut stack = vec![id];

        while let Some(cur) = stack.pop() {
            let count = &mut self.visits[cur.index()];
            *count += 1;
            if *count > 1 {
                continue;
            }

            tracing::trace!(module = %self.registry.name(cur), "propagating");

            // reversed so the pop order matches the declared order
            stack.extend(self.registry.get(cur).dependencies().iter().rev().copied());
        }
    }

    /// A module requested directly is its own service even if nothing else
    /// reaches it. Must run after every root has been selected.
    pub fn force_roots(&mut self, roots: &[ModuleId]) {
        for &id in roots {
            let count = &mut self.visits[id.index()];
            if *count <= 1 {
                tracing::debug!(module = %self.registry.name(id), "root promoted to standalone");
                *count = 2;
            }
            if !self.roots.contains(&id) {
                self.roots.push(id);
            }
        }
    }

    pub fn roots(&self) -> &[ModuleId] {
        &self.roots
    }

    pub fn visit_count(&self, id: ModuleId) -> u32 {
        self.visits[id.index()]
    }

    pub fn is_standalone(&self, id: ModuleId) -> bool {
        self.visit_count(id) > 1
    }

    pub fn role(&self, id: ModuleId) -> Role {
        match self.visit_count(id) {
            0 => Role::Unused,
            1 => Role::Folded,
            _ => Role::Standalone,
        }
    }

    /// Standalone modules in registry declaration order.
    pub fn standalone_modules(&self) -> Vec<ModuleId> {
        self.registry
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| self.is_standalone(id))
            .collect()
    }

    /// Own resources of `id` followed by those of every folded dependency,
    /// pre-order, never crossing into another standalone module.
    pub fn aggregate(&self, id: ModuleId) -> Resources {
        let mut out = Resources::default();
        for cur in self.folded_preorder(id) {
            let m = self.registry.get(cur);
            out.memory.extend(m.memory.iter().copied());
            out.dma.extend(m.dma.iter().copied());
        }
        out
    }

    /// Build flags of `id` under the given policy.
    pub fn flags(&self, id: ModuleId, policy: FlagPolicy) -> Vec<String> {
        match policy {
            FlagPolicy::Local => self.registry.get(id).flags.clone(),
            FlagPolicy::Transitive => {
                let mut seen: BTreeSet<&str> = BTreeSet::new();
                let mut out = Vec::new();
                for cur in self.folded_preorder(id) {
                    for f in self.registry.get(cur).flags.iter() {
                        if seen.insert(f.as_str()) {
                            out.push(f.clone());
                        }
                    }
                }
                out
            }
        }
    }

    /// Folded modules that `id` absorbs (excluding `id` itself), pre-order.
    pub fn folded_members(&self, id: ModuleId) -> Vec<ModuleId> {
        self.folded_preorder(id).into_iter().skip(1).collect()
    }

    /// Builds the component list handed to the emitters.
    pub fn plan(&self, policy: FlagPolicy) -> Result<Plan> {
        let standalone = self.standalone_modules();
        if standalone.is_empty() {
            return Err(Error::EmptySelection);
        }

        let components = standalone
            .into_iter()
            .map(|id| {
                let m = self.registry.get(id);
                let res = self.aggregate(id);
                Component {
                    name: m.name.clone(),
                    source: m.source.clone(),
                    memory: res.memory,
                    dma: res.dma,
                    flags: self.flags(id, policy),
                }
            })
            .collect();

        Ok(Plan { components })
    }

    // `start` first, then every dependency that is not standalone, depth first.
    // A cycle reachable from a root always contains a module counted twice,
    // so this stops even when the graph is not a DAG.
    fn folded_preorder(&self, start: ModuleId) -> Vec<ModuleId> {
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(cur) = stack.pop() {
            order.push(cur);
            let deps = self.registry.get(cur).dependencies();
            stack.extend(
                deps.iter()
                    .rev()
                    .copied()
                    .filter(|&d| !self.is_standalone(d)),
            );
        }

        order
    }
}
