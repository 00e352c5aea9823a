//! Module dependency graph.
//!
//! Tracks loaded modules, keyed by namespace-qualified address, and the
//! resolved edges between them.

use rustc_hash::FxHashMap as HashMap;
use std::collections::VecDeque;

use crate::imports::ImportSpec;
use crate::loader::LoaderKind;
use crate::resolver::{Address, ResolutionContext};

/// Unique identifier for a module in the graph.
pub type ModuleId = usize;

/// A module in the dependency graph.
#[derive(Debug, Clone)]
pub struct Module {
    pub address: Address,
    /// Source after the transform hooks.
    pub source: String,
    pub loader: LoaderKind,
    /// Context the module's own imports resolve against.
    pub context: ResolutionContext,
    /// Specifiers found in the source.
    pub imports: Vec<ImportSpec>,
    /// Modules this module depends on, in import order.
    pub dependencies: Vec<ModuleId>,
}

/// The module dependency graph.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    /// Address key to ID mapping for deduplication.
    key_to_id: HashMap<String, ModuleId>,
    /// (importer ID, specifier) to target ID.
    specifier_map: HashMap<(ModuleId, String), ModuleId>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning its ID. An address already in the graph keeps
    /// its existing ID.
    pub fn add(&mut self, module: Module) -> ModuleId {
        let key = module.address.key();
        if let Some(&id) = self.key_to_id.get(&key) {
            return id;
        }
        let id = self.modules.len();
        self.key_to_id.insert(key, id);
        self.modules.push(module);
        id
    }

    #[must_use]
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    #[must_use]
    pub fn id_of(&self, address: &Address) -> Option<ModuleId> {
        self.key_to_id.get(&address.key()).copied()
    }

    /// Record that `specifier` in module `from` resolved to module `to`.
    pub fn link(&mut self, from: ModuleId, specifier: &str, to: ModuleId) {
        self.specifier_map.insert((from, specifier.to_string()), to);
        if let Some(module) = self.modules.get_mut(from) {
            if !module.dependencies.contains(&to) {
                module.dependencies.push(to);
            }
        }
    }

    #[must_use]
    pub fn resolve_specifier(&self, from: ModuleId, specifier: &str) -> Option<ModuleId> {
        self.specifier_map
            .get(&(from, specifier.to_string()))
            .copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in dependency order (dependencies before dependents).
    ///
    /// Cycles are allowed; modules caught in one are appended in ID order.
    #[must_use]
    pub fn toposort(&self) -> Vec<ModuleId> {
        let n = self.modules.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<ModuleId>> = vec![Vec::new(); n];

        for (id, module) in self.modules.iter().enumerate() {
            for &dep in &module.dependencies {
                dependents[dep].push(id);
                in_degree[id] += 1;
            }
        }

        let mut queue: VecDeque<ModuleId> = (0..n).filter(|&id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];

        while let Some(id) = queue.pop_front() {
            order.push(id);
            placed[id] = true;
            for &next in &dependents[id] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < n {
            order.extend((0..n).filter(|&id| !placed[id]));
        }

        order
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate()
    }
}
