//! The type-resolution service the engine queries.
//!
//! [`TypeHost`] is the boundary between the engine and whatever produced the
//! module model. [`ModuleIndex`] is the in-memory implementation used for
//! modules lowered from Rust sources: it resolves a type name as seen from a
//! given module by looking at local declarations, renaming imports and
//! finally the set of all module-level declarations.

use crate::model::{DeclId, ModuleId, ModuleSet, Scope};
use log::debug;
use std::collections::HashMap;

/// Answer to "which declaration does this name refer to".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    Declaration(DeclId),
    Ambiguous(Vec<DeclId>),
    Unknown,
}

/// Failure of the type host itself; never a user error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HostError {}

/// Query interface over the parsed module set.
///
/// Implementations must be deterministic; the engine memoizes answers for
/// the duration of one run.
pub trait TypeHost {
    /// The modules being analyzed.
    fn modules(&self) -> &ModuleSet;

    /// Resolves a type-namespace `name` as written inside module `from`.
    fn resolve_name(&self, from: ModuleId, name: &str) -> Result<NameResolution, HostError>;
}

/// Name index over a [`ModuleSet`].
pub struct ModuleIndex<'m> {
    modules: &'m ModuleSet,
    local: HashMap<(ModuleId, String), DeclId>,
    imports: HashMap<(ModuleId, String), String>,
    global: HashMap<String, Vec<DeclId>>,
}

impl<'m> ModuleIndex<'m> {
    pub fn new(modules: &'m ModuleSet) -> Self {
        let mut local = HashMap::new();
        let mut global: HashMap<String, Vec<DeclId>> = HashMap::new();
        let mut imports = HashMap::new();

        for (id, decl) in modules.declarations() {
            if !decl.is_type_like() || decl.scope == Scope::Block {
                continue;
            }
            local.entry((id.module, decl.name.clone())).or_insert(id);
            global.entry(decl.name.clone()).or_default().push(id);
        }

        for (idx, module) in modules.modules.iter().enumerate() {
            for import in &module.imports {
                imports.insert(
                    (ModuleId(idx as u32), import.local.clone()),
                    import.target.clone(),
                );
            }
        }

        debug!(
            "Indexed {} type names across {} modules",
            global.len(),
            modules.modules.len()
        );

        Self {
            modules,
            local,
            imports,
            global,
        }
    }

    fn lookup_global(&self, name: &str) -> NameResolution {
        match self.global.get(name).map(Vec::as_slice) {
            Some([single]) => NameResolution::Declaration(*single),
            Some(many) if !many.is_empty() => NameResolution::Ambiguous(many.to_vec()),
            _ => NameResolution::Unknown,
        }
    }
}

impl TypeHost for ModuleIndex<'_> {
    fn modules(&self) -> &ModuleSet {
        self.modules
    }

    fn resolve_name(&self, from: ModuleId, name: &str) -> Result<NameResolution, HostError> {
        if from.0 as usize >= self.modules.modules.len() {
            return Err(HostError::new(format!(
                "module {} is not part of the module set",
                from.0
            )));
        }

        if let Some(id) = self.local.get(&(from, name.to_string())) {
            return Ok(NameResolution::Declaration(*id));
        }

        if let Some(target) = self.imports.get(&(from, name.to_string())) {
            return Ok(self.lookup_global(target));
        }

        Ok(self.lookup_global(name))
    }
}
