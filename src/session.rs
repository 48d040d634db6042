//! State of one extraction run.
//!
//! Every cache lives here and is dropped with the session, so repeated runs
//! over the same modules never observe each other.

use crate::collector::{Collected, Collection, Role};
use crate::config::ExtractConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::host::{NameResolution, TypeHost};
use crate::model::{DeclId, DeclKind, Declaration, ModuleId, ModuleSet, TypeExpr};
use log::debug;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

/// A generic argument: the expression written at the instantiation site,
/// evaluated in the module and scope of that site.
#[derive(Debug, Clone)]
pub struct TypeArg<'m> {
    pub expr: &'m TypeExpr,
    pub module: ModuleId,
    pub scope: Rc<GenericScope<'m>>,
}

/// Bindings of generic parameter names to arguments.
#[derive(Debug, Clone, Default)]
pub struct GenericScope<'m> {
    bindings: Vec<(String, TypeArg<'m>)>,
    /// Generic instances this scope was created inside, outermost first,
    /// with the canonical keys of their arguments.
    lineage: Vec<(DeclId, Vec<String>)>,
}

impl<'m> GenericScope<'m> {
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Bindings introduced while resolving inside `parent`, keeping its
    /// enclosing instances.
    pub fn within(bindings: Vec<(String, TypeArg<'m>)>, parent: &GenericScope<'m>) -> Rc<Self> {
        Rc::new(Self {
            bindings,
            lineage: parent.lineage.clone(),
        })
    }

    /// Scope of the instance `id<keys>` created while resolving inside `parent`.
    pub fn instance(
        bindings: Vec<(String, TypeArg<'m>)>,
        parent: &GenericScope<'m>,
        id: DeclId,
        keys: Vec<String>,
    ) -> Rc<Self> {
        let mut lineage = parent.lineage.clone();
        lineage.push((id, keys));
        Rc::new(Self { bindings, lineage })
    }

    /// Number of enclosing instances.
    pub fn depth(&self) -> usize {
        self.lineage.len()
    }

    /// Whether instantiating `id` with `keys` here would restart an enclosing
    /// instance of `id` with strictly larger arguments, which never ends.
    pub fn grows(&self, id: DeclId, keys: &[String]) -> bool {
        self.lineage.iter().any(|(outer, outer_keys)| {
            *outer == id
                && outer_keys.len() == keys.len()
                && outer_keys.iter().zip(keys).all(|(old, new)| new.contains(old.as_str()))
                && outer_keys.iter().zip(keys).any(|(old, new)| new.len() > old.len())
        })
    }

    pub fn get(&self, name: &str) -> Option<&TypeArg<'m>> {
        self.bindings
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, arg)| arg)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A declaration waiting to be turned into a schema definition.
#[derive(Debug, Clone)]
pub struct Pending<'m> {
    pub id: DeclId,
    /// Schema name; differs from the declared name for generic instances.
    pub name: String,
    pub scope: Rc<GenericScope<'m>>,
}

pub struct Session<'m> {
    pub host: &'m dyn TypeHost,
    pub modules: &'m ModuleSet,
    pub config: &'m ExtractConfig,
    pub collection: Collection<'m>,
    pub sink: DiagnosticSink,
    names: HashMap<(ModuleId, String), NameResolution>,
    /// Canonical instantiation key to schema name.
    instances: HashMap<String, String>,
    pending: VecDeque<Pending<'m>>,
    /// Untagged aliases being expanded, outermost first.
    expanding_aliases: Vec<DeclId>,
    /// Derived context type to the functions producing it.
    pub derived_contexts: BTreeMap<DeclId, Vec<DeclId>>,
    /// External types referenced during resolution.
    pub externals: BTreeMap<String, Option<String>>,
}

impl<'m> Session<'m> {
    pub fn new(
        host: &'m dyn TypeHost,
        config: &'m ExtractConfig,
        collection: Collection<'m>,
        sink: DiagnosticSink,
    ) -> Self {
        Self {
            host,
            modules: host.modules(),
            config,
            collection,
            sink,
            names: HashMap::new(),
            instances: HashMap::new(),
            pending: VecDeque::new(),
            expanding_aliases: Vec::new(),
            derived_contexts: BTreeMap::new(),
            externals: BTreeMap::new(),
        }
    }

    /// Resolves `name` as seen from `module`, memoized for the run.
    pub fn lookup(&mut self, module: ModuleId, name: &str) -> Result<NameResolution> {
        let key = (module, name.to_string());
        if let Some(found) = self.names.get(&key) {
            return Ok(found.clone());
        }
        let resolved = self.host.resolve_name(module, name)?;
        self.names.insert(key, resolved.clone());
        Ok(resolved)
    }

    pub fn declaration(&self, id: DeclId) -> &'m Declaration {
        self.modules.declaration(id)
    }

    pub fn collected(&self, id: DeclId) -> Option<&Collected<'m>> {
        self.collection.get(id)
    }

    pub fn role(&self, id: DeclId) -> Option<&Role> {
        self.collection.get(id).map(|c| &c.role)
    }

    pub fn is_root_context(&self, id: DeclId) -> bool {
        self.collection.root_context == Some(id)
    }

    pub fn is_derived_context(&self, id: DeclId) -> bool {
        self.derived_contexts.contains_key(&id)
    }

    /// Schema name of an instantiation, registering it for building when new.
    pub fn instance(
        &mut self,
        key: String,
        id: DeclId,
        name: String,
        scope: Rc<GenericScope<'m>>,
    ) -> String {
        if let Some(existing) = self.instances.get(&key) {
            return existing.clone();
        }
        debug!("New generic instance {} for {}", name, key);
        self.instances.insert(key, name.clone());
        self.pending.push_back(Pending {
            id,
            name: name.clone(),
            scope,
        });
        name
    }

    /// Target of an untagged, non-generic alias that is not already being
    /// expanded. Such aliases are looked through rather than named.
    pub fn expandable_alias(&self, id: DeclId) -> Option<&'m TypeExpr> {
        let decl = self.declaration(id);
        match &decl.kind {
            DeclKind::Alias(alias)
                if decl.generics.is_empty()
                    && self.collected(id).is_none()
                    && !self.expanding_aliases.contains(&id) =>
            {
                Some(&alias.target)
            }
            _ => None,
        }
    }

    pub fn begin_alias(&mut self, id: DeclId) {
        self.expanding_aliases.push(id);
    }

    pub fn end_alias(&mut self, id: DeclId) {
        if self.expanding_aliases.last() == Some(&id) {
            self.expanding_aliases.pop();
        }
    }

    /// `A -> B -> A` when expanding alias `id` again would close a cycle.
    pub fn alias_cycle(&self, id: DeclId) -> Option<String> {
        let start = self.expanding_aliases.iter().position(|&open| open == id)?;
        let mut path: Vec<&str> = self.expanding_aliases[start..]
            .iter()
            .map(|&open| self.declaration(open).name.as_str())
            .collect();
        path.push(self.declaration(id).name.as_str());
        Some(path.join(" -> "))
    }

    pub fn enqueue(&mut self, pending: Pending<'m>) {
        self.pending.push_back(pending);
    }

    pub fn next_pending(&mut self) -> Option<Pending<'m>> {
        self.pending.pop_front()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Ends the run, handing back what later passes still need.
    pub fn finish(self) -> (DiagnosticSink, BTreeMap<String, Option<String>>) {
        (self.sink, self.externals)
    }
}
