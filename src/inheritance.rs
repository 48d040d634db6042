//! Field inheritance, interface compliance and discriminants.
//!
//! Runs once every definition has been built. For each object and
//! interface the ancestors are visited breadth first, concrete parent before
//! interfaces, so the nearest declaration of a field wins. Inherited fields
//! are shared with the ancestor through `Arc` rather than copied.

use crate::config::ExtractConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::Span;
use crate::schema::{FieldDefinition, InputValue, TypeDefinition, TypeRef};
use crate::schema_generator::{BuiltType, ParentRef};
use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Applies inheritance to every object and interface in place.
pub fn resolve_inheritance(
    types: &mut [BuiltType],
    config: &ExtractConfig,
    sink: &mut DiagnosticSink,
) {
    let graph = Graph::new(types);
    graph.report_cycles(types, sink);

    let mut closures = Vec::with_capacity(types.len());
    for index in 0..types.len() {
        closures.push(graph.closure(types, index, sink));
    }

    let interfaces_of: HashMap<&str, BTreeSet<String>> = closures
        .iter()
        .enumerate()
        .filter_map(|(index, closure)| {
            closure.as_ref().map(|c| {
                (
                    types[index].definition.name(),
                    c.interfaces.iter().cloned().collect(),
                )
            })
        })
        .collect();
    let union_members: HashMap<&str, &[String]> = types
        .iter()
        .filter_map(|t| match &t.definition {
            TypeDefinition::Union(union) => Some((union.name.as_str(), union.members.as_slice())),
            _ => None,
        })
        .collect();
    let subtypes = Subtypes {
        interfaces_of: &interfaces_of,
        union_members: &union_members,
    };

    let mut diagnostics = Vec::new();
    for (index, closure) in closures.iter().enumerate() {
        let Some(closure) = closure else { continue };
        for interface in &closure.interfaces {
            let Some(&target) = graph.by_name.get(interface.as_str()) else {
                continue;
            };
            let Some(interface_closure) = &closures[target] else {
                continue;
            };
            // Fields inherited from another interface were checked for
            // conflicts already; those from a parent are checked there when
            // the parent implements the same interface.
            let fields: Vec<Arc<FieldDefinition>> = closure
                .fields
                .iter()
                .filter(|f| match closure.sources.get(f.name.as_str()) {
                    None => true,
                    Some(&ancestor) => {
                        matches!(types[ancestor].definition, TypeDefinition::Object(_))
                            && !interfaces_of
                                .get(types[ancestor].definition.name())
                                .is_some_and(|set| set.contains(interface))
                    }
                })
                .cloned()
                .collect();
            check_compliance(
                types[index].definition.name(),
                &fields,
                interface,
                &interface_closure.fields,
                &subtypes,
                &mut diagnostics,
            );
        }
    }
    for diagnostic in diagnostics {
        sink.push(diagnostic);
    }

    for (built, closure) in types.iter_mut().zip(closures) {
        let Some(closure) = closure else { continue };
        match &mut built.definition {
            TypeDefinition::Object(object) => {
                object.fields = closure.fields;
                object.interfaces = closure.interfaces;
            }
            TypeDefinition::Interface(interface) => {
                interface.fields = closure.fields;
                interface.interfaces = closure.interfaces;
            }
            _ => {}
        }
    }

    check_discriminants(types, config, sink);
}

/// Fields and interfaces of one type after inheritance.
struct Closure {
    fields: Vec<Arc<FieldDefinition>>,
    interfaces: Vec<String>,
    /// Inherited field name to the ancestor it came from.
    sources: HashMap<String, usize>,
}

struct Graph<'a> {
    by_name: HashMap<&'a str, usize>,
    /// Resolved parents of each type: concrete parent first.
    parents: Vec<Vec<(usize, &'a ParentRef)>>,
}

impl<'a> Graph<'a> {
    fn new(types: &'a [BuiltType]) -> Self {
        let by_name: HashMap<&str, usize> = types
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                matches!(
                    t.definition,
                    TypeDefinition::Object(_) | TypeDefinition::Interface(_)
                )
            })
            .map(|(index, t)| (t.definition.name(), index))
            .collect();

        let parents = types
            .iter()
            .map(|t| {
                t.origin
                    .parent
                    .iter()
                    .chain(t.origin.interfaces.iter())
                    .filter_map(|parent| by_name.get(parent.name.as_str()).map(|&i| (i, parent)))
                    .collect()
            })
            .collect();

        Self { by_name, parents }
    }

    fn report_cycles(&self, types: &[BuiltType], sink: &mut DiagnosticSink) {
        // 0 = unvisited, 1 = on the stack, 2 = done
        let mut state = vec![0u8; types.len()];
        let mut reported: HashSet<Vec<usize>> = HashSet::new();
        for start in 0..types.len() {
            if state[start] == 0 && self.by_name.contains_key(types[start].definition.name()) {
                let mut stack = Vec::new();
                self.visit(start, types, &mut state, &mut stack, &mut reported, sink);
            }
        }
    }

    fn visit(
        &self,
        node: usize,
        types: &[BuiltType],
        state: &mut [u8],
        stack: &mut Vec<usize>,
        reported: &mut HashSet<Vec<usize>>,
        sink: &mut DiagnosticSink,
    ) {
        state[node] = 1;
        stack.push(node);
        for &(parent, reference) in &self.parents[node] {
            match state[parent] {
                0 => self.visit(parent, types, state, stack, reported, sink),
                1 => {
                    let Some(position) = stack.iter().position(|&n| n == parent) else {
                        continue;
                    };
                    let cycle = &stack[position..];
                    let mut key = cycle.to_vec();
                    key.sort_unstable();
                    if !reported.insert(key) {
                        continue;
                    }
                    let path = cycle
                        .iter()
                        .chain(std::iter::once(&parent))
                        .map(|&n| types[n].definition.name())
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    sink.semantic(
                        reference.span,
                        format!("Inheritance cycle detected: {}.", path),
                    );
                }
                _ => {}
            }
        }
        stack.pop();
        state[node] = 2;
    }

    fn closure(
        &self,
        types: &[BuiltType],
        index: usize,
        sink: &mut DiagnosticSink,
    ) -> Option<Closure> {
        let (own, type_name, type_span) = match &types[index].definition {
            TypeDefinition::Object(object) => (&object.fields, &object.name, object.span),
            TypeDefinition::Interface(interface) => {
                (&interface.fields, &interface.name, interface.span)
            }
            _ => return None,
        };

        let mut fields = own.clone();
        let mut names: HashSet<&str> = own.iter().map(|f| f.name.as_str()).collect();
        let mut interfaces = Vec::new();
        let mut sources = HashMap::new();
        let mut visited = HashSet::from([index]);
        let mut frontier: Vec<usize> = Vec::new();
        for &(parent, _) in &self.parents[index] {
            if visited.insert(parent) {
                frontier.push(parent);
            }
        }

        while !frontier.is_empty() {
            // Candidates at this distance, in first-seen order.
            let mut level: Vec<(&str, Vec<(usize, &Arc<FieldDefinition>)>)> = Vec::new();
            for &ancestor in &frontier {
                let ancestor_fields = match &types[ancestor].definition {
                    TypeDefinition::Object(object) => &object.fields,
                    TypeDefinition::Interface(interface) => {
                        interfaces.push(interface.name.clone());
                        &interface.fields
                    }
                    _ => continue,
                };
                for field in ancestor_fields {
                    if names.contains(field.name.as_str()) {
                        continue;
                    }
                    match level.iter_mut().find(|(name, _)| *name == field.name) {
                        Some((_, candidates)) => candidates.push((ancestor, field)),
                        None => level.push((field.name.as_str(), vec![(ancestor, field)])),
                    }
                }
            }

            for (name, candidates) in level {
                let (first_owner, first) = candidates[0];
                for &(other_owner, other) in &candidates[1..] {
                    if Arc::ptr_eq(first, other) || same_shape(first, other) {
                        continue;
                    }
                    sink.push(
                        Diagnostic::semantic(
                            type_span,
                            format!(
                                "Field `{}` of `{}` is inherited from both `{}` and `{}` with incompatible types (`{}` and `{}`). Declare the field on `{}` to choose one.",
                                name,
                                type_name,
                                types[first_owner].definition.name(),
                                types[other_owner].definition.name(),
                                first.ty,
                                other.ty,
                                type_name
                            ),
                        )
                        .with_related(first.span, "first definition")
                        .with_related(other.span, "conflicting definition"),
                    );
                }
                names.insert(name);
                sources.insert(name.to_string(), first_owner);
                fields.push(Arc::clone(first));
            }

            let mut next = Vec::new();
            for &ancestor in &frontier {
                for &(parent, _) in &self.parents[ancestor] {
                    if visited.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            frontier = next;
        }

        debug!(
            "`{}` has {} fields after inheritance ({} own)",
            type_name,
            fields.len(),
            own.len()
        );
        Some(Closure {
            fields,
            interfaces,
            sources,
        })
    }
}

/// Fields declared by two ancestors are interchangeable when their type and
/// arguments agree; descriptions and resolvers may differ.
fn same_shape(a: &FieldDefinition, b: &FieldDefinition) -> bool {
    a.ty == b.ty
        && a.arguments.len() == b.arguments.len()
        && a
            .arguments
            .iter()
            .zip(&b.arguments)
            .all(|(x, y)| x.name == y.name && x.ty == y.ty)
}

struct Subtypes<'a> {
    interfaces_of: &'a HashMap<&'a str, BTreeSet<String>>,
    union_members: &'a HashMap<&'a str, &'a [String]>,
}

impl Subtypes<'_> {
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        sub == sup
            || self
                .interfaces_of
                .get(sub)
                .is_some_and(|interfaces| interfaces.contains(sup))
            || self
                .union_members
                .get(sup)
                .is_some_and(|members| members.iter().any(|m| m == sub))
    }

    /// Whether a field of type `implementation` may implement one of type
    /// `declared`. Nullability must match exactly unless `covariant`.
    fn compatible(&self, implementation: &TypeRef, declared: &TypeRef, covariant: bool) -> bool {
        match (implementation, declared) {
            (TypeRef::NonNull(a), TypeRef::NonNull(b)) => self.compatible(a, b, covariant),
            (TypeRef::NonNull(a), b) if covariant => self.compatible(a, b, covariant),
            (TypeRef::List(a), TypeRef::List(b)) => self.compatible(a, b, covariant),
            (TypeRef::Named(a), TypeRef::Named(b)) => self.is_subtype(a, b),
            (TypeRef::External { name: a, .. }, TypeRef::External { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

fn check_compliance(
    type_name: &str,
    fields: &[Arc<FieldDefinition>],
    interface: &str,
    interface_fields: &[Arc<FieldDefinition>],
    subtypes: &Subtypes<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for declared in interface_fields {
        let Some(implementation) = fields.iter().find(|f| f.name == declared.name) else {
            continue;
        };
        if Arc::ptr_eq(implementation, declared) {
            continue;
        }

        let covariant =
            implementation.kills_parent_on_exception && declared.kills_parent_on_exception;
        if !subtypes.compatible(&implementation.ty, &declared.ty, covariant) {
            diagnostics.push(
                Diagnostic::semantic(
                    implementation.span,
                    format!(
                        "Field `{}.{}` has type `{}`, which is not compatible with `{}.{}` of type `{}`.",
                        type_name,
                        implementation.name,
                        implementation.ty,
                        interface,
                        declared.name,
                        declared.ty
                    ),
                )
                .with_related(declared.span, "interface field declared here"),
            );
        }

        check_arguments(
            type_name,
            implementation,
            interface,
            declared,
            diagnostics,
        );
    }
}

fn check_arguments(
    type_name: &str,
    implementation: &FieldDefinition,
    interface: &str,
    declared: &FieldDefinition,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let find = |args: &'_ [InputValue], name: &str| -> Option<Span> {
        args.iter().find(|a| a.name == name).map(|a| a.span)
    };

    for argument in &declared.arguments {
        match implementation.arguments.iter().find(|a| a.name == argument.name) {
            None => diagnostics.push(
                Diagnostic::semantic(
                    implementation.span,
                    format!(
                        "Field `{}.{}` must accept argument `{}: {}` declared by interface `{}`.",
                        type_name, implementation.name, argument.name, argument.ty, interface
                    ),
                )
                .with_related(argument.span, "argument declared here"),
            ),
            Some(own) if own.ty != argument.ty => diagnostics.push(
                Diagnostic::semantic(
                    own.span,
                    format!(
                        "Argument `{}` of `{}.{}` has type `{}` but interface `{}` declares `{}`.",
                        argument.name, type_name, implementation.name, own.ty, interface, argument.ty
                    ),
                )
                .with_related(argument.span, "argument declared here"),
            ),
            Some(_) => {}
        }
    }

    for own in &implementation.arguments {
        if find(&declared.arguments, &own.name).is_none()
            && own.ty.is_non_null()
            && own.default_value.is_none()
        {
            diagnostics.push(
                Diagnostic::semantic(
                    own.span,
                    format!(
                        "Argument `{}` of `{}.{}` must be optional because interface `{}` does not declare it.",
                        own.name, type_name, implementation.name, interface
                    ),
                )
                .with_related(declared.span, "interface field declared here"),
            );
        }
    }
}

/// Union members, and with `strict_discriminants` interface implementors,
/// must declare a literal discriminant equal to their schema name.
fn check_discriminants(types: &[BuiltType], config: &ExtractConfig, sink: &mut DiagnosticSink) {
    let objects: HashMap<&str, &BuiltType> = types
        .iter()
        .filter(|t| matches!(t.definition, TypeDefinition::Object(_)))
        .map(|t| (t.definition.name(), t))
        .collect();

    for built in types {
        match &built.definition {
            TypeDefinition::Object(object) => {
                if let Some(discriminant) = &built.origin.discriminant {
                    if discriminant.value != object.name {
                        sink.semantic(
                            discriminant.span,
                            format!(
                                "Discriminant \"{}\" of `{}` must equal its schema name \"{}\".",
                                discriminant.value, object.name, object.name
                            ),
                        );
                    }
                } else if config.strict_discriminants && !object.interfaces.is_empty() {
                    sink.semantic(
                        object.span,
                        format!(
                            "Type `{}` implements `{}` but declares no discriminant. Add `pub const TYPENAME: &'static str = \"{}\";` to an inherent impl.",
                            object.name,
                            object.interfaces.join("`, `"),
                            object.name
                        ),
                    );
                }
            }
            TypeDefinition::Union(union) => {
                let mut seen: HashMap<&str, (&str, Span)> = HashMap::new();
                for member in &union.members {
                    let Some(member_type) = objects.get(member.as_str()) else {
                        continue;
                    };
                    let Some(discriminant) = &member_type.origin.discriminant else {
                        sink.push(
                            Diagnostic::semantic(
                                member_type.definition.span(),
                                format!(
                                    "Union member `{}` of union `{}` is missing a discriminant. Add `pub const TYPENAME: &'static str = \"{}\";` to an inherent impl.",
                                    member, union.name, member
                                ),
                            )
                            .with_related(union.span, "union declared here"),
                        );
                        continue;
                    };
                    if let Some((first, first_span)) = seen.get(discriminant.value.as_str()) {
                        sink.push(
                            Diagnostic::semantic(
                                discriminant.span,
                                format!(
                                    "Members `{}` and `{}` of union `{}` share the discriminant \"{}\".",
                                    first, member, union.name, discriminant.value
                                ),
                            )
                            .with_related(*first_span, "first used here"),
                        );
                    } else {
                        seen.insert(discriminant.value.as_str(), (member.as_str(), discriminant.span));
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use crate::schema::{InterfaceType, ObjectType, ResolverBinding, SemanticNullability, UnionType};
    use crate::schema_generator::{Discriminant, TypeOrigin};
    use pretty_assertions::assert_eq;

    fn span(at: u32) -> Span {
        Span::new(FileId(0), at, at + 1)
    }

    fn field(name: &str, ty: TypeRef, at: u32) -> Arc<FieldDefinition> {
        Arc::new(FieldDefinition {
            name: name.to_string(),
            description: None,
            ty,
            arguments: Vec::new(),
            deprecation_reason: None,
            semantic_nullability: SemanticNullability::Loose,
            kills_parent_on_exception: false,
            directives: Vec::new(),
            resolver: ResolverBinding::default(),
            span: span(at),
        })
    }

    fn string() -> TypeRef {
        TypeRef::named("String").non_null()
    }

    fn parent(name: &str) -> ParentRef {
        ParentRef {
            name: name.to_string(),
            span: span(900),
        }
    }

    fn interface(name: &str, fields: Vec<Arc<FieldDefinition>>, extends: &[&str]) -> BuiltType {
        BuiltType {
            definition: TypeDefinition::Interface(InterfaceType {
                name: name.to_string(),
                description: None,
                interfaces: Vec::new(),
                fields,
                directives: Vec::new(),
                span: span(0),
            }),
            origin: TypeOrigin {
                parent: None,
                interfaces: extends.iter().map(|n| parent(n)).collect(),
                discriminant: None,
            },
        }
    }

    fn object(
        name: &str,
        fields: Vec<Arc<FieldDefinition>>,
        base: Option<&str>,
        implements: &[&str],
    ) -> BuiltType {
        BuiltType {
            definition: TypeDefinition::Object(ObjectType {
                name: name.to_string(),
                description: None,
                interfaces: Vec::new(),
                discriminant: Some(name.to_string()),
                fields,
                directives: Vec::new(),
                span: span(100),
            }),
            origin: TypeOrigin {
                parent: base.map(parent),
                interfaces: implements.iter().map(|n| parent(n)).collect(),
                discriminant: Some(Discriminant {
                    value: name.to_string(),
                    span: span(200),
                }),
            },
        }
    }

    fn run(types: &mut [BuiltType], config: &ExtractConfig) -> Vec<String> {
        let mut sink = DiagnosticSink::new();
        resolve_inheritance(types, config, &mut sink);
        sink.finish().into_iter().map(|d| d.message).collect()
    }

    fn field_names(built: &BuiltType) -> Vec<&str> {
        match &built.definition {
            TypeDefinition::Object(o) => o.fields.iter().map(|f| f.name.as_str()).collect(),
            TypeDefinition::Interface(i) => i.fields.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_transitive_interface_fields_appear_once() {
        let mut types = vec![
            interface("Node", vec![field("id", string(), 1)], &[]),
            interface("Named", vec![field("name", string(), 2), field("id", string(), 3)], &["Node"]),
            object("User", vec![field("name", TypeRef::named("String").non_null(), 4)], None, &["Named"]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);

        assert_eq!(field_names(&types[2]), vec!["name", "id"]);
        // The local definition wins over the interface's.
        match &types[2].definition {
            TypeDefinition::Object(user) => {
                assert_eq!(user.field("name").unwrap().span, span(4));
                assert_eq!(user.interfaces, vec!["Named", "Node"]);
            }
            _ => unreachable!(),
        }
        assert_eq!(field_names(&types[1]), vec!["name", "id"]);
    }

    #[test]
    fn test_inherited_fields_are_shared() {
        let shared = field("id", string(), 1);
        let mut types = vec![
            interface("Node", vec![Arc::clone(&shared)], &[]),
            object("User", Vec::new(), None, &["Node"]),
        ];
        run(&mut types, &ExtractConfig::default());
        match &types[1].definition {
            TypeDefinition::Object(user) => assert!(Arc::ptr_eq(&user.fields[0], &shared)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let mut types = vec![
            interface("Node", vec![field("label", string(), 1)], &[]),
            object("Base", vec![field("label", string(), 2)], None, &["Node"]),
            object("Derived", Vec::new(), Some("Base"), &[]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        match &types[2].definition {
            TypeDefinition::Object(derived) => {
                assert_eq!(derived.field("label").unwrap().span, span(2));
                assert_eq!(derived.interfaces, vec!["Node"]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sibling_conflict() {
        let mut types = vec![
            interface("A", vec![field("value", string(), 1)], &[]),
            interface("B", vec![field("value", TypeRef::named("Int").non_null(), 2)], &[]),
            interface("C", vec![field("value", string(), 3)], &[]),
            object("Thing", vec![field("other", string(), 4)], None, &["A", "C"]),
            object("Broken", Vec::new(), None, &["A", "B"]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("Field `value` of `Broken` is inherited from both `A` and `B`"));
    }

    #[test]
    fn test_incompatible_nullability() {
        let mut types = vec![
            interface("Node", vec![field("id", string(), 1)], &[]),
            object("User", vec![field("id", TypeRef::named("String"), 2)], None, &["Node"]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is not compatible with `Node.id`"));
    }

    #[test]
    fn test_narrower_nullability_rejected_without_kills_parent() {
        let nullable = field("id", TypeRef::named("String"), 1);
        let mut types = vec![
            interface("Node", vec![nullable], &[]),
            object("User", vec![field("id", string(), 2)], None, &["Node"]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors.len(), 1);

        let mut declared = (*field("id", TypeRef::named("String"), 1)).clone();
        declared.kills_parent_on_exception = true;
        let mut own = (*field("id", string(), 2)).clone();
        own.kills_parent_on_exception = true;
        let mut types = vec![
            interface("Node", vec![Arc::new(declared)], &[]),
            object("User", vec![Arc::new(own)], None, &["Node"]),
        ];
        assert!(run(&mut types, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn test_interface_cycle() {
        let mut types = vec![
            interface("A", Vec::new(), &["B"]),
            interface("B", Vec::new(), &["A"]),
        ];
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors, vec!["Inheritance cycle detected: A -> B -> A.".to_string()]);
    }

    fn union(name: &str, members: &[&str]) -> BuiltType {
        BuiltType {
            definition: TypeDefinition::Union(UnionType {
                name: name.to_string(),
                description: None,
                members: members.iter().map(|m| m.to_string()).collect(),
                directives: Vec::new(),
                span: span(300),
            }),
            origin: TypeOrigin::default(),
        }
    }

    #[test]
    fn test_union_discriminants() {
        let mut types = vec![
            object("Cat", Vec::new(), None, &[]),
            object("Dog", Vec::new(), None, &[]),
            union("Pet", &["Cat", "Dog"]),
        ];
        assert!(run(&mut types, &ExtractConfig::default()).is_empty());

        types[1].origin.discriminant = None;
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Union member `Dog` of union `Pet` is missing a discriminant"));

        types[1].origin.discriminant = Some(Discriminant {
            value: "Cat".to_string(),
            span: span(250),
        });
        let errors = run(&mut types, &ExtractConfig::default());
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("share the discriminant \"Cat\"")));
    }

    #[test]
    fn test_strict_discriminants_for_implementors() {
        let mut plain = object("User", Vec::new(), None, &["Node"]);
        plain.origin.discriminant = None;
        let mut types = vec![interface("Node", Vec::new(), &[]), plain];
        let errors = run(&mut types.clone(), &ExtractConfig::default());
        assert_eq!(errors.len(), 1);

        let relaxed = ExtractConfig {
            strict_discriminants: false,
            ..ExtractConfig::default()
        };
        assert!(run(&mut types, &relaxed).is_empty());
    }
}
