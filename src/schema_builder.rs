use crate::config::ExtractConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::directives::{self, DirectiveChecker};
use crate::inheritance;
use crate::model::{DeclId, ModuleSet, Span};
use crate::schema::{
    DirectiveDefinition, ExternalType, FieldDefinition, ObjectType, Operation, ResolverBinding,
    SchemaIr, SchemaOutput, TypeDefinition,
};
use crate::schema_generator::{BuiltType, DerivedContext, Generated, OperationRoot, TypeOrigin};
use crate::type_resolver::BuiltinScalar;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Schema builder - merges generated definitions into one [`SchemaIr`]
pub struct SchemaBuilder {
    types: Vec<BuiltType>,
    directives: Vec<DirectiveDefinition>,
    root_fields: Vec<(Operation, FieldDefinition)>,
    extensions: Vec<(String, FieldDefinition)>,
    operations: Vec<OperationRoot>,
    derived: Vec<DerivedContext>,
    /// Root type name per operation, once attached.
    roots: BTreeMap<Operation, String>,
}

impl SchemaBuilder {
    pub fn new(generated: Generated) -> Self {
        debug!(
            "Initializing SchemaBuilder with {} types and {} directives",
            generated.types.len(),
            generated.directives.len()
        );
        Self {
            types: generated.types,
            directives: generated.directives,
            root_fields: generated.root_fields,
            extensions: generated
                .extensions
                .into_iter()
                .map(|e| (e.type_name, e.field))
                .collect(),
            operations: generated.operations,
            derived: generated.derived,
            roots: BTreeMap::new(),
        }
    }

    /// Adds root fields and function fields to their types, creating
    /// operation roots that were not declared.
    pub fn attach_fields(&mut self, sink: &mut DiagnosticSink) {
        for operation in Operation::ALL {
            let claims: Vec<&OperationRoot> = self
                .operations
                .iter()
                .filter(|root| root.operation == operation)
                .collect();
            if let Some(first) = claims.first() {
                for other in &claims[1..] {
                    sink.push(
                        Diagnostic::semantic(
                            other.span,
                            format!(
                                "Both `{}` and `{}` are marked as the {:?} root type.",
                                first.type_name, other.type_name, operation
                            ),
                        )
                        .with_related(first.span, "first root declared here"),
                    );
                }
                self.roots.insert(operation, first.type_name.clone());
            }
        }

        let root_fields = std::mem::take(&mut self.root_fields);
        for (operation, field) in root_fields {
            let type_name = match self.roots.get(&operation) {
                Some(name) => name.clone(),
                None => {
                    let name = operation.default_type_name().to_string();
                    if self.position(&name).is_none() {
                        debug!("Synthesizing root type `{}`", name);
                        self.types.push(BuiltType {
                            definition: TypeDefinition::Object(ObjectType {
                                name: name.clone(),
                                description: None,
                                interfaces: Vec::new(),
                                discriminant: None,
                                fields: Vec::new(),
                                directives: Vec::new(),
                                span: field.span,
                            }),
                            origin: TypeOrigin::default(),
                        });
                    }
                    self.roots.insert(operation, name.clone());
                    name
                }
            };
            self.extend(&type_name, field, sink);
        }

        let extensions = std::mem::take(&mut self.extensions);
        for (type_name, field) in extensions {
            self.extend(&type_name, field, sink);
        }

        for built in &self.types {
            let (name, fields) = match &built.definition {
                TypeDefinition::Object(object) => (&object.name, &object.fields),
                TypeDefinition::Interface(interface) => (&interface.name, &interface.fields),
                _ => continue,
            };
            let mut seen: HashMap<&str, Span> = HashMap::new();
            for field in fields {
                match seen.get(field.name.as_str()) {
                    Some(first) => sink.push(
                        Diagnostic::semantic(
                            field.span,
                            format!("Duplicate field `{}` on type `{}`.", field.name, name),
                        )
                        .with_related(*first, "also defined here"),
                    ),
                    None => {
                        seen.insert(&field.name, field.span);
                    }
                }
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t.definition.name() == name)
    }

    fn extend(&mut self, type_name: &str, field: FieldDefinition, sink: &mut DiagnosticSink) {
        let Some(index) = self.position(type_name) else {
            sink.syntax(
                field.span,
                format!("Cannot add field `{}` to unknown type `{}`.", field.name, type_name),
            );
            return;
        };
        match &mut self.types[index].definition {
            TypeDefinition::Object(object) => object.fields.push(Arc::new(field)),
            TypeDefinition::Interface(interface) => interface.fields.push(Arc::new(field)),
            other => {
                let kind = other.kind_label();
                let span = other.span();
                sink.push(
                    Diagnostic::syntax(
                        field.span,
                        format!(
                            "Cannot add field `{}` to `{}`, which is {} {}, not an object type.",
                            field.name,
                            type_name,
                            if kind.starts_with(['a', 'e', 'i', 'o', 'u']) {
                                "an"
                            } else {
                                "a"
                            },
                            kind
                        ),
                    )
                    .with_related(span, "declared here"),
                );
            }
        }
    }

    /// Validates directive applications and coerces every default value.
    pub fn check_directives(&mut self, sink: &mut DiagnosticSink) {
        directives::check_definitions(&self.directives, sink);
        let definitions = self.directives.clone();
        let builtins = directives::builtin_directives();
        let checker = DirectiveChecker::new(
            &definitions,
            &builtins,
            self.types.iter().map(|t| &t.definition),
        );
        for built in &mut self.types {
            checker.check_type(&mut built.definition, sink);
        }
        checker.check_definition_defaults(&mut self.directives, sink);
    }

    pub fn resolve_inheritance(&mut self, config: &ExtractConfig, sink: &mut DiagnosticSink) {
        inheritance::resolve_inheritance(&mut self.types, config, sink);
    }

    /// Reports derived contexts produced by more than one function and
    /// functions that depend on their own output.
    pub fn check_derived_contexts(&self, modules: &ModuleSet, sink: &mut DiagnosticSink) {
        let mut producers: BTreeMap<DeclId, Vec<DeclId>> = BTreeMap::new();
        for derived in &self.derived {
            producers
                .entry(derived.provides)
                .or_default()
                .push(derived.function);
        }
        for (provided, functions) in &producers {
            let Some((&first, rest)) = functions.split_first() else {
                continue;
            };
            for &other in rest {
                sink.push(
                    Diagnostic::semantic(
                        modules.declaration(other).name_span,
                        format!(
                            "Multiple derived context functions produce `{}`: `{}` and `{}`.",
                            modules.declaration(*provided).name,
                            modules.declaration(first).name,
                            modules.declaration(other).name
                        ),
                    )
                    .with_related(modules.declaration(first).name_span, "first defined here"),
                );
            }
        }

        // Edges from a provided type to the types its function requires.
        let edges: BTreeMap<DeclId, &DerivedContext> =
            self.derived.iter().map(|d| (d.provides, d)).collect();
        let mut done: HashSet<DeclId> = HashSet::new();
        let mut reported: HashSet<Vec<DeclId>> = HashSet::new();
        for &start in edges.keys() {
            let mut stack = Vec::new();
            self.visit_context(start, &edges, &mut stack, &mut done, &mut reported, modules, sink);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_context(
        &self,
        node: DeclId,
        edges: &BTreeMap<DeclId, &DerivedContext>,
        stack: &mut Vec<DeclId>,
        done: &mut HashSet<DeclId>,
        reported: &mut HashSet<Vec<DeclId>>,
        modules: &ModuleSet,
        sink: &mut DiagnosticSink,
    ) {
        if done.contains(&node) {
            return;
        }
        let Some(derived) = edges.get(&node) else {
            done.insert(node);
            return;
        };
        stack.push(node);
        for &(required, span) in &derived.requires {
            if let Some(position) = stack.iter().position(|&n| n == required) {
                let cycle = &stack[position..];
                let mut key = cycle.to_vec();
                key.sort_unstable();
                if reported.insert(key) {
                    let path = cycle
                        .iter()
                        .chain(std::iter::once(&required))
                        .filter_map(|id| edges.get(id))
                        .map(|d| modules.declaration(d.function).name.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    sink.semantic(
                        span,
                        format!("Derived context cycle detected: {}.", path),
                    );
                }
                continue;
            }
            self.visit_context(required, edges, stack, done, reported, modules, sink);
        }
        stack.pop();
        done.insert(node);
    }

    /// Final assembly: name checks, deterministic ordering and the resolver map.
    pub fn build(
        self,
        externals: &BTreeMap<String, Option<String>>,
        sink: &mut DiagnosticSink,
    ) -> SchemaOutput {
        debug!("Building final schema");
        let mut types: Vec<TypeDefinition> = Vec::with_capacity(self.types.len());
        let mut seen: HashMap<String, Span> = HashMap::new();
        for built in self.types {
            let definition = built.definition;
            let name = definition.name().to_string();
            if name.starts_with("__") || BuiltinScalar::from_schema_name(&name).is_some() {
                sink.semantic(
                    definition.span(),
                    format!("Type name `{}` is reserved. Choose a different name.", name),
                );
                continue;
            }
            if let Some(first) = seen.get(&name) {
                sink.push(
                    Diagnostic::semantic(
                        definition.span(),
                        format!("Duplicate type name `{}`.", name),
                    )
                    .with_related(*first, "also defined here"),
                );
                continue;
            }
            seen.insert(name, definition.span());
            types.push(definition);
        }

        for definition in &mut types {
            sort_definition(definition);
        }
        types.sort_by(|a, b| a.name().cmp(b.name()));

        let mut directives = self.directives;
        directives.sort_by(|a, b| a.name.cmp(&b.name));

        let resolvers: BTreeMap<String, ResolverBinding> = types
            .iter()
            .filter_map(|t| match t {
                TypeDefinition::Object(object) => Some(object),
                _ => None,
            })
            .flat_map(|object| {
                object
                    .fields
                    .iter()
                    .map(move |f| (format!("{}.{}", object.name, f.name), f.resolver.clone()))
            })
            .collect();

        let root = |operation: Operation| {
            self.roots
                .get(&operation)
                .filter(|name| types.iter().any(|t| t.name() == name.as_str()))
                .cloned()
        };
        let (query, mutation, subscription) = (
            root(Operation::Query),
            root(Operation::Mutation),
            root(Operation::Subscription),
        );
        let schema = SchemaIr {
            query,
            mutation,
            subscription,
            types,
            directives,
            externals: externals
                .iter()
                .map(|(name, location)| ExternalType {
                    name: name.clone(),
                    location: location.clone(),
                })
                .collect(),
        };

        debug!(
            "Schema has {} types, {} directives and {} resolvers",
            schema.types.len(),
            schema.directives.len(),
            resolvers.len()
        );
        SchemaOutput { schema, resolvers }
    }
}

/// Orders fields, interfaces and union members by name. Arguments, input
/// fields and enum values keep declaration order.
fn sort_definition(definition: &mut TypeDefinition) {
    match definition {
        TypeDefinition::Object(object) => {
            object.fields.sort_by(|a, b| a.name.cmp(&b.name));
            object.interfaces.sort();
        }
        TypeDefinition::Interface(interface) => {
            interface.fields.sort_by(|a, b| a.name.cmp(&b.name));
            interface.interfaces.sort();
        }
        TypeDefinition::Union(union) => union.members.sort(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use crate::schema::{ResolverTarget, ScalarType, SemanticNullability, TypeRef};
    use crate::schema_generator::FieldExtension;
    use pretty_assertions::assert_eq;

    fn span(at: u32) -> Span {
        Span::new(FileId(0), at, at + 1)
    }

    fn field(name: &str, at: u32) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            description: None,
            ty: TypeRef::named("String").non_null(),
            arguments: Vec::new(),
            deprecation_reason: None,
            semantic_nullability: SemanticNullability::Loose,
            kills_parent_on_exception: false,
            directives: Vec::new(),
            resolver: ResolverBinding {
                target: ResolverTarget::Property {
                    name: name.to_string(),
                },
                parameters: Vec::new(),
                is_async: false,
            },
            span: span(at),
        }
    }

    fn object(name: &str, fields: Vec<FieldDefinition>, at: u32) -> BuiltType {
        BuiltType {
            definition: TypeDefinition::Object(ObjectType {
                name: name.to_string(),
                description: None,
                interfaces: Vec::new(),
                discriminant: None,
                fields: fields.into_iter().map(Arc::new).collect(),
                directives: Vec::new(),
                span: span(at),
            }),
            origin: TypeOrigin::default(),
        }
    }

    fn finish(generated: Generated) -> (SchemaOutput, Vec<String>) {
        let mut sink = DiagnosticSink::new();
        let mut builder = SchemaBuilder::new(generated);
        builder.attach_fields(&mut sink);
        builder.check_directives(&mut sink);
        builder.resolve_inheritance(&ExtractConfig::default(), &mut sink);
        let output = builder.build(&BTreeMap::new(), &mut sink);
        (output, sink.finish().into_iter().map(|d| d.message).collect())
    }

    #[test]
    fn test_root_type_is_synthesized() {
        let generated = Generated {
            root_fields: vec![
                (Operation::Query, field("viewer", 10)),
                (Operation::Query, field("me", 20)),
            ],
            ..Generated::default()
        };
        let (output, errors) = finish(generated);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(output.schema.query.as_deref(), Some("Query"));
        assert_eq!(output.schema.mutation, None);
        let query = output.schema.object("Query").unwrap();
        let names: Vec<_> = query.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["me", "viewer"]);
        assert!(output.resolvers.contains_key("Query.viewer"));
    }

    #[test]
    fn test_declared_operation_root_receives_fields() {
        let generated = Generated {
            types: vec![object("RootQuery", vec![field("version", 1)], 0)],
            operations: vec![OperationRoot {
                operation: Operation::Query,
                type_name: "RootQuery".to_string(),
                span: span(0),
            }],
            root_fields: vec![(Operation::Query, field("viewer", 10))],
            ..Generated::default()
        };
        let (output, errors) = finish(generated);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(output.schema.query.as_deref(), Some("RootQuery"));
        assert!(output.schema.get_type("Query").is_none());
        assert_eq!(output.schema.object("RootQuery").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_duplicate_field_from_extension() {
        let generated = Generated {
            types: vec![object("User", vec![field("name", 1)], 0)],
            extensions: vec![FieldExtension {
                type_name: "User".to_string(),
                field: field("name", 30),
            }],
            ..Generated::default()
        };
        let (_, errors) = finish(generated);
        assert_eq!(errors, vec!["Duplicate field `name` on type `User`.".to_string()]);
    }

    #[test]
    fn test_duplicate_and_reserved_type_names() {
        let generated = Generated {
            types: vec![
                object("User", Vec::new(), 0),
                object("User", Vec::new(), 50),
                BuiltType {
                    definition: TypeDefinition::Scalar(ScalarType {
                        name: "String".to_string(),
                        description: None,
                        directives: Vec::new(),
                        span: span(80),
                    }),
                    origin: TypeOrigin::default(),
                },
            ],
            ..Generated::default()
        };
        let (_, errors) = finish(generated);
        assert_eq!(
            errors,
            vec![
                "Duplicate type name `User`.".to_string(),
                "Type name `String` is reserved. Choose a different name.".to_string()
            ]
        );
    }

    #[test]
    fn test_types_are_sorted() {
        let generated = Generated {
            types: vec![
                object("Zebra", vec![field("b", 1), field("a", 2)], 0),
                object("Apple", Vec::new(), 10),
            ],
            ..Generated::default()
        };
        let (output, _) = finish(generated);
        let names: Vec<_> = output.schema.types.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["Apple", "Zebra"]);
        let zebra = output.schema.object("Zebra").unwrap();
        assert_eq!(zebra.fields[0].name, "a");
    }

    fn context_messages(code: &str) -> Vec<String> {
        let modules = crate::lower::lower_sources(&[("src/context.rs", code)]).unwrap();
        match crate::extract::extract_modules(&modules, &ExtractConfig::default()).unwrap() {
            Ok(_) => Vec::new(),
            Err(diagnostics) => diagnostics.into_iter().map(|d| d.message).collect(),
        }
    }

    #[test]
    fn test_derived_context_chain() {
        let messages = context_messages(
            r#"
/// @gqlContext
pub struct AppContext { pub token: String }
pub struct Session { pub user_id: String }
pub struct Viewer { pub name: String }

/// @gqlContext
pub fn session(ctx: &AppContext) -> Session { todo!() }

/// @gqlContext
pub fn viewer(session: &Session) -> Viewer { todo!() }

/// @gqlQueryField
pub fn me(viewer: &Viewer) -> String { String::new() }
"#,
        );
        assert!(messages.is_empty(), "{:?}", messages);
    }

    #[test]
    fn test_derived_context_cycle() {
        let messages = context_messages(
            r#"
pub struct A { pub x: i32 }
pub struct B { pub y: i32 }

/// @gqlContext
pub fn a(b: &B) -> A { todo!() }

/// @gqlContext
pub fn b(a: &A) -> B { todo!() }
"#,
        );
        assert_eq!(
            messages,
            vec!["Derived context cycle detected: a -> b -> a.".to_string()]
        );
    }

    #[test]
    fn test_transitive_derived_context_cycle() {
        let messages = context_messages(
            r#"
pub struct A { pub x: i32 }
pub struct B { pub y: i32 }
pub struct C { pub z: i32 }

/// @gqlContext
pub fn a(c: &C) -> A { todo!() }

/// @gqlContext
pub fn b(a: &A) -> B { todo!() }

/// @gqlContext
pub fn c(b: &B) -> C { todo!() }
"#,
        );
        assert_eq!(
            messages,
            vec!["Derived context cycle detected: a -> c -> b -> a.".to_string()]
        );
    }

    #[test]
    fn test_derived_context_with_two_producers() {
        let messages = context_messages(
            r#"
/// @gqlContext
pub struct AppContext { pub token: String }
pub struct Viewer { pub name: String }

/// @gqlContext
pub fn viewer_from_token(ctx: &AppContext) -> Viewer { todo!() }

/// @gqlContext
pub fn viewer_from_cookie(ctx: &AppContext) -> Viewer { todo!() }
"#,
        );
        assert_eq!(
            messages,
            vec![
                "Multiple derived context functions produce `Viewer`: `viewer_from_token` and `viewer_from_cookie`."
                    .to_string()
            ]
        );
    }
}
