use crate::collector::{CollectedField, FieldSource, Role};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::field_binder::{self, ParamShape, Slot};
use crate::literal;
use crate::model::{
    DeclId, DeclKind, Expr, ModuleId, ParamDecl, ParamPattern, PropertyDecl, Signature, Span,
    TypeExpr, TypeExprKind,
};
use crate::schema::{
    DirectiveApplication, DirectiveDefinition, EnumType, EnumValue, FieldDefinition,
    InputObjectType, InputValue, InterfaceType, ObjectType, Operation, ParameterRole,
    ResolverBinding, ResolverTarget, ScalarType, SemanticNullability, TypeDefinition, TypeRef,
    UnionType,
};
use crate::session::{GenericScope, Pending, Session};
use crate::tags::{self, ParsedDoc};
use crate::type_resolver::TypeContext;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Reason used when `@deprecated` carries no text.
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// A type named in an inheritance position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub name: String,
    pub span: Span,
}

/// The literal kind marker of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminant {
    pub value: String,
    pub span: Span,
}

/// Where a definition came from, for the cross-declaration passes.
#[derive(Debug, Clone, Default)]
pub struct TypeOrigin {
    /// Concrete parent type (program-level inheritance)
    pub parent: Option<ParentRef>,
    /// Implemented or extended interfaces, in declaration order
    pub interfaces: Vec<ParentRef>,
    pub discriminant: Option<Discriminant>,
}

#[derive(Debug, Clone)]
pub struct BuiltType {
    pub definition: TypeDefinition,
    pub origin: TypeOrigin,
}

/// A derived-context function and the context values it consumes.
#[derive(Debug, Clone)]
pub struct DerivedContext {
    pub function: DeclId,
    pub provides: DeclId,
    pub requires: Vec<(DeclId, Span)>,
}

/// A field contributed from outside the type's own declaration.
#[derive(Debug, Clone)]
pub struct FieldExtension {
    pub type_name: String,
    pub field: FieldDefinition,
}

/// A type that roots one operation.
#[derive(Debug, Clone)]
pub struct OperationRoot {
    pub operation: Operation,
    pub type_name: String,
    pub span: Span,
}

/// Everything the definition builder produced.
#[derive(Debug, Default)]
pub struct Generated {
    pub types: Vec<BuiltType>,
    pub directives: Vec<DirectiveDefinition>,
    pub root_fields: Vec<(Operation, FieldDefinition)>,
    pub extensions: Vec<FieldExtension>,
    pub operations: Vec<OperationRoot>,
    pub derived: Vec<DerivedContext>,
}

/// The type that owns the fields being built.
struct FieldOwner<'m> {
    module: ModuleId,
    scope: Rc<GenericScope<'m>>,
    type_name: String,
    operation: Option<Operation>,
    /// Free function whose first parameter is the parent value.
    functional: bool,
}

/// Schema generator - turns collected declarations into schema definitions
///
/// Types are built from a worklist: every non-generic tagged type is queued
/// up front, and generic instances are queued by the type resolver the
/// first time they are referenced. Each entry is built exactly once.
pub struct SchemaGenerator<'s, 'm> {
    session: &'s mut Session<'m>,
    output: Generated,
}

impl<'s, 'm> SchemaGenerator<'s, 'm> {
    pub fn new(session: &'s mut Session<'m>) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            session,
            output: Generated::default(),
        }
    }

    /// Builds every definition reachable from the collected declarations.
    pub fn generate(mut self) -> Result<Generated> {
        self.register_derived_contexts()?;

        let queued: Vec<(DeclId, String)> = self
            .session
            .collection
            .declarations
            .values()
            .filter(|c| {
                c.role.is_schema_type()
                    && !matches!(c.role, Role::External { .. })
                    && c.decl.generics.is_empty()
            })
            .map(|c| (c.id, c.name.clone()))
            .collect();
        for (id, name) in queued {
            self.session.enqueue(Pending {
                id,
                name,
                scope: GenericScope::empty(),
            });
        }

        self.build_directive_definitions()?;
        self.build_root_fields()?;
        self.build_functional_fields()?;

        let mut built = 0usize;
        while let Some(pending) = self.session.next_pending() {
            debug!("Building `{}`", pending.name);
            if let Some(definition) = self.build_type(&pending)? {
                self.output.types.push(definition);
            }
            built += 1;
        }
        debug!(
            "Built {} definitions ({} generic instances)",
            built,
            self.session.instance_count()
        );

        Ok(self.output)
    }

    fn register_derived_contexts(&mut self) -> Result<()> {
        let functions: Vec<DeclId> = self
            .session
            .collection
            .with_role(|role| *role == Role::DerivedContext)
            .map(|c| c.id)
            .collect();

        let mut provided = Vec::new();
        for id in functions {
            let decl = self.session.declaration(id);
            let DeclKind::Function(signature) = &decl.kind else {
                continue;
            };
            let target = match &signature.returns {
                Some(returns) => {
                    self.session
                        .referenced_declaration(returns, id.module, &GenericScope::empty())?
                }
                None => None,
            };
            let Some(target) = target else {
                self.session.sink.syntax(
                    decl.name_span,
                    format!(
                        "Derived context function `{}` must return the named type it provides.",
                        decl.name
                    ),
                );
                continue;
            };
            self.session
                .derived_contexts
                .entry(target)
                .or_default()
                .push(id);
            provided.push((id, target, signature));
        }

        for (id, target, signature) in provided {
            let mut requires = Vec::new();
            for param in &signature.params {
                let dependency = match &param.ty {
                    Some(ty) => self
                        .session
                        .referenced_declaration(ty, id.module, &GenericScope::empty())?,
                    None => None,
                };
                match dependency {
                    Some(dep)
                        if self.session.is_root_context(dep)
                            || self.session.is_derived_context(dep) =>
                    {
                        requires.push((dep, param.span));
                    }
                    _ => {
                        let function = &self.session.declaration(id).name;
                        self.session.sink.syntax(
                            param.span,
                            format!(
                                "Parameters of derived context function `{}` must be context values: the `@gqlContext` type or another derived context.",
                                function
                            ),
                        );
                    }
                }
            }
            self.output.derived.push(DerivedContext {
                function: id,
                provides: target,
                requires,
            });
        }
        Ok(())
    }

    fn build_type(&mut self, pending: &Pending<'m>) -> Result<Option<BuiltType>> {
        let Some(collected) = self.session.collected(pending.id) else {
            return Ok(None);
        };
        let role = collected.role.clone();
        let decl = collected.decl;
        let doc = collected.doc.clone();
        let fields = collected.fields.clone();
        let implements = collected.implements.clone();
        let operation = collected.operation;
        let module = pending.id.module;
        let name = pending.name.clone();
        let span = decl.name_span;
        let directives = applications(&doc);
        let description = doc.description.clone();

        let root = match role {
            Role::Object => operation.or_else(|| root_operation(&name)),
            _ => None,
        };
        let owner = FieldOwner {
            module,
            scope: pending.scope.clone(),
            type_name: name.clone(),
            operation: root,
            functional: false,
        };

        let built = match (&role, &decl.kind) {
            (Role::Object, DeclKind::Struct(structure)) => {
                let fields = self.build_fields(&fields, &owner)?;
                let mut origin = TypeOrigin::default();
                if let Some(parent) = &structure.extends {
                    origin.parent = self.parent_of_kind(parent, &owner, Role::Object)?;
                }
                for interface in &structure.implements {
                    if let Some(parent) = self.parent_of_kind(interface, &owner, Role::Interface)? {
                        origin.interfaces.push(parent);
                    }
                }
                self.explicit_interfaces(&implements, module, &mut origin.interfaces)?;
                origin.discriminant = discriminant(&structure.properties);

                if let Some(operation) = root {
                    self.output.operations.push(OperationRoot {
                        operation,
                        type_name: name.clone(),
                        span: doc
                            .find(tags::TagName::OperationType)
                            .map(|tag| tag.span)
                            .unwrap_or(span),
                    });
                }

                BuiltType {
                    definition: TypeDefinition::Object(ObjectType {
                        name,
                        description,
                        interfaces: Vec::new(),
                        discriminant: origin.discriminant.as_ref().map(|d| d.value.clone()),
                        fields: fields.into_iter().map(Into::into).collect(),
                        directives,
                        span,
                    }),
                    origin,
                }
            }
            (Role::Interface, DeclKind::Trait(trait_decl)) => {
                let fields = self.build_fields(&fields, &owner)?;
                let mut origin = TypeOrigin::default();
                for parent in &trait_decl.extends {
                    if let Some(parent) = self.parent_of_kind(parent, &owner, Role::Interface)? {
                        origin.interfaces.push(parent);
                    }
                }
                self.explicit_interfaces(&implements, module, &mut origin.interfaces)?;
                BuiltType {
                    definition: TypeDefinition::Interface(InterfaceType {
                        name,
                        description,
                        interfaces: Vec::new(),
                        fields: fields.into_iter().map(Into::into).collect(),
                        directives,
                        span,
                    }),
                    origin,
                }
            }
            (Role::Union, DeclKind::Enum(_)) => {
                let members = self.union_members(pending, &name)?;
                BuiltType {
                    definition: TypeDefinition::Union(UnionType {
                        name,
                        description,
                        members,
                        directives,
                        span,
                    }),
                    origin: TypeOrigin::default(),
                }
            }
            (Role::Enum, DeclKind::Enum(_)) => {
                let values = self.enum_values(pending, &name);
                BuiltType {
                    definition: TypeDefinition::Enum(EnumType {
                        name,
                        description,
                        values,
                        directives,
                        span,
                    }),
                    origin: TypeOrigin::default(),
                }
            }
            (Role::Scalar, _) => BuiltType {
                definition: TypeDefinition::Scalar(ScalarType {
                    name,
                    description,
                    directives,
                    span,
                }),
                origin: TypeOrigin::default(),
            },
            (Role::Input, DeclKind::Struct(_)) => {
                let fields = self.input_fields(pending, &name)?;
                BuiltType {
                    definition: TypeDefinition::InputObject(InputObjectType {
                        name,
                        description,
                        fields,
                        one_of: false,
                        directives,
                        span,
                    }),
                    origin: TypeOrigin::default(),
                }
            }
            (Role::Input, DeclKind::Enum(_)) => {
                let fields = self.one_of_fields(pending, &name)?;
                BuiltType {
                    definition: TypeDefinition::InputObject(InputObjectType {
                        name,
                        description,
                        fields,
                        one_of: true,
                        directives,
                        span,
                    }),
                    origin: TypeOrigin::default(),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(built))
    }

    /// A parent type written in an `impl Trait for` or `Deref` position.
    /// Untagged parents are not schema-relevant and are skipped silently.
    fn parent_of_kind(
        &mut self,
        parent: &'m TypeExpr,
        owner: &FieldOwner<'m>,
        expected: Role,
    ) -> Result<Option<ParentRef>> {
        let Some(id) = self
            .session
            .referenced_declaration(parent, owner.module, &owner.scope)?
        else {
            return Ok(None);
        };
        if self.session.role(id) != Some(&expected) {
            return Ok(None);
        }
        let ctx = TypeContext::output(owner.module, owner.scope.clone());
        Ok(self.session.resolve_type(parent, &ctx)?.map(|resolved| ParentRef {
            name: resolved.ty.named_type().to_string(),
            span: parent.span,
        }))
    }

    /// Interfaces named in `@gqlImplements`; these must be tagged.
    fn explicit_interfaces(
        &mut self,
        names: &[crate::collector::NamedRef],
        module: ModuleId,
        into: &mut Vec<ParentRef>,
    ) -> Result<()> {
        for named in names {
            let resolution = self.session.lookup(module, &named.name)?;
            let target = match resolution {
                crate::host::NameResolution::Declaration(id) => self
                    .session
                    .collected(id)
                    .filter(|c| c.role == Role::Interface && c.decl.generics.is_empty())
                    .map(|c| c.name.clone()),
                _ => None,
            };
            match target {
                Some(name) if !into.iter().any(|p| p.name == name) => into.push(ParentRef {
                    name,
                    span: named.span,
                }),
                Some(_) => {}
                None => self.session.sink.syntax(
                    named.span,
                    format!(
                        "`{}` in `@gqlImplements` is not a non-generic trait tagged `@gqlInterface`.",
                        named.name
                    ),
                ),
            }
        }
        Ok(())
    }

    fn union_members(&mut self, pending: &Pending<'m>, union_name: &str) -> Result<Vec<String>> {
        let variants = match self.session.collected(pending.id) {
            Some(collected) => collected.variants.clone(),
            None => return Ok(Vec::new()),
        };
        let mut members: Vec<(String, Span)> = Vec::new();
        for member in variants {
            let variant = member.variant;
            let Some(payload) = &variant.payload else {
                self.session.sink.syntax(
                    variant.name_span,
                    format!(
                        "Variant `{}` of union `{}` must wrap exactly one object type, e.g. `{}({})`.",
                        variant.name, union_name, variant.name, variant.name
                    ),
                );
                continue;
            };
            let Some(id) = self.session.referenced_declaration(
                payload,
                pending.id.module,
                &pending.scope,
            )?
            else {
                let ctx = TypeContext::output(pending.id.module, pending.scope.clone());
                // Reports why the payload is not a schema type.
                self.session.resolve_type(payload, &ctx)?;
                continue;
            };
            let member_decl = self.session.declaration(id);
            match self.session.role(id).cloned() {
                Some(Role::Object) => {}
                Some(role @ (Role::Interface | Role::Union)) => {
                    let kind = if role == Role::Union {
                        "a union"
                    } else {
                        "an interface"
                    };
                    self.session.sink.push(
                        Diagnostic::semantic(
                            payload.span,
                            format!(
                                "Invalid union member kind: member `{}` of union `{}` is {}. Union members must be object types.",
                                member_decl.name, union_name, kind
                            ),
                        )
                        .with_related(member_decl.name_span, "declared here"),
                    );
                    continue;
                }
                _ => {
                    let ctx = TypeContext::output(pending.id.module, pending.scope.clone());
                    if self.session.resolve_type(payload, &ctx)?.is_some() {
                        self.session.sink.syntax(
                            payload.span,
                            format!(
                                "Invalid union member kind: members of union `{}` must be object types tagged `@gqlType`.",
                                union_name
                            ),
                        );
                    }
                    continue;
                }
            }

            let ctx = TypeContext::output(pending.id.module, pending.scope.clone());
            if let Some(resolved) = self.session.resolve_type(payload, &ctx)? {
                if resolved.ty.is_list() || resolved.explicit_nullable {
                    self.session.sink.syntax(
                        payload.span,
                        "Union members must be plain object types, not lists or `Option`.",
                    );
                    continue;
                }
                let name = resolved.ty.named_type().to_string();
                if let Some((_, first)) = members.iter().find(|(m, _)| *m == name) {
                    self.session.sink.push(
                        Diagnostic::semantic(
                            payload.span,
                            format!("Type `{}` appears twice in union `{}`.", name, union_name),
                        )
                        .with_related(*first, "first listed here"),
                    );
                    continue;
                }
                members.push((name, payload.span));
            }
        }
        Ok(members.into_iter().map(|(name, _)| name).collect())
    }

    fn enum_values(&mut self, pending: &Pending<'m>, enum_name: &str) -> Vec<EnumValue> {
        let variants = match self.session.collected(pending.id) {
            Some(collected) => collected.variants.clone(),
            None => return Vec::new(),
        };
        let mut values: Vec<EnumValue> = Vec::new();
        for member in variants {
            let variant = member.variant;
            if let Some(payload) = &variant.payload {
                self.session.sink.syntax(
                    payload.span,
                    format!(
                        "Variant `{}` of enum `{}` must not carry data. Use `@gqlUnion` for variants wrapping types.",
                        variant.name, enum_name
                    ),
                );
                continue;
            }
            let name = variant.rename.clone().unwrap_or_else(|| variant.name.clone());
            if !crate::collector::is_valid_name(&name) || matches!(name.as_str(), "true" | "false" | "null") {
                self.session.sink.syntax(
                    variant.name_span,
                    format!("Invalid enum value name `{}`.", name),
                );
                continue;
            }
            if let Some(first) = values.iter().find(|v| v.name == name) {
                self.session.sink.push(
                    Diagnostic::semantic(
                        variant.name_span,
                        format!("Duplicate value `{}` in enum `{}`.", name, enum_name),
                    )
                    .with_related(first.span, "also defined here"),
                );
                continue;
            }
            values.push(EnumValue {
                name,
                description: member.doc.description.clone(),
                deprecation_reason: deprecation_reason(&member.doc),
                directives: applications(&member.doc),
                source_name: variant.name.clone(),
                span: variant.name_span,
            });
        }
        values
    }

    fn input_fields(&mut self, pending: &Pending<'m>, input_name: &str) -> Result<Vec<InputValue>> {
        let properties = match self.session.collected(pending.id) {
            Some(collected) => collected.properties.clone(),
            None => return Ok(Vec::new()),
        };
        let ctx = TypeContext::input(pending.id.module, pending.scope.clone());
        let mut fields = Vec::new();
        for member in properties {
            if let Some(value) = self.property_input(member.property, &member.doc, &ctx)? {
                fields.push(value);
            }
        }
        self.check_unique_inputs(&fields, "field", input_name);
        Ok(fields)
    }

    /// An enum tagged `@gqlInput`: exactly one variant is provided.
    fn one_of_fields(&mut self, pending: &Pending<'m>, input_name: &str) -> Result<Vec<InputValue>> {
        let variants = match self.session.collected(pending.id) {
            Some(collected) => collected.variants.clone(),
            None => return Ok(Vec::new()),
        };
        let ctx = TypeContext::input(pending.id.module, pending.scope.clone());
        let mut fields = Vec::new();
        for member in variants {
            let variant = member.variant;
            let Some(payload) = &variant.payload else {
                self.session.sink.syntax(
                    variant.name_span,
                    format!(
                        "Variant `{}` of input `{}` must wrap exactly one value.",
                        variant.name, input_name
                    ),
                );
                continue;
            };
            let Some(resolved) = self.session.resolve_type(payload, &ctx)? else {
                continue;
            };
            fields.push(InputValue {
                name: variant
                    .rename
                    .clone()
                    .unwrap_or_else(|| lower_first(&variant.name)),
                description: member.doc.description.clone(),
                ty: resolved.ty.nullable(),
                default_value: None,
                deprecation_reason: deprecation_reason(&member.doc),
                directives: applications(&member.doc),
                span: variant.name_span,
            });
        }
        self.check_unique_inputs(&fields, "field", input_name);
        Ok(fields)
    }

    /// An input field or argument backed by a struct property.
    fn property_input(
        &mut self,
        property: &'m PropertyDecl,
        doc: &ParsedDoc,
        ctx: &TypeContext<'m>,
    ) -> Result<Option<InputValue>> {
        let Some(ty) = &property.ty else {
            self.session.sink.syntax(
                property.name_span,
                format!("Missing type annotation on `{}`.", property.name),
            );
            return Ok(None);
        };
        let Some(resolved) = self.session.resolve_type(ty, ctx)? else {
            return Ok(None);
        };
        let name = property
            .rename
            .clone()
            .unwrap_or_else(|| crate::collector::camel_case(&property.name));
        let default_value = self.default_value(property.default.as_ref());
        Ok(Some(self.input_value(
            name,
            resolved.ty,
            default_value,
            doc,
            property.name_span,
        )))
    }

    fn input_value(
        &mut self,
        name: String,
        ty: TypeRef,
        default_value: Option<literal::ConstValue>,
        doc: &ParsedDoc,
        span: Span,
    ) -> InputValue {
        if let Some(deprecated) = &doc.deprecated {
            if ty.is_non_null() && default_value.is_none() {
                self.session.sink.push(
                    Diagnostic::syntax(
                        deprecated.span,
                        format!(
                            "Deprecated argument `{}` must be optional. Make it `Option<T>` or give it a default value.",
                            name
                        ),
                    )
                    .with_related(span, "required argument declared here"),
                );
            }
        }
        InputValue {
            name,
            description: doc.description.clone(),
            ty,
            default_value,
            deprecation_reason: deprecation_reason(doc),
            directives: applications(doc),
            span,
        }
    }

    fn default_value(&mut self, expr: Option<&Expr>) -> Option<literal::ConstValue> {
        match literal::evaluate(expr?) {
            Ok(value) => Some(value),
            Err(err) => {
                self.session.sink.syntax(err.span, err.message);
                None
            }
        }
    }

    fn check_unique_inputs(&mut self, values: &[InputValue], what: &str, owner: &str) {
        let mut seen: HashMap<&str, Span> = HashMap::new();
        for value in values {
            if let Some(first) = seen.get(value.name.as_str()) {
                self.session.sink.push(
                    Diagnostic::semantic(
                        value.span,
                        format!("Duplicate {} name `{}` on `{}`.", what, value.name, owner),
                    )
                    .with_related(*first, "also defined here"),
                );
            } else {
                seen.insert(value.name.as_str(), value.span);
            }
        }
    }

    fn build_directive_definitions(&mut self) -> Result<()> {
        let directives: Vec<_> = self
            .session
            .collection
            .with_role(|role| matches!(role, Role::Directive { .. }))
            .map(|c| (c.id, c.name.clone(), c.role.clone(), c.doc.clone()))
            .collect();

        for (id, name, role, doc) in directives {
            let Role::Directive {
                repeatable,
                locations,
            } = role
            else {
                continue;
            };
            let decl = self.session.declaration(id);
            let DeclKind::Function(signature) = &decl.kind else {
                continue;
            };
            let ctx = TypeContext::input(id.module, GenericScope::empty());
            let mut arguments = Vec::new();
            for param in &signature.params {
                let (Some(ident), Some(ty)) = (param.ident(), &param.ty) else {
                    self.session.sink.syntax(
                        param.span,
                        "Directive arguments must be named, typed parameters.",
                    );
                    continue;
                };
                let Some(resolved) = self.session.resolve_type(ty, &ctx)? else {
                    continue;
                };
                let default_value = self.default_value(param.default.as_ref());
                arguments.push(self.input_value(
                    crate::collector::camel_case(ident),
                    resolved.ty,
                    default_value,
                    &ParsedDoc::default(),
                    param.span,
                ));
            }
            self.check_unique_inputs(&arguments, "argument", &format!("@{}", name));
            self.output.directives.push(DirectiveDefinition {
                name,
                description: doc.description.clone(),
                locations,
                arguments,
                repeatable,
                span: decl.name_span,
            });
        }
        Ok(())
    }

    fn build_root_fields(&mut self) -> Result<()> {
        let roots = self.session.collection.root_fields.clone();
        for root in roots {
            let owner = FieldOwner {
                module: root.field.module,
                scope: GenericScope::empty(),
                type_name: root.operation.default_type_name().to_string(),
                operation: Some(root.operation),
                functional: false,
            };
            if let Some(field) = self.build_field(&root.field, &owner)? {
                self.output.root_fields.push((root.operation, field));
            }
        }
        Ok(())
    }

    /// Free functions whose first parameter names the type they extend.
    fn build_functional_fields(&mut self) -> Result<()> {
        let fields = self.session.collection.functional_fields.clone();
        for field in fields {
            let Some(signature) = field.source.signature() else {
                continue;
            };
            let parent = match signature.params.first() {
                Some(param) => self.functional_parent(param, field.module)?,
                None => None,
            };
            let Some(type_name) = parent else {
                self.session.sink.syntax(
                    field.source.host_name_span(),
                    format!(
                        "Function field `{}` must take the type it extends as its first parameter, and that type must be a non-generic struct tagged `@gqlType` or trait tagged `@gqlInterface`.",
                        field.source.host_name()
                    ),
                );
                continue;
            };
            let owner = FieldOwner {
                module: field.module,
                scope: GenericScope::empty(),
                operation: root_operation(&type_name),
                type_name: type_name.clone(),
                functional: true,
            };
            if let Some(definition) = self.build_field(&field, &owner)? {
                self.output.extensions.push(FieldExtension {
                    type_name,
                    field: definition,
                });
            }
        }
        Ok(())
    }

    fn functional_parent(&mut self, param: &'m ParamDecl, module: ModuleId) -> Result<Option<String>> {
        let Some(ty) = &param.ty else {
            return Ok(None);
        };
        let Some(id) = self
            .session
            .referenced_declaration(ty, module, &GenericScope::empty())?
        else {
            return Ok(None);
        };
        Ok(self
            .session
            .collected(id)
            .filter(|c| matches!(c.role, Role::Object | Role::Interface))
            .filter(|c| c.decl.generics.is_empty())
            .map(|c| c.name.clone()))
    }

    fn build_fields(
        &mut self,
        fields: &[CollectedField<'m>],
        owner: &FieldOwner<'m>,
    ) -> Result<Vec<FieldDefinition>> {
        let mut built = Vec::with_capacity(fields.len());
        for field in fields {
            if let Some(definition) = self.build_field(field, owner)? {
                built.push(definition);
            }
        }
        Ok(built)
    }

    fn build_field(
        &mut self,
        field: &CollectedField<'m>,
        owner: &FieldOwner<'m>,
    ) -> Result<Option<FieldDefinition>> {
        let module_path = self.session.modules.module(field.module).path.clone();
        let mut ctx = TypeContext::output(owner.module, owner.scope.clone());
        if owner.operation == Some(Operation::Subscription) {
            ctx = ctx.with_stream();
        }

        let (return_type, signature, target, skip_params) = match field.source {
            FieldSource::Property(property) => (
                property.ty.as_ref(),
                None,
                ResolverTarget::Property {
                    name: property.name.clone(),
                },
                0,
            ),
            FieldSource::Method(method) => (
                method.signature.returns.as_ref(),
                Some(&method.signature),
                ResolverTarget::Method {
                    name: method.name.clone(),
                },
                0,
            ),
            FieldSource::StaticMethod { owner: host_owner, method } => (
                method.signature.returns.as_ref(),
                Some(&method.signature),
                ResolverTarget::StaticMethod {
                    owner: host_owner.to_string(),
                    name: method.name.clone(),
                    module: module_path.clone(),
                },
                0,
            ),
            FieldSource::Function { decl, signature } => (
                signature.returns.as_ref(),
                Some(signature),
                ResolverTarget::Function {
                    name: decl.name.clone(),
                    module: module_path.clone(),
                },
                usize::from(owner.functional),
            ),
        };

        let Some(return_type) = return_type else {
            self.session.sink.syntax(
                field.source.host_name_span(),
                format!(
                    "Field `{}` on `{}` must declare its type.",
                    field.name, owner.type_name
                ),
            );
            return Ok(None);
        };

        let resolved = self.session.resolve_type(return_type, &ctx)?;
        let binding = match signature {
            Some(signature) => self.bind_parameters(signature, skip_params, owner)?,
            None => Some((Vec::new(), Vec::new())),
        };
        let (Some(resolved), Some((arguments, mut parameters))) = (resolved, binding) else {
            return Ok(None);
        };

        if owner.operation == Some(Operation::Subscription) && !resolved.is_stream {
            self.session.sink.syntax(
                return_type.span,
                format!(
                    "Subscription field `{}` must return an async iterable, e.g. `impl Stream<Item = T>`.",
                    field.name
                ),
            );
            return Ok(None);
        }

        if owner.functional {
            parameters.insert(0, ParameterRole::Parent);
        }

        let mut ty = resolved.ty;
        let kills_parent = match field.doc.kills_parent {
            Some(span) if !self.session.config.nullable_by_default => {
                self.session.sink.syntax(
                    span,
                    "`@killsParentOnException` only applies when `nullableByDefault` is enabled; without it the field is already non-null.",
                );
                false
            }
            Some(span) if resolved.explicit_nullable => {
                self.session.sink.syntax(
                    span,
                    format!(
                        "`@killsParentOnException` cannot be used on field `{}`, which is declared `Option<T>`.",
                        field.name
                    ),
                );
                false
            }
            Some(_) => {
                ty = ty.non_null();
                true
            }
            None => false,
        };

        let config = self.session.config;
        let semantic_nullability = if config.strict_semantic_nullability
            && config.nullable_by_default
            && !resolved.explicit_nullable
        {
            SemanticNullability::Strict
        } else {
            SemanticNullability::Loose
        };

        self.check_unique_inputs(&arguments, "argument", &format!("{}.{}", owner.type_name, field.name));

        Ok(Some(FieldDefinition {
            name: field.name.clone(),
            description: field.doc.description.clone(),
            ty,
            arguments,
            deprecation_reason: deprecation_reason(&field.doc),
            semantic_nullability,
            kills_parent_on_exception: kills_parent,
            directives: applications(&field.doc),
            resolver: ResolverBinding {
                target,
                parameters,
                is_async: resolved.is_async
                    || signature.is_some_and(|s| s.is_async),
            },
            span: field.name_span,
        }))
    }

    fn param_shape(
        &mut self,
        param: &'m ParamDecl,
        owner: &FieldOwner<'m>,
    ) -> Result<ParamShape> {
        let Some(ty) = &param.ty else {
            return Ok(ParamShape::Missing);
        };
        if matches!(ty.kind, TypeExprKind::Object(_)) {
            return Ok(ParamShape::Structural);
        }
        if let TypeExprKind::Reference { name, .. } = &ty.kind {
            if owner.scope.get(name).is_none() && self.session.config.is_info_type(name) {
                return Ok(ParamShape::Info);
            }
        }
        let destructured = matches!(param.pattern, ParamPattern::Destructured(_));
        let shape = match self
            .session
            .referenced_declaration(ty, owner.module, &owner.scope)?
        {
            Some(id) if self.session.is_root_context(id) => ParamShape::RootContext,
            Some(id) if self.session.is_derived_context(id) => ParamShape::DerivedContext,
            Some(id)
                if self.session.collected(id).is_none()
                    && matches!(self.session.declaration(id).kind, DeclKind::Struct(_)) =>
            {
                ParamShape::Structural
            }
            _ if destructured => ParamShape::Structural,
            _ => ParamShape::Plain,
        };
        Ok(shape)
    }

    /// Classifies parameters and builds the schema arguments they declare.
    /// The first `skip` parameters are the parent value.
    fn bind_parameters(
        &mut self,
        signature: &'m Signature,
        skip: usize,
        owner: &FieldOwner<'m>,
    ) -> Result<Option<(Vec<InputValue>, Vec<ParameterRole>)>> {
        let params: Vec<&'m ParamDecl> = signature.params.iter().skip(skip).collect();
        let mut shapes = Vec::with_capacity(params.len());
        for &param in &params {
            shapes.push(self.param_shape(param, owner)?);
        }

        let slots = match field_binder::classify(&shapes) {
            Ok(slots) => slots,
            Err(errors) => {
                for error in errors {
                    let mut diagnostic = Diagnostic::syntax(params[error.index].span, error.message());
                    if let Some(related) = error.related {
                        diagnostic =
                            diagnostic.with_related(params[related].span, error.related_message());
                    }
                    self.session.sink.push(diagnostic);
                }
                return Ok(None);
            }
        };

        let mut arguments = Vec::new();
        let mut roles = Vec::with_capacity(params.len());
        let mut failed = false;
        for (&param, slot) in params.iter().zip(slots) {
            let role = match slot {
                Slot::RootContext => ParameterRole::Context,
                Slot::Info => ParameterRole::Info,
                Slot::DerivedContext => match self.derived_role(param, owner)? {
                    Some(role) => role,
                    None => {
                        failed = true;
                        continue;
                    }
                },
                Slot::ArgumentsObject => {
                    match self.arguments_object(param, owner)? {
                        Some(mut object_args) => arguments.append(&mut object_args),
                        None => failed = true,
                    }
                    ParameterRole::ArgumentsObject
                }
                Slot::Positional => {
                    let Some(argument) = self.positional_argument(param, owner)? else {
                        failed = true;
                        continue;
                    };
                    let role = ParameterRole::Argument {
                        name: argument.name.clone(),
                    };
                    arguments.push(argument);
                    role
                }
            };
            roles.push(role);
        }

        if failed {
            return Ok(None);
        }
        Ok(Some((arguments, roles)))
    }

    fn derived_role(
        &mut self,
        param: &'m ParamDecl,
        owner: &FieldOwner<'m>,
    ) -> Result<Option<ParameterRole>> {
        let Some(ty) = &param.ty else {
            return Ok(None);
        };
        let Some(id) = self
            .session
            .referenced_declaration(ty, owner.module, &owner.scope)?
        else {
            return Ok(None);
        };
        let Some(function) = self
            .session
            .derived_contexts
            .get(&id)
            .and_then(|functions| functions.first().copied())
        else {
            return Ok(None);
        };
        Ok(Some(ParameterRole::DerivedContext {
            type_name: self.session.declaration(id).name.clone(),
            function: self.session.declaration(function).name.clone(),
            module: self.session.modules.module(function.module).path.clone(),
        }))
    }

    /// Arguments declared by the properties of an arguments struct.
    fn arguments_object(
        &mut self,
        param: &'m ParamDecl,
        owner: &FieldOwner<'m>,
    ) -> Result<Option<Vec<InputValue>>> {
        let Some(ty) = &param.ty else {
            return Ok(None);
        };
        let destructured_defaults: BTreeMap<&str, &'m Expr> = match &param.pattern {
            ParamPattern::Destructured(properties) => properties
                .iter()
                .filter_map(|p| p.default.as_ref().map(|d| (p.name.as_str(), d)))
                .collect(),
            _ => BTreeMap::new(),
        };

        let (properties, module): (&'m [PropertyDecl], ModuleId) = match &ty.kind {
            TypeExprKind::Object(properties) => (properties.as_slice(), owner.module),
            _ => {
                let id = self
                    .session
                    .referenced_declaration(ty, owner.module, &owner.scope)?;
                match id.map(|id| (id, &self.session.declaration(id).kind)) {
                    Some((id, DeclKind::Struct(structure))) => {
                        (structure.properties.as_slice(), id.module)
                    }
                    _ => {
                        self.session.sink.syntax(
                            ty.span,
                            format!(
                                "Expected `{}` to be a struct declaring the field's arguments.",
                                ty.describe()
                            ),
                        );
                        return Ok(None);
                    }
                }
            }
        };

        let ctx = TypeContext::input(module, owner.scope.clone());
        let mut arguments = Vec::with_capacity(properties.len());
        for property in properties {
            let doc = tags::parse_doc(&property.annotations, &mut self.session.sink);
            let Some(mut argument) = self.property_input(property, &doc, &ctx)? else {
                continue;
            };
            if let Some(default) = destructured_defaults.get(property.name.as_str()) {
                argument.default_value = self.default_value(Some(default));
            }
            arguments.push(argument);
        }
        Ok(Some(arguments))
    }

    fn positional_argument(
        &mut self,
        param: &'m ParamDecl,
        owner: &FieldOwner<'m>,
    ) -> Result<Option<InputValue>> {
        let Some(ident) = param.ident() else {
            self.session.sink.syntax(
                param.span,
                "Positional arguments must be named. Use an identifier pattern such as `limit: i32`.",
            );
            return Ok(None);
        };
        let Some(ty) = &param.ty else {
            return Ok(None);
        };
        let ctx = TypeContext::input(owner.module, owner.scope.clone());
        let Some(resolved) = self.session.resolve_type(ty, &ctx)? else {
            return Ok(None);
        };
        let default_value = self.default_value(param.default.as_ref());
        Ok(Some(self.input_value(
            crate::collector::camel_case(ident),
            resolved.ty,
            default_value,
            &ParsedDoc::default(),
            param.span,
        )))
    }
}

/// The operation a type roots by its conventional name.
fn root_operation(type_name: &str) -> Option<Operation> {
    Operation::ALL
        .into_iter()
        .find(|operation| operation.default_type_name() == type_name)
}

/// The `__typename` literal a struct declares, if any.
fn discriminant(properties: &[PropertyDecl]) -> Option<Discriminant> {
    properties.iter().find_map(|property| match &property.ty {
        Some(TypeExpr {
            kind: TypeExprKind::StringLiteral(value),
            ..
        }) if property.name == "__typename" => Some(Discriminant {
            value: value.clone(),
            span: property.span,
        }),
        _ => None,
    })
}

fn deprecation_reason(doc: &ParsedDoc) -> Option<String> {
    doc.deprecated.as_ref().map(|deprecated| {
        deprecated
            .reason
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string())
    })
}

/// Directive applications written in a doc comment.
pub fn applications(doc: &ParsedDoc) -> Vec<DirectiveApplication> {
    doc.directives
        .iter()
        .map(|directive| DirectiveApplication {
            name: directive.name.clone(),
            arguments: directive
                .arguments
                .iter()
                .map(|argument| (argument.name.clone(), argument.value.clone()))
                .collect(),
            argument_spans: directive
                .arguments
                .iter()
                .map(|argument| (argument.name.clone(), argument.span))
                .collect(),
            explicit: directive.explicit,
            span: directive.span,
        })
        .collect()
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::collect;
    use crate::config::ExtractConfig;
    use crate::diagnostics::DiagnosticSink;
    use crate::host::ModuleIndex;
    use crate::lower::lower_sources;
    use pretty_assertions::assert_eq;

    fn generate_from_code(code: &str, config: ExtractConfig) -> (Generated, Vec<String>) {
        let modules = lower_sources(&[("src/lib.rs", code)]).unwrap();
        let index = ModuleIndex::new(&modules);
        let mut sink = DiagnosticSink::new();
        let collection = collect(&modules, &mut sink);
        let mut session = Session::new(&index, &config, collection, sink);
        let generated = SchemaGenerator::new(&mut session).generate().unwrap();
        let messages = session.sink.finish().into_iter().map(|d| d.message).collect();
        (generated, messages)
    }

    fn object<'a>(generated: &'a Generated, name: &str) -> &'a ObjectType {
        generated
            .types
            .iter()
            .find_map(|t| match &t.definition {
                TypeDefinition::Object(o) if o.name == name => Some(o),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("ById"), "byId");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_object_with_method_arguments() {
        let code = r#"
/// @gqlType
pub struct User {
    /// @gqlField
    pub name: String,
}

pub struct GreetArgs {
    pub greeting: Option<String>,
    #[gql(default = 1)]
    pub times: i32,
}

impl User {
    /// @gqlField
    pub async fn greet(&self, args: GreetArgs) -> String { String::new() }

    /// @gqlField
    pub fn friends(&self, first: i32, after: Option<String>) -> Vec<User> { Vec::new() }
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);

        let user = object(&generated, "User");
        let greet = user.field("greet").unwrap();
        assert_eq!(greet.ty.to_string(), "String!");
        assert!(greet.resolver.is_async);
        assert_eq!(greet.resolver.parameters, vec![ParameterRole::ArgumentsObject]);
        let args: Vec<_> = greet
            .arguments
            .iter()
            .map(|a| (a.name.as_str(), a.ty.to_string()))
            .collect();
        assert_eq!(args, vec![("greeting", "String".to_string()), ("times", "Int!".to_string())]);
        assert_eq!(
            greet.arguments[1].default_value,
            Some(literal::ConstValue::Int(1))
        );

        let friends = user.field("friends").unwrap();
        assert_eq!(friends.ty.to_string(), "[User!]!");
        assert_eq!(
            friends.resolver.parameters,
            vec![
                ParameterRole::Argument { name: "first".to_string() },
                ParameterRole::Argument { name: "after".to_string() }
            ]
        );
    }

    #[test]
    fn test_missing_argument_annotation() {
        let code = r#"
/// @gqlType
pub struct User;

impl User {
    /// @gqlField
    pub fn greet(&self, Args { name }: _) -> String { String::new() }
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Missing type annotation for resolver arguments"));
    }

    #[test]
    fn test_context_and_info_parameters() {
        let code = r#"
/// @gqlContext
pub struct Ctx;

pub struct ResolveInfo;

/// @gqlType
pub struct User;

impl User {
    /// @gqlField
    pub fn viewer(&self, info: &ResolveInfo, ctx: &Ctx) -> bool { true }
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        let viewer = object(&generated, "User").field("viewer").unwrap();
        assert_eq!(
            viewer.resolver.parameters,
            vec![ParameterRole::Info, ParameterRole::Context]
        );
        assert!(viewer.arguments.is_empty());
    }

    #[test]
    fn test_non_constant_default() {
        let code = r#"
/// @gqlType
pub struct User;

pub struct Args {
    #[gql(default = compute_limit())]
    pub limit: i32,
}

impl User {
    /// @gqlField
    pub fn posts(&self, args: Args) -> i32 { 0 }
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("call to `compute_limit`"));
    }

    #[test]
    fn test_deprecated_required_argument() {
        let code = r#"
/// @gqlType
pub struct User;

pub struct Args {
    /// @deprecated
    pub old: String,
    /// @deprecated
    pub fine: Option<String>,
}

impl User {
    /// @gqlField
    pub fn posts(&self, args: Args) -> i32 { 0 }
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Deprecated argument `old` must be optional"));
    }

    #[test]
    fn test_discriminant_and_interfaces_recorded() {
        let code = r#"
/// @gqlInterface
pub trait Node {
    /// @gqlField
    fn id(&self) -> String;
}

pub trait Untagged {}

/// @gqlType
pub struct User;

impl User {
    pub const TYPENAME: &'static str = "User";
}

impl Node for User {
    fn id(&self) -> String { String::new() }
}

impl Untagged for User {}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        let user = generated
            .types
            .iter()
            .find(|t| t.definition.name() == "User")
            .unwrap();
        let interfaces: Vec<_> = user.origin.interfaces.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(interfaces, vec!["Node"]);
        assert_eq!(user.origin.discriminant.as_ref().unwrap().value, "User");
    }

    #[test]
    fn test_union_member_kinds() {
        let code = r#"
/// @gqlType
pub struct Cat;
/// @gqlInterface
pub trait Pet {}

/// @gqlUnion
pub enum SearchResult {
    Cat(Cat),
    Pet(Box<dyn Pet>),
    Nothing,
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].starts_with("Invalid union member kind"));
        assert!(errors[1].contains("must wrap exactly one object type"));
        let union = generated
            .types
            .iter()
            .find_map(|t| match &t.definition {
                TypeDefinition::Union(u) => Some(u),
                _ => None,
            })
            .unwrap();
        assert_eq!(union.members, vec!["Cat"]);
    }

    #[test]
    fn test_enum_values_and_one_of_input() {
        let code = r#"
/// @gqlEnum
pub enum Color {
    Red,
    /// @deprecated Use Red
    #[serde(rename = "GREEN")]
    Green,
}

/// @gqlInput
pub enum UserBy {
    Id(ID),
    #[serde(rename = "mail")]
    Email(String),
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);

        let color = generated
            .types
            .iter()
            .find_map(|t| match &t.definition {
                TypeDefinition::Enum(e) => Some(e),
                _ => None,
            })
            .unwrap();
        let values: Vec<_> = color.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(values, vec!["Red", "GREEN"]);
        assert_eq!(color.values[1].deprecation_reason.as_deref(), Some("Use Red"));
        assert_eq!(color.values[1].source_name, "Green");

        let input = generated
            .types
            .iter()
            .find_map(|t| match &t.definition {
                TypeDefinition::InputObject(i) => Some(i),
                _ => None,
            })
            .unwrap();
        assert!(input.one_of);
        let fields: Vec<_> = input
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.to_string()))
            .collect();
        assert_eq!(
            fields,
            vec![("id", "ID".to_string()), ("mail", "String".to_string())]
        );
    }

    #[test]
    fn test_subscription_requires_stream() {
        let code = r#"
/// @gqlSubscriptionField
pub fn ticks() -> impl Stream<Item = i32> { todo!() }

/// @gqlSubscriptionField
pub fn broken() -> i32 { 0 }
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Subscription field `broken` must return an async iterable"));
        assert_eq!(generated.root_fields.len(), 1);
        assert_eq!(generated.root_fields[0].1.ty.to_string(), "Int!");
    }

    #[test]
    fn test_functional_field_extends_type() {
        let code = r#"
/// @gqlType
pub struct User;

/// @gqlField
pub fn full_name(user: &User, separator: String) -> String { String::new() }
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(generated.extensions.len(), 1);
        let extension = &generated.extensions[0];
        assert_eq!(extension.type_name, "User");
        assert_eq!(extension.field.name, "fullName");
        assert_eq!(
            extension.field.resolver.parameters,
            vec![
                ParameterRole::Parent,
                ParameterRole::Argument { name: "separator".to_string() }
            ]
        );
    }

    #[test]
    fn test_kills_parent_requires_nullable_by_default() {
        let code = r#"
/// @gqlType
pub struct User {
    /// @gqlField
    /// @killsParentOnException
    pub name: String,
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1);

        let config = ExtractConfig {
            nullable_by_default: true,
            strict_semantic_nullability: true,
            ..ExtractConfig::default()
        };
        let (generated, errors) = generate_from_code(code, config);
        assert!(errors.is_empty(), "{:?}", errors);
        let name = object(&generated, "User").field("name").unwrap();
        assert_eq!(name.ty.to_string(), "String!");
        assert!(name.kills_parent_on_exception);
        assert_eq!(name.semantic_nullability, SemanticNullability::Strict);
    }

    fn type_names(generated: &Generated) -> Vec<&str> {
        generated.types.iter().map(|t| t.definition.name()).collect()
    }

    #[test]
    fn test_recursive_generic_with_same_arguments() {
        let code = r#"
/// @gqlType
pub struct Tree<T> {
    /// @gqlField
    pub value: T,
    /// @gqlField
    pub children: Vec<Tree<T>>,
}

/// @gqlType
pub struct Query {
    /// @gqlField
    pub tree: Tree<String>,
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        let tree = object(&generated, "StringTree");
        assert_eq!(tree.field("children").unwrap().ty.to_string(), "[StringTree!]!");
    }

    #[test]
    fn test_growing_generic_recursion_is_reported() {
        let code = r#"
/// @gqlType
pub struct Nest<T> {
    /// @gqlField
    pub value: T,
    /// @gqlField
    pub deeper: Option<Box<Nest<Vec<T>>>>,
}

/// @gqlType
pub struct Query {
    /// @gqlField
    pub nest: Nest<String>,
}
"#;
        let (generated, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("Recursive generic expansion: `Nest`"));
        assert!(type_names(&generated).contains(&"StringNest"));
        assert!(!type_names(&generated).iter().any(|name| name.ends_with("ListNest")));
    }

    #[test]
    fn test_growing_recursion_through_another_generic() {
        let code = r#"
/// @gqlType
pub struct Outer<T> {
    /// @gqlField
    pub inner: Inner<Option<T>>,
}

/// @gqlType
pub struct Inner<T> {
    /// @gqlField
    pub outer: Vec<Outer<T>>,
}

/// @gqlType
pub struct Query {
    /// @gqlField
    pub outer: Outer<i32>,
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("Recursive generic expansion: `Outer`"));
    }

    #[test]
    fn test_growing_recursion_through_generic_alias() {
        let code = r#"
pub type Deeper<T> = Nest<Vec<T>>;

/// @gqlType
pub struct Nest<T> {
    /// @gqlField
    pub value: T,
    /// @gqlField
    pub deeper: Option<Deeper<T>>,
}

/// @gqlType
pub struct Query {
    /// @gqlField
    pub nest: Nest<bool>,
}
"#;
        let (_, errors) = generate_from_code(code, ExtractConfig::default());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("Recursive generic expansion: `Nest`"));
    }
}
