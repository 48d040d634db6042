use crate::collector::Role;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::host::NameResolution;
use crate::model::{DeclId, DeclKind, ModuleId, Span, TypeExpr, TypeExprKind};
use crate::schema::TypeRef;
use crate::session::{GenericScope, Session, TypeArg};
use log::debug;
use std::rc::Rc;

/// Whether a type is produced by a resolver or supplied by a client.
///
/// `nullable_by_default` only applies to output positions; inputs are
/// required unless written as `Option<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Output,
    Input,
}

/// Where a type expression is being resolved.
#[derive(Debug, Clone)]
pub struct TypeContext<'m> {
    /// Module whose names are in scope
    pub module: ModuleId,
    /// Generic parameter bindings in effect
    pub scope: Rc<GenericScope<'m>>,
    pub position: Position,
    /// Only subscription fields may return an async iterable
    pub allow_stream: bool,
}

impl<'m> TypeContext<'m> {
    pub fn output(module: ModuleId, scope: Rc<GenericScope<'m>>) -> Self {
        Self {
            module,
            scope,
            position: Position::Output,
            allow_stream: false,
        }
    }

    pub fn input(module: ModuleId, scope: Rc<GenericScope<'m>>) -> Self {
        Self {
            module,
            scope,
            position: Position::Input,
            allow_stream: false,
        }
    }

    #[must_use]
    pub fn with_stream(mut self) -> Self {
        self.allow_stream = true;
        self
    }

    fn without_stream(&self) -> Self {
        Self {
            allow_stream: false,
            ..self.clone()
        }
    }
}

/// A resolved type reference plus facts about how it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub ty: TypeRef,
    /// Written as `Option<T>` (rather than nullable through configuration)
    pub explicit_nullable: bool,
    /// Wrapped in an async iterable
    pub is_stream: bool,
    /// Wrapped in a future
    pub is_async: bool,
}

impl Resolved {
    fn plain(ty: TypeRef) -> Self {
        Self {
            ty,
            explicit_nullable: false,
            is_stream: false,
            is_async: false,
        }
    }
}

/// The five scalars every schema has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScalar {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl BuiltinScalar {
    pub const ALL: [BuiltinScalar; 5] = [
        BuiltinScalar::String,
        BuiltinScalar::Int,
        BuiltinScalar::Float,
        BuiltinScalar::Boolean,
        BuiltinScalar::Id,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinScalar::String => "String",
            BuiltinScalar::Int => "Int",
            BuiltinScalar::Float => "Float",
            BuiltinScalar::Boolean => "Boolean",
            BuiltinScalar::Id => "ID",
        }
    }

    pub fn from_schema_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|scalar| scalar.name() == name)
    }
}

/// Builtin scalar for a host type name, if any.
pub fn builtin_scalar(type_name: &str) -> Option<BuiltinScalar> {
    match type_name {
        "String" | "str" | "char" => Some(BuiltinScalar::String),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "Int" => Some(BuiltinScalar::Int),
        "f32" | "f64" | "Float" => Some(BuiltinScalar::Float),
        "bool" | "Boolean" => Some(BuiltinScalar::Boolean),
        "ID" => Some(BuiltinScalar::Id),
        _ => None,
    }
}

// Integers that do not fit the 32-bit `Int` scalar.
fn is_wide_integer(type_name: &str) -> bool {
    matches!(
        type_name,
        "i64" | "u64" | "i128" | "u128" | "isize" | "usize"
    )
}

/// Generic instances nested deeper than this are reported as an unbounded
/// expansion even when no argument visibly grows.
const MAX_INSTANCE_DEPTH: usize = 32;

fn sanitize(text: &str) -> String {
    text.chars().filter(|ch| ch.is_ascii_alphanumeric()).collect()
}

impl<'m> Session<'m> {
    /// Converts a host type expression into a schema type reference.
    ///
    /// Returns `Ok(None)` after reporting a diagnostic; `Err` only for
    /// failures of the type host.
    pub fn resolve_type(
        &mut self,
        expr: &'m TypeExpr,
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Resolved>> {
        match &expr.kind {
            TypeExprKind::Deferred(inner) => {
                let resolved = self.resolve_type(inner, ctx)?;
                Ok(resolved.map(|r| Resolved {
                    is_async: true,
                    ..r
                }))
            }
            TypeExprKind::Stream(inner) => {
                if !ctx.allow_stream {
                    self.sink.syntax(
                        expr.span,
                        "Async iterables can only be returned by subscription fields. Tag the function `@gqlSubscriptionField` or return the item type directly.",
                    );
                    return Ok(None);
                }
                let resolved = self.resolve_type(inner, &ctx.without_stream())?;
                Ok(resolved.map(|r| Resolved {
                    is_stream: true,
                    ..r
                }))
            }
            TypeExprKind::Union(members) => self.resolve_union(expr, members, ctx),
            TypeExprKind::Array { element, .. } => {
                let Some(element) = self.resolve_type(element, &ctx.without_stream())? else {
                    return Ok(None);
                };
                Ok(Some(Resolved::plain(self.bare(element.ty.list(), ctx))))
            }
            TypeExprKind::Reference { name, args } => {
                self.resolve_reference(expr, name, args, ctx)
            }
            TypeExprKind::Null | TypeExprKind::Undefined | TypeExprKind::Void => {
                self.unsupported(
                    expr.span,
                    format!(
                        "Expected a schema type, found `{}`. A field must produce a value.",
                        expr.describe()
                    ),
                )
            }
            TypeExprKind::StringLiteral(value) => self.unsupported(
                expr.span,
                format!(
                    "Unsupported type: string literal {:?}. Literal types are only allowed as discriminants.",
                    value
                ),
            ),
            TypeExprKind::Object(_) => self.unsupported(
                expr.span,
                "Unsupported type: inline object types are only allowed as a resolver's arguments object.",
            ),
            TypeExprKind::Tuple(_) => self.unsupported(
                expr.span,
                "Unsupported type: tuples have no schema equivalent. Declare a struct tagged `@gqlType` instead.",
            ),
            TypeExprKind::Intersection(_) => self.unsupported(
                expr.span,
                "Unsupported type: intersections (`A + B`) have no schema equivalent.",
            ),
            TypeExprKind::Function => self.unsupported(
                expr.span,
                "Unsupported type: functions cannot be used as data.",
            ),
            TypeExprKind::Unsupported(text) => {
                self.unsupported(expr.span, format!("Unsupported type shape `{}`.", text))
            }
        }
    }

    fn unsupported(&mut self, span: Span, message: impl Into<String>) -> Result<Option<Resolved>> {
        self.sink.syntax(span, message);
        Ok(None)
    }

    /// Applies the default nullability of the position to a bare type.
    fn bare(&self, ty: TypeRef, ctx: &TypeContext<'m>) -> TypeRef {
        if ctx.position == Position::Output && self.config.nullable_by_default {
            ty
        } else {
            ty.non_null()
        }
    }

    fn resolve_union(
        &mut self,
        expr: &'m TypeExpr,
        members: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Resolved>> {
        let non_null: Vec<&'m TypeExpr> = members.iter().filter(|m| !m.is_nullish()).collect();
        let has_null = non_null.len() != members.len();

        match non_null.as_slice() {
            [] => self.unsupported(
                expr.span,
                "Expected a schema type, found only `null`.",
            ),
            [single] => {
                let resolved = self.resolve_type(single, ctx)?;
                if !has_null {
                    return Ok(resolved);
                }
                Ok(resolved.map(|r| Resolved {
                    ty: r.ty.nullable(),
                    explicit_nullable: true,
                    ..r
                }))
            }
            many if has_null => self.unsupported(
                expr.span,
                format!(
                    "Ambiguous nullable type `{}`: expected exactly one non-null member, found {}.",
                    expr.describe(),
                    many.len()
                ),
            ),
            _ => self.unsupported(
                expr.span,
                "Unsupported type: inline unions are not allowed. Declare an enum tagged `@gqlUnion`.",
            ),
        }
    }

    fn resolve_reference(
        &mut self,
        expr: &'m TypeExpr,
        name: &str,
        args: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Resolved>> {
        if let Some(arg) = ctx.scope.get(name).cloned() {
            if !args.is_empty() {
                return self.unsupported(
                    expr.span,
                    format!("Generic parameter `{}` cannot take type arguments.", name),
                );
            }
            let arg_ctx = TypeContext {
                module: arg.module,
                scope: arg.scope.clone(),
                ..ctx.clone()
            };
            return self.resolve_type(arg.expr, &arg_ctx);
        }

        match self.lookup(ctx.module, name)? {
            NameResolution::Declaration(id) => self.resolve_declaration(expr, id, args, ctx),
            NameResolution::Ambiguous(ids) => {
                let mut diagnostic = Diagnostic::semantic(
                    expr.span,
                    format!(
                        "Ambiguous type `{}`: it is declared in {} modules. Import it with `use` to pick one.",
                        name,
                        ids.len()
                    ),
                );
                for id in ids {
                    diagnostic = diagnostic
                        .with_related(self.declaration(id).name_span, "candidate declared here");
                }
                self.sink.push(diagnostic);
                Ok(None)
            }
            NameResolution::Unknown => self.resolve_builtin(expr, name, args, ctx),
        }
    }

    fn resolve_builtin(
        &mut self,
        expr: &'m TypeExpr,
        name: &str,
        args: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Resolved>> {
        if let Some(scalar) = builtin_scalar(name) {
            if !args.is_empty() {
                return self.unsupported(
                    expr.span,
                    format!("`{}` does not take type arguments.", name),
                );
            }
            return Ok(Some(Resolved::plain(
                self.bare(TypeRef::named(scalar.name()), ctx),
            )));
        }

        if is_wide_integer(name) {
            return self.unsupported(
                expr.span,
                format!(
                    "`{}` is not a schema type: `Int` is a 32-bit signed integer. Use `i32`, `f64` or a custom scalar.",
                    name
                ),
            );
        }

        self.unsupported(
            expr.span,
            format!(
                "Unknown type `{}`: it is not declared in any scanned module and is not a builtin scalar.",
                name
            ),
        )
    }

    fn resolve_declaration(
        &mut self,
        expr: &'m TypeExpr,
        id: DeclId,
        args: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Resolved>> {
        let decl = self.declaration(id);
        let Some(collected) = self.collected(id) else {
            if let DeclKind::Alias(alias) = &decl.kind {
                if let Some(path) = self.alias_cycle(id) {
                    self.sink.push(
                        Diagnostic::semantic(
                            expr.span,
                            format!("Cyclic type alias `{}`: {}.", decl.name, path),
                        )
                        .with_related(decl.name_span, "alias declared here"),
                    );
                    return Ok(None);
                }
                let Some(bindings) = self.bind_generics(expr, id, args, ctx)? else {
                    return Ok(None);
                };
                let alias_ctx = TypeContext {
                    module: id.module,
                    scope: GenericScope::within(bindings, &ctx.scope),
                    ..ctx.clone()
                };
                self.begin_alias(id);
                let resolved = self.resolve_type(&alias.target, &alias_ctx);
                self.end_alias(id);
                return resolved;
            }
            self.sink.push(
                Diagnostic::syntax(
                    expr.span,
                    format!(
                        "`{}` is not a schema type. Tag its declaration with `@gqlType`, `@gqlInterface`, `@gqlUnion`, `@gqlEnum`, `@gqlScalar` or `@gqlInput`, or mark it `@gqlExternal`.",
                        decl.name
                    ),
                )
                .with_related(decl.name_span, "declared here"),
            );
            return Ok(None);
        };

        let role = collected.role.clone();
        let schema_name = collected.name.clone();

        if let Role::External { location } = role {
            if !args.is_empty() {
                return self.unsupported(
                    expr.span,
                    format!("External type `{}` does not take type arguments.", schema_name),
                );
            }
            self.externals.insert(schema_name.clone(), location.clone());
            return Ok(Some(Resolved::plain(
                self.bare(TypeRef::external(schema_name, location), ctx),
            )));
        }

        if !role.is_schema_type() {
            self.sink.push(
                Diagnostic::syntax(
                    expr.span,
                    format!(
                        "`{}` is a {} and cannot be used as a schema type.",
                        decl.name,
                        match role {
                            Role::Directive { .. } => "directive",
                            _ => "context",
                        }
                    ),
                )
                .with_related(decl.name_span, "declared here"),
            );
            return Ok(None);
        }

        match (ctx.position, &role) {
            (Position::Output, Role::Input) => {
                self.sink.push(
                    Diagnostic::syntax(
                        expr.span,
                        format!(
                            "Input type `{}` cannot be used as an output type.",
                            schema_name
                        ),
                    )
                    .with_related(decl.name_span, "declared here"),
                );
                return Ok(None);
            }
            (Position::Input, Role::Object | Role::Interface | Role::Union) => {
                self.sink.push(
                    Diagnostic::syntax(
                        expr.span,
                        format!(
                            "`{}` is an output type and cannot be used as an argument or input field. Use a type tagged `@gqlInput`.",
                            schema_name
                        ),
                    )
                    .with_related(decl.name_span, "declared here"),
                );
                return Ok(None);
            }
            _ => {}
        }

        let name = if decl.generics.is_empty() {
            if !args.is_empty() {
                return self.unsupported(
                    expr.span,
                    format!("`{}` does not take type arguments.", decl.name),
                );
            }
            schema_name
        } else {
            match self.instantiate(expr, id, args, ctx)? {
                Some(name) => name,
                None => return Ok(None),
            }
        };

        Ok(Some(Resolved::plain(self.bare(TypeRef::named(name), ctx))))
    }

    /// Binds a declaration's generic parameters to the arguments written at
    /// a use site. Reports arity mismatches.
    fn bind_generics(
        &mut self,
        expr: &'m TypeExpr,
        id: DeclId,
        args: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<Vec<(String, TypeArg<'m>)>>> {
        let decl = self.declaration(id);
        if args.len() != decl.generics.len() {
            let message = if args.is_empty() {
                format!(
                    "Generic type `{}` must be given {} type argument(s).",
                    decl.name,
                    decl.generics.len()
                )
            } else {
                format!(
                    "`{}` expects {} type argument(s), found {}.",
                    decl.name,
                    decl.generics.len(),
                    args.len()
                )
            };
            self.sink
                .push(Diagnostic::syntax(expr.span, message).with_related(decl.name_span, "declared here"));
            return Ok(None);
        }
        let bindings = decl
            .generics
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                (
                    param.name.clone(),
                    TypeArg {
                        expr: arg,
                        module: ctx.module,
                        scope: ctx.scope.clone(),
                    },
                )
            })
            .collect();
        Ok(Some(bindings))
    }

    /// One schema type per distinct combination of declaration and
    /// argument identities.
    fn instantiate(
        &mut self,
        expr: &'m TypeExpr,
        id: DeclId,
        args: &'m [TypeExpr],
        ctx: &TypeContext<'m>,
    ) -> Result<Option<String>> {
        let Some(bindings) = self.bind_generics(expr, id, args, ctx)? else {
            return Ok(None);
        };

        let mut keys = Vec::with_capacity(args.len());
        for arg in args {
            keys.push(self.canonical(arg, ctx.module, &ctx.scope)?);
        }
        if ctx.scope.grows(id, &keys) || ctx.scope.depth() >= MAX_INSTANCE_DEPTH {
            let decl = self.declaration(id);
            self.sink.push(
                Diagnostic::semantic(
                    expr.span,
                    format!(
                        "Recursive generic expansion: `{}` refers to itself with growing type arguments, which would need infinitely many schema types. Pass the same type arguments in the recursive reference.",
                        decl.name
                    ),
                )
                .with_related(decl.name_span, "generic type declared here"),
            );
            return Ok(None);
        }

        let mut prefix = String::new();
        for arg in args {
            prefix.push_str(&self.display_name(arg, ctx.module, &ctx.scope)?);
        }
        let key = format!("{}.{}<{}>", id.module.0, id.index, keys.join(","));
        let scope = GenericScope::instance(bindings, &ctx.scope, id, keys);
        let base = self
            .collected(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.declaration(id).name.clone());

        debug!("Instantiating {} as {}{}", key, prefix, base);
        Ok(Some(self.instance(key, id, format!("{}{}", prefix, base), scope)))
    }

    /// Identity of a type expression: declarations by id, builtins by
    /// name, generic parameters by what they are bound to.
    pub fn canonical(
        &mut self,
        expr: &'m TypeExpr,
        module: ModuleId,
        scope: &Rc<GenericScope<'m>>,
    ) -> Result<String> {
        Ok(match &expr.kind {
            TypeExprKind::Reference { name, args } => {
                if let Some(arg) = scope.get(name) {
                    let arg = arg.clone();
                    return self.canonical(arg.expr, arg.module, &arg.scope);
                }
                let head = match self.lookup(module, name)? {
                    NameResolution::Declaration(id) => {
                        if let Some(target) = self.expandable_alias(id) {
                            self.begin_alias(id);
                            let canonical = self.canonical(target, id.module, &GenericScope::empty());
                            self.end_alias(id);
                            return canonical;
                        }
                        format!("#{}.{};", id.module.0, id.index)
                    }
                    NameResolution::Ambiguous(_) | NameResolution::Unknown => {
                        match builtin_scalar(name) {
                            Some(scalar) => scalar.name().to_string(),
                            None => name.clone(),
                        }
                    }
                };
                if args.is_empty() {
                    head
                } else {
                    let mut parts = Vec::with_capacity(args.len());
                    for arg in args {
                        parts.push(self.canonical(arg, module, scope)?);
                    }
                    format!("{}<{}>", head, parts.join(","))
                }
            }
            TypeExprKind::Union(members) => {
                let mut parts = Vec::with_capacity(members.len());
                for member in members {
                    parts.push(self.canonical(member, module, scope)?);
                }
                format!("({})", parts.join("|"))
            }
            TypeExprKind::Array { element, .. } => {
                format!("[{}]", self.canonical(element, module, scope)?)
            }
            TypeExprKind::Deferred(inner) => self.canonical(inner, module, scope)?,
            TypeExprKind::Stream(inner) => {
                format!("stream<{}>", self.canonical(inner, module, scope)?)
            }
            TypeExprKind::Null | TypeExprKind::Undefined | TypeExprKind::Void => {
                "null".to_string()
            }
            _ => expr.describe(),
        })
    }

    /// Name fragment contributed by a generic argument to an instance name.
    pub fn display_name(
        &mut self,
        expr: &'m TypeExpr,
        module: ModuleId,
        scope: &Rc<GenericScope<'m>>,
    ) -> Result<String> {
        Ok(match &expr.kind {
            TypeExprKind::Reference { name, args } => {
                if let Some(arg) = scope.get(name) {
                    let arg = arg.clone();
                    return self.display_name(arg.expr, arg.module, &arg.scope);
                }
                let mut prefix = String::new();
                for arg in args {
                    prefix.push_str(&self.display_name(arg, module, scope)?);
                }
                let base = match self.lookup(module, name)? {
                    NameResolution::Declaration(id) => match self.collected(id) {
                        Some(collected) => collected.name.clone(),
                        None => {
                            if let Some(target) = self.expandable_alias(id) {
                                self.begin_alias(id);
                                let name = self.display_name(target, id.module, &GenericScope::empty());
                                self.end_alias(id);
                                return name;
                            }
                            self.declaration(id).name.clone()
                        }
                    },
                    _ => builtin_scalar(name)
                        .map(|scalar| scalar.name().to_string())
                        .unwrap_or_else(|| sanitize(name)),
                };
                format!("{}{}", prefix, base)
            }
            TypeExprKind::Union(members) => match members.iter().find(|m| !m.is_nullish()) {
                Some(member) => self.display_name(member, module, scope)?,
                None => "Null".to_string(),
            },
            TypeExprKind::Array { element, .. } => {
                format!("{}List", self.display_name(element, module, scope)?)
            }
            TypeExprKind::Deferred(inner) | TypeExprKind::Stream(inner) => {
                self.display_name(inner, module, scope)?
            }
            _ => sanitize(&expr.describe()),
        })
    }

    /// The declaration a type expression names, looking through generic
    /// bindings, untagged aliases, futures and `Option`. Reports nothing.
    pub fn referenced_declaration(
        &mut self,
        expr: &'m TypeExpr,
        module: ModuleId,
        scope: &Rc<GenericScope<'m>>,
    ) -> Result<Option<DeclId>> {
        match &expr.kind {
            TypeExprKind::Reference { name, .. } => {
                if let Some(arg) = scope.get(name) {
                    let arg = arg.clone();
                    return self.referenced_declaration(arg.expr, arg.module, &arg.scope);
                }
                match self.lookup(module, name)? {
                    NameResolution::Declaration(id) => {
                        let Some(target) = self.expandable_alias(id) else {
                            return Ok(Some(id));
                        };
                        self.begin_alias(id);
                        let referenced =
                            self.referenced_declaration(target, id.module, &GenericScope::empty());
                        self.end_alias(id);
                        referenced
                    }
                    _ => Ok(None),
                }
            }
            TypeExprKind::Deferred(inner) => self.referenced_declaration(inner, module, scope),
            TypeExprKind::Union(members) => {
                let mut non_null = members.iter().filter(|m| !m.is_nullish());
                match (non_null.next(), non_null.next()) {
                    (Some(single), None) => self.referenced_declaration(single, module, scope),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}
