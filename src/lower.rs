//! Lowering of parsed Rust files into the host-neutral [`model`](crate::model).
//!
//! This is the only module that looks at `syn` trees. It records every
//! struct, enum, trait, free function and type alias with byte-accurate spans
//! (via `proc-macro2`'s `span-locations`), keeps doc comments and attributes
//! in source order, and folds `impl` blocks into the struct they target:
//!
//! - methods of every `impl` block, inherent or trait, anywhere in the module set
//! - `impl Trait for X` adds `Trait` to `X`'s implemented interfaces
//! - `impl Deref for X { type Target = Base; }` makes `Base` the parent of `X`
//! - `const TYPENAME: &str = "X";` in an inherent impl becomes a `__typename`
//!   literal property
//!
//! Rust type syntax is mapped onto [`TypeExprKind`]: `Option` is the
//! nullable union, collections are arrays, smart pointers, references and
//! `Result` are transparent, and futures and streams become `Deferred` and
//! `Stream`.

use crate::collector::camel_case;
use crate::error::{Error, Result};
use crate::model::{
    AliasDecl, Annotation, DeclId, DeclKind, Declaration, DestructuredProperty, EnumDecl, Expr,
    ExprKind, FileId, GenericParam, Import, MethodDecl, ModuleId, ModuleSet, ObjectEntry,
    ParamDecl, ParamPattern, PropertyDecl, Scope, Signature, SourceFile, SourceMap, SourceModule,
    Span, StructDecl, TraitDecl, TypeExpr, TypeExprKind, VariantDecl,
};
use crate::parser::ParsedFile;
use log::debug;
use std::path::PathBuf;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{
    Attribute, FnArg, Generics, ImplItem, Item, Lit, Member, Meta, Pat, PathArguments, ReturnType,
    TraitItem, Type, TypeParamBound, UnOp, UseTree, Visibility,
};

/// Marker traits that never contribute to the shape of a type.
const MARKER_TRAITS: &[&str] = &["Send", "Sync", "Unpin", "Sized", "Copy", "Clone"];

/// Parses and lowers in-memory sources. Mostly used by tests.
pub fn lower_sources(sources: &[(&str, &str)]) -> Result<ModuleSet> {
    let mut parsed = Vec::with_capacity(sources.len());
    for (path, source) in sources {
        let syntax_tree = syn::parse_file(source).map_err(|err| Error::ParseError {
            file: PathBuf::from(path),
            message: format!("{} (line {})", err, err.span().start().line),
        })?;
        parsed.push(ParsedFile {
            path: PathBuf::from(path),
            source: source.to_string(),
            syntax_tree,
        });
    }
    lower_files(&parsed)
}

/// Lowers parsed files into one [`ModuleSet`]; file order becomes module order.
pub fn lower_files(files: &[ParsedFile]) -> Result<ModuleSet> {
    let mut sources = SourceMap::new();
    let ids: Vec<FileId> = files
        .iter()
        .map(|file| sources.add_file(file.path.clone(), file.source.clone()))
        .collect();

    let mut modules = Vec::with_capacity(files.len());
    let mut impls = Vec::new();
    for (index, (file, id)) in files.iter().zip(ids).enumerate() {
        let source = sources
            .file(id)
            .ok_or_else(|| Error::Internal(format!("source map lost {}", file.path.display())))?;
        let mut lowerer = ModuleLowerer::new(id, source, ModuleId(index as u32));
        for item in &file.syntax_tree.items {
            lowerer.lower_item(item, true, Scope::Module);
        }
        debug!(
            "Lowered {}: {} declarations, {} impl blocks",
            file.path.display(),
            lowerer.declarations.len(),
            lowerer.impls.len()
        );
        modules.push(SourceModule {
            file: id,
            path: file.path.display().to_string(),
            imports: lowerer.imports,
            declarations: lowerer.declarations,
        });
        impls.extend(lowerer.impls);
    }

    attach_impls(&mut modules, impls);
    Ok(ModuleSet { sources, modules })
}

/// What one `impl` block contributes to its target struct.
struct PendingImpl {
    module: ModuleId,
    self_name: String,
    methods: Vec<MethodDecl>,
    implements: Option<TypeExpr>,
    deref: Option<TypeExpr>,
    typename: Option<PropertyDecl>,
}

struct ModuleLowerer<'a> {
    file: FileId,
    source: &'a SourceFile,
    module: ModuleId,
    declarations: Vec<Declaration>,
    imports: Vec<Import>,
    impls: Vec<PendingImpl>,
    /// Name `Self` stands for while inside an `impl` block.
    self_name: Option<String>,
    /// Outermost non-`pub` inline module being lowered.
    private_module: Option<String>,
}

impl<'a> ModuleLowerer<'a> {
    fn new(file: FileId, source: &'a SourceFile, module: ModuleId) -> Self {
        Self {
            file,
            source,
            module,
            declarations: Vec::new(),
            imports: Vec::new(),
            impls: Vec::new(),
            self_name: None,
            private_module: None,
        }
    }

    fn span(&self, span: proc_macro2::Span) -> Span {
        let start = span.start();
        let end = span.end();
        Span::new(
            self.file,
            self.source.offset_of(start.line, start.column),
            self.source.offset_of(end.line, end.column),
        )
    }

    fn text(&self, span: Span) -> String {
        self.source
            .source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
            .to_string()
    }

    fn lower_item(&mut self, item: &Item, exported: bool, scope: Scope) {
        match item {
            Item::Struct(item) => {
                let kind = DeclKind::Struct(StructDecl {
                    properties: self.lower_fields(&item.fields),
                    ..StructDecl::default()
                });
                self.declare(&item.ident, item.span(), &item.vis, exported, scope, &item.attrs, &item.generics, kind);
            }
            Item::Enum(item) => {
                let variants = item
                    .variants
                    .iter()
                    .map(|variant| VariantDecl {
                        name: variant.ident.to_string(),
                        name_span: self.span(variant.ident.span()),
                        span: self.span(variant.span()),
                        annotations: self.lower_attrs(&variant.attrs),
                        rename: serde_rename(&variant.attrs),
                        payload: self.lower_payload(&variant.fields),
                    })
                    .collect();
                let kind = DeclKind::Enum(EnumDecl { variants });
                self.declare(&item.ident, item.span(), &item.vis, exported, scope, &item.attrs, &item.generics, kind);
            }
            Item::Trait(item) => {
                let methods = item
                    .items
                    .iter()
                    .filter_map(|trait_item| match trait_item {
                        TraitItem::Fn(method) => {
                            Some(self.lower_method(&method.attrs, &method.sig, method.span()))
                        }
                        _ => None,
                    })
                    .collect();
                let extends = self.lower_bounds(&item.supertraits);
                let kind = DeclKind::Trait(TraitDecl { methods, extends });
                self.declare(&item.ident, item.span(), &item.vis, exported, scope, &item.attrs, &item.generics, kind);
            }
            Item::Fn(item) => {
                let kind = DeclKind::Function(self.lower_signature(&item.sig));
                self.declare(&item.sig.ident, item.span(), &item.vis, exported, scope, &item.attrs, &item.sig.generics, kind);
                self.lower_block(&item.block);
            }
            Item::Type(item) => {
                let kind = DeclKind::Alias(AliasDecl {
                    target: self.lower_type(&item.ty),
                });
                self.declare(&item.ident, item.span(), &item.vis, exported, scope, &item.attrs, &item.generics, kind);
            }
            Item::Impl(item) => self.lower_impl(item),
            Item::Mod(item) => {
                if let Some((_, items)) = &item.content {
                    let exported = exported && is_public(&item.vis);
                    let previous = self.private_module.clone();
                    if previous.is_none() && !is_public(&item.vis) {
                        self.private_module = Some(item.ident.to_string());
                    }
                    for nested in items {
                        self.lower_item(nested, exported, scope);
                    }
                    self.private_module = previous;
                }
            }
            Item::Use(item) if scope == Scope::Module => self.lower_use(&item.tree),
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn declare(
        &mut self,
        ident: &syn::Ident,
        span: proc_macro2::Span,
        vis: &Visibility,
        exported: bool,
        scope: Scope,
        attrs: &[Attribute],
        generics: &Generics,
        kind: DeclKind,
    ) {
        let declaration = Declaration {
            name: ident.to_string(),
            name_span: self.span(ident.span()),
            span: self.span(span),
            exported: scope == Scope::Module && exported && is_public(vis),
            private_module: match scope {
                Scope::Module if is_public(vis) => self.private_module.clone(),
                _ => None,
            },
            scope,
            annotations: self.lower_attrs(attrs),
            generics: generics
                .type_params()
                .map(|param| GenericParam {
                    name: param.ident.to_string(),
                    span: self.span(param.ident.span()),
                })
                .collect(),
            kind,
        };
        self.declarations.push(declaration);
    }

    /// Items declared anywhere inside a function body.
    fn lower_block(&mut self, block: &syn::Block) {
        let mut nested = NestedItems::default();
        nested.visit_block(block);
        for item in nested.items {
            self.lower_item(item, false, Scope::Block);
        }
    }

    fn lower_use(&mut self, tree: &UseTree) {
        match tree {
            UseTree::Path(path) => self.lower_use(&path.tree),
            UseTree::Rename(rename) => self.imports.push(Import {
                local: rename.rename.to_string(),
                target: rename.ident.to_string(),
                span: self.span(rename.span()),
            }),
            UseTree::Group(group) => {
                for tree in &group.items {
                    self.lower_use(tree);
                }
            }
            _ => {}
        }
    }

    fn lower_impl(&mut self, item: &syn::ItemImpl) {
        let Type::Path(self_ty) = &*item.self_ty else {
            return;
        };
        let Some(segment) = self_ty.path.segments.last() else {
            return;
        };
        let self_name = segment.ident.to_string();
        let previous = self.self_name.replace(self_name.clone());

        let trait_path = item.trait_.as_ref().map(|(_, path, _)| path);
        let is_deref = trait_path
            .and_then(|path| path.segments.last())
            .is_some_and(|segment| segment.ident == "Deref");

        let mut pending = PendingImpl {
            module: self.module,
            self_name,
            methods: Vec::new(),
            implements: None,
            deref: None,
            typename: None,
        };
        for impl_item in &item.items {
            match impl_item {
                ImplItem::Fn(method) => {
                    pending
                        .methods
                        .push(self.lower_method(&method.attrs, &method.sig, method.span()));
                    self.lower_block(&method.block);
                }
                ImplItem::Type(assoc) if is_deref && assoc.ident == "Target" => {
                    pending.deref = Some(self.lower_type(&assoc.ty));
                }
                ImplItem::Const(constant) if trait_path.is_none() && constant.ident == "TYPENAME" => {
                    pending.typename = self.lower_typename(constant);
                }
                _ => {}
            }
        }
        if let Some(path) = trait_path {
            if !is_deref {
                pending.implements = Some(self.lower_path(path, self.span(path.span())));
            }
        }

        self.self_name = previous;
        self.impls.push(pending);
    }

    fn lower_typename(&self, constant: &syn::ImplItemConst) -> Option<PropertyDecl> {
        let syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(value),
            ..
        }) = &constant.expr
        else {
            debug!("TYPENAME of {:?} is not a string literal", self.self_name);
            return None;
        };
        Some(PropertyDecl {
            name: "__typename".to_string(),
            name_span: self.span(constant.ident.span()),
            span: self.span(constant.span()),
            annotations: Vec::new(),
            ty: Some(TypeExpr::new(
                TypeExprKind::StringLiteral(value.value()),
                self.span(value.span()),
            )),
            rename: None,
            default: None,
        })
    }

    fn lower_fields(&self, fields: &syn::Fields) -> Vec<PropertyDecl> {
        let syn::Fields::Named(named) = fields else {
            return Vec::new();
        };
        named
            .named
            .iter()
            .filter_map(|field| {
                let ident = field.ident.as_ref()?;
                Some(PropertyDecl {
                    name: ident.to_string(),
                    name_span: self.span(ident.span()),
                    span: self.span(field.span()),
                    annotations: self.lower_attrs(&field.attrs),
                    ty: Some(self.lower_type(&field.ty)),
                    rename: serde_rename(&field.attrs),
                    default: self.gql_default(&field.attrs),
                })
            })
            .collect()
    }

    fn lower_payload(&self, fields: &syn::Fields) -> Option<TypeExpr> {
        let span = self.span(fields.span());
        match fields {
            syn::Fields::Unit => None,
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                unnamed.unnamed.first().map(|field| self.lower_type(&field.ty))
            }
            syn::Fields::Unnamed(unnamed) => Some(TypeExpr::new(
                TypeExprKind::Tuple(
                    unnamed
                        .unnamed
                        .iter()
                        .map(|field| self.lower_type(&field.ty))
                        .collect(),
                ),
                span,
            )),
            syn::Fields::Named(_) => Some(TypeExpr::new(
                TypeExprKind::Object(self.lower_fields(fields)),
                span,
            )),
        }
    }

    fn lower_method(
        &self,
        attrs: &[Attribute],
        sig: &syn::Signature,
        span: proc_macro2::Span,
    ) -> MethodDecl {
        MethodDecl {
            name: sig.ident.to_string(),
            name_span: self.span(sig.ident.span()),
            span: self.span(span),
            annotations: self.lower_attrs(attrs),
            signature: self.lower_signature(sig),
        }
    }

    fn lower_signature(&self, sig: &syn::Signature) -> Signature {
        let mut receiver = None;
        let mut params = Vec::new();
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(this) => receiver = Some(self.span(this.span())),
                FnArg::Typed(param) => params.push(self.lower_param(param)),
            }
        }
        Signature {
            receiver,
            params,
            returns: match &sig.output {
                ReturnType::Default => None,
                ReturnType::Type(_, ty) => Some(self.lower_type(ty)),
            },
            is_async: sig.asyncness.is_some(),
            span: self.span(sig.span()),
        }
    }

    fn lower_param(&self, param: &syn::PatType) -> ParamDecl {
        let pattern = match &*param.pat {
            Pat::Ident(ident) => ParamPattern::Ident(ident.ident.to_string()),
            Pat::Struct(destructured) => ParamPattern::Destructured(
                destructured
                    .fields
                    .iter()
                    .filter_map(|field| match &field.member {
                        Member::Named(name) => Some(DestructuredProperty {
                            name: name.to_string(),
                            span: self.span(field.span()),
                            default: self.gql_default(&field.attrs),
                        }),
                        Member::Unnamed(_) => None,
                    })
                    .collect(),
            ),
            _ => ParamPattern::Ignored,
        };
        ParamDecl {
            pattern,
            span: self.span(param.span()),
            ty: match &*param.ty {
                Type::Infer(_) => None,
                ty => Some(self.lower_type(ty)),
            },
            default: self.gql_default(&param.attrs),
        }
    }

    fn lower_attrs(&self, attrs: &[Attribute]) -> Vec<Annotation> {
        attrs
            .iter()
            .filter(|attr| matches!(attr.style, syn::AttrStyle::Outer))
            .map(|attr| {
                let span = self.span(attr.span());
                if let Meta::NameValue(doc) = &attr.meta {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(text), ..
                    }) = &doc.value
                    {
                        if doc.path.is_ident("doc") {
                            return Annotation::Doc {
                                text: text.value(),
                                span,
                                text_start: self.comment_text_start(span.start),
                            };
                        }
                    }
                }
                Annotation::Attribute {
                    name: path_name(attr.path()),
                    span,
                }
            })
            .collect()
    }

    /// Offset of the text of a `///` or `/** */` comment starting at `offset`.
    fn comment_text_start(&self, offset: u32) -> Option<u32> {
        let rest = self.source.source.get(offset as usize..)?;
        if rest.starts_with("///") || rest.starts_with("/**") {
            Some(offset + 3)
        } else {
            None
        }
    }

    /// `#[gql(default = <expr>)]`
    fn gql_default(&self, attrs: &[Attribute]) -> Option<Expr> {
        let mut default = None;
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("gql")) {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    let value: syn::Expr = meta.value()?.parse()?;
                    default = Some(self.lower_expr(&value));
                    Ok(())
                } else {
                    skip_meta_value(&meta)
                }
            });
            if let Err(err) = parsed {
                debug!("Ignoring malformed gql attribute: {}", err);
            }
        }
        default
    }

    fn lower_type(&self, ty: &Type) -> TypeExpr {
        let span = self.span(ty.span());
        match ty {
            Type::Path(path) if path.qself.is_none() => self.lower_path(&path.path, span),
            Type::Reference(reference) => self.lower_type(&reference.elem),
            Type::Paren(paren) => self.lower_type(&paren.elem),
            Type::Group(group) => self.lower_type(&group.elem),
            Type::Slice(slice) => self.array(&slice.elem, true, span),
            Type::Array(array) => self.array(&array.elem, true, span),
            Type::Tuple(tuple) if tuple.elems.is_empty() => TypeExpr::new(TypeExprKind::Void, span),
            Type::Tuple(tuple) => TypeExpr::new(
                TypeExprKind::Tuple(tuple.elems.iter().map(|elem| self.lower_type(elem)).collect()),
                span,
            ),
            Type::ImplTrait(bounds) => self.lower_trait_object(&bounds.bounds, span),
            Type::TraitObject(bounds) => self.lower_trait_object(&bounds.bounds, span),
            Type::BareFn(_) => TypeExpr::new(TypeExprKind::Function, span),
            _ => TypeExpr::new(TypeExprKind::Unsupported(self.text(span)), span),
        }
    }

    fn array(&self, element: &Type, readonly: bool, span: Span) -> TypeExpr {
        TypeExpr::new(
            TypeExprKind::Array {
                element: Box::new(self.lower_type(element)),
                readonly,
            },
            span,
        )
    }

    fn lower_path(&self, path: &syn::Path, span: Span) -> TypeExpr {
        let Some(segment) = path.segments.last() else {
            return TypeExpr::new(TypeExprKind::Unsupported(self.text(span)), span);
        };
        let ident = segment.ident.to_string();
        if let PathArguments::Parenthesized(_) = segment.arguments {
            return TypeExpr::new(TypeExprKind::Function, span);
        }
        let (args, assoc) = generic_args(&segment.arguments);
        let first = args.first().copied();

        match (ident.as_str(), first) {
            ("Self", None) if path.segments.len() == 1 => {
                let name = self.self_name.clone().unwrap_or_else(|| ident.clone());
                TypeExpr::reference(name, span)
            }
            ("Option", Some(inner)) => TypeExpr::new(
                TypeExprKind::Union(vec![
                    self.lower_type(inner),
                    TypeExpr::new(TypeExprKind::Null, span),
                ]),
                span,
            ),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "LinkedList", Some(inner)) => {
                self.array(inner, false, span)
            }
            ("Box" | "Arc" | "Rc" | "Cow" | "Pin" | "Result", Some(inner)) => self.lower_type(inner),
            ("BoxFuture" | "LocalBoxFuture", Some(inner)) => TypeExpr::new(
                TypeExprKind::Deferred(Box::new(self.lower_type(inner))),
                span,
            ),
            ("BoxStream" | "LocalBoxStream", Some(inner)) => TypeExpr::new(
                TypeExprKind::Stream(Box::new(self.lower_type(inner))),
                span,
            ),
            ("Future", _) => {
                let output = assoc
                    .iter()
                    .find(|(ident, _)| *ident == "Output")
                    .map(|(_, ty)| self.lower_type(ty))
                    .unwrap_or_else(|| TypeExpr::new(TypeExprKind::Void, span));
                TypeExpr::new(TypeExprKind::Deferred(Box::new(output)), span)
            }
            ("Stream", _) => match assoc.iter().find(|(ident, _)| *ident == "Item") {
                Some((_, item)) => TypeExpr::new(
                    TypeExprKind::Stream(Box::new(self.lower_type(item))),
                    span,
                ),
                None => TypeExpr::new(TypeExprKind::Unsupported(self.text(span)), span),
            },
            ("Fn" | "FnMut" | "FnOnce", _) => TypeExpr::new(TypeExprKind::Function, span),
            _ => TypeExpr::new(
                TypeExprKind::Reference {
                    name: ident.clone(),
                    args: args.iter().map(|arg| self.lower_type(arg)).collect(),
                },
                span,
            ),
        }
    }

    /// `impl A`, `dyn A + Send`: one meaningful bound is that bound, several
    /// are an intersection.
    fn lower_trait_object(
        &self,
        bounds: &Punctuated<TypeParamBound, syn::Token![+]>,
        span: Span,
    ) -> TypeExpr {
        let mut lowered = self.lower_bounds(bounds);
        match lowered.len() {
            0 => TypeExpr::new(TypeExprKind::Unsupported(self.text(span)), span),
            1 => {
                let mut only = lowered.remove(0);
                only.span = span;
                only
            }
            _ => TypeExpr::new(TypeExprKind::Intersection(lowered), span),
        }
    }

    fn lower_bounds(&self, bounds: &Punctuated<TypeParamBound, syn::Token![+]>) -> Vec<TypeExpr> {
        bounds
            .iter()
            .filter_map(|bound| match bound {
                TypeParamBound::Trait(bound)
                    if matches!(bound.modifier, syn::TraitBoundModifier::None) =>
                {
                    let name = bound.path.segments.last()?.ident.to_string();
                    if MARKER_TRAITS.contains(&name.as_str()) {
                        return None;
                    }
                    Some(self.lower_path(&bound.path, self.span(bound.span())))
                }
                _ => None,
            })
            .collect()
    }

    fn lower_expr(&self, expr: &syn::Expr) -> Expr {
        let span = self.span(expr.span());
        let kind = match expr {
            syn::Expr::Lit(lit) => match &lit.lit {
                Lit::Str(value) => ExprKind::String(value.value()),
                Lit::Char(value) => ExprKind::String(value.value().to_string()),
                Lit::Int(value) => ExprKind::Number(value.base10_digits().to_string()),
                Lit::Float(value) => ExprKind::Number(value.base10_digits().to_string()),
                Lit::Bool(value) => ExprKind::Bool(value.value),
                _ => ExprKind::Other(self.text(span)),
            },
            syn::Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
                match self.lower_expr(&unary.expr).kind {
                    ExprKind::Number(digits) => ExprKind::Number(format!("-{}", digits)),
                    _ => ExprKind::Other(self.text(span)),
                }
            }
            syn::Expr::Reference(reference) => return self.lower_expr(&reference.expr),
            syn::Expr::Paren(paren) => return self.lower_expr(&paren.expr),
            syn::Expr::Group(group) => return self.lower_expr(&group.expr),
            syn::Expr::Array(array) => {
                ExprKind::Array(array.elems.iter().map(|elem| self.lower_expr(elem)).collect())
            }
            syn::Expr::Path(path) if path.qself.is_none() => {
                let segments: Vec<String> = path
                    .path
                    .segments
                    .iter()
                    .map(|segment| segment.ident.to_string())
                    .collect();
                match segments.as_slice() {
                    [single] if single == "None" => ExprKind::Null,
                    [single] => ExprKind::Identifier(single.clone()),
                    [.., owner, member] => ExprKind::EnumMember {
                        owner: owner.clone(),
                        member: member.clone(),
                    },
                    [] => ExprKind::Other(self.text(span)),
                }
            }
            syn::Expr::Call(call) => {
                let callee = match &*call.func {
                    syn::Expr::Path(path) => path_name(&path.path),
                    other => self.text(self.span(other.span())),
                };
                let wraps_value = matches!(callee.as_str(), "Some" | "String::from" | "Box::new");
                match call.args.first() {
                    Some(inner) if wraps_value && call.args.len() == 1 => {
                        return self.lower_expr(inner)
                    }
                    _ => ExprKind::Call(callee),
                }
            }
            syn::Expr::MethodCall(call)
                if call.args.is_empty()
                    && matches!(call.method.to_string().as_str(), "to_string" | "to_owned" | "into") =>
            {
                return self.lower_expr(&call.receiver)
            }
            syn::Expr::MethodCall(call) => ExprKind::Call(call.method.to_string()),
            syn::Expr::Struct(object) => match &object.rest {
                Some(rest) => ExprKind::Spread(Box::new(self.lower_expr(rest))),
                None => ExprKind::Object(
                    object
                        .fields
                        .iter()
                        .filter_map(|field| match &field.member {
                            Member::Named(name) => Some(ObjectEntry {
                                key: camel_case(&name.to_string()),
                                value: self.lower_expr(&field.expr),
                            }),
                            Member::Unnamed(_) => None,
                        })
                        .collect(),
                ),
            },
            syn::Expr::Macro(mac) => self.lower_macro(&mac.mac, span),
            _ => ExprKind::Other(self.text(span)),
        };
        Expr::new(kind, span)
    }

    fn lower_macro(&self, mac: &syn::Macro, span: Span) -> ExprKind {
        let name = path_name(&mac.path);
        match name.as_str() {
            "vec" => match mac.parse_body_with(Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated) {
                Ok(elems) => ExprKind::Array(elems.iter().map(|elem| self.lower_expr(elem)).collect()),
                Err(_) => ExprKind::Other(self.text(span)),
            },
            "format" => match mac.parse_body::<syn::LitStr>() {
                Ok(text) => {
                    let value = text.value();
                    let interpolated = value.contains('{');
                    ExprKind::Template {
                        value,
                        interpolated,
                    }
                }
                Err(_) => ExprKind::Template {
                    value: mac.tokens.to_string(),
                    interpolated: true,
                },
            },
            _ => ExprKind::Call(format!("{}!", name)),
        }
    }
}

/// Items nested in a function body, without descending into those items.
#[derive(Default)]
struct NestedItems<'ast> {
    items: Vec<&'ast Item>,
}

impl<'ast> Visit<'ast> for NestedItems<'ast> {
    fn visit_item(&mut self, item: &'ast Item) {
        self.items.push(item);
    }
}

fn attach_impls(modules: &mut [SourceModule], impls: Vec<PendingImpl>) {
    for pending in impls {
        let Some(target) = find_struct(modules, pending.module, &pending.self_name) else {
            debug!(
                "No unique struct `{}` for impl block, skipping",
                pending.self_name
            );
            continue;
        };
        let declaration =
            &mut modules[target.module.0 as usize].declarations[target.index as usize];
        if let DeclKind::Struct(structure) = &mut declaration.kind {
            structure.methods.extend(pending.methods);
            structure.implements.extend(pending.implements);
            if pending.deref.is_some() {
                structure.extends = pending.deref;
            }
            structure.properties.extend(pending.typename);
        }
    }
}

/// The struct an impl block targets: a local one first, else the only one
/// with that name in the whole set.
fn find_struct(modules: &[SourceModule], from: ModuleId, name: &str) -> Option<DeclId> {
    let is_target =
        |decl: &Declaration| decl.name == name && matches!(decl.kind, DeclKind::Struct(_));

    if let Some(index) = modules
        .get(from.0 as usize)?
        .declarations
        .iter()
        .position(|decl| is_target(decl))
    {
        return Some(DeclId {
            module: from,
            index: index as u32,
        });
    }

    let mut found = None;
    for (module_index, module) in modules.iter().enumerate() {
        for (index, decl) in module.declarations.iter().enumerate() {
            if !is_target(decl) {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(DeclId {
                module: ModuleId(module_index as u32),
                index: index as u32,
            });
        }
    }
    found
}

fn is_public(vis: &Visibility) -> bool {
    !matches!(vis, Visibility::Inherited)
}

fn path_name(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// Positional type arguments and `Name = Type` bindings of a path segment.
fn generic_args(arguments: &PathArguments) -> (Vec<&Type>, Vec<(&syn::Ident, &Type)>) {
    let mut args = Vec::new();
    let mut assoc = Vec::new();
    if let PathArguments::AngleBracketed(bracketed) = arguments {
        for arg in &bracketed.args {
            match arg {
                syn::GenericArgument::Type(ty) => args.push(ty),
                syn::GenericArgument::AssocType(binding) => assoc.push((&binding.ident, &binding.ty)),
                _ => {}
            }
        }
    }
    (args, assoc)
}

/// `#[serde(rename = "...")]` on a field or variant.
fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                skip_meta_value(&meta)
            }
        });
        if let Err(err) = parsed {
            debug!("Ignoring malformed serde attribute: {}", err);
        }
    }
    rename
}

/// Consumes `= value` or `(...)` after a nested meta path we do not interpret.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lower_one(source: &str) -> ModuleSet {
        lower_sources(&[("src/lib.rs", source)]).unwrap()
    }

    fn decl<'m>(modules: &'m ModuleSet, name: &str) -> &'m Declaration {
        modules
            .declarations()
            .map(|(_, decl)| decl)
            .find(|decl| decl.name == name)
            .unwrap_or_else(|| panic!("no declaration `{}`", name))
    }

    fn structure<'m>(modules: &'m ModuleSet, name: &str) -> &'m StructDecl {
        match &decl(modules, name).kind {
            DeclKind::Struct(structure) => structure,
            other => panic!("`{}` is not a struct: {:?}", name, other),
        }
    }

    fn property_types(modules: &ModuleSet, name: &str) -> Vec<String> {
        structure(modules, name)
            .properties
            .iter()
            .map(|property| property.ty.as_ref().unwrap().describe())
            .collect()
    }

    #[test]
    fn test_doc_comment_offsets_point_at_text() {
        let source = "/// @gqlType\npub struct User;\n";
        let modules = lower_one(source);
        let user = decl(&modules, "User");

        match &user.annotations[0] {
            Annotation::Doc {
                text, text_start, ..
            } => {
                assert_eq!(text, " @gqlType");
                let start = text_start.unwrap() as usize;
                assert_eq!(&source[start..start + 9], " @gqlType");
            }
            other => panic!("Expected doc annotation, got {:?}", other),
        }
        assert_eq!(modules.sources.snippet(&user.name_span), "User");
    }

    #[test]
    fn test_attribute_annotations_keep_order() {
        let modules = lower_one("#[derive(Debug)]\n/// @gqlType\npub struct User;\n");
        let user = decl(&modules, "User");

        assert!(matches!(&user.annotations[0], Annotation::Attribute { name, .. } if name == "derive"));
        assert!(matches!(&user.annotations[1], Annotation::Doc { .. }));
    }

    #[test]
    fn test_type_mapping() {
        let modules = lower_one(
            r#"
pub struct Holder {
    a: Option<String>,
    b: Vec<Option<i32>>,
    c: &'static [User],
    d: Box<User>,
    e: Result<User, Error>,
    f: impl Future<Output = User>,
    g: Pin<Box<dyn Future<Output = User> + Send>>,
    h: impl Stream<Item = User>,
    i: BoxStream<'static, User>,
    j: dyn Pet,
    k: (i32, i32),
    l: impl Pet + Named,
    m: fn() -> i32,
    n: Page<User>,
}
"#,
        );

        assert_eq!(
            property_types(&modules, "Holder"),
            vec![
                "String | null",
                "Vec<i32 | null>",
                "Vec<User>",
                "User",
                "User",
                "Future<User>",
                "Future<User>",
                "Stream<User>",
                "Stream<User>",
                "Pet",
                "tuple",
                "intersection",
                "function",
                "Page<User>",
            ]
        );
        let slice = structure(&modules, "Holder").properties[2].ty.clone().unwrap();
        assert!(matches!(slice.kind, TypeExprKind::Array { readonly: true, .. }));
    }

    #[test]
    fn test_impl_blocks_attach_across_files() {
        let modules = lower_sources(&[
            (
                "src/models.rs",
                "pub struct User { pub name: String }\npub struct Base;\n",
            ),
            (
                "src/resolvers.rs",
                r#"
impl User {
    pub const TYPENAME: &'static str = "User";
    pub fn friends(&self) -> Vec<Self> { Vec::new() }
}
impl Node for User {
    fn id(&self) -> String { String::new() }
}
impl std::ops::Deref for User {
    type Target = Base;
    fn deref(&self) -> &Base { todo!() }
}
"#,
            ),
        ])
        .unwrap();

        let user = structure(&modules, "User");
        let methods: Vec<&str> = user.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["friends", "id", "deref"]);
        assert_eq!(
            user.methods[0].signature.returns.as_ref().unwrap().describe(),
            "Vec<User>"
        );
        assert_eq!(user.implements.len(), 1);
        assert_eq!(user.implements[0].describe(), "Node");
        assert_eq!(user.extends.as_ref().unwrap().describe(), "Base");

        let typename = user.properties.last().unwrap();
        assert_eq!(typename.name, "__typename");
        assert_eq!(
            typename.ty.as_ref().unwrap().kind,
            TypeExprKind::StringLiteral("User".to_string())
        );
    }

    #[test]
    fn test_parameter_patterns() {
        let modules = lower_one(
            r#"
pub fn search(Args { name, #[gql(default = 10)] limit }: _, _ctx: Context, _: Info) {}
"#,
        );
        let DeclKind::Function(signature) = &decl(&modules, "search").kind else {
            panic!("search is not a function");
        };

        match &signature.params[0].pattern {
            ParamPattern::Destructured(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name, "name");
                assert_eq!(
                    fields[1].default.as_ref().unwrap().kind,
                    ExprKind::Number("10".to_string())
                );
            }
            other => panic!("Expected destructuring, got {:?}", other),
        }
        assert!(signature.params[0].ty.is_none());
        assert_eq!(signature.params[1].ident(), Some("_ctx"));
        assert!(matches!(signature.params[2].pattern, ParamPattern::Ignored));
        assert!(signature.receiver.is_none());
    }

    #[test]
    fn test_field_attributes() {
        let modules = lower_one(
            r#"
pub struct Filter {
    #[serde(rename = "first")]
    pub limit: i32,
    #[gql(default = Color::Red)]
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none", rename = "q")]
    #[gql(default = vec![-1, 2])]
    pub query: Option<Vec<i32>>,
}
"#,
        );
        let properties = &structure(&modules, "Filter").properties;

        assert_eq!(properties[0].rename.as_deref(), Some("first"));
        assert_eq!(
            properties[1].default.as_ref().unwrap().kind,
            ExprKind::EnumMember {
                owner: "Color".to_string(),
                member: "Red".to_string()
            }
        );
        assert_eq!(properties[2].rename.as_deref(), Some("q"));
        let ExprKind::Array(elems) = &properties[2].default.as_ref().unwrap().kind else {
            panic!("Expected array default");
        };
        assert_eq!(elems[0].kind, ExprKind::Number("-1".to_string()));
    }

    #[test]
    fn test_default_expression_shapes() {
        let modules = lower_one(
            r#"
pub struct Defaults {
    #[gql(default = "x".to_string())] a: String,
    #[gql(default = Some(Range { min_value: 1 }))] b: Option<Range>,
    #[gql(default = None)] c: Option<i32>,
    #[gql(default = compute())] d: i32,
    #[gql(default = format!("{}", 1))] e: String,
}
"#,
        );
        let defaults: Vec<ExprKind> = structure(&modules, "Defaults")
            .properties
            .iter()
            .map(|property| property.default.clone().unwrap().kind)
            .collect();

        assert_eq!(defaults[0], ExprKind::String("x".to_string()));
        match &defaults[1] {
            ExprKind::Object(entries) => assert_eq!(entries[0].key, "minValue"),
            other => panic!("Expected object, got {:?}", other),
        }
        assert_eq!(defaults[2], ExprKind::Null);
        assert_eq!(defaults[3], ExprKind::Call("compute".to_string()));
        assert!(matches!(defaults[4], ExprKind::Template { interpolated: true, .. }));
    }

    #[test]
    fn test_scope_and_visibility() {
        let modules = lower_one(
            r#"
pub struct Visible;
struct Private;
mod hidden {
    pub struct Inner;
}
pub mod open {
    pub struct Outer;
}
pub fn outer() {
    struct Local;
}
"#,
        );

        assert!(decl(&modules, "Visible").exported);
        assert!(!decl(&modules, "Private").exported);
        assert!(!decl(&modules, "Inner").exported);
        assert_eq!(decl(&modules, "Inner").private_module.as_deref(), Some("hidden"));
        assert!(decl(&modules, "Outer").exported);
        assert_eq!(decl(&modules, "Outer").private_module, None);
        assert_eq!(decl(&modules, "Private").private_module, None);
        let local = decl(&modules, "Local");
        assert_eq!(local.scope, Scope::Block);
        assert!(!local.exported);
    }

    #[test]
    fn test_enum_payloads_and_trait_supertraits() {
        let modules = lower_one(
            r#"
pub enum SearchResult {
    #[serde(rename = "person")]
    User(User),
    Post(Box<Post>),
    Empty,
}
pub trait Named: Node + Send + Sync {
    fn name(&self) -> String;
}
"#,
        );

        let DeclKind::Enum(search) = &decl(&modules, "SearchResult").kind else {
            panic!("SearchResult is not an enum");
        };
        assert_eq!(search.variants[0].rename.as_deref(), Some("person"));
        assert_eq!(search.variants[1].payload.as_ref().unwrap().describe(), "Post");
        assert!(search.variants[2].payload.is_none());

        let DeclKind::Trait(named) = &decl(&modules, "Named").kind else {
            panic!("Named is not a trait");
        };
        assert_eq!(named.extends.len(), 1);
        assert_eq!(named.extends[0].describe(), "Node");
        assert_eq!(named.methods[0].name, "name");
    }

    #[test]
    fn test_renaming_imports_and_generics() {
        let modules = lower_one(
            "use crate::models::{User as Member, Post};\npub struct Page<'a, T, U> { items: &'a [T], extra: Option<U> }\n",
        );

        assert_eq!(modules.modules[0].imports.len(), 1);
        assert_eq!(modules.modules[0].imports[0].local, "Member");
        assert_eq!(modules.modules[0].imports[0].target, "User");
        let generics: Vec<&str> = decl(&modules, "Page")
            .generics
            .iter()
            .map(|param| param.name.as_str())
            .collect();
        assert_eq!(generics, vec!["T", "U"]);
    }

    #[test]
    fn test_async_functions() {
        let modules = lower_one("pub async fn me() -> Option<User> { None }\n");
        let DeclKind::Function(signature) = &decl(&modules, "me").kind else {
            panic!("me is not a function");
        };

        assert!(signature.is_async);
        assert_eq!(signature.returns.as_ref().unwrap().describe(), "User | null");
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let result = lower_sources(&[("src/broken.rs", "pub struct {")]);

        match result {
            Err(Error::ParseError { file, .. }) => assert_eq!(file, PathBuf::from("src/broken.rs")),
            other => panic!("Expected parse error, got {:?}", other.map(|_| ())),
        }
    }
}
