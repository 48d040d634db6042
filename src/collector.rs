//! Declaration collection.
//!
//! Walks every declaration of the module set once, parses its doc tags and
//! those of its members, and records what each tagged declaration is
//! ([`Role`]) together with the members that contribute schema elements.
//! Nothing here resolves types; that is left to the definition builder,
//! which may visit declarations in any order.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{
    Annotation, DeclId, DeclKind, Declaration, MethodDecl, ModuleId, ModuleSet, PropertyDecl,
    Scope, Signature, Span, VariantDecl,
};
use crate::schema::{DirectiveLocation, Operation};
use crate::tags::{self, ParsedDoc, Tag, TagName};
use log::debug;
use std::collections::BTreeMap;

/// What a tagged declaration contributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    Input,
    /// A schema type defined outside the extracted modules.
    External { location: Option<String> },
    /// The root context value passed to every resolver.
    Context,
    /// A function deriving a context value from other context values.
    DerivedContext,
    Directive {
        repeatable: bool,
        locations: Vec<DirectiveLocation>,
    },
}

impl Role {
    /// Whether references to the declaration resolve to a schema type.
    pub fn is_schema_type(&self) -> bool {
        !matches!(
            self,
            Role::Context | Role::DerivedContext | Role::Directive { .. }
        )
    }
}

/// A name written in a tag body, with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRef {
    pub name: String,
    pub span: Span,
}

/// The program construct backing a field.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource<'m> {
    Property(&'m PropertyDecl),
    Method(&'m MethodDecl),
    /// An associated function without a receiver (root fields only).
    StaticMethod {
        owner: &'m str,
        method: &'m MethodDecl,
    },
    Function {
        decl: &'m Declaration,
        signature: &'m Signature,
    },
}

impl<'m> FieldSource<'m> {
    pub fn signature(&self) -> Option<&'m Signature> {
        match self {
            FieldSource::Property(_) => None,
            FieldSource::Method(method) | FieldSource::StaticMethod { method, .. } => {
                Some(&method.signature)
            }
            FieldSource::Function { signature, .. } => Some(signature),
        }
    }

    pub fn host_name(&self) -> &'m str {
        match self {
            FieldSource::Property(property) => &property.name,
            FieldSource::Method(method) | FieldSource::StaticMethod { method, .. } => &method.name,
            FieldSource::Function { decl, .. } => &decl.name,
        }
    }

    pub fn host_name_span(&self) -> Span {
        match self {
            FieldSource::Property(property) => property.name_span,
            FieldSource::Method(method) | FieldSource::StaticMethod { method, .. } => {
                method.name_span
            }
            FieldSource::Function { decl, .. } => decl.name_span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectedField<'m> {
    /// Schema name: the tag's rename or the camel-cased host name.
    pub name: String,
    pub name_span: Span,
    pub doc: ParsedDoc,
    pub source: FieldSource<'m>,
    pub module: ModuleId,
}

#[derive(Debug, Clone)]
pub struct CollectedProperty<'m> {
    pub property: &'m PropertyDecl,
    pub doc: ParsedDoc,
}

#[derive(Debug, Clone)]
pub struct CollectedVariant<'m> {
    pub variant: &'m VariantDecl,
    pub doc: ParsedDoc,
}

#[derive(Debug, Clone)]
pub struct Collected<'m> {
    pub id: DeclId,
    pub decl: &'m Declaration,
    pub role: Role,
    /// Schema name (type, directive) or host name (contexts).
    pub name: String,
    pub doc: ParsedDoc,
    /// The kind tag that gave the declaration its role.
    pub tag_span: Span,
    pub operation: Option<Operation>,
    pub implements: Vec<NamedRef>,
    pub fields: Vec<CollectedField<'m>>,
    pub properties: Vec<CollectedProperty<'m>>,
    pub variants: Vec<CollectedVariant<'m>>,
}

#[derive(Debug, Clone)]
pub struct RootField<'m> {
    pub operation: Operation,
    pub field: CollectedField<'m>,
}

#[derive(Debug, Default)]
pub struct Collection<'m> {
    pub declarations: BTreeMap<DeclId, Collected<'m>>,
    /// Free functions adding a field to the type of their first parameter.
    pub functional_fields: Vec<CollectedField<'m>>,
    pub root_fields: Vec<RootField<'m>>,
    pub root_context: Option<DeclId>,
}

impl<'m> Collection<'m> {
    pub fn get(&self, id: DeclId) -> Option<&Collected<'m>> {
        self.declarations.get(&id)
    }

    pub fn with_role<'a>(
        &'a self,
        matches: impl Fn(&Role) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Collected<'m>> + 'a {
        self.declarations.values().filter(move |c| matches(&c.role))
    }
}

/// Why a declaration cannot be reached from other modules, and the fix.
fn unreachable_reason(decl: &Declaration) -> String {
    if decl.scope == Scope::Block {
        format!("`{}` is inside a function body. Move it to module level", decl.name)
    } else if let Some(module) = &decl.private_module {
        format!(
            "`{}` is inside the private module `{}`. Make `mod {}` public",
            decl.name, module, module
        )
    } else {
        format!("`{}` is not public. Make it `pub` at module level", decl.name)
    }
}

/// Converts a snake_case host identifier into the camelCase schema name.
pub fn camel_case(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let leading = name.len() - name.trim_start_matches('_').len();
    let mut result = "_".repeat(leading);
    let mut upper = false;
    for ch in name[leading..].chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            result.extend(ch.to_uppercase());
            upper = false;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Whether `name` is a valid schema name that is not reserved for introspection.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|ch| ch == '_' || ch.is_ascii_alphabetic());
    valid_start
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
        && !name.starts_with("__")
}

fn mentions_gql(annotations: &[Annotation]) -> bool {
    annotations.iter().any(|annotation| match annotation {
        Annotation::Doc { text, .. } => text.contains("@gql"),
        Annotation::Attribute { .. } => false,
    })
}

/// Span of the word at byte `offset` within a tag body, when the body span
/// is verbatim source.
fn word_span(tag: &Tag, offset: usize, len: usize) -> Span {
    if tag.body_span.len() as usize == tag.body.len() {
        let start = tag.body_span.start + offset as u32;
        Span::new(tag.body_span.file, start, start + len as u32)
    } else {
        tag.body_span
    }
}

/// Words of a tag body with their byte offsets.
fn body_words(body: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (idx, ch) in body.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(from)) => {
                words.push((from, &body[from..idx]));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(from) = start {
        words.push((from, &body[from..]));
    }
    words
}

struct Collector<'m, 's> {
    modules: &'m ModuleSet,
    sink: &'s mut DiagnosticSink,
    collection: Collection<'m>,
}

/// Collects every tagged declaration in `modules`.
pub fn collect<'m>(modules: &'m ModuleSet, sink: &mut DiagnosticSink) -> Collection<'m> {
    let mut collector = Collector {
        modules,
        sink,
        collection: Collection::default(),
    };
    for (id, decl) in modules.declarations() {
        collector.visit(id, decl);
    }
    debug!(
        "Collected {} tagged declarations, {} functional fields, {} root fields",
        collector.collection.declarations.len(),
        collector.collection.functional_fields.len(),
        collector.collection.root_fields.len()
    );
    collector.collection
}

impl<'m, 's> Collector<'m, 's> {
    fn parse(&mut self, annotations: &[Annotation], force: bool) -> ParsedDoc {
        if force || mentions_gql(annotations) {
            tags::parse_doc(annotations, self.sink)
        } else {
            ParsedDoc::default()
        }
    }

    fn visit(&mut self, id: DeclId, decl: &'m Declaration) {
        let doc = self.parse(&decl.annotations, false);
        let mut kind_tags = doc.kind_tags();
        let kind = kind_tags.next().cloned();
        for extra in kind_tags {
            if let Some(first) = &kind {
                self.sink.push(
                    Diagnostic::syntax(
                        extra.span,
                        format!(
                            "Unexpected `{}`: `{}` is already tagged `{}`. A declaration can only have one kind tag.",
                            extra.name.as_str(),
                            decl.name,
                            first.name.as_str()
                        ),
                    )
                    .with_related(first.span, "first kind tag"),
                );
            }
        }

        let Some(kind) = kind else {
            self.check_orphan_tags(decl, &doc);
            self.visit_members(id, decl, None);
            return;
        };

        if decl.scope == Scope::Block || !decl.exported {
            self.sink.syntax(
                kind.span,
                format!(
                    "Tag `{}` is on a declaration that is unreachable from other modules: {}.",
                    kind.name.as_str(),
                    unreachable_reason(decl)
                ),
            );
            return;
        }

        debug!("Collecting {} `{}` ({})", kind.name.as_str(), decl.name, decl.kind_label());

        match (kind.name, &decl.kind) {
            (TagName::Field, DeclKind::Function(signature)) => {
                if let Some(field) = self.function_field(id, decl, signature, &kind, doc) {
                    self.collection.functional_fields.push(field);
                }
                return;
            }
            (
                TagName::QueryField | TagName::MutationField | TagName::SubscriptionField,
                DeclKind::Function(signature),
            ) => {
                let operation = root_operation(kind.name);
                if let Some(field) = self.function_field(id, decl, signature, &kind, doc) {
                    self.collection.root_fields.push(RootField { operation, field });
                }
                return;
            }
            _ => {}
        }

        let Some((role, name)) = self.role(decl, &kind) else {
            self.visit_members(id, decl, None);
            return;
        };

        if role == Role::Context {
            if let Some(existing) = self.collection.root_context {
                let previous = self.modules.declaration(existing);
                self.sink.push(
                    Diagnostic::semantic(
                        kind.span,
                        format!(
                            "Multiple root context types: `{}` and `{}`. Only one declaration may be tagged `@gqlContext`.",
                            previous.name, decl.name
                        ),
                    )
                    .with_related(previous.name_span, "previous context type"),
                );
            } else {
                self.collection.root_context = Some(id);
            }
        }

        if !matches!(role, Role::DerivedContext) {
            self.check_field_only_tags(decl, &doc);
        }

        let operation = self.operation(decl, &doc, &role);
        let implements = self.implements(&doc, &role);

        let collected = Collected {
            id,
            decl,
            role: role.clone(),
            name,
            doc,
            tag_span: kind.span,
            operation,
            implements,
            fields: Vec::new(),
            properties: Vec::new(),
            variants: Vec::new(),
        };
        self.collection.declarations.insert(id, collected);
        self.visit_members(id, decl, Some(role));
    }

    /// Role and name for a kind tag on a non-field declaration.
    fn role(&mut self, decl: &'m Declaration, tag: &Tag) -> Option<(Role, String)> {
        let role = match (tag.name, &decl.kind) {
            (TagName::Type, DeclKind::Struct(_)) => Role::Object,
            (TagName::Interface, DeclKind::Trait(_)) => Role::Interface,
            (TagName::Union, DeclKind::Enum(_)) => Role::Union,
            (TagName::Enum, DeclKind::Enum(_)) => Role::Enum,
            (TagName::Input, DeclKind::Struct(_) | DeclKind::Enum(_)) => Role::Input,
            (TagName::Scalar, DeclKind::Struct(_) | DeclKind::Enum(_) | DeclKind::Alias(_)) => {
                Role::Scalar
            }
            (TagName::External, kind) if !matches!(kind, DeclKind::Function(_)) => {
                return self.external(decl, tag);
            }
            (TagName::Context, DeclKind::Function(_)) => Role::DerivedContext,
            (TagName::Context, _) => {
                if !tag.body.is_empty() {
                    self.sink
                        .syntax(tag.body_span, "`@gqlContext` does not take arguments.");
                }
                Role::Context
            }
            (TagName::Directive, DeclKind::Function(_)) => {
                return self.directive(decl, tag);
            }
            (name, _) => {
                let expected = match name {
                    TagName::Type => "a struct",
                    TagName::Interface => "a trait",
                    TagName::Union => "an enum whose variants each wrap one type",
                    TagName::Enum => "an enum",
                    TagName::Input => "a struct or an enum",
                    TagName::Scalar => "a struct, an enum or a type alias",
                    TagName::External => "a type declaration",
                    TagName::Directive => "a function whose parameters are the directive arguments",
                    _ => "a method, a struct field or a free function",
                };
                self.sink.syntax(
                    tag.span,
                    format!(
                        "`{}` cannot be used on {} `{}`. Expected {}.",
                        name.as_str(),
                        decl.kind_label(),
                        decl.name,
                        expected
                    ),
                );
                return None;
            }
        };

        let name = if matches!(role, Role::Context | Role::DerivedContext) {
            decl.name.clone()
        } else {
            self.tag_name(tag, &decl.name, false)?.name
        };
        Some((role, name))
    }

    /// Optional name in a tag body; nothing else may follow it.
    fn tag_name(&mut self, tag: &Tag, default: &str, camel: bool) -> Option<NamedRef> {
        let words = body_words(&tag.body);
        let Some(&(offset, word)) = words.first() else {
            let name = if camel {
                camel_case(default)
            } else {
                default.to_string()
            };
            return Some(NamedRef {
                name,
                span: tag.span,
            });
        };

        let span = word_span(tag, offset, word.len());
        if !is_valid_name(word) {
            self.sink.syntax(
                span,
                format!(
                    "Invalid name `{}` in `{}`. Names must match /^[_A-Za-z][_0-9A-Za-z]*$/ and must not start with `__`.",
                    word,
                    tag.name.as_str()
                ),
            );
            return None;
        }
        if let Some(&(extra_offset, extra)) = words.get(1) {
            self.sink.syntax(
                word_span(tag, extra_offset, extra.len()),
                format!(
                    "Unexpected text `{}` after the name in `{}`. Put descriptions on their own line.",
                    extra,
                    tag.name.as_str()
                ),
            );
        }
        Some(NamedRef {
            name: word.to_string(),
            span,
        })
    }

    /// `@gqlExternal [Name] ["location"]`
    fn external(&mut self, decl: &Declaration, tag: &Tag) -> Option<(Role, String)> {
        let body = tag.body.as_str();
        let (name_part, location) = match body.find('"') {
            Some(quote) => {
                let rest = &body[quote + 1..];
                let Some(close) = rest.find('"') else {
                    self.sink.syntax(
                        tag.body_span,
                        "Unterminated location string in `@gqlExternal`.",
                    );
                    return None;
                };
                (body[..quote].trim(), Some(rest[..close].to_string()))
            }
            None => (body, None),
        };

        let name = match name_part.split_whitespace().collect::<Vec<_>>().as_slice() {
            [] => decl.name.clone(),
            [name] if is_valid_name(name) => name.to_string(),
            _ => {
                self.sink.syntax(
                    tag.body_span,
                    "Expected `@gqlExternal [Name] [\"location\"]`.",
                );
                return None;
            }
        };
        Some((Role::External { location }, name))
    }

    /// `@gqlDirective [name] [repeatable] on LOCATION | LOCATION`
    fn directive(&mut self, decl: &Declaration, tag: &Tag) -> Option<(Role, String)> {
        let words = body_words(&tag.body);
        let Some(on_idx) = words.iter().position(|(_, word)| *word == "on") else {
            self.sink.syntax(
                tag.span,
                format!(
                    "Expected `on LOCATION` in `@gqlDirective` for `{}`, e.g. `@gqlDirective on FIELD_DEFINITION | OBJECT`.",
                    decl.name
                ),
            );
            return None;
        };

        let mut name = decl.name.clone();
        let mut repeatable = false;
        for &(offset, word) in &words[..on_idx] {
            if word == "repeatable" {
                repeatable = true;
            } else if is_valid_name(word) && name == decl.name && !repeatable {
                name = word.to_string();
            } else {
                self.sink.syntax(
                    word_span(tag, offset, word.len()),
                    format!("Unexpected `{}` in `@gqlDirective`.", word),
                );
                return None;
            }
        }

        let (on_offset, _) = words[on_idx];
        let locations_text = &tag.body[on_offset + 2..];
        let mut locations = Vec::new();
        let mut cursor = on_offset + 2;
        for part in locations_text.split('|') {
            let trimmed = part.trim();
            let offset = cursor + (part.len() - part.trim_start().len());
            cursor += part.len() + 1;
            match DirectiveLocation::parse(trimmed) {
                Some(location) if !locations.contains(&location) => locations.push(location),
                Some(_) => {}
                None => {
                    self.sink.syntax(
                        word_span(tag, offset, trimmed.len().max(1)),
                        format!("Unknown directive location `{}`.", trimmed),
                    );
                    return None;
                }
            }
        }

        Some((
            Role::Directive {
                repeatable,
                locations,
            },
            name,
        ))
    }

    fn operation(
        &mut self,
        decl: &Declaration,
        doc: &ParsedDoc,
        role: &Role,
    ) -> Option<Operation> {
        let tag = doc.find(TagName::OperationType)?;
        if *role != Role::Object {
            self.sink.syntax(
                tag.span,
                format!(
                    "`@gqlOperationType` on `{}` requires the declaration to be tagged `@gqlType`.",
                    decl.name
                ),
            );
            return None;
        }
        match Operation::parse(tag.body.trim()) {
            Some(operation) => Some(operation),
            None => {
                self.sink.syntax(
                    tag.body_span,
                    "Expected `@gqlOperationType query`, `mutation` or `subscription`.",
                );
                None
            }
        }
    }

    /// `@gqlImplements A, B`; repeated tags accumulate.
    fn implements(&mut self, doc: &ParsedDoc, role: &Role) -> Vec<NamedRef> {
        let mut names = Vec::new();
        for tag in doc.all(TagName::Implements) {
            if !matches!(role, Role::Object | Role::Interface) {
                self.sink.syntax(
                    tag.span,
                    "`@gqlImplements` can only be used on types tagged `@gqlType` or `@gqlInterface`.",
                );
                continue;
            }
            let mut offset = 0;
            for part in tag.body.split(',') {
                let name = part.trim();
                let start = offset + (part.len() - part.trim_start().len());
                offset += part.len() + 1;
                if name.is_empty() {
                    continue;
                }
                let span = word_span(tag, start, name.len());
                if !is_valid_name(name) {
                    self.sink
                        .syntax(span, format!("Invalid interface name `{}`.", name));
                    continue;
                }
                names.push(NamedRef {
                    name: name.to_string(),
                    span,
                });
            }
        }
        names
    }

    fn check_field_only_tags(&mut self, decl: &Declaration, doc: &ParsedDoc) {
        if let Some(deprecated) = &doc.deprecated {
            if !matches!(decl.kind, DeclKind::Function(_)) {
                self.sink.syntax(
                    deprecated.span,
                    "`@deprecated` can only be used on fields, arguments, input fields and enum values.",
                );
            }
        }
        if let Some(span) = doc.kills_parent {
            self.sink.syntax(
                span,
                "`@killsParentOnException` can only be used on fields.",
            );
        }
    }

    /// Non-kind tags on an untagged declaration.
    fn check_orphan_tags(&mut self, decl: &Declaration, doc: &ParsedDoc) {
        for tag in &doc.tags {
            self.sink.syntax(
                tag.span,
                format!(
                    "`{}` on `{}` requires a kind tag such as `@gqlType`.",
                    tag.name.as_str(),
                    decl.name
                ),
            );
        }
    }

    fn function_field(
        &mut self,
        id: DeclId,
        decl: &'m Declaration,
        signature: &'m Signature,
        tag: &Tag,
        doc: ParsedDoc,
    ) -> Option<CollectedField<'m>> {
        let name = self.tag_name(tag, &decl.name, true)?;
        Some(CollectedField {
            name: name.name,
            name_span: name.span,
            doc,
            source: FieldSource::Function { decl, signature },
            module: id.module,
        })
    }

    fn visit_members(&mut self, id: DeclId, decl: &'m Declaration, role: Option<Role>) {
        match &decl.kind {
            DeclKind::Struct(structure) => {
                for property in &structure.properties {
                    self.visit_property(id, property, role.as_ref());
                }
                for method in &structure.methods {
                    self.visit_method(id, decl, method, role.as_ref());
                }
            }
            DeclKind::Trait(trait_decl) => {
                for method in &trait_decl.methods {
                    self.visit_method(id, decl, method, role.as_ref());
                }
            }
            DeclKind::Enum(enum_decl) => {
                let tagged = matches!(role, Some(Role::Enum | Role::Union | Role::Input));
                for variant in &enum_decl.variants {
                    let doc = self.parse(&variant.annotations, tagged);
                    self.reject_member_kind_tags(&doc, "an enum variant");
                    if tagged {
                        if let Some(collected) = self.collection.declarations.get_mut(&id) {
                            collected.variants.push(CollectedVariant { variant, doc });
                        }
                    }
                }
            }
            DeclKind::Function(_) | DeclKind::Alias(_) => {}
        }
    }

    fn reject_member_kind_tags(&mut self, doc: &ParsedDoc, what: &str) {
        for tag in doc.kind_tags() {
            self.sink.syntax(
                tag.span,
                format!("`{}` cannot be used on {}.", tag.name.as_str(), what),
            );
        }
    }

    fn visit_property(&mut self, id: DeclId, property: &'m PropertyDecl, role: Option<&Role>) {
        let in_input = matches!(role, Some(Role::Input));
        let in_object = matches!(role, Some(Role::Object));
        let doc = self.parse(&property.annotations, in_input || in_object);

        let mut field_tag = None;
        for tag in doc.kind_tags() {
            if tag.name == TagName::Field && field_tag.is_none() {
                field_tag = Some(tag.clone());
            } else {
                self.sink.syntax(
                    tag.span,
                    format!("`{}` cannot be used on a struct field.", tag.name.as_str()),
                );
            }
        }

        if in_input {
            if let Some(collected) = self.collection.declarations.get_mut(&id) {
                collected.properties.push(CollectedProperty { property, doc });
            }
            return;
        }

        let Some(tag) = field_tag else {
            return;
        };
        if !in_object {
            self.sink.syntax(
                tag.span,
                format!(
                    "`@gqlField` on `{}` must be inside a struct tagged `@gqlType`.",
                    property.name
                ),
            );
            return;
        }

        let default = property.rename.as_deref().unwrap_or(&property.name);
        let Some(name) = self.tag_name(&tag, default, property.rename.is_none()) else {
            return;
        };
        if let Some(collected) = self.collection.declarations.get_mut(&id) {
            collected.fields.push(CollectedField {
                name: name.name,
                name_span: name.span,
                doc,
                source: FieldSource::Property(property),
                module: id.module,
            });
        }
    }

    fn visit_method(
        &mut self,
        id: DeclId,
        owner: &'m Declaration,
        method: &'m MethodDecl,
        role: Option<&Role>,
    ) {
        let has_fields = matches!(role, Some(Role::Object | Role::Interface));
        let doc = self.parse(&method.annotations, has_fields);
        let Some(tag) = doc.kind_tags().next().cloned() else {
            return;
        };

        match tag.name {
            TagName::QueryField | TagName::MutationField | TagName::SubscriptionField => {
                if let Some(receiver) = method.signature.receiver {
                    self.sink.push(
                        Diagnostic::syntax(
                            tag.span,
                            format!(
                                "Root field `{}` must be an associated function without a `self` receiver.",
                                method.name
                            ),
                        )
                        .with_related(receiver, "receiver declared here"),
                    );
                    return;
                }
                if owner.scope == Scope::Block || !owner.exported {
                    self.sink.syntax(
                        tag.span,
                        format!(
                            "Root field `{}` is on `{}`, which is unreachable from other modules: {}.",
                            method.name,
                            owner.name,
                            unreachable_reason(owner)
                        ),
                    );
                    return;
                }
                let Some(name) = self.tag_name(&tag, &method.name, true) else {
                    return;
                };
                self.collection.root_fields.push(RootField {
                    operation: root_operation(tag.name),
                    field: CollectedField {
                        name: name.name,
                        name_span: name.span,
                        doc,
                        source: FieldSource::StaticMethod {
                            owner: &owner.name,
                            method,
                        },
                        module: id.module,
                    },
                });
            }
            TagName::Field => {
                if !has_fields {
                    self.sink.syntax(
                        tag.span,
                        format!(
                            "`@gqlField` on method `{}` must be inside an impl of a struct tagged `@gqlType` or a trait tagged `@gqlInterface`.",
                            method.name
                        ),
                    );
                    return;
                }
                if method.signature.receiver.is_none() {
                    self.sink.syntax(
                        tag.span,
                        format!(
                            "`@gqlField` method `{}` has no `self` receiver. Add `&self`, or use `@gqlQueryField` for a root field.",
                            method.name
                        ),
                    );
                    return;
                }
                let Some(name) = self.tag_name(&tag, &method.name, true) else {
                    return;
                };
                if let Some(collected) = self.collection.declarations.get_mut(&id) {
                    collected.fields.push(CollectedField {
                        name: name.name,
                        name_span: name.span,
                        doc,
                        source: FieldSource::Method(method),
                        module: id.module,
                    });
                }
            }
            other => {
                self.sink.syntax(
                    tag.span,
                    format!("`{}` cannot be used on a method.", other.as_str()),
                );
            }
        }
    }
}

fn root_operation(tag: TagName) -> Operation {
    match tag {
        TagName::MutationField => Operation::Mutation,
        TagName::SubscriptionField => Operation::Subscription,
        _ => Operation::Query,
    }
}
