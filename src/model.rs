//! Host-neutral model of annotated source modules.
//!
//! The extraction engine never looks at `syn` syntax trees directly. The
//! [`lower`](crate::lower) pass turns parsed Rust files into the types in this
//! module, and everything downstream (collection, type resolution, binding)
//! works against this model plus the [`TypeHost`](crate::host::TypeHost)
//! query interface.
//!
//! Every node that can be the subject of a diagnostic carries a [`Span`]
//! pointing back into the [`SourceMap`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Index of a file inside a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self {
            file,
            start,
            end: end.max(start),
        }
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans from different files are not merged; `self` is returned.
    pub fn join(&self, other: &Span) -> Span {
        if self.file != other.file {
            return *self;
        }
        Span::new(self.file, self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// All source files taking part in one extraction run.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of the start of every line; `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based line and 1-based character column of a byte offset.
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx] as usize;
        let offset = (offset as usize).min(self.source.len());
        let column = self
            .source
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        (line_idx + 1, column + 1)
    }

    /// Byte offset of a 1-based line and 0-based character column, the
    /// coordinate system `proc-macro2` reports.
    pub fn offset_of(&self, line: usize, column: usize) -> u32 {
        let Some(&line_start) = self.line_starts.get(line.saturating_sub(1)) else {
            return self.source.len() as u32;
        };
        let rest = &self.source[line_start as usize..];
        let within: usize = rest
            .char_indices()
            .nth(column)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        line_start + within as u32
    }

    /// Text of a 1-based line without its trailing newline.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)? as usize;
        let end = self
            .line_starts
            .get(line)
            .map(|&next| next as usize)
            .unwrap_or(self.source.len());
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: PathBuf, source: String) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(path, source));
        id
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn path(&self, span: &Span) -> &Path {
        self.file(span.file)
            .map(|file| file.path.as_path())
            .unwrap_or_else(|| Path::new("<unknown>"))
    }

    pub fn line_col(&self, span: &Span) -> (usize, usize) {
        self.file(span.file)
            .map(|file| file.line_col(span.start))
            .unwrap_or((1, 1))
    }

    /// Source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        self.file(span.file)
            .and_then(|file| file.source.get(span.start as usize..span.end as usize))
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Index of a module inside a [`ModuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// Identity of a declaration: its module and position inside that module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId {
    pub module: ModuleId,
    pub index: u32,
}

/// The complete input of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    pub sources: SourceMap,
    pub modules: Vec<SourceModule>,
}

impl ModuleSet {
    pub fn module(&self, id: ModuleId) -> &SourceModule {
        &self.modules[id.0 as usize]
    }

    pub fn declaration(&self, id: DeclId) -> &Declaration {
        &self.module(id.module).declarations[id.index as usize]
    }

    /// Every declaration with its identity, in module order.
    pub fn declarations(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.modules.iter().enumerate().flat_map(|(module_idx, module)| {
            module
                .declarations
                .iter()
                .enumerate()
                .map(move |(index, decl)| {
                    (
                        DeclId {
                            module: ModuleId(module_idx as u32),
                            index: index as u32,
                        },
                        decl,
                    )
                })
        })
    }
}

/// One source file lowered into declarations.
#[derive(Debug, Clone)]
pub struct SourceModule {
    pub file: FileId,
    /// Module path used when naming function resolvers (e.g. `src/models.rs`).
    pub path: String,
    pub imports: Vec<Import>,
    pub declarations: Vec<Declaration>,
}

/// A renaming import: `use models::User as Member;`.
#[derive(Debug, Clone)]
pub struct Import {
    pub local: String,
    pub target: String,
    pub span: Span,
}

/// Doc comments and other attributes, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Doc {
        text: String,
        span: Span,
        /// Absolute offset of `text` in the file when the comment text is
        /// verbatim source (`///` and `/** */` comments).
        text_start: Option<u32>,
    },
    Attribute {
        name: String,
        span: Span,
    },
}

impl Annotation {
    pub fn span(&self) -> Span {
        match self {
            Annotation::Doc { span, .. } | Annotation::Attribute { span, .. } => *span,
        }
    }
}

/// Whether a declaration lives at module level or inside a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Module,
    Block,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
    /// Visible from outside its module, taking enclosing inline modules into account.
    pub exported: bool,
    /// The non-`pub` inline module hiding this otherwise `pub` item.
    pub private_module: Option<String>,
    pub scope: Scope,
    pub annotations: Vec<Annotation>,
    pub generics: Vec<GenericParam>,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            DeclKind::Struct(_) => "struct",
            DeclKind::Trait(_) => "trait",
            DeclKind::Function(_) => "function",
            DeclKind::Alias(_) => "type alias",
            DeclKind::Enum(_) => "enum",
        }
    }

    pub fn is_type_like(&self) -> bool {
        !matches!(self.kind, DeclKind::Function(_))
    }
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Struct(StructDecl),
    Trait(TraitDecl),
    Function(Signature),
    Alias(AliasDecl),
    Enum(EnumDecl),
}

/// A class-like declaration: properties plus methods gathered from every impl block.
#[derive(Debug, Clone, Default)]
pub struct StructDecl {
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    /// Concrete base type (program-level inheritance).
    pub extends: Option<TypeExpr>,
    /// Language-level implemented interfaces.
    pub implements: Vec<TypeExpr>,
}

#[derive(Debug, Clone, Default)]
pub struct TraitDecl {
    pub methods: Vec<MethodDecl>,
    pub extends: Vec<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub target: TypeExpr,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDecl {
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
    pub annotations: Vec<Annotation>,
    pub rename: Option<String>,
    pub payload: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
    pub annotations: Vec<Annotation>,
    /// `None` when the property carries no type annotation.
    pub ty: Option<TypeExpr>,
    /// Explicit external name.
    pub rename: Option<String>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
    pub annotations: Vec<Annotation>,
    pub signature: Signature,
}

#[derive(Debug, Clone)]
pub struct Signature {
    /// Span of the `self` receiver, when present.
    pub receiver: Option<Span>,
    pub params: Vec<ParamDecl>,
    pub returns: Option<TypeExpr>,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub pattern: ParamPattern,
    pub span: Span,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
}

impl ParamDecl {
    pub fn ident(&self) -> Option<&str> {
        match &self.pattern {
            ParamPattern::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParamPattern {
    Ident(String),
    /// `Args { a, b }: Args` style destructuring.
    Destructured(Vec<DestructuredProperty>),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DestructuredProperty {
    pub name: String,
    pub span: Span,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn reference(name: impl Into<String>, span: Span) -> Self {
        Self::new(
            TypeExprKind::Reference {
                name: name.into(),
                args: Vec::new(),
            },
            span,
        )
    }

    pub fn is_nullish(&self) -> bool {
        matches!(
            self.kind,
            TypeExprKind::Null | TypeExprKind::Undefined | TypeExprKind::Void
        )
    }

    /// Short human-readable rendering used in diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            TypeExprKind::Reference { name, args } if args.is_empty() => name.clone(),
            TypeExprKind::Reference { name, args } => format!(
                "{}<{}>",
                name,
                args.iter().map(TypeExpr::describe).collect::<Vec<_>>().join(", ")
            ),
            TypeExprKind::Array { element, .. } => format!("Vec<{}>", element.describe()),
            TypeExprKind::Deferred(inner) => format!("Future<{}>", inner.describe()),
            TypeExprKind::Stream(inner) => format!("Stream<{}>", inner.describe()),
            TypeExprKind::Union(members) => members
                .iter()
                .map(TypeExpr::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeExprKind::Null => "null".to_string(),
            TypeExprKind::Undefined => "undefined".to_string(),
            TypeExprKind::Void => "()".to_string(),
            TypeExprKind::StringLiteral(value) => format!("{:?}", value),
            TypeExprKind::Object(_) => "{ .. }".to_string(),
            TypeExprKind::Tuple(_) => "tuple".to_string(),
            TypeExprKind::Intersection(_) => "intersection".to_string(),
            TypeExprKind::Function => "function".to_string(),
            TypeExprKind::Unsupported(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Reference { name: String, args: Vec<TypeExpr> },
    Array { element: Box<TypeExpr>, readonly: bool },
    /// A value available later (a future).
    Deferred(Box<TypeExpr>),
    /// An async iterable of values.
    Stream(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Null,
    Undefined,
    Void,
    StringLiteral(String),
    /// Inline structural object type.
    Object(Vec<PropertyDecl>),
    Tuple(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Function,
    Unsupported(String),
}

// Shape equality only: spans, annotations and defaults are ignored.
impl PartialEq for PropertyDecl {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty && self.rename == other.rename
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    String(String),
    /// Numeric literal in its normalized source text (`10`, `-2.5`).
    Number(String),
    Bool(bool),
    Null,
    Array(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    EnumMember { owner: String, member: String },
    Identifier(String),
    Call(String),
    Spread(Box<Expr>),
    Template { value: String, interpolated: bool },
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expr,
}
