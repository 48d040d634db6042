//! The schema representation produced by a successful extraction run.
//!
//! Every collection in [`SchemaIr`] is sorted by name before it is returned,
//! so serializing the same input twice yields byte-identical output.

use crate::literal::ConstValue;
use crate::model::Span;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A reference to a schema type.
///
/// Built only through [`TypeRef::named`], [`TypeRef::external`],
/// [`TypeRef::list`] and [`TypeRef::non_null`]; `non_null` is idempotent so a
/// `NonNull` never directly wraps another `NonNull`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
    /// A named type defined outside the extracted modules.
    External {
        name: String,
        location: Option<String>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn external(name: impl Into<String>, location: Option<String>) -> Self {
        TypeRef::External {
            name: name.into(),
            location,
        }
    }

    pub fn list(self) -> Self {
        TypeRef::List(Box::new(self))
    }

    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    /// The same reference with any outer non-null wrapper removed.
    pub fn nullable(self) -> Self {
        match self {
            TypeRef::NonNull(inner) => *inner,
            other => other,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::List(_) => true,
            _ => false,
        }
    }

    /// Name of the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) | TypeRef::External { name, .. } => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    /// List element type, looking through an outer non-null.
    pub fn list_element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::NonNull(inner) => inner.list_element(),
            TypeRef::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) | TypeRef::External { name, .. } => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Where a directive may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl DirectiveLocation {
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "QUERY" => Self::Query,
            "MUTATION" => Self::Mutation,
            "SUBSCRIPTION" => Self::Subscription,
            "FIELD" => Self::Field,
            "FRAGMENT_DEFINITION" => Self::FragmentDefinition,
            "FRAGMENT_SPREAD" => Self::FragmentSpread,
            "INLINE_FRAGMENT" => Self::InlineFragment,
            "VARIABLE_DEFINITION" => Self::VariableDefinition,
            "SCHEMA" => Self::Schema,
            "SCALAR" => Self::Scalar,
            "OBJECT" => Self::Object,
            "FIELD_DEFINITION" => Self::FieldDefinition,
            "ARGUMENT_DEFINITION" => Self::ArgumentDefinition,
            "INTERFACE" => Self::Interface,
            "UNION" => Self::Union,
            "ENUM" => Self::Enum,
            "ENUM_VALUE" => Self::EnumValue,
            "INPUT_OBJECT" => Self::InputObject,
            "INPUT_FIELD_DEFINITION" => Self::InputFieldDefinition,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::VariableDefinition => "VARIABLE_DEFINITION",
            Self::Schema => "SCHEMA",
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::EnumValue => "ENUM_VALUE",
            Self::InputObject => "INPUT_OBJECT",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

/// The three operation roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Query,
    Mutation,
    Subscription,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Query, Operation::Mutation, Operation::Subscription];

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "query" => Some(Operation::Query),
            "mutation" => Some(Operation::Mutation),
            "subscription" => Some(Operation::Subscription),
            _ => None,
        }
    }

    /// Conventional name of the root type.
    pub fn default_type_name(&self) -> &'static str {
        match self {
            Operation::Query => "Query",
            Operation::Mutation => "Mutation",
            Operation::Subscription => "Subscription",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticNullability {
    /// Null only ever means an error occurred.
    Strict,
    Loose,
}

/// A directive applied to a schema element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveApplication {
    pub name: String,
    pub arguments: BTreeMap<String, ConstValue>,
    #[serde(skip)]
    pub argument_spans: BTreeMap<String, Span>,
    /// Written with an argument list or through `@gqlAnnotate`.
    #[serde(skip)]
    pub explicit: bool,
    #[serde(skip)]
    pub span: Span,
}

/// An argument, input field or directive argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ConstValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<InputValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    pub semantic_nullability: SemanticNullability,
    pub kills_parent_on_exception: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub resolver: ResolverBinding,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Literal kind marker, when the type declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<String>,
    /// Inherited fields are shared with the ancestor that declares them.
    pub fields: Vec<Arc<FieldDefinition>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    pub fields: Vec<Arc<FieldDefinition>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    /// Host identifier of the variant, used to evaluate defaults.
    #[serde(skip)]
    pub source_name: String,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<EnumValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputObjectType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<InputValue>,
    /// Exactly one field must be provided.
    pub one_of: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectiveApplication>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeDefinition {
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    Scalar(ScalarType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(t) => &t.name,
            TypeDefinition::Interface(t) => &t.name,
            TypeDefinition::Union(t) => &t.name,
            TypeDefinition::Enum(t) => &t.name,
            TypeDefinition::Scalar(t) => &t.name,
            TypeDefinition::InputObject(t) => &t.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDefinition::Object(t) => t.span,
            TypeDefinition::Interface(t) => t.span,
            TypeDefinition::Union(t) => t.span,
            TypeDefinition::Enum(t) => t.span,
            TypeDefinition::Scalar(t) => t.span,
            TypeDefinition::InputObject(t) => t.span,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            TypeDefinition::Object(_) => "object type",
            TypeDefinition::Interface(_) => "interface",
            TypeDefinition::Union(_) => "union",
            TypeDefinition::Enum(_) => "enum",
            TypeDefinition::Scalar(_) => "scalar",
            TypeDefinition::InputObject(_) => "input object",
        }
    }

    /// Whether values of this type may appear in output positions.
    pub fn is_output(&self) -> bool {
        !matches!(self, TypeDefinition::InputObject(_))
    }

    /// Whether values of this type may appear in input positions.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            TypeDefinition::InputObject(_) | TypeDefinition::Enum(_) | TypeDefinition::Scalar(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub locations: Vec<DirectiveLocation>,
    pub arguments: Vec<InputValue>,
    pub repeatable: bool,
    #[serde(skip)]
    pub span: Span,
}

/// A type referenced through `@gqlExternal` rather than defined locally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExternalType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaIr {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    pub types: Vec<TypeDefinition>,
    pub directives: Vec<DirectiveDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub externals: Vec<ExternalType>,
}

impl SchemaIr {
    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.get_type(name)? {
            TypeDefinition::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceType> {
        match self.get_type(name)? {
            TypeDefinition::Interface(interface) => Some(interface),
            _ => None,
        }
    }
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.as_ref())
    }
}

impl InterfaceType {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.as_ref())
    }
}

/// What a resolver invokes to produce a field value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolverTarget {
    /// Read the named property of the parent.
    Property { name: String },
    /// Call the named method on the parent.
    Method { name: String },
    /// Call an associated function of a host type.
    StaticMethod {
        owner: String,
        name: String,
        module: String,
    },
    /// Call a free function.
    Function { name: String, module: String },
    /// Root types synthesised without a backing declaration.
    #[default]
    None,
}

/// What to pass in one parameter slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParameterRole {
    Parent,
    /// All schema arguments as one structured value.
    ArgumentsObject,
    /// One schema argument by schema name.
    Argument { name: String },
    Context,
    /// A context value produced by the named function.
    DerivedContext {
        #[serde(rename = "type")]
        type_name: String,
        function: String,
        module: String,
    },
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverBinding {
    pub target: ResolverTarget,
    /// Parameter slots in call order.
    pub parameters: Vec<ParameterRole>,
    pub is_async: bool,
}

/// The result of a successful run: the schema plus a resolver map keyed by
/// `Type.field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaOutput {
    pub schema: SchemaIr,
    pub resolvers: BTreeMap<String, ResolverBinding>,
}
