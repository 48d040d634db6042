use gql_from_source::{
    config::ExtractConfig,
    diagnostics::Diagnostic,
    extract::extract_modules,
    literal::ConstValue,
    lower::{lower_files, lower_sources},
    model::ModuleSet,
    parser::AstParser,
    scanner::FileScanner,
    schema::{ParameterRole, ResolverTarget, SchemaOutput, TypeDefinition},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use tempfile::TempDir;

const BLOG: &str = include_str!("fixtures/blog_schema.rs");

fn extract_source(source: &str, config: &ExtractConfig) -> (ModuleSet, Result<SchemaOutput, Vec<Diagnostic>>) {
    let modules = lower_sources(&[("src/schema.rs", source)]).expect("fixture should parse");
    let result = extract_modules(&modules, config).expect("no fatal error");
    (modules, result)
}

fn extract_ok(source: &str, config: &ExtractConfig) -> SchemaOutput {
    match extract_source(source, config).1 {
        Ok(output) => output,
        Err(diagnostics) => panic!(
            "unexpected diagnostics: {:?}",
            diagnostics.iter().map(|d| &d.message).collect::<Vec<_>>()
        ),
    }
}

fn extract_err(source: &str, config: &ExtractConfig) -> Vec<Diagnostic> {
    match extract_source(source, config).1 {
        Ok(_) => panic!("expected diagnostics"),
        Err(diagnostics) => diagnostics,
    }
}

/// `field name -> type` of an object or interface.
fn field_types(output: &SchemaOutput, type_name: &str) -> BTreeMap<String, String> {
    let fields = match output.schema.get_type(type_name) {
        Some(TypeDefinition::Object(object)) => &object.fields,
        Some(TypeDefinition::Interface(interface)) => &interface.fields,
        other => panic!("`{}` is not an object or interface: {:?}", type_name, other),
    };
    fields
        .iter()
        .map(|f| (f.name.clone(), f.ty.to_string()))
        .collect()
}

fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_blog_schema_types() {
    let output = extract_ok(BLOG, &ExtractConfig::default());
    let schema = &output.schema;

    let names: Vec<&str> = schema.types.iter().map(|t| t.name()).collect();
    assert_eq!(
        names,
        vec![
            "Authored",
            "DateTime",
            "Mutation",
            "NewPost",
            "Node",
            "Post",
            "PostConnection",
            "PostFilter",
            "Query",
            "SearchResult",
            "Status",
            "Subscription",
            "User",
            "UserBy",
        ]
    );
    assert_eq!(schema.query.as_deref(), Some("Query"));
    assert_eq!(schema.mutation.as_deref(), Some("Mutation"));
    assert_eq!(schema.subscription.as_deref(), Some("Subscription"));
    assert_eq!(schema.directives.len(), 1);
    assert_eq!(schema.directives[0].name, "cost");
    assert_eq!(schema.directives[0].arguments[0].ty.to_string(), "Int!");
}

#[test]
fn test_blog_schema_fields() {
    let output = extract_ok(BLOG, &ExtractConfig::default());

    assert_eq!(
        field_types(&output, "Query"),
        map(&[
            ("node", "Node"),
            ("recentPosts", "PostConnection!"),
            ("search", "[SearchResult!]!"),
            ("user", "User"),
            ("viewer", "User"),
        ])
    );
    assert_eq!(field_types(&output, "Mutation"), map(&[("createPost", "Post!")]));
    assert_eq!(field_types(&output, "Subscription"), map(&[("postPublished", "Post!")]));
    assert_eq!(
        field_types(&output, "User"),
        map(&[
            ("email", "String"),
            ("handle", "String"),
            ("id", "ID!"),
            ("isViewer", "Boolean!"),
            ("name", "String!"),
            ("posts", "[Post!]!"),
        ])
    );
    assert_eq!(
        field_types(&output, "PostConnection"),
        map(&[("nodes", "[Post!]!"), ("totalCount", "Int!")])
    );
}

#[test]
fn test_interface_inheritance_is_idempotent() {
    let output = extract_ok(BLOG, &ExtractConfig::default());

    // Post implements Node directly and again through Authored.
    assert_eq!(
        field_types(&output, "Post"),
        map(&[
            ("author", "User!"),
            ("id", "ID!"),
            ("publishedAt", "DateTime"),
            ("readingTime", "Int!"),
            ("status", "Status!"),
            ("tags", "[String]!"),
            ("title", "String!"),
        ])
    );
    let post = output.schema.object("Post").unwrap();
    assert_eq!(post.interfaces, vec!["Authored", "Node"]);
    assert_eq!(post.discriminant.as_deref(), Some("Post"));

    let authored = output.schema.interface("Authored").unwrap();
    assert_eq!(authored.interfaces, vec!["Node"]);
    assert_eq!(field_types(&output, "Authored"), map(&[("author", "User!"), ("id", "ID!")]));
}

#[test]
fn test_blog_schema_inputs_and_enums() {
    let output = extract_ok(BLOG, &ExtractConfig::default());

    let Some(TypeDefinition::InputObject(user_by)) = output.schema.get_type("UserBy") else {
        panic!("UserBy is not an input object");
    };
    assert!(user_by.one_of);
    assert_eq!(user_by.description.as_deref(), Some("How to look up a user."));

    let Some(TypeDefinition::Enum(status)) = output.schema.get_type("Status") else {
        panic!("Status is not an enum");
    };
    let values: Vec<&str> = status.values.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(values, vec!["Draft", "Published", "Archived"]);
    assert_eq!(
        status.values[2].deprecation_reason.as_deref(),
        Some("No longer supported")
    );

    let posts = output.schema.object("User").unwrap().field("posts").unwrap();
    let arguments: Vec<(&str, String)> = posts
        .arguments
        .iter()
        .map(|a| (a.name.as_str(), a.ty.to_string()))
        .collect();
    assert_eq!(
        arguments,
        vec![
            ("first", "Int!".to_string()),
            ("status", "Status".to_string()),
            ("filter", "PostFilter".to_string()),
        ]
    );
    assert_eq!(posts.arguments[0].default_value, Some(ConstValue::Int(10)));
    assert_eq!(
        posts.arguments[1].default_value,
        Some(ConstValue::Enum("Published".to_string()))
    );
    let mut filter = BTreeMap::new();
    filter.insert(
        "tags".to_string(),
        ConstValue::List(vec![ConstValue::String("rust".to_string())]),
    );
    assert_eq!(posts.arguments[2].default_value, Some(ConstValue::Object(filter)));
    assert_eq!(posts.directives[0].name, "cost");
    assert_eq!(posts.description.as_deref(), Some("Posts written by this user."));
}

#[test]
fn test_blog_resolver_map() {
    let output = extract_ok(BLOG, &ExtractConfig::default());
    let resolvers = &output.resolvers;

    let search = &resolvers["Query.search"];
    assert_eq!(
        search.target,
        ResolverTarget::Function {
            name: "search".to_string(),
            module: "src/schema.rs".to_string()
        }
    );
    assert_eq!(
        search.parameters,
        vec![ParameterRole::Argument { name: "query".to_string() }]
    );

    assert_eq!(
        resolvers["Query.viewer"].parameters,
        vec![ParameterRole::DerivedContext {
            type_name: "Viewer".to_string(),
            function: "current_viewer".to_string(),
            module: "src/schema.rs".to_string(),
        }]
    );

    let create = &resolvers["Mutation.createPost"];
    assert!(create.is_async);
    assert_eq!(
        create.parameters,
        vec![
            ParameterRole::Argument { name: "input".to_string() },
            ParameterRole::Context
        ]
    );

    let reading_time = &resolvers["Post.readingTime"];
    assert_eq!(
        reading_time.parameters,
        vec![
            ParameterRole::Parent,
            ParameterRole::Argument { name: "wordsPerMinute".to_string() }
        ]
    );
    assert_eq!(
        resolvers["Post.title"].target,
        ResolverTarget::Property { name: "title".to_string() }
    );
    assert_eq!(resolvers["User.posts"].parameters, vec![ParameterRole::ArgumentsObject]);
    assert!(resolvers.keys().all(|key| !key.starts_with("Node.")));
}

#[test]
fn test_determinism() {
    let config = ExtractConfig::default();
    let first = serialize_yaml(&extract_ok(BLOG, &config).schema).unwrap();
    let second = serialize_yaml(&extract_ok(BLOG, &config).schema).unwrap();
    assert_eq!(first, second);

    let first = serialize_json(&extract_ok(BLOG, &config).resolvers).unwrap();
    let second = serialize_json(&extract_ok(BLOG, &config).resolvers).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_nullability_round_trip() {
    let source = r#"
/// @gqlType
pub struct Query {
    /// @gqlField
    pub bare: String,
    /// @gqlField
    pub optional: Option<String>,
}
"#;
    let strict = extract_ok(source, &ExtractConfig::default());
    assert_eq!(
        field_types(&strict, "Query"),
        map(&[("bare", "String!"), ("optional", "String")])
    );

    let lenient = extract_ok(
        source,
        &ExtractConfig {
            nullable_by_default: true,
            ..ExtractConfig::default()
        },
    );
    assert_eq!(
        field_types(&lenient, "Query"),
        map(&[("bare", "String"), ("optional", "String")])
    );
}

#[test]
fn test_list_non_null_propagation() {
    let source = r#"
/// @gqlType
pub struct Query {
    /// @gqlField
    pub loose: Vec<Option<String>>,
    /// @gqlField
    pub frozen: &'static [String],
}
"#;
    let output = extract_ok(source, &ExtractConfig::default());
    assert_eq!(
        field_types(&output, "Query"),
        map(&[("frozen", "[String!]!"), ("loose", "[String]!")])
    );
}

#[test]
fn test_generic_monomorphization() {
    let source = r#"
/// @gqlType
pub struct Page { /// @gqlField
pub number: i32 }

/// @gqlType
pub struct User { /// @gqlField
pub name: String }

/// @gqlType
pub struct Wrapper<T> {
    /// @gqlField
    pub inner: T,
}

/// @gqlType
pub struct Query {
    /// @gqlField
    pub first: Wrapper<Page>,
    /// @gqlField
    pub second: Wrapper<Page>,
    /// @gqlField
    pub third: Wrapper<User>,
}
"#;
    let output = extract_ok(source, &ExtractConfig::default());

    assert_eq!(
        field_types(&output, "Query"),
        map(&[
            ("first", "PageWrapper!"),
            ("second", "PageWrapper!"),
            ("third", "UserWrapper!"),
        ])
    );
    assert_eq!(field_types(&output, "PageWrapper"), map(&[("inner", "Page!")]));
    assert_eq!(field_types(&output, "UserWrapper"), map(&[("inner", "User!")]));
    assert!(output.schema.get_type("Wrapper").is_none());
}

const SEARCH: &str = r#"
/// @gqlType
pub struct User { /// @gqlField
pub name: String }

impl User {
    pub const TYPENAME: &'static str = "User";
}

/// @gqlType
pub struct Post { /// @gqlField
pub title: String }

impl Post {
    pub const TYPENAME: &'static str = "Post";
}

/// @gqlUnion
pub enum SearchResult {
    User(User),
    Post(Post),
}

/// @gqlQueryField
pub fn search() -> Vec<SearchResult> { Vec::new() }
"#;

#[test]
fn test_union_discriminants_validate() {
    let output = extract_ok(SEARCH, &ExtractConfig::default());
    let Some(TypeDefinition::Union(union)) = output.schema.get_type("SearchResult") else {
        panic!("SearchResult is not a union");
    };
    assert_eq!(union.members, vec!["Post", "User"]);
}

#[test]
fn test_union_member_without_discriminant() {
    let source = SEARCH.replace(
        "impl Post {\n    pub const TYPENAME: &'static str = \"Post\";\n}\n",
        "",
    );
    let diagnostics = extract_err(&source, &ExtractConfig::default());

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0]
        .message
        .starts_with("Union member `Post` of union `SearchResult` is missing a discriminant"));
}

#[test]
fn test_union_members_sharing_a_discriminant() {
    let source = SEARCH.replace("= \"Post\"", "= \"User\"");
    let diagnostics = extract_err(&source, &ExtractConfig::default());

    assert!(diagnostics
        .iter()
        .any(|d| d.message.contains("share the discriminant")));
}

#[test]
fn test_literal_defaults_are_accepted() {
    let source = r#"
/// @gqlInput
pub struct Range {
    pub min: i32,
    pub max: Option<i32>,
}

pub struct Args {
    #[gql(default = Range { min: 1, max: Some(5) })]
    pub range: Range,
    #[gql(default = vec![1.5, 2.0])]
    pub weights: Vec<f64>,
}

/// @gqlQueryField
pub fn total(args: Args) -> i32 { 0 }
"#;
    let output = extract_ok(source, &ExtractConfig::default());
    let total = output.schema.object("Query").unwrap().field("total").unwrap();

    assert_eq!(
        total.arguments[1].default_value,
        Some(ConstValue::List(vec![ConstValue::Float(1.5), ConstValue::Float(2.0)]))
    );
}

#[test]
fn test_computed_defaults_are_rejected() {
    let source = r#"
pub struct Args {
    #[gql(default = compute_limit())]
    pub limit: i32,
    #[gql(default = LIMIT)]
    pub offset: i32,
}

/// @gqlQueryField
pub fn total(args: Args) -> i32 { 0 }
"#;
    let (modules, result) = extract_source(source, &ExtractConfig::default());
    let diagnostics = result.unwrap_err();

    let snippets: Vec<&str> = diagnostics
        .iter()
        .map(|d| modules.sources.snippet(&d.primary))
        .collect();
    assert_eq!(snippets, vec!["compute_limit()", "LIMIT"]);
}

#[test]
fn test_end_to_end_scenario() {
    let source = r#"
/// @gqlType
pub struct Thing {
    /// @gqlField
    pub label: String,
    /// @gqlField
    pub others: Vec<Option<OtherType>>,
}

/// @gqlType
pub struct OtherType {
    /// @gqlField
    pub name: String,
}
"#;
    let output = extract_ok(
        source,
        &ExtractConfig {
            nullable_by_default: true,
            ..ExtractConfig::default()
        },
    );

    assert_eq!(output.schema.types.len(), 2);
    assert_eq!(field_types(&output, "Thing")["others"], "[OtherType]");
    assert_eq!(field_types(&output, "OtherType")["name"], "String");
}

#[test]
fn test_error_scenario_untyped_arguments() {
    let source = r#"
/// @gqlType
pub struct Query;

impl Query {
    /// @gqlField
    pub fn greet(&self, Args { name }: _) -> String { String::new() }
}
"#;
    let (modules, result) = extract_source(source, &ExtractConfig::default());
    let diagnostics = result.unwrap_err();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0]
        .message
        .starts_with("Missing type annotation for resolver arguments"));
    assert_eq!(modules.sources.snippet(&diagnostics[0].primary), "Args { name }: _");
}

#[test]
fn test_project_directory_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("schema.rs"), BLOG).unwrap();
    std::fs::write(src.join("broken.rs"), "pub struct {").unwrap();

    let scan_result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();
    assert_eq!(scan_result.rust_files.len(), 2);

    let parsed: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(parsed.len(), 1);

    let modules = lower_files(&parsed).unwrap();
    let output = extract_modules(&modules, &ExtractConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(output.schema.types.len(), 14);
    let module = match &output.resolvers["Query.search"].target {
        ResolverTarget::Function { module, .. } => module.clone(),
        other => panic!("Expected function resolver, got {:?}", other),
    };
    assert!(module.ends_with("schema.rs"));
}
