//! Schema of a small blog server.

use futures::stream::Stream;

/// Request-scoped state.
/// @gqlContext
pub struct AppContext {
    pub viewer_id: Option<String>,
}

pub struct Viewer {
    pub user_id: String,
}

/// @gqlContext
pub fn current_viewer(ctx: &AppContext) -> Option<Viewer> {
    ctx.viewer_id.clone().map(|user_id| Viewer { user_id })
}

/// Query cost used by the rate limiter.
/// @gqlDirective on FIELD_DEFINITION | OBJECT
pub fn cost(credits: i32) {}

/// An RFC 3339 timestamp.
/// @gqlScalar
pub type DateTime = String;

/// Something with a global identity.
/// @gqlInterface
pub trait Node {
    /// @gqlField
    fn id(&self) -> ID;
}

/// @gqlInterface
pub trait Authored: Node {
    /// @gqlField
    fn author(&self) -> User;
}

/// A registered user.
/// @gqlType
/// @cost(credits: 2)
pub struct User {
    /// @gqlField
    pub name: String,
    /// @gqlField
    pub email: Option<String>,
    /// @gqlField
    /// @deprecated Use `name`
    pub handle: Option<String>,
}

impl User {
    pub const TYPENAME: &'static str = "User";

    /// Posts written by this user.
    /// @gqlField
    /// @cost(credits: 5)
    pub async fn posts(&self, args: PostsArgs) -> Vec<Post> {
        Vec::new()
    }

    /// @gqlField
    pub fn is_viewer(&self, viewer: Option<Viewer>) -> bool {
        viewer.is_some()
    }
}

impl Node for User {
    fn id(&self) -> ID {
        todo!()
    }
}

/// @gqlType
pub struct Post {
    /// @gqlField
    pub title: String,
    /// @gqlField
    pub tags: Vec<Option<String>>,
    /// @gqlField
    pub status: Status,
    /// @gqlField
    pub published_at: Option<DateTime>,
    pub author_id: String,
}

impl Post {
    pub const TYPENAME: &'static str = "Post";
}

impl Node for Post {
    fn id(&self) -> ID {
        todo!()
    }
}

impl Authored for Post {
    fn author(&self) -> User {
        todo!()
    }
}

/// Estimated reading time in minutes.
/// @gqlField
pub fn reading_time(post: &Post, words_per_minute: Option<i32>) -> i32 {
    0
}

/// @gqlType
pub struct Connection<T> {
    /// @gqlField
    pub nodes: Vec<T>,
    /// @gqlField
    pub total_count: i32,
}

/// @gqlEnum
pub enum Status {
    Draft,
    Published,
    /// @deprecated
    Archived,
}

/// @gqlUnion
pub enum SearchResult {
    User(User),
    Post(Post),
}

pub struct PostsArgs {
    #[gql(default = 10)]
    pub first: i32,
    #[gql(default = Status::Published)]
    pub status: Option<Status>,
    #[gql(default = PostFilter { tags: vec!["rust".to_string()] })]
    pub filter: Option<PostFilter>,
}

/// @gqlInput
pub struct PostFilter {
    pub tags: Option<Vec<String>>,
    #[gql(default = false)]
    pub include_drafts: bool,
}

/// @gqlInput
pub struct NewPost {
    pub title: String,
    pub status: Option<Status>,
    pub published_at: Option<DateTime>,
}

/// How to look up a user.
/// @gqlInput
pub enum UserBy {
    Id(ID),
    Email(String),
}

/// @gqlQueryField
pub fn search(query: String) -> Vec<SearchResult> {
    Vec::new()
}

/// @gqlQueryField
pub async fn node(id: ID) -> Option<Box<dyn Node>> {
    None
}

/// @gqlQueryField
pub fn user(by: UserBy) -> Option<User> {
    None
}

/// The signed-in user.
/// @gqlQueryField
pub fn viewer(viewer: Option<Viewer>) -> Option<User> {
    None
}

/// @gqlQueryField
pub fn recent_posts(first: Option<i32>) -> Connection<Post> {
    todo!()
}

/// @gqlMutationField
pub async fn create_post(input: NewPost, ctx: &AppContext) -> Result<Post, Error> {
    todo!()
}

/// @gqlSubscriptionField
pub fn post_published() -> impl Stream<Item = Post> {
    futures::stream::empty()
}
