use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use url::form_urlencoded;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::posts::PostListing;
use crate::domain::entities::PostRecord;
use crate::domain::posts::format_display_time;

pub const HOME_PATH: &str = "/";
pub const SEARCH_PATH: &str = "/search";
pub const NEW_POST_PATH: &str = "/posts/new";

const EXCERPT_CHARS: usize = 240;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Internal server error",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Error page for `status`. Falls back to plain text if the page itself
/// cannot be rendered.
pub fn render_error_page(status: StatusCode, message: &'static str) -> Response {
    let view = LayoutContext::new(message, "", ErrorPageView::new(message));
    match (ErrorTemplate { view }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message).into_response(),
    }
}

/// Location of a listing page. Search listings keep the raw query text;
/// `page` is omitted for the first page.
pub fn listing_href(search: Option<&str>, page: Option<u64>) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(page) = page {
        params.append_pair("page", &page.to_string());
    }
    if let Some(query) = search {
        params.append_pair("q", query);
    }
    let encoded = params.finish();

    let path = if search.is_some() {
        SEARCH_PATH
    } else {
        HOME_PATH
    };
    if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{encoded}")
    }
}

pub fn post_href(id: Uuid) -> String {
    format!("/posts/{id}")
}

pub fn edit_post_href(id: Uuid) -> String {
    format!("/posts/{id}/edit")
}

pub fn delete_post_href(id: Uuid) -> String {
    format!("/posts/{id}/delete")
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    pub search: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, search: impl Into<String>, content: T) -> Self {
        Self {
            title: title.into(),
            search: search.into(),
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub excerpt: String,
    pub created: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            href: post_href(post.id),
            title: post.title.clone(),
            excerpt: excerpt(&post.content),
            created: format_display_time(post.created_at),
        }
    }
}

pub struct PagerView {
    pub page: u64,
    pub pages_count: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

pub struct IndexContext {
    pub posts: Vec<PostCard>,
    pub pager: PagerView,
    pub search: String,
    pub has_results: bool,
}

impl IndexContext {
    /// `search` is `None` for the home feed.
    pub fn from_listing(listing: &PostListing, search: Option<&str>) -> Self {
        let paginator = &listing.paginator;
        let href = |page: u64| listing_href(search, (page > 1).then_some(page));

        Self {
            posts: listing.posts.iter().map(PostCard::from).collect(),
            pager: PagerView {
                page: paginator.page(),
                pages_count: paginator.pages_count(),
                previous_href: paginator.previous_page().map(&href),
                next_href: paginator.next_page().map(&href),
            },
            search: search.unwrap_or_default().to_string(),
            has_results: !listing.posts.is_empty(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct PostDetailContext {
    pub title: String,
    pub content: String,
    pub created: String,
    pub updated: Option<String>,
    pub edit_href: String,
    pub delete_href: String,
}

impl From<&PostRecord> for PostDetailContext {
    fn from(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            created: format_display_time(post.created_at),
            updated: (post.updated_at > post.created_at)
                .then(|| format_display_time(post.updated_at)),
            edit_href: edit_post_href(post.id),
            delete_href: delete_post_href(post.id),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct PostFormContext {
    pub heading: String,
    pub action: String,
    pub title: String,
    pub content: String,
    pub error: Option<String>,
}

impl PostFormContext {
    pub fn create() -> Self {
        Self {
            heading: "Create new post".to_string(),
            action: NEW_POST_PATH.to_string(),
            title: String::new(),
            content: String::new(),
            error: None,
        }
    }

    pub fn update(id: Uuid) -> Self {
        Self {
            heading: "Update post".to_string(),
            action: edit_post_href(id),
            title: String::new(),
            content: String::new(),
            error: None,
        }
    }

    pub fn with_values(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.title = title.into();
        self.content = content.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

pub struct ErrorPageView {
    pub message: String,
    pub home_href: &'static str,
}

impl ErrorPageView {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            home_href: HOME_PATH,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let mut out: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::Paginator;
    use time::macros::datetime;

    fn post(title: &str, content: &str) -> PostRecord {
        PostRecord {
            id: Uuid::nil(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: datetime!(2025-01-02 03:04:00 UTC),
            updated_at: datetime!(2025-01-02 03:04:00 UTC),
        }
    }

    #[test]
    fn home_links_drop_the_first_page() {
        assert_eq!(listing_href(None, None), "/");
        assert_eq!(listing_href(None, Some(3)), "/?page=3");
    }

    #[test]
    fn search_links_encode_the_query() {
        assert_eq!(listing_href(Some("query"), None), "/search?q=query");
        assert_eq!(
            listing_href(Some("query"), Some(3)),
            "/search?page=3&q=query"
        );
        assert_eq!(
            listing_href(Some("rust & go"), None),
            "/search?q=rust+%26+go"
        );
    }

    #[test]
    fn pager_links_keep_the_search_text() {
        let mut paginator = Paginator::new("2", 4).expect("valid paginator");
        paginator.apply_total_count(12);
        let listing = PostListing {
            posts: vec![post("title", "body")],
            paginator,
            search: "echo".to_string(),
        };

        let context = IndexContext::from_listing(&listing, Some("echo"));
        assert_eq!(context.pager.previous_href.as_deref(), Some("/search?q=echo"));
        assert_eq!(
            context.pager.next_href.as_deref(),
            Some("/search?page=3&q=echo")
        );
        assert!(context.has_results);
    }

    #[test]
    fn excerpt_truncates_on_characters() {
        let long = "é".repeat(EXCERPT_CHARS + 10);
        let card = PostCard::from(&post("title", &long));
        assert_eq!(card.excerpt.chars().count(), EXCERPT_CHARS + 1);
        assert!(card.excerpt.ends_with('…'));
        assert_eq!(card.created, "2025-01-02 03:04 UTC");
    }

    #[test]
    fn post_page_escapes_content() {
        let view = LayoutContext::new(
            "title",
            "",
            PostDetailContext::from(&post("<b>title</b>", "<script>alert(1)</script>")),
        );
        let html = (PostTemplate { view }).render().expect("renders");
        assert!(html.contains("alert(1)"));
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("<b>title</b>"));
    }

    #[test]
    fn error_page_has_requested_status() {
        let response = render_error_page(StatusCode::NOT_FOUND, "Page not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
