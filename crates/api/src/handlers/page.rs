use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
///
/// The single-page UI. It talks to the session endpoints only; the
/// try-on credential never reaches the browser.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
