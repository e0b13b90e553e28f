//! Static chat UI compiled into the binary.
use axum::{
    http::header,
    response::{Html, IntoResponse},
};

const INDEX_HTML: &str = include_str!("../static/index.html");
const STYLE_CSS: &str = include_str!("../static/style.css");
const SCRIPT_JS: &str = include_str!("../static/script.js");

pub const PLACEHOLDER_HTML: &str = "<h1>Nova Memory Server is Running!</h1>";

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS)
}

pub async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT_JS)
}

/// Answer for every request that matches no route
pub async fn placeholder() -> Html<&'static str> {
    Html(PLACEHOLDER_HTML)
}
