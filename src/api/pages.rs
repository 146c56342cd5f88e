//! Dashboard page

use crate::service::ActiveSession;
use axum::response::Html;

const INDEX_PAGE: &str = include_str!("../../assets/index.html");
const OPERATOR_SLOT: &str = "<!--OPERATOR-->";

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// GET / (gated)
pub async fn index(session: ActiveSession) -> Html<String> {
    Html(INDEX_PAGE.replace(
        OPERATOR_SLOT,
        &escape_html(session.operator.display_name()),
    ))
}
