pub mod chat;
pub mod ingestion;

/// Navigation HTML shared across all pages.
pub const NAV_HTML: &str = include_str!("../../templates/nav.html");

/// Minimal HTML escaping for user- and model-provided text.
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_neutralizes_tags() {
        assert_eq!(escape_html("<script>&"), "&lt;script&gt;&amp;");
    }
}
