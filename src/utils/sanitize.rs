use std::collections::HashSet;

/// Whitelist-clean article HTML before it is stored.
///
/// Article bodies are rendered as raw HTML by the frontend, so everything
/// outside a small rich-text vocabulary is stripped at write time. Links get
/// rel="noopener noreferrer" appended to close the tabnabbing hole.
pub fn sanitize_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let tags: HashSet<&str> = [
        "p", "br", "strong", "em", "u", "s", "blockquote", "pre", "code", "ul", "ol", "li", "h1",
        "h2", "h3", "h4", "hr", "span", "div", "img", "a",
    ]
    .into_iter()
    .collect();

    ammonia::Builder::default()
        .tags(tags)
        .generic_attributes(HashSet::from(["class"]))
        .add_tag_attributes("a", &["href", "title", "target"])
        .add_tag_attributes("img", &["src", "alt", "title"])
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(Some("noopener noreferrer"))
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tags_are_stripped() {
        let dirty = "<p>hello</p><script>alert('xss')</script>";
        let clean = sanitize_html(dirty);
        assert!(clean.contains("<p>hello</p>"));
        assert!(!clean.contains("script"));
    }

    #[test]
    fn event_handler_attributes_are_stripped() {
        let dirty = r#"<img src="/static/x.png" onerror="alert(1)" alt="ok">"#;
        let clean = sanitize_html(dirty);
        assert!(clean.contains("src=\"/static/x.png\""));
        assert!(!clean.contains("onerror"));
    }

    #[test]
    fn links_gain_noopener_rel() {
        let dirty = r#"<a href="https://example.com" target="_blank">site</a>"#;
        let clean = sanitize_html(dirty);
        assert!(clean.contains("rel=\"noopener noreferrer\""));
    }

    #[test]
    fn javascript_urls_are_removed() {
        let dirty = r#"<a href="javascript:alert(1)">x</a>"#;
        let clean = sanitize_html(dirty);
        assert!(!clean.contains("javascript:"));
    }
}
