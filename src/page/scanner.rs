//! Discovery of hoverable, username-bearing elements
//!
//! Username extraction is a heuristic: starting at an element, look at the
//! links inside it and then inside each ancestor, up to a fixed depth, and
//! take the first `/name` path that is not a reserved route. It favours
//! surviving markup churn over precision.

use tracing::debug;

use super::{Document, ElementId, Page, Selector};

/// First path segments that are site routes rather than usernames
pub const RESERVED_ROUTES: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "i",
    "compose",
    "search",
    "settings",
    "hashtag",
];

/// Usernames must be shorter than this many characters
const MAX_USERNAME_LEN: usize = 20;

/// Attribute marking an element whose hover listeners are attached
pub const ATTACHED_ATTR: &str = "data-flagtip-attached";

/// Parses the first path segment of an href as a candidate username
fn username_from_href(href: &str) -> Option<&str> {
    let path = href.strip_prefix('/')?;
    let segment = path.split(|c: char| c == '/' || c == '?').next()?;
    let len = segment.chars().count();
    if len == 0 || len >= MAX_USERNAME_LEN || RESERVED_ROUTES.contains(&segment) {
        return None;
    }
    Some(segment)
}

/// Finds the username associated with `element`
///
/// Inspects links under the element and under each ancestor, at most
/// `max_depth` levels in total; the closest level with an acceptable link wins.
pub fn extract_username(doc: &Document, element: ElementId, max_depth: usize) -> Option<String> {
    let links = Selector::new("a").attr_prefix("href", "/");
    let mut current = Some(element);

    for _ in 0..max_depth {
        let scope = current?;
        for link in doc.query_within(scope, &links) {
            if let Some(username) = doc.attribute(link, "href").and_then(username_from_href) {
                return Some(username.to_string());
            }
        }
        current = doc.parent(scope);
    }

    None
}

/// Finds hoverable elements and marks each one as attached exactly once
#[derive(Debug, Clone)]
pub struct Scanner {
    selectors: Vec<Selector>,
    max_depth: usize,
}

impl Scanner {
    pub fn new(max_depth: usize) -> Self {
        Self {
            selectors: vec![
                // Username links
                Selector::new("a").attr_prefix("href", "/").attr_eq("role", "link"),
                // Profile pictures
                Selector::new("div").attr_prefix("data-testid", "UserAvatar-Container-"),
                // Display name blocks
                Selector::new("div").attr_eq("data-testid", "User-Name"),
                // Whole posts, as a fallback source of usernames
                Selector::new("article").attr_eq("data-testid", "tweet"),
            ],
            max_depth,
        }
    }

    /// Attaches every hoverable element not attached yet, returning the newly attached ones
    pub async fn scan(&self, page: &Page) -> Vec<ElementId> {
        let mut doc = page.write().await;
        let attached = self.scan_document(&mut doc);
        if !attached.is_empty() {
            debug!(count = attached.len(), url = doc.url(), "attached hover targets");
        }
        attached
    }

    pub fn scan_document(&self, doc: &mut Document) -> Vec<ElementId> {
        let candidates: Vec<ElementId> = doc
            .query_any(&self.selectors)
            .into_iter()
            .filter(|&id| doc.attribute(id, ATTACHED_ATTR) != Some("true"))
            .filter(|&id| extract_username(doc, id, self.max_depth).is_some())
            .collect();

        for &id in &candidates {
            doc.set_attribute(id, ATTACHED_ATTR, "true");
        }
        candidates
    }
}

/// Whether hover listeners are attached to `id`
pub fn is_attached(doc: &Document, id: ElementId) -> bool {
    doc.attribute(id, ATTACHED_ATTR) == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Node;

    fn post(author: &str) -> Node {
        Node::new("article")
            .attr("data-testid", "tweet")
            .child(
                Node::new("div")
                    .attr("data-testid", &format!("UserAvatar-Container-{}", author))
                    .child(Node::new("img")),
            )
            .child(
                Node::new("div").attr("data-testid", "User-Name").child(
                    Node::new("a")
                        .attr("href", &format!("/{}", author))
                        .attr("role", "link")
                        .text(&format!("@{}", author)),
                ),
            )
    }

    #[test]
    fn test_username_from_href() {
        assert_eq!(username_from_href("/jdoe"), Some("jdoe"));
        assert_eq!(username_from_href("/jdoe/status/123"), Some("jdoe"));
        assert_eq!(username_from_href("/jdoe?src=hover"), Some("jdoe"));
        assert_eq!(username_from_href("/home"), None);
        assert_eq!(username_from_href("/i/flow"), None);
        assert_eq!(username_from_href("/"), None);
        assert_eq!(username_from_href("https://x.com/jdoe"), None);
        assert_eq!(username_from_href("/abcdefghijklmnopqrs"), Some("abcdefghijklmnopqrs"));
        assert_eq!(username_from_href("/abcdefghijklmnopqrst"), None);
    }

    #[test]
    fn test_extract_from_ancestor_chain() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let (article, _) = doc.insert(body, post("jdoe"));
        let avatar = doc.children(article)[0];
        let img = doc.children(avatar)[0];

        // img -> avatar -> article, where the link lives
        assert_eq!(extract_username(&doc, img, 5).as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_extract_rejects_reserved_routes() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let (nav, _) = doc.insert(
            body,
            Node::new("nav").child(Node::new("a").attr("href", "/home").attr("role", "link")),
        );
        assert_eq!(extract_username(&doc, nav, 5), None);
    }

    #[test]
    fn test_extract_rejects_long_usernames() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let (div, _) = doc.insert(
            body,
            Node::new("div").child(Node::new("a").attr("href", "/averyveryverylongusername")),
        );
        assert_eq!(extract_username(&doc, div, 5), None);
    }

    #[test]
    fn test_extract_respects_walk_depth() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let deep = Node::new("div").child(Node::new("div").child(Node::new("div").child(Node::new("span"))));
        let (outer, _) = doc.insert(
            body,
            Node::new("section")
                .child(Node::new("a").attr("href", "/far"))
                .child(deep),
        );
        let d1 = doc.children(outer)[1];
        let d2 = doc.children(d1)[0];
        let d3 = doc.children(d2)[0];
        let span = doc.children(d3)[0];

        // span, d3, d2, d1 see nothing; the link is found at the 5th level (section)
        assert_eq!(extract_username(&doc, span, 5).as_deref(), Some("far"));
        assert_eq!(extract_username(&doc, span, 4), None);
    }

    #[test]
    fn test_closest_level_wins() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let (outer, _) = doc.insert(
            body,
            Node::new("div")
                .child(Node::new("a").attr("href", "/outer"))
                .child(Node::new("div").child(Node::new("a").attr("href", "/inner"))),
        );
        let inner = doc.children(outer)[1];
        assert_eq!(extract_username(&doc, inner, 5).as_deref(), Some("inner"));
    }

    #[test]
    fn test_scan_attaches_once() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        doc.insert(body, post("jdoe"));
        doc.insert(body, post("mika"));
        let scanner = Scanner::new(5);

        // article, avatar, name block and link for each post
        let first = scanner.scan_document(&mut doc);
        assert_eq!(first.len(), 8);
        assert!(first.iter().all(|&id| is_attached(&doc, id)));

        assert!(scanner.scan_document(&mut doc).is_empty());

        doc.insert(body, post("zoe"));
        assert_eq!(scanner.scan_document(&mut doc).len(), 4);
    }

    #[test]
    fn test_scan_skips_elements_without_username() {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        doc.insert(
            body,
            Node::new("header").child(
                Node::new("nav")
                    .child(Node::new("a").attr("href", "/home").attr("role", "link"))
                    .child(Node::new("a").attr("href", "/explore").attr("role", "link")),
            ),
        );
        assert!(Scanner::new(5).scan_document(&mut doc).is_empty());
    }

    #[tokio::test]
    async fn test_scan_page() {
        let page = Page::new(Document::new("https://x.com/home"));
        let body = page.read().await.body();
        page.insert(body, post("jdoe")).await;

        let scanner = Scanner::new(5);
        assert_eq!(scanner.scan(&page).await.len(), 4);
        assert!(scanner.scan(&page).await.is_empty());
    }
}
