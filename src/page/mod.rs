//! Observed page surface
//!
//! A `Document` is an arena of elements with tags, attributes, text and
//! parent links, queried with simple attribute selectors. A `Page` shares a
//! document between the scanner, the hover controller and the host, and
//! broadcasts a `PageChange` whenever nodes are inserted or the URL changes.

pub mod scanner;
pub mod watcher;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};

/// Handle to an element inside a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Description of a subtree to insert
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

/// How an attribute must look for a selector to match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Equals(String, String),
    Prefix(String, String),
}

/// Tag plus attribute conditions, e.g. `a[href^="/"][role="link"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: String,
    conditions: Vec<AttrMatch>,
}

impl Selector {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            conditions: Vec::new(),
        }
    }

    pub fn attr_eq(mut self, name: &str, value: &str) -> Self {
        self.conditions
            .push(AttrMatch::Equals(name.to_string(), value.to_string()));
        self
    }

    pub fn attr_prefix(mut self, name: &str, prefix: &str) -> Self {
        self.conditions
            .push(AttrMatch::Prefix(name.to_string(), prefix.to_string()));
        self
    }
}

/// Element tree for one page
///
/// Ids come from a counter and are never reused. Elements removed from the
/// tree are dropped, and lookups on their ids behave like an empty detached
/// element.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    elements: HashMap<ElementId, Element>,
    next_id: usize,
}

impl Document {
    /// Creates a document holding only an empty `body`
    pub fn new(url: &str) -> Self {
        let body = Element {
            tag: "body".to_string(),
            attributes: BTreeMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        };
        Self {
            url: url.to_string(),
            elements: HashMap::from([(ElementId(0), body)]),
            next_id: 1,
        }
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Number of elements currently in the tree, `body` included
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> ElementId {
        ElementId(0)
    }

    /// Inserts `node` and its subtree as the last child of `parent`
    ///
    /// Returns the id of the subtree root and the number of elements added.
    pub fn insert(&mut self, parent: ElementId, node: Node) -> (ElementId, usize) {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        let parent = self.elements.get_mut(&parent).map(|element| {
            element.children.push(id);
            parent
        });
        self.elements.insert(
            id,
            Element {
                tag: node.tag,
                attributes: node.attributes.into_iter().collect(),
                text: node.text,
                parent,
                children: Vec::new(),
            },
        );

        let mut added = 1;
        for child in node.children {
            added += self.insert(id, child).1;
        }
        (id, added)
    }

    /// Removes every element below `body`
    ///
    /// Their ids are never handed out again, so a stale handle can never
    /// alias new content.
    pub fn clear(&mut self) {
        let body = self.body();
        let removed = self.descendants(body);
        for id in removed {
            self.elements.remove(&id);
        }
        if let Some(body) = self.elements.get_mut(&body) {
            body.children.clear();
        }
    }

    pub fn tag(&self, id: ElementId) -> &str {
        self.element(id).map_or("", |e| e.tag.as_str())
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.element(id)?.text.as_deref()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id)?.parent
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map_or(&[], |e| e.children.as_slice())
    }

    /// Descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, id: ElementId, selector: &Selector) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        element.tag == selector.tag
            && selector.conditions.iter().all(|condition| match condition {
                AttrMatch::Equals(name, value) => element.attributes.get(name) == Some(value),
                AttrMatch::Prefix(name, prefix) => element
                    .attributes
                    .get(name)
                    .is_some_and(|v| v.starts_with(prefix.as_str())),
            })
    }

    /// Descendants of `scope` matching `selector`
    pub fn query_within(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    /// Every element matching any of `selectors`, in document order
    pub fn query_any(&self, selectors: &[Selector]) -> Vec<ElementId> {
        self.descendants(self.body())
            .into_iter()
            .filter(|&id| selectors.iter().any(|s| self.matches(id, s)))
            .collect()
    }

    /// Concatenated text of `id` and its descendants
    pub fn text_content(&self, id: ElementId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|e| self.text(e))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Structural change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageChange {
    /// A batch of elements was inserted
    NodesAdded(usize),
    /// The page URL changed without a reload
    Navigated(String),
}

/// Shared handle to a document with change notifications
#[derive(Debug, Clone)]
pub struct Page {
    document: Arc<RwLock<Document>>,
    changes: broadcast::Sender<PageChange>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            document: Arc::new(RwLock::new(document)),
            changes,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.document.read().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageChange> {
        self.changes.subscribe()
    }

    /// Inserts a subtree and notifies subscribers
    pub async fn insert(&self, parent: ElementId, node: Node) -> ElementId {
        let (id, added) = self.document.write().await.insert(parent, node);
        let _ = self.changes.send(PageChange::NodesAdded(added));
        id
    }

    /// Replaces the page content under a new URL, as a client-side route change does
    pub async fn navigate(&self, url: &str, content: Vec<Node>) {
        let added = {
            let mut document = self.document.write().await;
            document.clear();
            document.url = url.to_string();
            let body = document.body();
            content
                .into_iter()
                .map(|node| document.insert(body, node).1)
                .sum::<usize>()
        };
        let _ = self.changes.send(PageChange::Navigated(url.to_string()));
        if added > 0 {
            let _ = self.changes.send(PageChange::NodesAdded(added));
        }
    }

    pub(crate) async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, Document> {
        self.document.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, ElementId, ElementId) {
        let mut doc = Document::new("https://x.com/home");
        let body = doc.body();
        let (article, added) = doc.insert(
            body,
            Node::new("article")
                .attr("data-testid", "tweet")
                .child(
                    Node::new("div")
                        .attr("data-testid", "User-Name")
                        .child(Node::new("a").attr("href", "/jdoe").attr("role", "link").text("Jane")),
                )
                .child(Node::new("span").text("hello")),
        );
        assert_eq!(added, 4);
        let link = doc.query_within(article, &Selector::new("a"))[0];
        (doc, article, link)
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let (doc, article, _) = sample();
        let tags: Vec<_> = doc.descendants(article).iter().map(|&id| doc.tag(id)).collect();
        assert_eq!(tags, vec!["div", "a", "span"]);
    }

    #[test]
    fn test_descendants_exclude_self() {
        let (doc, _, link) = sample();
        assert!(doc.descendants(link).is_empty());
    }

    #[test]
    fn test_selector_matching() {
        let (doc, article, link) = sample();
        let username_link = Selector::new("a").attr_prefix("href", "/").attr_eq("role", "link");
        assert!(doc.matches(link, &username_link));
        assert!(!doc.matches(article, &username_link));
        assert!(!doc.matches(link, &Selector::new("a").attr_prefix("href", "https://")));
        assert_eq!(doc.query_any(&[username_link, Selector::new("article")]), vec![article, link]);
    }

    #[test]
    fn test_parent_links_and_text_content() {
        let (doc, article, link) = sample();
        let div = doc.parent(link).unwrap();
        assert_eq!(doc.parent(div), Some(article));
        assert_eq!(doc.parent(doc.body()), None);
        assert_eq!(doc.text_content(article), "Jane hello");
    }

    #[tokio::test]
    async fn test_page_notifies_insertions_and_navigation() {
        let page = Page::new(Document::new("https://x.com/home"));
        let mut changes = page.subscribe();
        let body = page.read().await.body();

        page.insert(body, Node::new("div").child(Node::new("a"))).await;
        assert_eq!(changes.recv().await.unwrap(), PageChange::NodesAdded(2));

        page.navigate("https://x.com/explore", vec![Node::new("main")]).await;
        assert_eq!(
            changes.recv().await.unwrap(),
            PageChange::Navigated("https://x.com/explore".to_string())
        );
        assert_eq!(changes.recv().await.unwrap(), PageChange::NodesAdded(1));

        let doc = page.read().await;
        assert_eq!(doc.url(), "https://x.com/explore");
        assert_eq!(doc.descendants(doc.body()).len(), 1);
    }

    #[test]
    fn test_clear_reclaims_elements_without_reusing_ids() {
        let (mut doc, article, link) = sample();
        assert_eq!(doc.element_count(), 5);

        doc.clear();
        assert_eq!(doc.element_count(), 1);
        assert!(doc.children(doc.body()).is_empty());
        // Stale handles read as empty detached elements
        assert_eq!(doc.tag(article), "");
        assert_eq!(doc.parent(link), None);
        assert_eq!(doc.attribute(link, "href"), None);

        let body = doc.body();
        let (fresh, _) = doc.insert(body, Node::new("main"));
        assert!(fresh != article && fresh != link);
        assert_eq!(doc.tag(article), "");
    }

    #[tokio::test]
    async fn test_repeated_navigation_keeps_document_bounded() {
        let page = Page::new(Document::new("https://x.com/home"));
        for route in ["explore", "notifications", "search", "home"] {
            let content = vec![Node::new("article").child(Node::new("a").attr("href", "/jdoe"))];
            page.navigate(&format!("https://x.com/{route}"), content).await;
        }
        assert_eq!(page.read().await.element_count(), 3);
    }
}
