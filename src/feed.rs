//! Feed content for the simulated host page
//!
//! Posts are turned into `Node` trees with the same markers a real timeline
//! carries (post containers, avatar containers, name blocks and profile
//! links), so the scanner and username extraction see familiar markup.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::page::{Document, Node, Page};

/// Home timeline URL
pub const HOME_URL: &str = "https://x.com/home";

/// Routes cycled through by client-side navigation
pub const ROUTES: &[&str] = &["home", "explore", "notifications", "search"];

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse feed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feed has no posts")]
    Empty,
}

/// One post as it appears in a feed file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    /// Screen name without the leading `@`
    pub author: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub text: String,
}

impl FeedPost {
    fn new(author: &str, display_name: &str, text: &str) -> Self {
        Self {
            author: author.to_string(),
            display_name: Some(display_name.to_string()),
            text: text.to_string(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.author)
    }
}

/// Posts shown when no feed file is given
pub fn sample_feed() -> Vec<FeedPost> {
    vec![
        FeedPost::new("mika_h", "Mika Häkkinen", "First snow of the year in Helsinki already."),
        FeedPost::new("tanaka_dev", "Tanaka", "Shipped the new release. Time for ramen."),
        FeedPost::new("maple_jo", "Jo", "Hockey night, nothing else matters."),
        FeedPost::new("rio_surf", "Rafa", "Waves are perfect this morning."),
        FeedPost::new("berlin_beats", "Lena", "New mix is up, link in bio."),
        FeedPost::new("outback_al", "Al", "Saw three kangaroos on the drive in."),
        FeedPost::new("no_location", "Mystery", "You will never know where I am."),
        FeedPost::new("croissant", "Camille", "Bakery queue is already around the block."),
    ]
}

/// Locations the sample resolver knows about
pub fn sample_locations() -> std::collections::HashMap<String, String> {
    [
        ("mika_h", "Finland"),
        ("tanaka_dev", "Japan"),
        ("maple_jo", "Canada"),
        ("rio_surf", "Brazil"),
        ("berlin_beats", "Germany"),
        ("outback_al", "Australia"),
        ("croissant", "France"),
    ]
    .into_iter()
    .map(|(name, location)| (name.to_string(), location.to_string()))
    .collect()
}

/// Reads a JSON array of posts
pub fn load_feed(path: &Path) -> Result<Vec<FeedPost>, FeedError> {
    let content = std::fs::read_to_string(path)?;
    let posts: Vec<FeedPost> = serde_json::from_str(&content)?;
    if posts.is_empty() {
        return Err(FeedError::Empty);
    }
    Ok(posts)
}

/// Markup for one post
pub fn post_node(post: &FeedPost) -> Node {
    let profile = format!("/{}", post.author);
    Node::new("article")
        .attr("data-testid", "tweet")
        .child(
            Node::new("div")
                .attr("data-testid", &format!("UserAvatar-Container-{}", post.author))
                .child(Node::new("a").attr("href", &profile).attr("role", "link")),
        )
        .child(
            Node::new("div")
                .attr("data-testid", "User-Name")
                .child(
                    Node::new("a")
                        .attr("href", &profile)
                        .attr("role", "link")
                        .text(post.display_name()),
                )
                .child(
                    Node::new("a")
                        .attr("href", &profile)
                        .attr("role", "link")
                        .text(&format!("@{}", post.author)),
                ),
        )
        .child(
            Node::new("div")
                .attr("data-testid", "tweetText")
                .text(&post.text),
        )
}

/// Site navigation header
///
/// The links sit deep enough under the header that walking up from them
/// never reaches the posts.
pub fn header_node() -> Node {
    let links = ROUTES.iter().fold(Node::new("div"), |row, route| {
        row.child(
            Node::new("a")
                .attr("href", &format!("/{}", route))
                .attr("role", "link")
                .text(route),
        )
    });
    Node::new("header").attr("role", "banner").child(
        Node::new("nav")
            .child(Node::new("div").child(Node::new("div").child(links))),
    )
}

/// Header followed by every post
pub fn page_content(posts: &[FeedPost]) -> Vec<Node> {
    std::iter::once(header_node())
        .chain(posts.iter().map(post_node))
        .collect()
}

/// Builds the initial home page
pub fn home_page(posts: &[FeedPost]) -> Page {
    let mut doc = Document::new(HOME_URL);
    let body = doc.body();
    for node in page_content(posts) {
        doc.insert(body, node);
    }
    Page::new(doc)
}
