//! Ordered-fallback field location.
//!
//! A [`FieldSelector`] is a list of [`Strategy`] values tried in order against
//! a [`Container`]; the first one yielding non-empty text wins. Supporting a
//! new markup convention means adding a strategy to the list, nothing more.

use crate::models::Field;
use crate::utils::collapse_whitespace;
use regex::Regex;

/// Read-only view of one DOM subtree presumed to hold a single event.
///
/// Lookups search descendants in document order and never include the
/// container element itself.
pub trait Container {
    /// Text of each descendant whose class attribute matches `class`.
    ///
    /// A value containing whitespace must equal the whole class attribute;
    /// a single token matches any element carrying that class.
    fn texts_by_class(&self, class: &str) -> Vec<String>;

    /// Text of each descendant with the given tag name.
    fn texts_by_tag(&self, tag: &str) -> Vec<String>;

    /// Text of each descendant whose `name` attribute matches `pattern`.
    fn texts_by_attr(&self, name: &str, pattern: &Regex) -> Vec<String>;

    /// All rendered text of the subtree, text nodes separated by spaces.
    fn full_text(&self) -> String;

    /// `href` values of every link in the subtree.
    fn links(&self) -> Vec<String>;
}

/// One way of finding a field's text inside a container.
#[derive(Debug, Clone)]
pub enum Strategy {
    Class(String),
    Tag(String),
    Attr { name: String, pattern: Regex },
    /// Regex over the container's full text. Yields capture group 1 when the
    /// pattern has one, otherwise the whole match.
    Text(Regex),
}

impl Strategy {
    /// Try this strategy alone. `None` means "try the next one".
    pub fn apply<C: Container + ?Sized>(&self, container: &C) -> Option<String> {
        match self {
            Strategy::Class(class) => first_non_empty(container.texts_by_class(class)),
            Strategy::Tag(tag) => first_non_empty(container.texts_by_tag(tag)),
            Strategy::Attr { name, pattern } => {
                first_non_empty(container.texts_by_attr(name, pattern))
            }
            Strategy::Text(pattern) => {
                let text = container.full_text();
                let caps = pattern.captures(&text)?;
                let hit = caps.get(1).or_else(|| caps.get(0))?;
                first_non_empty(vec![hit.as_str().to_string()])
            }
        }
    }
}

fn first_non_empty(candidates: Vec<String>) -> Option<String> {
    candidates
        .into_iter()
        .map(|s| collapse_whitespace(&s))
        .find(|s| !s.is_empty())
}

/// Immutable, ordered list of strategies for one logical field.
#[derive(Debug, Clone)]
pub struct FieldSelector {
    pub field: Field,
    pub strategies: Vec<Strategy>,
}

impl FieldSelector {
    pub fn new(field: Field, strategies: Vec<Strategy>) -> Self {
        Self { field, strategies }
    }
}

/// Return the trimmed text of the first strategy in `selector` that finds
/// anything, or `None` when every strategy comes up empty.
pub fn locate<C: Container + ?Sized>(container: &C, selector: &FieldSelector) -> Option<String> {
    selector
        .strategies
        .iter()
        .find_map(|strategy| strategy.apply(container))
}
