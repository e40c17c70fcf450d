//! Parsed listings page and its event containers.
//!
//! This is the DOM side of the page-fetch collaborator: it turns raw HTML
//! into [`scraper::ElementRef`] containers and implements the read-only
//! [`Container`] queries the extraction core relies on.

use crate::extract::locator::{Container, Strategy};
use crate::utils::{collapse_whitespace, truncate_for_log};
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html};
use std::collections::BTreeSet;
use tracing::debug;

/// A parsed snapshot of one listings page.
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Candidate event containers, in document order.
    ///
    /// Strategies are tried in order and the first one matching at least one
    /// element decides the whole set.
    pub fn containers(&self, strategies: &[Strategy]) -> Vec<ElementRef<'_>> {
        for strategy in strategies {
            let found: Vec<ElementRef<'_>> = self
                .document
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| element_matches(strategy, el))
                .collect();

            if !found.is_empty() {
                debug!(?strategy, count = found.len(), "Matched event containers");
                return found;
            }
            debug!(?strategy, "No containers for strategy");
        }
        Vec::new()
    }

    /// Every CSS class used anywhere in the page, sorted.
    pub fn class_inventory(&self) -> BTreeSet<String> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .flat_map(|el| el.value().classes().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }
}

/// Short HTML preview of a container for debug logs.
pub fn preview(container: &ElementRef<'_>, max: usize) -> String {
    truncate_for_log(&container.html(), max)
}

fn element_matches(strategy: &Strategy, el: &ElementRef<'_>) -> bool {
    match strategy {
        Strategy::Class(class) => class_matches(el.value(), class),
        Strategy::Tag(tag) => el.value().name().eq_ignore_ascii_case(tag),
        Strategy::Attr { name, pattern } => el
            .value()
            .attr(name)
            .is_some_and(|value| pattern.is_match(value)),
        Strategy::Text(pattern) => el
            .children()
            .filter_map(|node| node.value().as_text())
            .any(|text| pattern.is_match(text)),
    }
}

fn class_matches(el: &Element, class: &str) -> bool {
    let wanted = class.trim();
    if wanted.contains(char::is_whitespace) {
        el.attr("class")
            .is_some_and(|attr| attr.split_whitespace().eq(wanted.split_whitespace()))
    } else {
        el.classes().any(|c| c == wanted)
    }
}

fn descendant_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

impl Container for ElementRef<'_> {
    fn texts_by_class(&self, class: &str) -> Vec<String> {
        descendant_elements(*self)
            .filter(|el| class_matches(el.value(), class))
            .map(|el| element_text(&el))
            .collect()
    }

    fn texts_by_tag(&self, tag: &str) -> Vec<String> {
        descendant_elements(*self)
            .filter(|el| el.value().name().eq_ignore_ascii_case(tag))
            .map(|el| element_text(&el))
            .collect()
    }

    fn texts_by_attr(&self, name: &str, pattern: &Regex) -> Vec<String> {
        descendant_elements(*self)
            .filter(|el| el.value().attr(name).is_some_and(|v| pattern.is_match(v)))
            .map(|el| element_text(&el))
            .collect()
    }

    fn full_text(&self) -> String {
        element_text(self)
    }

    fn links(&self) -> Vec<String> {
        self.descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "a")
            .filter_map(|el| el.value().attr("href").map(str::to_string))
            .collect()
    }
}
