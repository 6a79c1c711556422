//! Catalog filtering, sorting and pagination
//!
//! [`select`] runs the listing pipeline over a snapshot of packages:
//! search, then tag filter, then sort. Pagination is kept apart in
//! [`Reveal`], which only windows the final list.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::package::Package;
use super::search::SearchIndex;
use crate::config::DEFAULT_PAGE_SIZE;

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Search score, or index order when there is no query
    #[default]
    Relevance,
    /// Most recently updated first
    Updated,
    /// Most starred first
    Stars,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Updated => "updated",
            SortBy::Stars => "stars",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "updated" => Ok(SortBy::Updated),
            "stars" => Ok(SortBy::Stars),
            other => Err(format!(
                "Invalid sort mode '{other}' (expected relevance, updated or stars)"
            )),
        }
    }
}

/// How many results of the current listing are revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    page_size: usize,
    shown: usize,
}

impl Default for Reveal {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Reveal {
    /// Start with one page revealed
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            shown: page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Reveal one more page, capped at `total`
    pub fn grow(self, total: usize) -> Self {
        Self {
            shown: (self.shown + self.page_size).min(total).max(self.shown),
            ..self
        }
    }

    /// Back to a single page
    pub fn reset(self) -> Self {
        Self::new(self.page_size)
    }

    /// Whether more results remain hidden
    pub fn has_more(&self, total: usize) -> bool {
        self.shown < total
    }

    /// The revealed prefix of `items`
    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.shown.min(items.len())]
    }
}

/// Everything the listing depends on besides the package snapshot
///
/// Each change produces a new state. Changing the query or the tag
/// selection collapses the reveal back to one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    query: String,
    selected_tags: BTreeSet<String>,
    sort_by: SortBy,
    reveal: Reveal,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            reveal: Reveal::new(page_size),
            ..Default::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_tags(&self) -> &BTreeSet<String> {
        &self.selected_tags
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn reveal(&self) -> Reveal {
        self.reveal
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        let query = query.into();
        if query == self.query {
            return self;
        }
        Self {
            query,
            reveal: self.reveal.reset(),
            ..self
        }
    }

    /// Select the tag if unselected, unselect it otherwise
    pub fn toggle_tag(mut self, tag: &str) -> Self {
        if !self.selected_tags.remove(tag) {
            self.selected_tags.insert(tag.to_string());
        }
        self.reveal = self.reveal.reset();
        self
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected_tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        if selected_tags == self.selected_tags {
            return self;
        }
        Self {
            selected_tags,
            reveal: self.reveal.reset(),
            ..self
        }
    }

    pub fn with_sort(self, sort_by: SortBy) -> Self {
        Self { sort_by, ..self }
    }

    /// Reveal one more page of a listing with `total` results
    pub fn grow(self, total: usize) -> Self {
        Self {
            reveal: self.reveal.grow(total),
            ..self
        }
    }
}

/// Run the listing pipeline: search, tag filter, sort
///
/// Without a search index the query is ignored. The input is never
/// reordered; the result borrows from it.
pub fn select<'a>(
    packages: &'a [Package],
    index: Option<&SearchIndex>,
    view: &ViewState,
) -> Vec<&'a Package> {
    let query = view.query.trim();
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut result: Vec<&Package> = packages.iter().collect();

    if let Some(index) = index.filter(|_| !query.is_empty()) {
        let hits = index.search(query);
        if hits.is_empty() {
            tracing::debug!("Query '{}' matched nothing", query);
            return Vec::new();
        }
        scores.extend(hits.into_iter().map(|hit| (hit.id, hit.score)));
        result.retain(|pkg| scores.contains_key(pkg.tooth.as_str()));
    }

    if !view.selected_tags.is_empty() {
        result.retain(|pkg| pkg.has_all_tags(view.selected_tags.iter()));
    }

    match view.sort_by {
        SortBy::Relevance => {
            if !query.is_empty() {
                result.sort_by(|a, b| {
                    let sa = scores.get(a.tooth.as_str()).copied().unwrap_or(0.0);
                    let sb = scores.get(b.tooth.as_str()).copied().unwrap_or(0.0);
                    sb.total_cmp(&sa)
                });
            }
        }
        SortBy::Stars => result.sort_by_key(|pkg| Reverse(pkg.stars)),
        // Unparseable timestamps (None) land after every parseable one
        SortBy::Updated => result.sort_by_cached_key(|pkg| Reverse(pkg.updated_at())),
    }

    result
}

/// A tag and how many packages carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Count tags over all packages; most used first, then alphabetical
pub fn tag_facets(packages: &[Package]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for pkg in packages {
        for tag in &pkg.info.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut facets: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    facets
}
