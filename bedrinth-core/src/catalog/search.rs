//! Full-text search over package name, description and tags
//!
//! A small in-memory inverted index scored with BM25+ per field. Query
//! tokens match indexed terms exactly, by prefix, or fuzzily within an
//! edit distance proportional to the token length. Matches from all query
//! tokens are OR-combined, and documents matching more distinct tokens
//! are ranked higher.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use super::package::Package;

const FIELD_COUNT: usize = 3;
const NAME: usize = 0;
const DESCRIPTION: usize = 1;
const TAGS: usize = 2;

/// Per-field boost, indexed by field
const FIELD_BOOST: [f64; FIELD_COUNT] = [3.0, 1.0, 2.0];

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.7;
const BM25_D: f64 = 0.5;

const PREFIX_WEIGHT: f64 = 0.375;
const FUZZY_WEIGHT: f64 = 0.45;
/// Allowed edit distance as a fraction of the query token length
const FUZZY_FACTOR: f64 = 0.2;
const MAX_FUZZY_DISTANCE: usize = 6;

/// A matching package and its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Tooth of the matching package
    pub id: String,
    /// Relevance, only comparable within one query
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: usize,
    term_freq: u32,
}

/// Postings of one term, one list per field
type TermPostings = [Vec<Posting>; FIELD_COUNT];

/// Inverted index over a package snapshot
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    ids: Vec<String>,
    field_lengths: Vec<[usize; FIELD_COUNT]>,
    avg_field_length: [f64; FIELD_COUNT],
    terms: BTreeMap<String, TermPostings>,
}

impl SearchIndex {
    /// Index every package, keyed by tooth
    pub fn build(packages: &[Package]) -> Self {
        let mut index = Self::default();
        let mut total_length = [0usize; FIELD_COUNT];

        for (doc, pkg) in packages.iter().enumerate() {
            let tags = pkg.info.tags.join(" ");
            let fields: [&str; FIELD_COUNT] = [&pkg.info.name, &pkg.info.description, &tags];
            let mut lengths = [0usize; FIELD_COUNT];

            for (field, text) in fields.iter().enumerate() {
                let mut freqs: HashMap<String, u32> = HashMap::new();
                for token in tokenize(text) {
                    lengths[field] += 1;
                    *freqs.entry(token).or_default() += 1;
                }
                for (term, term_freq) in freqs {
                    index.terms.entry(term).or_default()[field].push(Posting { doc, term_freq });
                }
                total_length[field] += lengths[field];
            }

            index.ids.push(pkg.tooth.clone());
            index.field_lengths.push(lengths);
        }

        if !packages.is_empty() {
            for field in 0..FIELD_COUNT {
                index.avg_field_length[field] = total_length[field] as f64 / packages.len() as f64;
            }
        }

        tracing::debug!(
            "Built search index: {} packages, {} terms",
            index.ids.len(),
            index.terms.len()
        );
        index
    }

    /// Number of indexed packages
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Run a query, best match first
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let mut query_terms = tokenize(query);
        let mut seen = HashSet::new();
        query_terms.retain(|t| seen.insert(t.clone()));

        let mut acc: HashMap<usize, (f64, HashSet<usize>)> = HashMap::new();

        for (qi, qterm) in query_terms.iter().enumerate() {
            let q_len = qterm.chars().count() as f64;

            if let Some(postings) = self.terms.get(qterm.as_str()) {
                self.accumulate(postings, 1.0, qi, &mut acc);
            }

            let prefix_range = self
                .terms
                .range::<str, _>((Bound::Excluded(qterm.as_str()), Bound::Unbounded))
                .take_while(|(term, _)| term.starts_with(qterm.as_str()));
            for (term, postings) in prefix_range {
                let distance = (term.chars().count() as f64) - q_len;
                let weight = PREFIX_WEIGHT * q_len / (q_len + 0.3 * distance);
                self.accumulate(postings, weight, qi, &mut acc);
            }

            let max_distance = ((q_len * FUZZY_FACTOR).round() as usize).min(MAX_FUZZY_DISTANCE);
            if max_distance == 0 {
                continue;
            }
            for (term, postings) in &self.terms {
                // Exact and prefix matches were already scored above
                if term.starts_with(qterm.as_str()) {
                    continue;
                }
                if let Some(distance) = bounded_levenshtein(qterm, term, max_distance) {
                    let weight = FUZZY_WEIGHT * q_len / (q_len + distance as f64);
                    self.accumulate(postings, weight, qi, &mut acc);
                }
            }
        }

        let mut scored: Vec<(usize, f64)> = acc
            .into_iter()
            .map(|(doc, (score, matched))| (doc, score * matched.len() as f64))
            .collect();
        scored.sort_by_key(|(doc, _)| *doc);
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .map(|(doc, score)| SearchHit {
                id: self.ids[doc].clone(),
                score,
            })
            .collect()
    }

    fn accumulate(
        &self,
        postings: &TermPostings,
        weight: f64,
        query_term: usize,
        acc: &mut HashMap<usize, (f64, HashSet<usize>)>,
    ) {
        let total_docs = self.ids.len() as f64;

        for (field, list) in postings.iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let doc_freq = list.len() as f64;
            let idf = ((total_docs - doc_freq + 0.5) / (doc_freq + 0.5)).ln_1p();
            let avg_len = self.avg_field_length[field].max(1.0);

            for posting in list {
                let tf = f64::from(posting.term_freq);
                let field_len = self.field_lengths[posting.doc][field] as f64;
                let length_norm = 1.0 - BM25_B + BM25_B * field_len / avg_len;
                let tf_part = tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * length_norm);
                let score = FIELD_BOOST[field] * weight * idf * (BM25_D + tf_part);

                let entry = acc.entry(posting.doc).or_default();
                entry.0 += score;
                entry.1.insert(query_term);
            }
        }
    }
}

/// Runs of whitespace, Unicode separators and Unicode punctuation
static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\p{Z}\p{P}]+").expect("token separator is a valid regex"));

/// Split on separators and punctuation (CJK included), lowercase, drop empties
fn tokenize(text: &str) -> Vec<String> {
    TOKEN_SEPARATOR
        .split(text)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Levenshtein distance, or `None` once it must exceed `max`
fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}
