//! Immutable in-memory reference table of title→code entries.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DistanceMetricConfig;
use crate::errors::CodingError;
use crate::normalize::{normalize, tokens};
use crate::taxonomy::TaxonomyRow;
use crate::types::{Category, Code, NormalizedString, Title, Token};

/// One reference taxonomy entry. Immutable once the index is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Original canonical title as it appeared in the taxonomy.
    pub title: Title,
    /// Precomputed normalized form used by every metric.
    pub normalized_title: NormalizedString,
    /// Standardized occupation code.
    pub code: Code,
    /// Optional category metadata.
    pub category: Option<Category>,
}

/// Read-only lookup structure over the reference taxonomy.
///
/// Built once, shared across concurrent callers. Duplicate titles with
/// different codes are allowed; entry order is the deterministic tie-break
/// everywhere downstream.
pub struct CodingIndex {
    entries: Vec<ReferenceEntry>,
    entry_tokens: Vec<Vec<Token>>,
    exact: HashMap<NormalizedString, Vec<usize>>,
    token_index: IndexMap<Token, Vec<usize>>,
    fingerprint: u64,
}

impl CodingIndex {
    /// Build an index from already-loaded taxonomy rows.
    ///
    /// Construction cost is proportional to taxonomy size; build once and
    /// share. Fails with `EmptyIndex` when `rows` yields nothing.
    pub fn build<I>(rows: I) -> Result<Self, CodingError>
    where
        I: IntoIterator<Item = TaxonomyRow>,
    {
        let mut entries = Vec::new();
        let mut entry_tokens = Vec::new();
        let mut exact: HashMap<NormalizedString, Vec<usize>> = HashMap::new();
        let mut token_index: IndexMap<Token, Vec<usize>> = IndexMap::new();

        for row in rows {
            let idx = entries.len();
            let normalized_title = normalize(&row.title);
            let title_tokens = tokens(&normalized_title);
            exact
                .entry(normalized_title.to_lowercase())
                .or_default()
                .push(idx);
            for token in &title_tokens {
                token_index.entry(token.clone()).or_default().push(idx);
            }
            entries.push(ReferenceEntry {
                title: row.title,
                normalized_title,
                code: row.code,
                category: row.category,
            });
            entry_tokens.push(title_tokens);
        }

        if entries.is_empty() {
            return Err(CodingError::EmptyIndex);
        }

        let fingerprint = fingerprint_entries(&entries);
        info!(
            entries = entries.len(),
            tokens = token_index.len(),
            fingerprint = format_args!("{fingerprint:#018x}"),
            "coding index built"
        );

        Ok(Self {
            entries,
            entry_tokens,
            exact,
            token_index,
            fingerprint,
        })
    }

    /// Number of reference entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the index holds no entries (unreachable after `build`).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in taxonomy order.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Entry at `idx`, if in range.
    pub fn entry(&self, idx: usize) -> Option<&ReferenceEntry> {
        self.entries.get(idx)
    }

    /// Stable content fingerprint pairing trained models with this index.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Codes whose normalized title equals `normalized` (case-insensitive).
    /// Duplicates collapse; order follows the taxonomy.
    pub fn lookup_exact(&self, normalized: &str) -> Vec<Code> {
        let mut codes: Vec<Code> = Vec::new();
        if let Some(indices) = self.exact.get(&normalized.to_lowercase()) {
            for &idx in indices {
                let code = &self.entries[idx].code;
                if !codes.iter().any(|seen| seen == code) {
                    codes.push(code.clone());
                }
            }
        }
        codes
    }

    /// Candidate entry indices worth scoring for `query` under `config`.
    ///
    /// The substring metric admits a cheap prefilter: only entries sharing at
    /// least one token with the query can match. Wordwise has no safe cheap
    /// prefilter (a single close-but-unequal word suffices), so the full
    /// index is returned.
    pub fn candidates_for(
        &self,
        query: &NormalizedString,
        config: &DistanceMetricConfig,
    ) -> Vec<usize> {
        match config {
            DistanceMetricConfig::Wordwise { .. } => (0..self.entries.len()).collect(),
            DistanceMetricConfig::Substring => {
                let query_tokens = tokens(query);
                let mut seen = vec![false; self.entries.len()];
                let mut candidates = Vec::new();
                for token in &query_tokens {
                    if let Some(indices) = self.token_index.get(token) {
                        for &idx in indices {
                            if !seen[idx] {
                                seen[idx] = true;
                                candidates.push(idx);
                            }
                        }
                    }
                }
                candidates.sort_unstable();
                candidates
            }
        }
    }

    /// Precomputed tokens for entry `idx`.
    pub(crate) fn tokens_of(&self, idx: usize) -> &[Token] {
        &self.entry_tokens[idx]
    }
}

/// Stable hash over (normalized title, code) pairs. `DefaultHasher::new()`
/// uses fixed keys, so the value is reproducible across processes.
fn fingerprint_entries(entries: &[ReferenceEntry]) -> u64 {
    let mut hasher = DefaultHasher::new();
    entries.len().hash(&mut hasher);
    for entry in entries {
        entry.normalized_title.hash(&mut hasher);
        entry.code.hash(&mut hasher);
    }
    hasher.finish()
}
