//! Referential integrity between per-clause outputs and the document.
//!
//! Clause ids are weak references by value. Model-produced mappings may
//! name clauses that do not exist; those entries are dropped.

use std::collections::HashMap;

use crate::types::{ClauseLaws, DocumentInfo, LawMapping};

/// Upper bound on related laws kept for a single clause.
pub const MAX_LAWS_PER_CLAUSE: usize = 5;

/// What [`enforce_law_mapping`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Ids that matched no clause
    pub unknown_clause_ids: Vec<String>,

    /// Laws removed by the per-clause cap
    pub trimmed_laws: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_clause_ids.is_empty() && self.trimmed_laws == 0
    }
}

/// Keep entries for known clauses, merge repeats, and cap laws per clause.
///
/// Entries keep the order in which their clause first appeared.
pub fn enforce_law_mapping(entries: Vec<ClauseLaws>, doc: &DocumentInfo) -> (LawMapping, IntegrityReport) {
    let known = doc.clause_ids();
    let mut report = IntegrityReport::default();
    let mut merged: Vec<ClauseLaws> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        if !known.contains(entry.clause_id.as_str()) {
            report.unknown_clause_ids.push(entry.clause_id);
            continue;
        }
        match position.get(&entry.clause_id) {
            Some(&idx) => merged[idx].related_laws.extend(entry.related_laws),
            None => {
                position.insert(entry.clause_id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }

    for entry in &mut merged {
        if entry.related_laws.len() > MAX_LAWS_PER_CLAUSE {
            report.trimmed_laws += entry.related_laws.len() - MAX_LAWS_PER_CLAUSE;
            entry.related_laws.truncate(MAX_LAWS_PER_CLAUSE);
        }
    }

    (LawMapping { laws: merged }, report)
}

/// Whether `ids` names every clause of `doc` exactly once, in clause order.
pub fn is_aligned<'a>(doc: &DocumentInfo, ids: impl IntoIterator<Item = &'a str>) -> bool {
    let ids: Vec<&str> = ids.into_iter().collect();
    ids.len() == doc.clauses.len() && doc.clauses.iter().zip(ids).all(|(c, id)| c.id == id)
}
