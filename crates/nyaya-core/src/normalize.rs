//! Lenient conversion of an extracted object into a [`DocumentInfo`].
//!
//! The document record is the root of the pipeline, so wrong-typed fields
//! are coerced to their empty default instead of rejecting the record.
//! Clause ids are made unique here; downstream agents rely on them.

use serde_json::Value;
use std::collections::HashSet;

use crate::extract::{JsonObject, Shape};
use crate::fallback::full_document_clause;
use crate::types::{Clause, DocumentDates, DocumentInfo, Party};

/// Keys of the document record, used for nested-duplicate repair.
pub const DOCUMENT_SHAPE: Shape<'static> = Shape::new(
    &["document_type", "parties", "dates", "clauses", "summary"],
    &["document_type", "clauses"],
);

/// Build a document record from an extracted object.
///
/// `source_text` backs the synthetic clause used when the object carries
/// no usable clauses.
pub fn normalize_document(object: &JsonObject, source_text: &str) -> DocumentInfo {
    let mut clauses: Vec<Clause> = objects(object.get("clauses")).map(clause_from).collect();
    clauses.retain(|c| !c.text.is_empty() || !c.title.is_empty());
    assign_clause_ids(&mut clauses);

    if clauses.is_empty() {
        tracing::debug!("Structured record had no usable clauses; using full document");
        clauses.push(full_document_clause(source_text));
    }

    DocumentInfo {
        document_type: scalar(object.get("document_type")),
        parties: objects(object.get("parties"))
            .map(|p| Party::new(scalar(p.get("name")), scalar(p.get("role"))))
            .filter(|p| !p.name.is_empty() || !p.role.is_empty())
            .collect(),
        dates: object
            .get("dates")
            .and_then(Value::as_object)
            .map(|d| DocumentDates {
                start_date: scalar(d.get("start_date")),
                end_date: scalar(d.get("end_date")),
                signature_date: scalar(d.get("signature_date")),
            })
            .unwrap_or_default(),
        clauses,
        summary: scalar(object.get("summary")),
    }
}

fn clause_from(object: &JsonObject) -> Clause {
    Clause {
        id: scalar(object.get("id")).trim().to_string(),
        title: scalar(object.get("title")),
        text: scalar(object.get("text")),
        obligations: string_list(object.get("obligations")),
        penalties: string_list(object.get("penalties")),
    }
}

/// Make every clause id non-empty and unique, keeping the first occurrence
/// of each id and renaming the rest to `clause_<position>`.
pub fn assign_clause_ids(clauses: &mut [Clause]) {
    let mut used: HashSet<String> = HashSet::new();
    let mut needs_id = Vec::new();

    for (idx, clause) in clauses.iter_mut().enumerate() {
        if clause.id.is_empty() || !used.insert(clause.id.clone()) {
            needs_id.push(idx);
        }
    }

    for idx in needs_id {
        let mut n = idx + 1;
        loop {
            let candidate = format!("clause_{}", n);
            if used.insert(candidate.clone()) {
                clauses[idx].id = candidate;
                break;
            }
            n += 1;
        }
    }
}

/// Strings and other scalars as text; everything else empty.
fn scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| scalar(Some(item)))
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &JsonObject> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FULL_DOCUMENT_TITLE;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_well_formed_record() {
        let doc = normalize_document(
            &object(json!({
                "document_type": "rental_agreement",
                "parties": [{"name": "Ravi", "role": "landlord"}, {"name": "Meera", "role": "tenant"}],
                "dates": {"start_date": "2024-04-01", "end_date": "", "signature_date": "1st April"},
                "clauses": [{
                    "id": "clause_1",
                    "title": "Rent",
                    "text": "Tenant shall pay ₹10,000 monthly rent by the 5th.",
                    "obligations": ["Tenant must pay rent by the 5th"],
                    "penalties": []
                }],
                "summary": "A rental agreement."
            })),
            "",
        );
        assert_eq!(doc.document_type, "rental_agreement");
        assert_eq!(doc.parties.len(), 2);
        assert_eq!(doc.dates.signature_date, "1st April");
        assert_eq!(doc.clauses[0].obligations.len(), 1);
    }

    #[test]
    fn test_wrong_types_become_defaults() {
        let doc = normalize_document(
            &object(json!({
                "document_type": null,
                "parties": "Ravi and Meera",
                "dates": ["2024-04-01"],
                "clauses": [{"id": 7, "title": "Rent", "text": "Pay rent", "obligations": "Pay rent on time", "penalties": [null, "2% per day"]}],
                "summary": 42
            })),
            "",
        );
        assert_eq!(doc.document_type, "");
        assert!(doc.parties.is_empty());
        assert_eq!(doc.dates, DocumentDates::default());
        assert_eq!(doc.clauses[0].id, "7");
        assert_eq!(doc.clauses[0].obligations, vec!["Pay rent on time"]);
        assert_eq!(doc.clauses[0].penalties, vec!["2% per day"]);
        assert_eq!(doc.summary, "42");
    }

    #[test]
    fn test_missing_and_duplicate_ids_are_reassigned() {
        let mut clauses = vec![
            Clause::new("clause_2", "A", "a"),
            Clause::new("", "B", "b"),
            Clause::new("clause_2", "C", "c"),
        ];
        assign_clause_ids(&mut clauses);
        let ids: Vec<&str> = clauses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clause_2", "clause_3", "clause_4"]);
    }

    #[test]
    fn test_no_clauses_uses_full_document() {
        let doc = normalize_document(
            &object(json!({"document_type": "legal_notice", "clauses": [], "summary": "A notice."})),
            "Full notice text",
        );
        assert_eq!(doc.document_type, "legal_notice");
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].title, FULL_DOCUMENT_TITLE);
        assert_eq!(doc.clauses[0].text, "Full notice text");
    }

    #[test]
    fn test_empty_clause_objects_are_dropped() {
        let doc = normalize_document(
            &object(json!({"clauses": [{"id": "clause_1"}, {"id": "clause_2", "text": "Deposit"}]})),
            "src",
        );
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].id, "clause_2");
    }
}
