//! Prompts for the Nyaya agents.
//!
//! Every prompt states the same framing: the assistant explains documents
//! for Indian users, is not a lawyer, and gives no legal advice. Structured
//! agents ask for strict JSON in a fixed shape; the parsers in
//! `nyaya-core` tolerate the usual deviations from it.
//!
//! Prompt size is bounded where a document can be long: next-steps and QA
//! context use clause prefixes and capped entry lists.

use nyaya_core::text::truncate_chars;
use nyaya_core::{ClauseLaws, ClauseRisk, DocumentInfo, Language, DISCLAIMER};

/// Clause prefix length in the next-steps prompt.
pub const NEXT_STEPS_CLAUSE_CHARS: usize = 400;

/// Law-mapping and risk entries listed in the next-steps prompt.
pub const NEXT_STEPS_MAX_ENTRIES: usize = 10;

/// Clauses included in QA context.
pub const QA_MAX_CLAUSES: usize = 10;

/// Clause prefix length in QA context.
pub const QA_CLAUSE_CHARS: usize = 300;

/// System instruction for document structuring.
pub const DOCUMENT_SYSTEM_PROMPT: &str = "You are a legal document understanding assistant for Indian users. \
You are NOT a lawyer and must not give legal advice. \
You only analyze and summarize documents.";

const DOCUMENT_SHAPE_TEMPLATE: &str = r#"{
  "document_type": "",
  "parties": [
    {
      "name": "",
      "role": ""
    }
  ],
  "dates": {
    "start_date": "",
    "end_date": "",
    "signature_date": ""
  },
  "clauses": [
    {
      "id": "clause_1",
      "title": "",
      "text": "",
      "obligations": [],
      "penalties": []
    }
  ],
  "summary": ""
}"#;

const DOCUMENT_GUIDELINES: &str = r#"Guidelines:
- Infer the document_type in simple English, e.g. "rental_agreement", "employment_offer", "legal_notice", "consumer_complaint".
- Include only clearly identifiable parties with simple roles like "landlord", "tenant", "employer", "employee", "service_provider", "customer".
- Dates can be in ISO format (YYYY-MM-DD) or as they appear if ambiguous.
- Split the document into reasonably sized clauses; each clause has a short title and its original text, copied verbatim.
- Give every clause a unique id: "clause_1", "clause_2", and so on.
- Obligations: simple sentences like "Tenant must pay rent on time".
- Penalties: simple sentences like "If the tenant is late, a penalty of X is charged".
- If a field is unknown, keep it as an empty string "" or an empty list [] rather than leaving it out."#;

/// Structuring request for a whole document.
pub fn document_prompt(text: &str) -> String {
    format!(
        "Read the following legal or semi-legal document text (for an Indian context) and extract structured information.\n\n\
         Return STRICT JSON with this exact structure and keys only (no comments, no extra text):\n\
         {}\n\n{}\n\nDocument text:\n\"\"\"\n{}\n\"\"\"\n",
        DOCUMENT_SHAPE_TEMPLATE, DOCUMENT_GUIDELINES, text
    )
}

const LEGAL_TEMPLATE: &str = r#"{
  "laws": [
    {
      "clause_id": "clause_1",
      "related_laws": [
        {
          "act": "Indian Contract Act, 1872",
          "section": "Section 73",
          "summary": "Very short, plain-language explanation of how this section is relevant."
        }
      ]
    }
  ]
}"#;

const LEGAL_GUIDELINES: &str = r#"Guidelines:
- Use the clause ids exactly as given below.
- Only mention a FEW major acts at a basic level, for example:
  - "Indian Contract Act, 1872"
  - "Consumer Protection Act, 2019"
  - "Rent control law of the relevant state" (if clearly about tenancy)
  - "Labour laws" in very general terms for employment agreements
- At most 5 related laws per clause. It is okay to leave related_laws as an empty list [] if nothing is obvious.
- Do not draw legal conclusions. This is only an informational mapping."#;

/// Law mapping request covering every clause in one call.
pub fn legal_prompt(doc: &DocumentInfo) -> String {
    let clauses = doc
        .clauses
        .iter()
        .map(|c| format!("Clause {} - {}:\n{}", c.id, c.title, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a legal assistant focused on INDIAN law. You are NOT a lawyer and must not give legal advice.\n\n\
         Given these clauses from a document, do a simple, high-level mapping to Indian laws.\n\n\
         Return STRICT JSON with this structure:\n{}\n\n{}\n\nClauses:\n\"\"\"\n{}\n\"\"\"\n",
        LEGAL_TEMPLATE, LEGAL_GUIDELINES, clauses
    )
}

const RISK_TEMPLATE: &str = r#"{
  "risk_level": "Low",
  "reason": "Short explanation of why this risk level was chosen",
  "flags": ["one-sided obligation", "excessive penalty"]
}"#;

/// Risk classification request for one clause.
pub fn risk_prompt(clause_text: &str) -> String {
    format!(
        "You are a risk analysis assistant for legal-style documents for Indian users.\n\
         You are NOT a lawyer and must not give legal advice.\n\n\
         For the clause below, identify potential risks and red flags.\n\n\
         Return STRICT JSON with this structure and nothing else:\n{}\n\n\
         Allowed risk_level values: \"Low\", \"Medium\", \"High\".\n\n\
         Examples of flags:\n\
         - \"unfair term\"\n\
         - \"one-sided obligation\"\n\
         - \"excessive penalty\"\n\
         - \"missing consumer protection\"\n\
         - \"vague or unclear language\"\n\
         - \"broad indemnity\"\n\n\
         Do NOT tell the user what they should do. Only describe risks in neutral language.\n\n\
         Clause text:\n\"\"\"\n{}\n\"\"\"\n",
        RISK_TEMPLATE, clause_text
    )
}

const SIMPLIFY_TEMPLATE: &str = r#"{
  "simple_explanation_en": "plain, everyday English explanation",
  "simple_explanation_hi": "1-2 sentence explanation in simple Hindi (Roman script is okay)",
  "why_it_matters": "1-2 sentences explaining why this clause is important"
}"#;

/// Plain-language explanation request for one clause.
pub fn simplify_prompt(clause_text: &str) -> String {
    format!(
        "You are a legal language simplification assistant for Indian users.\n\
         You are NOT a lawyer and must not give legal advice.\n\n\
         For the clause below, produce a simple explanation.\n\n\
         Return STRICT JSON with this structure and nothing else:\n{}\n\n\
         Clause text:\n\"\"\"\n{}\n\"\"\"\n",
        SIMPLIFY_TEMPLATE, clause_text
    )
}

/// Next-steps request from the document and optional downstream results.
pub fn next_steps_prompt(doc: &DocumentInfo, laws: &[ClauseLaws], risks: &[ClauseRisk]) -> String {
    let mut prompt = format!(
        "You are a legal information assistant for Indian users.\n\
         You are NOT a lawyer and MUST NOT give legal advice.\n\
         You can only provide general, high-level information and possible next steps.\n\n\
         Based on:\n\
         - The type of document: {}\n\
         - The clauses (summarised below)\n\
         - Any high-level law mappings and risk flags\n\n\
         Suggest basic rights and possible next steps a typical user might consider.\n\n\
         Return STRICT JSON with this structure:\n\
         {{\n  \"next_steps\": [\n    \"Short, neutral, informational suggestion 1\",\n    \"Short, neutral, informational suggestion 2\"\n  ],\n  \"disclaimer\": \"{}\"\n}}\n\n\
         Guidelines:\n\
         - Do NOT say things like \"You should sign\" or \"You must do X\".\n\
         - Use language like \"You may want to\", \"You could consider\", \"In many cases people...\".\n\
         - Keep it very general and informational.\n\
         - Always keep the disclaimer EXACTLY as provided above.\n\n\
         Clauses (summary):\n\"\"\"\n",
        doc.document_type, DISCLAIMER
    );

    for clause in &doc.clauses {
        prompt.push_str(&format!(
            "Clause {} - {}:\n{}\n\n",
            clause.id,
            clause.title,
            truncate_chars(&clause.text, NEXT_STEPS_CLAUSE_CHARS)
        ));
    }
    prompt.push_str("\"\"\"\n");

    if !laws.is_empty() {
        prompt.push_str("\nHigh-level law mappings:\n");
        for entry in laws.iter().take(NEXT_STEPS_MAX_ENTRIES) {
            let acts = entry
                .related_laws
                .iter()
                .map(|law| {
                    if law.section.is_empty() {
                        law.act.clone()
                    } else {
                        format!("{} {}", law.act, law.section)
                    }
                })
                .collect::<Vec<_>>();
            let acts = if acts.is_empty() {
                "none identified".to_string()
            } else {
                acts.join("; ")
            };
            prompt.push_str(&format!("- Clause {}: {}\n", entry.clause_id, acts));
        }
    }

    if !risks.is_empty() {
        prompt.push_str("\nRisk flags:\n");
        for risk in risks.iter().take(NEXT_STEPS_MAX_ENTRIES) {
            prompt.push_str(&format!(
                "- Clause {}: {} risk - {}\n",
                risk.clause_id, risk.risk_level, risk.reason
            ));
        }
    }

    prompt
}

/// System instruction pinning the answer language.
pub fn qa_system_prompt(language: Language) -> String {
    let name = language.name();
    format!(
        "You are a helpful legal document assistant for Indian users.\n\
         You are NOT a lawyer and must NOT provide legal advice.\n\n\
         Your role:\n\
         - Answer questions about the uploaded legal document based on the context provided\n\
         - Use simple, clear language in {name}\n\
         - If the question cannot be answered from the document, say so clearly\n\
         - Mention that this is informational only, not legal advice\n\
         - Respond entirely in {name}\n\n\
         Guidelines:\n\
         - Be concise and helpful\n\
         - Do not make legal recommendations\n\
         - Focus on explaining what is in the document\n"
    )
}

/// Bounded description of a document for question answering.
pub fn qa_context(doc: &DocumentInfo) -> String {
    let document_type = if doc.document_type.is_empty() {
        "legal document"
    } else {
        doc.document_type.as_str()
    };
    let mut parts = vec![format!("Document Type: {}", document_type)];

    if !doc.summary.is_empty() {
        parts.push(format!("Summary: {}", doc.summary));
    }

    if !doc.parties.is_empty() {
        let parties = doc
            .parties
            .iter()
            .map(|p| format!("{} ({})", p.name, p.role))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Parties: {}", parties));
    }

    if !doc.clauses.is_empty() {
        parts.push("\nClauses:".to_string());
        for clause in doc.clauses.iter().take(QA_MAX_CLAUSES) {
            parts.push(format!(
                "- {}: {}",
                clause.title,
                truncate_chars(&clause.text, QA_CLAUSE_CHARS)
            ));
        }
    }

    parts.join("\n")
}

/// User prompt for one question.
pub fn qa_prompt(question: &str, doc: &DocumentInfo, language: Language) -> String {
    format!(
        "Based on the following legal document information, answer the user's question.\n\n\
         Document Information:\n{}\n\n\
         User Question: {}\n\n\
         Please provide a helpful answer in {} based on the document information above.\n\
         Remember: This is informational only, not legal advice.",
        qa_context(doc),
        question,
        language.name()
    )
}

/// Translation request.
pub fn translate_prompt(text: &str, target: Language, source: Option<Language>) -> String {
    let source_line = match source {
        Some(source) => format!("The text is written in {}.", source.name()),
        None => "Detect the language of the text automatically.".to_string(),
    };
    format!(
        "Translate the following text to {}. {} Keep the meaning and tone exactly the same. \
         Only return the translated text, no explanations.\n\n\
         Text to translate:\n{}\n\nTranslated text:",
        target.name(),
        source_line,
        text
    )
}
