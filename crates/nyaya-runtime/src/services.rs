//! Boundary collaborators: PDF text extraction, speech, report rendering.
//!
//! These are consumed contracts. Each is a trait with a thin
//! implementation, so the HTTP surface and CLI can swap them out in tests.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use nyaya_core::{AnalysisReport, Language};

use crate::config::ServicesConfig;

/// Errors from a boundary collaborator.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} failed: {message}")]
    Failed {
        service: &'static str,
        message: String,
    },

    #[error(transparent)]
    UnsupportedLanguage(#[from] nyaya_core::UnsupportedLanguage),
}

/// Turns a PDF byte stream into text.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    /// Per-page text in page order; pages without text contribute an empty
    /// string.
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, ServiceError>;
}

/// Runs the poppler `pdftotext` program over stdin.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: String,
}

impl PdftotextExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

const PDFTOTEXT: &str = "PDF text extraction";

#[async_trait]
impl PdfTextExtractor for PdftotextExtractor {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, ServiceError> {
        let mut child = Command::new(&self.program)
            .args(["-layout", "-enc", "UTF-8", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServiceError::Unavailable {
                service: PDFTOTEXT,
                message: format!("cannot run '{}': {}", self.program, e),
            })?;

        // Feed stdin from a separate task; a large PDF would otherwise
        // deadlock against a full stdout pipe.
        let mut stdin = child.stdin.take().ok_or_else(|| ServiceError::Failed {
            service: PDFTOTEXT,
            message: "stdin not captured".to_string(),
        })?;
        let input = pdf.to_vec();
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        });

        let output = child.wait_with_output().await.map_err(|e| ServiceError::Failed {
            service: PDFTOTEXT,
            message: e.to_string(),
        })?;

        if let Ok(Err(e)) = writer.await {
            tracing::debug!(error = %e, "pdftotext closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::Failed {
                service: PDFTOTEXT,
                message: format!("exit status {}: {}", output.status, stderr.trim()),
            });
        }

        let text = join_pages(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(bytes = pdf.len(), chars = text.chars().count(), "Extracted PDF text");
        Ok(text)
    }
}

/// Join form-feed separated pages with one newline between pages, dropping
/// the empty tail `pdftotext` writes after the last page.
///
/// Pages are not glued end to end, so the last word of one page never runs
/// into the first word of the next.
pub fn join_pages(raw: &str) -> String {
    let mut pages: Vec<&str> = raw.split('\x0c').collect();
    if pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
        .iter()
        .map(|p| p.trim_end_matches('\n'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Synthesized speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Turns text into speech in one of the supported languages.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Audio, ServiceError>;
}

/// Posts `{text, language}` to a speech endpoint and returns its body.
#[cfg(feature = "http-services")]
#[derive(Debug, Clone)]
pub struct HttpSpeechSynthesizer {
    url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http-services")]
impl HttpSpeechSynthesizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http-services")]
const SPEECH: &str = "Speech synthesis";

#[cfg(feature = "http-services")]
#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Audio, ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": text, "language": language.code() }))
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable {
                service: SPEECH,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Failed {
                service: SPEECH,
                message: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response.bytes().await.map_err(|e| ServiceError::Failed {
            service: SPEECH,
            message: e.to_string(),
        })?;

        Ok(Audio {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// A rendered report ready to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Renders an aggregated analysis as a downloadable document.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &AnalysisReport) -> Result<RenderedDocument, ServiceError>;
}

const REPORT: &str = "Report rendering";

fn render_failed(error: impl std::fmt::Display) -> ServiceError {
    ServiceError::Failed {
        service: REPORT,
        message: error.to_string(),
    }
}

/// Renders a report as a plain UTF-8 text document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReportRenderer;

impl ReportRenderer for PlainTextReportRenderer {
    fn render(&self, report: &AnalysisReport) -> Result<RenderedDocument, ServiceError> {
        let text = render_text(report, true).map_err(render_failed)?;
        Ok(RenderedDocument {
            bytes: text.into_bytes(),
            content_type: "text/plain; charset=utf-8".to_string(),
            file_name: "nyaya-report.txt".to_string(),
        })
    }
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const FONT_SIZE_PT: f32 = 10.0;

/// Characters per line at `FONT_SIZE_PT` inside the margins.
const WRAP_COLUMNS: usize = 90;

/// Renders a report as an A4 PDF in the built-in Helvetica font.
///
/// Built-in PDF fonts cover Latin-1 only. The Hindi explanation is left out
/// and any other character outside that range prints as `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportRenderer;

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &AnalysisReport) -> Result<RenderedDocument, ServiceError> {
        let text = render_text(report, false).map_err(render_failed)?;
        Ok(RenderedDocument {
            bytes: layout_pdf(&text)?,
            content_type: "application/pdf".to_string(),
            file_name: "nyaya-report.pdf".to_string(),
        })
    }
}

fn layout_pdf(text: &str) -> Result<Vec<u8>, ServiceError> {
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    let (doc, page, layer) = PdfDocument::new(
        "Nyaya document analysis",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "text",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_failed)?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    for line in text.lines().flat_map(|line| wrap(&latin1(line), WRAP_COLUMNS)) {
        if y < MARGIN_MM {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "text");
            current = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        if !line.is_empty() {
            current.use_text(line, FONT_SIZE_PT, Mm(MARGIN_MM), Mm(y), &font);
        }
        y -= LINE_HEIGHT_MM;
    }

    doc.save_to_bytes().map_err(render_failed)
}

/// Map text onto what a built-in PDF font can draw.
fn latin1(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '₹' => out.push_str("Rs."),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            c if c <= '\u{ff}' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap. A blank line stays one blank line.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    lines.push(current);
    lines
}

fn render_text(report: &AnalysisReport, hindi: bool) -> Result<String, std::fmt::Error> {
    let doc = &report.document_info;
    let mut out = String::new();

    writeln!(out, "NYAYA DOCUMENT ANALYSIS")?;
    writeln!(out, "Generated {}", report.analyzed_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out, "{}", report.disclaimer)?;
    writeln!(out)?;

    writeln!(out, "Document type: {}", or_dash(&doc.document_type))?;
    for party in &doc.parties {
        writeln!(out, "Party: {} ({})", or_dash(&party.name), or_dash(&party.role))?;
    }
    for (label, date) in [
        ("Start date", &doc.dates.start_date),
        ("End date", &doc.dates.end_date),
        ("Signed", &doc.dates.signature_date),
    ] {
        if !date.is_empty() {
            writeln!(out, "{}: {}", label, date)?;
        }
    }
    if !doc.summary.is_empty() {
        writeln!(out, "\nSummary\n{}", doc.summary)?;
    }

    writeln!(out, "\nCLAUSES")?;
    for clause in &doc.clauses {
        writeln!(out, "\n[{}] {}", clause.id, or_dash(&clause.title))?;

        if let Some(risk) = report.risks.risks.iter().find(|r| r.clause_id == clause.id) {
            write!(out, "Risk: {}", risk.risk_level)?;
            if !risk.reason.is_empty() {
                write!(out, " - {}", risk.reason)?;
            }
            writeln!(out)?;
            if !risk.flags.is_empty() {
                writeln!(out, "Flags: {}", risk.flags.join(", "))?;
            }
        }

        if let Some(simple) = report
            .simplified
            .simplified_clauses
            .iter()
            .find(|s| s.clause_id == clause.id)
        {
            if !simple.simple_explanation_en.is_empty() {
                writeln!(out, "In plain words: {}", simple.simple_explanation_en)?;
            }
            if hindi && !simple.simple_explanation_hi.is_empty() {
                writeln!(out, "सरल भाषा में: {}", simple.simple_explanation_hi)?;
            }
            if !simple.why_it_matters.is_empty() {
                writeln!(out, "Why it matters: {}", simple.why_it_matters)?;
            }
        }

        if let Some(entry) = report
            .legal_mapping
            .laws
            .iter()
            .find(|l| l.clause_id == clause.id)
        {
            for law in &entry.related_laws {
                write!(out, "Law: {}", law.act)?;
                if !law.section.is_empty() {
                    write!(out, ", {}", law.section)?;
                }
                if !law.summary.is_empty() {
                    write!(out, " - {}", law.summary)?;
                }
                writeln!(out)?;
            }
        }
    }

    writeln!(out, "\nNEXT STEPS")?;
    for (n, step) in report.next_steps.next_steps.iter().enumerate() {
        writeln!(out, "{}. {}", n + 1, step)?;
    }
    if !report.next_steps.disclaimer.is_empty() {
        writeln!(out, "\n{}", report.next_steps.disclaimer)?;
    }

    Ok(out)
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// The collaborators available to this process.
pub struct Services {
    pub pdf: Box<dyn PdfTextExtractor>,

    /// `None` when no speech endpoint is configured
    pub speech: Option<Box<dyn SpeechSynthesizer>>,

    pub renderer: Box<dyn ReportRenderer>,
}

impl Services {
    pub fn from_config(config: &ServicesConfig) -> Self {
        Self {
            pdf: Box::new(PdftotextExtractor::new(config.pdftotext.clone())),
            speech: speech_from_config(config),
            renderer: Box::new(PdfReportRenderer),
        }
    }
}

#[cfg(feature = "http-services")]
fn speech_from_config(config: &ServicesConfig) -> Option<Box<dyn SpeechSynthesizer>> {
    config
        .tts_url
        .as_ref()
        .map(|url| Box::new(HttpSpeechSynthesizer::new(url.clone())) as Box<dyn SpeechSynthesizer>)
}

#[cfg(not(feature = "http-services"))]
fn speech_from_config(config: &ServicesConfig) -> Option<Box<dyn SpeechSynthesizer>> {
    if config.tts_url.is_some() {
        tracing::warn!("tts_url is set but this build has no http-services feature");
    }
    None
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("speech", &self.speech.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nyaya_core::{
        Clause, ClauseLaws, ClauseRisk, DocumentInfo, LawMapping, NextSteps, RelatedLaw,
        RiskAssessment, RiskLevel, Simplification, SimplifiedClause, REPORT_DISCLAIMER,
    };

    #[test]
    fn test_join_pages() {
        assert_eq!(join_pages("page one\n\x0cpage two\n\x0c"), "page one\npage two");
        assert_eq!(join_pages(""), "");
    }

    #[test]
    fn test_join_pages_keeps_empty_pages_empty() {
        assert_eq!(join_pages("first\n\x0c\x0cthird\n\x0c"), "first\n\nthird");
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let extractor = PdftotextExtractor::new("nyaya-no-such-pdftotext-binary");
        let err = extractor.extract_text(b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { .. }));
    }

    fn report() -> AnalysisReport {
        let mut clause = Clause::new("clause_1", "Rent", "Tenant pays ₹10,000 by the 5th.");
        clause.penalties = vec!["2% per day late".to_string()];
        AnalysisReport {
            document_info: DocumentInfo {
                document_type: "rental_agreement".to_string(),
                clauses: vec![clause],
                summary: "A rental agreement.".to_string(),
                ..Default::default()
            },
            legal_mapping: LawMapping {
                laws: vec![ClauseLaws {
                    clause_id: "clause_1".to_string(),
                    related_laws: vec![RelatedLaw {
                        act: "Indian Contract Act, 1872".to_string(),
                        section: "Section 74".to_string(),
                        summary: "Penalties must be reasonable".to_string(),
                    }],
                }],
            },
            simplified: Simplification {
                simplified_clauses: vec![SimplifiedClause {
                    clause_id: "clause_1".to_string(),
                    simple_explanation_en: "Pay rent by the 5th.".to_string(),
                    ..Default::default()
                }],
            },
            risks: RiskAssessment {
                risks: vec![ClauseRisk {
                    clause_id: "clause_1".to_string(),
                    risk_level: RiskLevel::High,
                    reason: "Daily penalty".to_string(),
                    flags: vec!["excessive penalty".to_string()],
                }],
            },
            next_steps: NextSteps {
                next_steps: vec!["Negotiate the late fee".to_string()],
                disclaimer: nyaya_core::DISCLAIMER.to_string(),
            },
            disclaimer: REPORT_DISCLAIMER.to_string(),
            analyzed_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_plain_text_report() {
        let rendered = PlainTextReportRenderer.render(&report()).unwrap();
        assert_eq!(rendered.content_type, "text/plain; charset=utf-8");
        let text = String::from_utf8(rendered.bytes).unwrap();

        assert!(text.contains("Generated 2026-01-02 03:04 UTC"));
        assert!(text.contains(REPORT_DISCLAIMER));
        assert!(text.contains("[clause_1] Rent"));
        assert!(text.contains("Risk: High - Daily penalty"));
        assert!(text.contains("Law: Indian Contract Act, 1872, Section 74"));
        assert!(text.contains("1. Negotiate the late fee"));
    }

    #[test]
    fn test_pdf_report() {
        let rendered = PdfReportRenderer.render(&report()).unwrap();
        assert!(rendered.bytes.starts_with(b"%PDF"));
        assert_eq!(rendered.content_type, "application/pdf");
        assert_eq!(rendered.file_name, "nyaya-report.pdf");
    }

    #[test]
    fn test_pdf_report_spans_pages() {
        let mut long_report = report();
        long_report.document_info.clauses = (1..=120)
            .map(|n| Clause::new(format!("clause_{}", n), "Term", "Tenant shall comply."))
            .collect();
        let single = PdfReportRenderer.render(&report()).unwrap();
        let long = PdfReportRenderer.render(&long_report).unwrap();
        assert!(long.bytes.starts_with(b"%PDF"));
        assert!(long.bytes.len() > single.bytes.len());
    }

    #[test]
    fn test_latin1_mapping() {
        assert_eq!(latin1("Pay ₹10,000 – on time"), "Pay Rs.10,000 - on time");
        assert_eq!(latin1("café"), "café");
        assert_eq!(latin1("किराया"), "??????");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("", 10), vec![String::new()]);
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert_eq!(wrap("unbreakable-word", 4), vec!["unbreakable-word"]);
    }

    #[test]
    fn test_services_default_to_pdf_reports() {
        let services = Services::from_config(&ServicesConfig::default());
        let rendered = services.renderer.render(&report()).unwrap();
        assert_eq!(rendered.content_type, "application/pdf");
    }

    #[test]
    fn test_services_without_speech() {
        let services = Services::from_config(&ServicesConfig::default());
        assert!(services.speech.is_none());
    }
}
