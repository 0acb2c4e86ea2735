// Evidence ranking and construction helpers

use crate::models::{Evidence, EvidencePayload};
use crate::services::segmenter::{Document, Paragraph, Sentence, Span};
use crate::services::text_processor::preview;
use std::cmp::Ordering;

pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Max characters kept in an evidence excerpt for multi-paragraph spans.
const PAIR_PREVIEW_CHARS: usize = 240;

/// Full ranked list with a bounded leading view.
#[derive(Debug, Clone)]
pub struct RankedEvidence {
    all: Vec<Evidence>,
    limit: usize,
}

impl RankedEvidence {
    pub fn top(&self) -> &[Evidence] {
        &self.all[..self.limit.min(self.all.len())]
    }

    pub fn total(&self) -> usize {
        self.all.len()
    }

    pub fn all(&self) -> &[Evidence] {
        &self.all
    }

    pub fn into_all(self) -> Vec<Evidence> {
        self.all
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvidenceRanker {
    limit: usize,
}

impl Default for EvidenceRanker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_LIMIT)
    }
}

impl EvidenceRanker {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Severity descending, then earlier span first.
    pub fn rank(&self, mut evidences: Vec<Evidence>) -> RankedEvidence {
        evidences.sort_by(compare_evidence);
        RankedEvidence {
            all: evidences,
            limit: self.limit,
        }
    }
}

fn compare_evidence(a: &Evidence, b: &Evidence) -> Ordering {
    b.severity
        .total_cmp(&a.severity)
        .then(a.start_index.cmp(&b.start_index))
        .then(a.end_index.cmp(&b.end_index))
}

pub fn sentence_evidence(
    doc: &Document,
    sentence: &Sentence,
    severity: f64,
    reason: String,
) -> Evidence {
    let (start, end) = doc.char_span(sentence.span);
    Evidence::new(
        doc.slice(sentence.span),
        severity,
        start,
        end,
        reason,
        EvidencePayload::Sentence {
            paragraph_index: sentence.paragraph_index,
            sentence_index: sentence.index,
        },
    )
}

pub fn paragraph_evidence(
    doc: &Document,
    paragraph: &Paragraph,
    severity: f64,
    reason: String,
) -> Evidence {
    let (start, end) = doc.char_span(paragraph.span);
    Evidence::new(
        doc.slice(paragraph.span),
        severity,
        start,
        end,
        reason,
        EvidencePayload::Paragraph {
            paragraph_index: paragraph.index,
        },
    )
}

/// Covers both paragraphs; the excerpt is a preview of each joined by a marker.
pub fn paragraph_pair_evidence(
    doc: &Document,
    first: &Paragraph,
    second: &Paragraph,
    similarity: f64,
    severity: f64,
    reason: String,
) -> Evidence {
    let span = Span::new(first.span.start, second.span.end);
    let (start, end) = doc.char_span(span);
    let half = PAIR_PREVIEW_CHARS / 2;
    let text = format!(
        "{} || {}",
        preview(doc.slice(first.span), half),
        preview(doc.slice(second.span), half)
    );
    Evidence::new(
        text,
        severity,
        start,
        end,
        reason,
        EvidencePayload::ParagraphPair {
            first: first.index,
            second: second.index,
            similarity,
        },
    )
}
