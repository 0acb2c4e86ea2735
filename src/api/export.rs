// Export report building
// Flattens an AnalysisResult into the renderer's input contract

use super::ApiError;
use crate::models::{AnalysisResult, Dimension, ExportOverview, ExportReport, ExportSection};

/// Risk band for an overall score.
pub fn risk_band(score: f64) -> &'static str {
    if score >= 0.7 {
        "high"
    } else if score >= 0.6 {
        "medium"
    } else {
        "low"
    }
}

/// POST /export-pdf input. Every section keeps its full ranked evidence list.
pub fn export_report(result: &AnalysisResult) -> ExportReport {
    let sections = Dimension::ALL
        .iter()
        .filter_map(|d| result.dimension_results.get(d))
        .map(|dr| ExportSection {
            dimension: dr.dimension,
            name: dr.dimension.info().name,
            score: result.global_scores.get(&dr.dimension).copied().flatten(),
            weight: dr.weight,
            active: dr.active,
            failure: dr.failure.clone(),
            total_evidences: dr.total_evidences,
            evidences: dr.evidences.clone(),
        })
        .collect();

    ExportReport {
        overview: ExportOverview {
            overall_score: result.overall_score,
            overall_percent: format!("{:.1}%", result.overall_score * 100.0),
            risk_band: risk_band(result.overall_score).to_string(),
            global_scores: result.global_scores.clone(),
            active_dimensions: result.active_dimensions.clone(),
            metadata: result.analysis_metadata.clone(),
        },
        sections,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Same as [`export_report`] for a JSON body posted by a client.
pub fn export_report_json(body: &str) -> Result<ExportReport, ApiError> {
    let result: AnalysisResult = serde_json::from_str(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid analysis result: {}", e)))?;
    Ok(export_report(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OrigoService;
    use crate::models::AnalyzeRequest;

    const TEXT: &str = "It is important to note that the results are important. \
        It is important to note that the method is important. \
        It is important to note that the data is important. \
        It is important to note that the team is important. \
        It is important to note that the plan is important. \
        It is important to note that the goal is important.\n\n\
        A second paragraph keeps the coherence analyzer busy.";

    #[test]
    fn test_risk_band() {
        assert_eq!(risk_band(0.95), "high");
        assert_eq!(risk_band(0.7), "high");
        assert_eq!(risk_band(0.65), "medium");
        assert_eq!(risk_band(0.2), "low");
    }

    #[tokio::test]
    async fn test_export_keeps_full_evidence_lists() {
        let result = OrigoService::local().analyze(AnalyzeRequest::new(TEXT)).await.unwrap();
        let report = export_report(&result);

        assert_eq!(report.sections.len(), 7);
        let lexical = report
            .sections
            .iter()
            .find(|s| s.dimension == Dimension::LexicalRichness)
            .unwrap();
        assert_eq!(lexical.total_evidences, 7);
        assert_eq!(lexical.evidences.len(), 7);

        let ngram = report
            .sections
            .iter()
            .find(|s| s.dimension == Dimension::NgramRepetition)
            .unwrap();
        assert!(ngram.evidences.len() > 10);
        assert_eq!(ngram.evidences.len(), ngram.total_evidences);
        assert!(report.overview.overall_percent.ends_with('%'));
    }

    #[tokio::test]
    async fn test_export_from_json_body() {
        let result = OrigoService::local().analyze(AnalyzeRequest::new(TEXT)).await.unwrap();
        let body = serde_json::to_string(&result).unwrap();
        let report = export_report_json(&body).unwrap();
        assert_eq!(report.overview.overall_score, result.overall_score);

        let err = export_report_json("{\"overall_score\": 1}").unwrap_err();
        assert_eq!(err.status, 400);
    }
}
