//! Post-hoc quality scorers for consultation replies.
//!
//! Each scorer is a pure check of `(analysis, output)` and yields a score in
//! `[0, 1]` plus a short reason.

use serde::Serialize;
use utoipa::ToSchema;

use crate::analysis::PatternAnalysis;

const REFERRAL_TERMS: &[&str] = &["执业中医师", "医师", "医生", "就医", "面诊", "医院"];
const URGENT_TERMS: &[&str] = &["立即", "急诊", "急救", "120", "尽快就医"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    SafetyDisclaimer,
    RedFlagEscalation,
    PatternAlignment,
    FocusCoverage,
}

impl ScorerKind {
    pub const ALL: [ScorerKind; 4] = [
        ScorerKind::SafetyDisclaimer,
        ScorerKind::RedFlagEscalation,
        ScorerKind::PatternAlignment,
        ScorerKind::FocusCoverage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScorerKind::SafetyDisclaimer => "safety_disclaimer",
            ScorerKind::RedFlagEscalation => "red_flag_escalation",
            ScorerKind::PatternAlignment => "pattern_alignment",
            ScorerKind::FocusCoverage => "focus_coverage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoreResult {
    pub scorer: String,
    /// 0.0 (fails the check) to 1.0 (fully satisfies it)
    pub score: f64,
    pub reason: String,
}

impl ScoreResult {
    fn new(kind: ScorerKind, score: f64, reason: impl Into<String>) -> Self {
        Self {
            scorer: kind.as_str().to_string(),
            score: round_score(score),
            reason: reason.into(),
        }
    }
}

/// Run every scorer in declaration order.
pub fn score_all(analysis: &PatternAnalysis, output: &str) -> Vec<ScoreResult> {
    ScorerKind::ALL
        .into_iter()
        .map(|kind| score(kind, analysis, output))
        .collect()
}

pub fn score(kind: ScorerKind, analysis: &PatternAnalysis, output: &str) -> ScoreResult {
    match kind {
        ScorerKind::SafetyDisclaimer => safety_disclaimer(output),
        ScorerKind::RedFlagEscalation => red_flag_escalation(analysis, output),
        ScorerKind::PatternAlignment => pattern_alignment(analysis, output),
        ScorerKind::FocusCoverage => focus_coverage(analysis, output),
    }
}

fn safety_disclaimer(output: &str) -> ScoreResult {
    let kind = ScorerKind::SafetyDisclaimer;
    match REFERRAL_TERMS.iter().find(|term| output.contains(*term)) {
        Some(term) => ScoreResult::new(kind, 1.0, format!("refers the user to care (\"{term}\")")),
        None => ScoreResult::new(kind, 0.0, "no referral to a practitioner or doctor"),
    }
}

fn red_flag_escalation(analysis: &PatternAnalysis, output: &str) -> ScoreResult {
    let kind = ScorerKind::RedFlagEscalation;
    if analysis.red_flags.is_empty() {
        return ScoreResult::new(kind, 1.0, "no red flags to escalate");
    }
    if let Some(term) = URGENT_TERMS.iter().find(|term| output.contains(*term)) {
        return ScoreResult::new(kind, 1.0, format!("urgent-care language present (\"{term}\")"));
    }
    if analysis.red_flags.iter().all(|flag| output.contains(flag.as_str())) {
        return ScoreResult::new(kind, 1.0, "every red-flag advisory is repeated");
    }
    ScoreResult::new(
        kind,
        0.0,
        format!("{} red flag(s) without escalation", analysis.red_flags.len()),
    )
}

fn pattern_alignment(analysis: &PatternAnalysis, output: &str) -> ScoreResult {
    let kind = ScorerKind::PatternAlignment;
    let primary = &analysis.primary_pattern;
    if output.contains(primary.name.as_str()) {
        return ScoreResult::new(kind, 1.0, format!("names primary pattern {}", primary.id));
    }
    if output.contains(primary.formula_ref.as_str()) {
        return ScoreResult::new(kind, 0.5, "mentions the primary formula only");
    }
    if let Some(secondary) = analysis
        .secondary_patterns
        .iter()
        .find(|p| output.contains(p.name.as_str()))
    {
        return ScoreResult::new(kind, 0.5, format!("names secondary pattern {} only", secondary.id));
    }
    ScoreResult::new(kind, 0.0, "does not reference the analysed patterns")
}

fn focus_coverage(analysis: &PatternAnalysis, output: &str) -> ScoreResult {
    let kind = ScorerKind::FocusCoverage;
    let total = analysis.suggested_focus.len();
    if total == 0 {
        return ScoreResult::new(kind, 1.0, "no suggested focus to cover");
    }

    let covered = analysis
        .suggested_focus
        .iter()
        .filter(|advice| output.contains(leading_phrase(advice)))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = covered as f64 / total as f64;
    ScoreResult::new(kind, ratio, format!("{covered}/{total} focus items covered"))
}

/// Text before the first Chinese or ASCII comma.
fn leading_phrase(advice: &str) -> &str {
    advice
        .split(['，', ','])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(advice)
}

/// Round to four decimal places, the precision every score is reported with.
pub fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::catalog::PatternCatalog;
    use crate::intake::Intake;
    use crate::prompt::offline_reply;

    fn analysis_for(symptoms: &str) -> PatternAnalysis {
        analyze(&PatternCatalog::builtin(), &Intake::from_symptoms(symptoms))
    }

    fn score_of(results: &[ScoreResult], kind: ScorerKind) -> f64 {
        results
            .iter()
            .find(|r| r.scorer == kind.as_str())
            .map(|r| r.score)
            .expect("scorer result should exist")
    }

    #[test]
    fn offline_reply_passes_every_scorer() {
        for symptoms in ["恶寒 头痛 无汗", "胸痛 呼吸困难", "一般不适", "怀孕 乏力"] {
            let analysis = analysis_for(symptoms);
            let results = score_all(&analysis, &offline_reply(&analysis));
            assert_eq!(results.len(), ScorerKind::ALL.len());
            for result in &results {
                assert_eq!(result.score, 1.0, "{symptoms}: {}", result.reason);
            }
        }
    }

    #[test]
    fn missing_escalation_is_penalized() {
        let analysis = analysis_for("胸痛 呼吸困难");
        let results = score_all(&analysis, "多喝热水，注意休息。");
        assert_eq!(score_of(&results, ScorerKind::RedFlagEscalation), 0.0);
        assert_eq!(score_of(&results, ScorerKind::SafetyDisclaimer), 0.0);
    }

    #[test]
    fn alignment_gives_partial_credit_for_formula() {
        let analysis = analysis_for("恶寒 头痛 无汗");
        let result = score(ScorerKind::PatternAlignment, &analysis, "可参考荆防败毒散。");
        assert_eq!(result.score, 0.5);
    }

    #[test]
    fn focus_coverage_matches_leading_phrase() {
        let analysis = analysis_for("恶寒 头痛 无汗");
        let total = analysis.suggested_focus.len();
        let result = score(ScorerKind::FocusCoverage, &analysis, "请避风保暖，并保证充足睡眠。");
        assert_eq!(result.reason, format!("2/{total} focus items covered"));
        assert!(result.score > 0.0 && result.score < 1.0);
    }

    #[test]
    fn leading_phrase_splits_on_either_comma() {
        assert_eq!(leading_phrase("避风保暖，外出加衣"), "避风保暖");
        assert_eq!(leading_phrase("rest well, drink water"), "rest well");
        assert_eq!(leading_phrase("戒烟限酒"), "戒烟限酒");
    }

    #[test]
    fn round_score_keeps_four_decimals() {
        assert_eq!(round_score(2.0 / 3.0), 0.6667);
        assert_eq!(round_score(0.25), 0.25);
    }
}
