use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{PatternCatalog, PatternDefinition};
use crate::intake::Intake;

/// Number of runner-up patterns reported next to the primary one.
pub const MAX_SECONDARY_PATTERNS: usize = 2;
/// Upper bound for `suggestedFocus`.
pub const MAX_SUGGESTED_FOCUS: usize = 5;

const SUMMARY_DELIMITER: &str = "；";

/// A catalog pattern together with its keyword score for one intake.
#[derive(Debug, Clone, Copy)]
pub struct ScoredMatch<'a> {
    pub pattern: &'a PatternDefinition,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub id: String,
    pub name: String,
    pub description: String,
    pub formula_ref: String,
    pub key_terms: Vec<String>,
    pub support_terms: Vec<String>,
    pub acupoints: Vec<String>,
    /// Number of catalog keywords found in the intake narrative
    pub score: u32,
}

impl From<ScoredMatch<'_>> for PatternMatch {
    fn from(scored: ScoredMatch<'_>) -> Self {
        let p = scored.pattern;
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            formula_ref: p.formula_ref.clone(),
            key_terms: p.key_terms.clone(),
            support_terms: p.support_terms.clone(),
            acupoints: p.acupoints.clone(),
            score: scored.score,
        }
    }
}

/// Output of the pattern-analysis tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    pub primary_pattern: PatternMatch,
    pub secondary_patterns: Vec<PatternMatch>,
    pub red_flags: Vec<String>,
    pub intake_summary: String,
    pub suggested_focus: Vec<String>,
}

/// Lower-cased narrative of all present fields, single-space joined.
pub fn narrative(intake: &Intake) -> String {
    intake
        .present_fields()
        .map(|(_, value)| value)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score every catalog pattern against the narrative, best first.
///
/// The sort is stable, so equal scores keep catalog declaration order.
pub fn rank_patterns<'a>(catalog: &'a PatternCatalog, narrative: &str) -> Vec<ScoredMatch<'a>> {
    let mut ranked: Vec<ScoredMatch<'a>> = catalog
        .patterns()
        .iter()
        .map(|pattern| ScoredMatch {
            pattern,
            score: count_hits(&pattern.keywords, narrative),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Advisory messages of every red-flag rule hit by the narrative, one per rule.
pub fn detect_red_flags(catalog: &PatternCatalog, narrative: &str) -> Vec<String> {
    catalog
        .red_flags()
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| narrative.contains(k.as_str())))
        .map(|rule| rule.message.clone())
        .collect()
}

/// Human-readable summary of the present fields, e.g. `主要症状：头痛；脉象：浮紧`.
pub fn intake_summary(intake: &Intake) -> String {
    intake
        .present_fields()
        .map(|(field, value)| format!("{}：{}", field.label(), value))
        .collect::<Vec<_>>()
        .join(SUMMARY_DELIMITER)
}

/// Run the keyword scorer over one intake.
pub fn analyze(catalog: &PatternCatalog, intake: &Intake) -> PatternAnalysis {
    let narrative = narrative(intake);
    let ranked = rank_patterns(catalog, &narrative);

    let mut hits = ranked.into_iter().filter(|m| m.score > 0);
    let primary = hits.next().unwrap_or(ScoredMatch {
        pattern: catalog.fallback(),
        score: 0,
    });
    let secondary: Vec<ScoredMatch<'_>> = hits.take(MAX_SECONDARY_PATTERNS).collect();

    let suggested_focus = suggested_focus(
        std::iter::once(primary.pattern).chain(secondary.iter().map(|m| m.pattern)),
    );

    let red_flags = detect_red_flags(catalog, &narrative);
    if !red_flags.is_empty() {
        tracing::warn!(count = red_flags.len(), "intake triggered red-flag rules");
    }
    tracing::debug!(
        primary = %primary.pattern.id,
        score = primary.score,
        secondary = secondary.len(),
        "pattern analysis complete"
    );

    PatternAnalysis {
        primary_pattern: primary.into(),
        secondary_patterns: secondary.into_iter().map(PatternMatch::from).collect(),
        red_flags,
        intake_summary: intake_summary(intake),
        suggested_focus,
    }
}

fn count_hits(keywords: &[String], narrative: &str) -> u32 {
    let hits = keywords
        .iter()
        .filter(|k| narrative.contains(k.to_lowercase().as_str()))
        .count();
    u32::try_from(hits).unwrap_or(u32::MAX)
}

fn suggested_focus<'a>(patterns: impl Iterator<Item = &'a PatternDefinition>) -> Vec<String> {
    let mut seen = HashSet::new();
    patterns
        .flat_map(|p| p.lifestyle.iter())
        .filter(|advice| seen.insert(*advice))
        .take(MAX_SUGGESTED_FOCUS)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FALLBACK_PATTERN_ID, RedFlagRule};

    fn catalog() -> PatternCatalog {
        PatternCatalog::builtin()
    }

    #[test]
    fn wind_cold_symptoms_select_wind_cold() {
        let result = analyze(&catalog(), &Intake::from_symptoms("恶寒 头痛 无汗"));
        assert_eq!(result.primary_pattern.id, "windCold");
        assert!(result.primary_pattern.score >= 3);
        assert!(result.red_flags.is_empty());
    }

    #[test]
    fn chest_pain_raises_red_flag() {
        let result = analyze(&catalog(), &Intake::from_symptoms("胸痛 呼吸困难"));
        assert!(!result.red_flags.is_empty());
    }

    #[test]
    fn no_hits_fall_back_to_general_regulation() {
        let result = analyze(&catalog(), &Intake::from_symptoms("一般不适"));
        assert_eq!(result.primary_pattern.id, FALLBACK_PATTERN_ID);
        assert_eq!(result.primary_pattern.score, 0);
        assert!(result.red_flags.is_empty());
        assert!(result.secondary_patterns.is_empty());
        assert!(!result.suggested_focus.is_empty());
    }

    #[test]
    fn secondary_patterns_are_next_two_with_hits() {
        let mut intake = Intake::from_symptoms("恶寒 头痛 无汗 乏力 气短 盗汗 口苦");
        intake.pulse = Some("脉弦".to_string());
        let result = analyze(&catalog(), &intake);

        assert_eq!(result.primary_pattern.id, "windCold");
        let ids: Vec<&str> = result.secondary_patterns.iter().map(|p| p.id.as_str()).collect();
        // qiDeficiency scores 2; the single-hit patterns tie and keep catalog order.
        assert_eq!(ids, vec!["qiDeficiency", "yinDeficiency"]);
        assert!(result.secondary_patterns.iter().all(|p| p.score > 0));
    }

    #[test]
    fn ties_keep_catalog_declaration_order() {
        let result = analyze(&catalog(), &Intake::from_symptoms("畏寒 盗汗"));
        assert_eq!(result.primary_pattern.id, "yangDeficiency");
        assert_eq!(result.secondary_patterns[0].id, "yinDeficiency");
    }

    #[test]
    fn every_optional_field_contributes_to_the_narrative() {
        let mut intake = Intake::from_symptoms("一般不适");
        intake.tongue = Some("苔薄白".to_string());
        intake.pulse = Some("浮紧".to_string());
        let result = analyze(&catalog(), &intake);
        assert_eq!(result.primary_pattern.id, "windCold");
        assert_eq!(result.primary_pattern.score, 2);
    }

    #[test]
    fn keyword_matching_ignores_case() {
        let mut pattern = catalog().fallback().clone();
        pattern.id = "cough".to_string();
        pattern.keywords = vec!["Dry Cough".to_string()];
        let custom = PatternCatalog::new(vec![pattern], catalog().fallback().clone(), Vec::new())
            .expect("valid catalog");

        let result = analyze(&custom, &Intake::from_symptoms("Persistent DRY COUGH at night"));
        assert_eq!(result.primary_pattern.id, "cough");
        assert_eq!(result.primary_pattern.score, 1);
    }

    #[test]
    fn red_flags_dedupe_by_rule_not_by_message() {
        let rule = |id: &str, keyword: &str| RedFlagRule {
            id: id.to_string(),
            keywords: vec![keyword.to_string(), "胸痛".to_string()],
            message: "请立即就医".to_string(),
        };
        let base = catalog();
        let custom = PatternCatalog::new(
            base.patterns().to_vec(),
            base.fallback().clone(),
            vec![rule("a", "胸痛"), rule("b", "呼吸困难")],
        )
        .expect("valid catalog");

        let result = analyze(&custom, &Intake::from_symptoms("胸痛 呼吸困难"));
        assert_eq!(result.red_flags, vec!["请立即就医", "请立即就医"]);
    }

    #[test]
    fn suggested_focus_is_capped_and_unique() {
        let inputs = [
            "恶寒 头痛 无汗 发热 咽痛 乏力 气短",
            "盗汗 失眠 心悸 头晕 口干",
            "一般不适",
            "畏寒 腰酸 夜尿 便溏 胸闷 烦躁 刺痛",
        ];
        for symptoms in inputs {
            let result = analyze(&catalog(), &Intake::from_symptoms(symptoms));
            assert!(result.suggested_focus.len() <= MAX_SUGGESTED_FOCUS);
            let unique: HashSet<&String> = result.suggested_focus.iter().collect();
            assert_eq!(unique.len(), result.suggested_focus.len(), "{symptoms}");
        }
    }

    fn focus_catalog(a_lifestyle: &[&str], b_lifestyle: &[&str]) -> PatternCatalog {
        let fallback = catalog().fallback().clone();
        let pattern = |id: &str, keyword: &str, lifestyle: &[&str]| {
            let mut p = fallback.clone();
            p.id = id.to_string();
            p.keywords = vec![keyword.to_string()];
            p.lifestyle = lifestyle.iter().map(|s| (*s).to_string()).collect();
            p
        };
        PatternCatalog::new(
            vec![
                pattern("a", "alpha", a_lifestyle),
                pattern("b", "beta", b_lifestyle),
            ],
            fallback.clone(),
            Vec::new(),
        )
        .expect("valid catalog")
    }

    #[test]
    fn suggested_focus_drops_advice_shared_with_secondary() {
        let custom = focus_catalog(&["rest", "walk"], &["rest", "tea"]);
        let result = analyze(&custom, &Intake::from_symptoms("alpha beta"));

        assert_eq!(result.primary_pattern.id, "a");
        assert_eq!(result.secondary_patterns[0].id, "b");
        assert_eq!(result.suggested_focus, vec!["rest", "walk", "tea"]);
    }

    #[test]
    fn suggested_focus_dedupe_is_case_sensitive() {
        let custom = focus_catalog(&["rest", "walk"], &["Rest", "tea"]);
        let result = analyze(&custom, &Intake::from_symptoms("alpha beta"));

        assert_eq!(result.suggested_focus, vec!["rest", "walk", "Rest", "tea"]);
    }

    #[test]
    fn suggested_focus_starts_with_primary_advice() {
        let result = analyze(&catalog(), &Intake::from_symptoms("恶寒 头痛 无汗"));
        assert_eq!(result.suggested_focus[0], "避风保暖，外出加衣");
    }

    #[test]
    fn intake_summary_lists_present_fields_only() {
        let mut intake = Intake::from_symptoms("头痛");
        intake.pulse = Some("浮紧".to_string());
        intake.duration = Some("三天".to_string());
        assert_eq!(
            intake_summary(&intake),
            "主要症状：头痛；脉象：浮紧；病程：三天"
        );
    }
}
