use crate::analysis::{PatternAnalysis, PatternMatch};
use crate::intake::Intake;

/// Closing line every reply carries, offline or model-generated.
pub const DISCLAIMER: &str =
    "以上内容仅供健康参考，不能替代面诊。如症状持续或加重，请及时咨询执业中医师或医生。";

pub const SYSTEM_PROMPT: &str = "你是一名谨慎的中医健康咨询助手。\
根据提供的问诊摘要与证候分析，用通俗的中文解释可能的证候倾向、调养方向和生活建议。\
规则：\n\
1. 不做明确诊断，不开具处方剂量，方剂仅作参考并提示需在执业中医师指导下使用。\n\
2. 如果存在预警信号，必须在回复开头明确建议立即就医或前往急诊。\n\
3. 回复结尾提醒用户咨询执业中医师或医生。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationPrompt {
    pub system: String,
    pub user: String,
}

/// Build the chat messages for the consultation step.
pub fn build_consultation_prompt(intake: &Intake, analysis: &PatternAnalysis) -> ConsultationPrompt {
    let mut lines = vec![format!("【问诊摘要】{}", analysis.intake_summary)];
    if intake.constitution.is_none() && intake.tongue.is_none() && intake.pulse.is_none() {
        lines.push("（未提供舌象、脉象或体质信息）".to_string());
    }

    lines.push(format!("【主要证候】{}", describe_pattern(&analysis.primary_pattern)));
    if !analysis.secondary_patterns.is_empty() {
        lines.push("【兼夹证候】".to_string());
        lines.extend(
            analysis
                .secondary_patterns
                .iter()
                .map(|pattern| format!("- {}", describe_pattern(pattern))),
        );
    }

    if analysis.red_flags.is_empty() {
        lines.push("【预警信号】无".to_string());
    } else {
        lines.push("【预警信号】".to_string());
        lines.extend(analysis.red_flags.iter().map(|flag| format!("- {flag}")));
    }

    if !analysis.suggested_focus.is_empty() {
        lines.push(format!("【调养重点】{}", analysis.suggested_focus.join("；")));
    }
    lines.push("请据此给出咨询回复。".to_string());

    ConsultationPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user: lines.join("\n"),
    }
}

/// Deterministic reply used when no language model is configured.
pub fn offline_reply(analysis: &PatternAnalysis) -> String {
    let mut lines: Vec<String> = analysis
        .red_flags
        .iter()
        .map(|flag| format!("⚠ {flag}"))
        .collect();

    let primary = &analysis.primary_pattern;
    lines.push(format!(
        "根据您提供的信息，目前倾向于「{}」：{}",
        primary.name, primary.description
    ));
    lines.push(format!("参考方向：{}。", primary.formula_ref));
    if !primary.acupoints.is_empty() {
        lines.push(format!("可按揉穴位：{}。", primary.acupoints.join("、")));
    }

    if !analysis.secondary_patterns.is_empty() {
        let names: Vec<&str> = analysis
            .secondary_patterns
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        lines.push(format!("兼有倾向：{}。", names.join("、")));
    }

    if !analysis.suggested_focus.is_empty() {
        lines.push("日常调养建议：".to_string());
        lines.extend(
            analysis
                .suggested_focus
                .iter()
                .enumerate()
                .map(|(idx, advice)| format!("{}. {advice}", idx + 1)),
        );
    }
    lines.push(DISCLAIMER.to_string());
    lines.join("\n")
}

fn describe_pattern(pattern: &PatternMatch) -> String {
    let mut line = format!(
        "{}（{}，匹配度 {}）：{} 参考方剂：{}",
        pattern.name, pattern.id, pattern.score, pattern.description, pattern.formula_ref
    );
    if !pattern.acupoints.is_empty() {
        line.push_str(&format!("；常用穴位：{}", pattern.acupoints.join("、")));
    }
    line
}
