use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Id of the pattern used when nothing in the narrative matches.
pub const FALLBACK_PATTERN_ID: &str = "generalRegulation";

/// A labeled TCM syndrome pattern. Never mutated after the catalog is built.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Reference formula for the pattern (e.g. "荆防败毒散")
    pub formula_ref: String,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub support_terms: Vec<String>,
    /// Matched as case-insensitive substrings of the intake narrative.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub acupoints: Vec<String>,
    /// Lifestyle advice, in priority order. Feeds `suggestedFocus`.
    #[serde(default)]
    pub lifestyle: Vec<String>,
}

/// Keyword rule that raises an advisory when any keyword is present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedFlagRule {
    pub id: String,
    pub keywords: Vec<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("catalog contains no patterns")]
    Empty,
    #[error("pattern or red-flag rule has an empty id")]
    EmptyId,
    #[error("duplicate pattern id `{0}`")]
    DuplicatePatternId(String),
    #[error("duplicate red-flag rule id `{0}`")]
    DuplicateRuleId(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    patterns: Vec<PatternDefinition>,
    fallback: PatternDefinition,
    #[serde(default)]
    red_flags: Vec<RedFlagRule>,
}

/// Static catalog of patterns and red-flag rules.
///
/// Declaration order of `patterns` is significant: it breaks score ties.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<PatternDefinition>,
    fallback: PatternDefinition,
    red_flags: Vec<RedFlagRule>,
}

impl PatternCatalog {
    /// Build a catalog, normalizing keywords and rejecting duplicate ids.
    pub fn new(
        patterns: Vec<PatternDefinition>,
        fallback: PatternDefinition,
        red_flags: Vec<RedFlagRule>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self::assemble(patterns, fallback, red_flags);
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_str(raw: &str, path: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(raw).map_err(|source| CatalogError::ParseFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(file.patterns, file.fallback, file.red_flags)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, path)
    }

    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    pub fn fallback(&self) -> &PatternDefinition {
        &self.fallback
    }

    pub fn red_flags(&self) -> &[RedFlagRule] {
        &self.red_flags
    }

    fn assemble(
        mut patterns: Vec<PatternDefinition>,
        mut fallback: PatternDefinition,
        mut red_flags: Vec<RedFlagRule>,
    ) -> Self {
        for pattern in &mut patterns {
            pattern.keywords = normalize_keywords(&pattern.keywords);
        }
        fallback.keywords = normalize_keywords(&fallback.keywords);
        for rule in &mut red_flags {
            rule.keywords = normalize_keywords(&rule.keywords);
        }
        Self {
            patterns,
            fallback,
            red_flags,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.patterns.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for pattern in self.patterns.iter().chain(std::iter::once(&self.fallback)) {
            if pattern.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(pattern.id.as_str()) {
                return Err(CatalogError::DuplicatePatternId(pattern.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.red_flags {
            if rule.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(CatalogError::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(())
    }

    /// The built-in catalog shipped with the service.
    pub fn builtin() -> Self {
        Self::assemble(builtin_patterns(), builtin_fallback(), builtin_red_flags())
    }
}

/// Lowercase, trim, and dedupe keywords; first occurrence keeps its position.
fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty() && seen.insert(keyword.clone()))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn pattern(
    id: &str,
    name: &str,
    description: &str,
    formula_ref: &str,
    key_terms: &[&str],
    support_terms: &[&str],
    keywords: &[&str],
    acupoints: &[&str],
    lifestyle: &[&str],
) -> PatternDefinition {
    PatternDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        formula_ref: formula_ref.to_string(),
        key_terms: strings(key_terms),
        support_terms: strings(support_terms),
        keywords: strings(keywords),
        acupoints: strings(acupoints),
        lifestyle: strings(lifestyle),
    }
}

fn builtin_patterns() -> Vec<PatternDefinition> {
    vec![
        pattern(
            "windCold",
            "风寒束表证",
            "外感风寒，卫阳被遏，腠理闭塞。",
            "荆防败毒散",
            &["恶寒重", "发热轻", "无汗"],
            &["头身疼痛", "鼻塞流清涕", "苔薄白", "脉浮紧"],
            &["恶寒", "怕冷", "头痛", "无汗", "鼻塞", "清涕", "身痛", "浮紧", "薄白"],
            &["风池", "风门", "列缺", "合谷"],
            &[
                "避风保暖，外出加衣",
                "饮用生姜红糖水或葱白汤以助发汗",
                "清淡饮食，忌食生冷",
                "保证充足睡眠",
            ],
        ),
        pattern(
            "windHeat",
            "风热犯表证",
            "外感风热，肺卫失宣。",
            "银翘散",
            &["发热重", "微恶风", "咽喉肿痛"],
            &["咳嗽痰黄", "口渴", "舌尖红", "脉浮数"],
            &["发热", "咽痛", "咽喉肿痛", "黄涕", "口渴", "浮数", "舌尖红", "咳嗽", "有汗"],
            &["大椎", "曲池", "合谷", "外关"],
            &[
                "多饮温开水",
                "饮食清淡，少食辛辣油炸",
                "可用菊花、薄荷代茶饮",
                "保证充足睡眠",
            ],
        ),
        pattern(
            "qiDeficiency",
            "脾肺气虚证",
            "脾肺气虚，运化无力，卫表不固。",
            "补中益气汤",
            &["神疲乏力", "气短懒言"],
            &["自汗", "食欲不振", "舌淡", "脉弱"],
            &[
                "乏力", "疲劳", "疲倦", "气短", "自汗", "懒言", "食欲不振", "纳差", "脉弱",
                "舌淡", "易感冒",
            ],
            &["足三里", "气海", "脾俞", "肺俞"],
            &[
                "规律作息，避免过度劳累",
                "适度进行太极拳、八段锦等和缓运动",
                "饮食宜温软易消化，可食山药、小米粥",
                "避免久坐久卧",
            ],
        ),
        pattern(
            "yangDeficiency",
            "肾阳虚证",
            "肾阳不足，温煦失职。",
            "金匮肾气丸",
            &["畏寒肢冷", "腰膝酸软"],
            &["夜尿频多", "便溏", "脉沉"],
            &[
                "畏寒", "手脚冰凉", "四肢不温", "腰膝酸软", "腰酸", "夜尿", "便溏", "脉沉",
                "精神萎靡",
            ],
            &["关元", "命门", "肾俞", "足三里"],
            &[
                "注意腰腹及足部保暖",
                "忌食生冷寒凉",
                "可适当艾灸关元、命门",
                "早睡晚起，避免熬夜",
                "适度晒太阳",
            ],
        ),
        pattern(
            "yinDeficiency",
            "阴虚火旺证",
            "阴液亏虚，虚火内扰。",
            "六味地黄丸",
            &["五心烦热", "盗汗"],
            &["口干咽燥", "失眠", "舌红少苔", "脉细数"],
            &[
                "盗汗", "五心烦热", "手足心热", "口干", "咽干", "潮热", "失眠", "少苔", "细数",
                "便干",
            ],
            &["太溪", "三阴交", "照海", "肾俞"],
            &[
                "避免熬夜，尽量在子时前入睡",
                "少食辛辣、烧烤及温燥食物",
                "可食银耳、百合、梨等滋阴之品",
                "保持情绪平和",
                "适度进行舒缓运动",
            ],
        ),
        pattern(
            "liverQiStagnation",
            "肝郁气滞证",
            "肝失疏泄，气机郁滞。",
            "逍遥散",
            &["情志抑郁", "胁肋胀痛"],
            &["善太息", "胸闷", "月经不调", "脉弦"],
            &[
                "情绪低落", "抑郁", "烦躁", "易怒", "胁痛", "胁肋胀痛", "叹气", "胸闷",
                "月经不调", "脉弦", "压力大",
            ],
            &["太冲", "期门", "内关", "膻中"],
            &[
                "保持情绪舒畅，学会疏解压力",
                "规律进行散步、慢跑等舒展运动",
                "可用玫瑰花、佛手代茶饮",
                "规律作息，避免熬夜",
            ],
        ),
        pattern(
            "dampHeat",
            "湿热蕴结证",
            "湿热内蕴，阻滞气机。",
            "甘露消毒丹",
            &["口苦口黏", "舌苔黄腻"],
            &["小便黄", "大便黏滞", "身重"],
            &["口苦", "口黏", "黏腻", "小便黄", "黄腻", "痤疮", "大便黏", "身重", "湿疹"],
            &["阴陵泉", "曲池", "内庭", "丰隆"],
            &[
                "饮食清淡，少食肥甘厚味及辛辣",
                "戒烟限酒",
                "保持居处干燥通风",
                "适度运动以助出汗祛湿",
            ],
        ),
        pattern(
            "phlegmDamp",
            "痰湿内阻证",
            "脾失健运，痰湿内停。",
            "二陈汤",
            &["形体肥胖", "痰多"],
            &["困倦嗜睡", "头重如裹", "苔白腻", "脉滑"],
            &["肥胖", "痰多", "困倦", "嗜睡", "头重", "白腻", "脉滑", "腹胀", "胸脘痞闷"],
            &["丰隆", "中脘", "阴陵泉", "足三里"],
            &[
                "控制饮食总量，少食甜腻",
                "坚持有氧运动，循序渐进",
                "可食薏苡仁、赤小豆等健脾利湿之品",
                "避免久居潮湿环境",
            ],
        ),
        pattern(
            "bloodStasis",
            "气滞血瘀证",
            "气机阻滞，血行不畅。",
            "血府逐瘀汤",
            &["刺痛", "痛有定处"],
            &["舌紫暗或有瘀斑", "脉涩"],
            &["刺痛", "痛有定处", "瘀斑", "紫暗", "痛经", "血块", "唇色紫", "脉涩"],
            &["血海", "膈俞", "三阴交", "合谷"],
            &[
                "注意保暖，避免受寒",
                "适度运动以促进气血运行",
                "保持情绪舒畅",
                "可适量食用山楂、黑木耳",
            ],
        ),
        pattern(
            "bloodDeficiency",
            "心脾血虚证",
            "心脾两虚，气血生化不足。",
            "归脾汤",
            &["面色苍白或萎黄", "心悸"],
            &["头晕", "多梦健忘", "唇甲色淡", "脉细"],
            &[
                "面色苍白", "面色萎黄", "头晕", "心悸", "唇甲色淡", "月经量少", "脉细", "多梦",
                "健忘",
            ],
            &["足三里", "三阴交", "心俞", "脾俞"],
            &[
                "保证充足睡眠，避免过度用脑",
                "饮食均衡，可食红枣、桂圆",
                "适度运动，量力而行",
                "保持情绪平和",
            ],
        ),
    ]
}

fn builtin_fallback() -> PatternDefinition {
    pattern(
        FALLBACK_PATTERN_ID,
        "整体调理",
        "未见明确证候倾向，以调和饮食起居为主。",
        "以饮食起居调养为主，暂不推荐方剂",
        &[],
        &[],
        &[],
        &["足三里", "关元"],
        &[
            "规律作息，早睡早起",
            "均衡饮食，少食生冷油腻",
            "每周进行适量运动",
            "保持情绪舒畅",
            "如症状持续或加重，请及时就医",
        ],
    )
}

fn builtin_red_flags() -> Vec<RedFlagRule> {
    let rule = |id: &str, keywords: &[&str], message: &str| RedFlagRule {
        id: id.to_string(),
        keywords: strings(keywords),
        message: message.to_string(),
    };

    vec![
        rule(
            "cardiopulmonary",
            &["胸痛", "呼吸困难", "喘不上气", "胸口压榨"],
            "胸痛或呼吸困难可能提示心肺急症，请立即拨打急救电话或前往急诊。",
        ),
        rule(
            "neurological",
            &["意识模糊", "昏迷", "晕厥", "抽搐", "口角歪斜", "言语不清", "半身无力", "剧烈头痛"],
            "出现神志改变、抽搐、口眼歪斜或肢体无力时需警惕脑卒中等急症，请立即就医。",
        ),
        rule(
            "bleeding",
            &["呕血", "咯血", "便血", "黑便", "大出血"],
            "出血症状需要尽快由医生评估，请立即就医。",
        ),
        rule(
            "highFever",
            &["高热", "高烧", "39度", "40度", "发热不退"],
            "持续高热需及时就医，排查感染等原因。",
        ),
        rule(
            "selfHarm",
            &["自杀", "轻生", "不想活"],
            "如有伤害自己的想法，请立即联系身边的人或拨打心理援助热线，必要时前往急诊。",
        ),
        rule(
            "pregnancy",
            &["怀孕", "妊娠", "孕期"],
            "妊娠期用药需特别谨慎，任何方药请在专业医师指导下使用。",
        ),
        rule(
            "weightLoss",
            &["体重骤降", "不明原因消瘦", "明显消瘦"],
            "不明原因的体重明显下降需要就医进一步检查。",
        ),
    ]
}
