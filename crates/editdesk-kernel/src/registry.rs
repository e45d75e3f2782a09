use std::collections::BTreeMap;

use editdesk_contracts::{ActionCatalog, ActionDescriptor, Language, API_VERSION};

pub const FALLBACK_ACTION: &str = "generic";

/// Options shared by every template's `render`. Templates ignore what they do
/// not use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub tone: String,
    pub target_length: Option<String>,
}

/// Per-template tail appended after the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addendum {
    None,
    ToneConstraints,
    TargetLength,
}

#[derive(Debug, Clone)]
pub struct ActionTemplate {
    pub id: &'static str,
    pub description: &'static str,
    pub requires_text: bool,
    pub fields: &'static [&'static str],
    role_en: &'static str,
    role_ar: &'static str,
    schema_en: &'static str,
    schema_ar: &'static str,
    addendum: Addendum,
}

impl ActionTemplate {
    pub fn render(&self, language: Language, options: &RenderOptions) -> String {
        let (role, json_only, label, schema) = match language {
            Language::En => (self.role_en, "Output JSON only.", "Schema:", self.schema_en),
            Language::Ar => (self.role_ar, "أجب بـ JSON فقط.", "الشكل:", self.schema_ar),
        };
        let mut out = format!("{role} {json_only}\n\n{label}\n{schema}\n");
        match (self.addendum, language) {
            (Addendum::None, _) => {}
            (Addendum::ToneConstraints, Language::En) => {
                out.push_str(&format!(
                    "\nConstraints:\n- Preserve facts.\n- Adopt tone: {}.\n- Keep paragraphs short.\n",
                    options.tone
                ));
            }
            (Addendum::ToneConstraints, Language::Ar) => {
                out.push_str(&format!(
                    "\nقيود:\n- احفظ الحقائق.\n- النبرة: {}.\n- فقرات قصيرة.\n",
                    options.tone
                ));
            }
            (Addendum::TargetLength, Language::En) => {
                let target = options
                    .target_length
                    .as_deref()
                    .unwrap_or("about 300 words");
                out.push_str(&format!("\nTarget length: {target}\n"));
            }
            (Addendum::TargetLength, Language::Ar) => {
                let target = options
                    .target_length
                    .as_deref()
                    .unwrap_or("حوالي 300 كلمة");
                out.push_str(&format!("\nالطول المستهدف: {target}\n"));
            }
        }
        out
    }

    pub fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            id: self.id.to_string(),
            description: self.description.to_string(),
            requires_text: self.requires_text,
            fields: self.fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Immutable id -> template map. Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    templates: BTreeMap<&'static str, ActionTemplate>,
    fallback: ActionTemplate,
}

impl ActionRegistry {
    pub fn builtin() -> Self {
        let templates = builtin_templates()
            .into_iter()
            .map(|t| (t.id, t))
            .collect::<BTreeMap<_, _>>();
        let fallback = templates
            .get(FALLBACK_ACTION)
            .cloned()
            .unwrap_or_else(generic_template);
        Self {
            templates,
            fallback,
        }
    }

    /// Resolves an untrusted action name. Unknown names resolve to the
    /// fallback template.
    pub fn lookup(&self, action_id: &str) -> &ActionTemplate {
        self.templates.get(action_id).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, action_id: &str) -> bool {
        self.templates.contains_key(action_id)
    }

    pub fn fallback(&self) -> &'static str {
        self.fallback.id
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.keys().copied()
    }

    pub fn catalog(&self) -> ActionCatalog {
        ActionCatalog {
            api_version: API_VERSION.to_string(),
            fallback: self.fallback.id.to_string(),
            actions: self.templates.values().map(|t| t.descriptor()).collect(),
        }
    }
}

fn builtin_templates() -> Vec<ActionTemplate> {
    vec![
        ActionTemplate {
            id: "rewrite",
            description: "إعادة صياغة قوية ومحترفة للنص مع ملخص وتغييرات رئيسية",
            requires_text: true,
            fields: &["summary", "polished", "key_changes", "openers", "notes"],
            role_en: "You are an expert admissions editor.",
            role_ar: "أنت محرر خبير مختص برسائل القبول والمنح.",
            schema_en: r#"{
  "summary": "1-2 sentence summary",
  "polished": "Full polished rewritten text",
  "key_changes": ["change 1", "change 2", ...],
  "openers": ["option1", "option2", "option3"],
  "notes": "short note for tone/length"
}"#,
            schema_ar: r#"{
  "summary": "ملخص 1-2 جملة",
  "polished": "النص المعاد صياغته بالكامل",
  "key_changes": ["تغيير 1", "تغيير 2", ...],
  "openers": ["خيار1", "خيار2", "خيار3"],
  "notes": "ملاحظات قصيرة عن النبرة/الطول"
}"#,
            addendum: Addendum::ToneConstraints,
        },
        ActionTemplate {
            id: "feedback",
            description: "تقرير فيدباك مفصّل: نقاط قوة، نقاط ضعف، خطة عمل",
            requires_text: true,
            fields: &[
                "summary",
                "strengths",
                "weaknesses",
                "missing_metrics",
                "action_plan",
                "score",
            ],
            role_en: "You are a senior admissions reviewer.",
            role_ar: "أنت مُقيّم قبول كبير ومحترف.",
            schema_en: r#"{
  "summary": "...",
  "strengths": ["..."],
  "weaknesses": [{"quote":"...", "issue":"...", "severity":"High|Medium|Low"}],
  "missing_metrics": ["..."],
  "action_plan": ["step 1","step 2","step 3"],
  "score": {"clarity":7, "evidence":4, "grammar":8}
}"#,
            schema_ar: r#"{
  "summary":"...",
  "strengths":["..."],
  "weaknesses":[{"quote":"...","issue":"...","severity":"High|Medium|Low"}],
  "missing_metrics":["..."],
  "action_plan":["خطوة1","خطوة2","خطوة3"],
  "score":{"clarity":7,"evidence":4,"grammar":8}
}"#,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "shorten",
            description: "اختصار النص مع حفظ النقاط الأساسية",
            requires_text: true,
            fields: &[
                "shortened",
                "original_word_count",
                "shortened_word_count",
                "removed_summary",
            ],
            role_en: "You are an expert summarizer.",
            role_ar: "أنت ملخّص محترف.",
            schema_en: SHORTEN_SCHEMA,
            schema_ar: SHORTEN_SCHEMA,
            addendum: Addendum::TargetLength,
        },
        ActionTemplate {
            id: "paraphrase",
            description: "إعادة صياغة بعدة نبرات مع بديل لكل نبرة",
            requires_text: true,
            fields: &["paraphrases", "formal", "friendly", "concise", "academic", "notes"],
            role_en: "You are a paraphrasing coach.",
            role_ar: "أنت مدرب إعادة صياغة.",
            schema_en: PARAPHRASE_SCHEMA,
            schema_ar: PARAPHRASE_SCHEMA,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "ielts_check",
            description: "تحليل متطلبات اللغة/IELTS لمنحة معينة؛ يعتمد على metadata.scholarshipName أو metadata.url",
            requires_text: false,
            fields: &["scholarship", "likely_needs_ielts", "notes", "evidence_needed", "links"],
            role_en: "You are an expert on scholarship language requirements.",
            role_ar: "أنت خبير في متطلبات اللغة للمنح.",
            schema_en: r#"{
  "scholarship": "...",
  "likely_needs_ielts": "Yes|No|Maybe",
  "notes": "...",
  "evidence_needed": ["check url", "contact email"],
  "links": ["..."]
}"#,
            schema_ar: r#"{
  "scholarship":"...",
  "likely_needs_ielts":"Yes|No|Maybe",
  "notes":"...",
  "evidence_needed":["راجع الرابط","راسل اللجنة"],
  "links":["..."]
}"#,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "scholarship_summary",
            description: "ملخّص منظّم لمنحة: تغطية تمويلية، لغة، IELTS، المدة، الموعد النهائي، رابط التسجيل",
            requires_text: false,
            fields: &[
                "title",
                "country",
                "level",
                "funding",
                "language_of_instruction",
                "ielts_required",
                "deadline",
                "url",
                "notes",
            ],
            role_en: "You are a scholarship analyst.",
            role_ar: "أنت محلّل منح.",
            schema_en: r#"{
  "title":"...",
  "country":"...",
  "level":"Bachelors|Masters|PhD|All",
  "funding":"Fully funded|Partial|None|Unknown",
  "language_of_instruction":"English|Arabic|Other|Unknown",
  "ielts_required":"Yes|No|Maybe",
  "deadline":"YYYY-MM-DD or 'Unknown'",
  "url":"...",
  "notes":"..."
}"#,
            schema_ar: r#"{
  "title":"...",
  "country":"...",
  "level":"Bachelors|Masters|PhD|All",
  "funding":"مموّلة بالكامل|جزئياً|غير مموّلة|غير معروف",
  "language_of_instruction":"English|Arabic|Other|Unknown",
  "ielts_required":"Yes|No|Maybe",
  "deadline":"YYYY-MM-DD أو 'Unknown'",
  "url":"...",
  "notes":"..."
}"#,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "compare",
            description: "مقارنة بين منح تُرسل في metadata.items",
            requires_text: false,
            fields: &["comparison_table", "recommendation"],
            role_en: "You are a comparison engine for scholarships.",
            role_ar: "أنت محرك مقارنة للمنح.",
            schema_en: COMPARE_SCHEMA,
            schema_ar: COMPARE_SCHEMA,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "application_checklist",
            description: "قائمة مستندات مطلوبة وخطوات التقديم مفصّلة",
            requires_text: false,
            fields: &["checklist", "timeline_steps", "tips"],
            role_en: "You are an application checklist generator.",
            role_ar: "أنت مُولّد قائمة تحقق لطلبات التقديم.",
            schema_en: r#"{
  "checklist":[ {"name":"Passport copy","required":true,"notes":"..."} ],
  "timeline_steps":[ "Step 1", "Step 2" ],
  "tips":[ "Tip 1", "Tip 2" ]
}"#,
            schema_ar: r#"{
  "checklist":[ {"name":"صورة جواز السفر","required":true,"notes":"..."} ],
  "timeline_steps":[ "خطوة 1", "خطوة 2" ],
  "tips":[ "نصيحة 1", "نصيحة 2" ]
}"#,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "mock_interview",
            description: "أسئلة مقابلة مخصصة مع إجابات نموذجية ونصائح",
            requires_text: false,
            fields: &["questions", "advice"],
            role_en: "You are an admissions interviewer.",
            role_ar: "أنت محاور مقابلات قبول.",
            schema_en: INTERVIEW_SCHEMA,
            schema_ar: INTERVIEW_SCHEMA,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "cv_bullets",
            description: "تحويل الخبرات إلى نقاط قوية للسيرة الذاتية",
            requires_text: true,
            fields: &["bullets", "tailored_for"],
            role_en: "You are a CV bullets writer.",
            role_ar: "أنت كاتب نقاط للسيرة الذاتية.",
            schema_en: r#"{
  "bullets":[ "Achieved X by Y", "Led team of..." ],
  "tailored_for":"masters|phd|scholarship"
}"#,
            schema_ar: r#"{
  "bullets":[ "حصلت على X بـ Y", "قاد فريق..." ],
  "tailored_for":"ماجستير|دكتوراه|منحة"
}"#,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "translate",
            description: "ترجمة أو تصحيح لغة إلى metadata.targetLanguage",
            requires_text: false,
            fields: &["translated", "notes"],
            role_en: "You are a translator/editor.",
            role_ar: "أنت مترجم/مصحح لغوي.",
            schema_en: TRANSLATE_SCHEMA,
            schema_ar: TRANSLATE_SCHEMA,
            addendum: Addendum::None,
        },
        ActionTemplate {
            id: "summarize_url",
            description: "تلخيص صفحة أو رابط؛ يُفضّل إرسال نص الصفحة في metadata.context",
            requires_text: false,
            fields: &["title", "summary", "key_points", "links"],
            role_en: "You are a web summarizer.",
            role_ar: "أنت مُلخّص صفحات ويب.",
            schema_en: SUMMARIZE_URL_SCHEMA,
            schema_ar: SUMMARIZE_URL_SCHEMA,
            addendum: Addendum::None,
        },
        generic_template(),
    ]
}

fn generic_template() -> ActionTemplate {
    ActionTemplate {
        id: FALLBACK_ACTION,
        description: "رد عام مفصّل ومنسّق للطلاب: ملخص ونقاط وروابط إن وُجدت",
        requires_text: false,
        fields: &["summary", "details", "suggestions", "links"],
        role_en: "You are a helpful scholarship assistant.",
        role_ar: "أنت مساعد منحة مفيد.",
        schema_en: GENERIC_SCHEMA,
        schema_ar: GENERIC_SCHEMA,
        addendum: Addendum::None,
    }
}

const SHORTEN_SCHEMA: &str = r#"{
  "shortened":"...",
  "original_word_count": 0,
  "shortened_word_count": 0,
  "removed_summary":["..."]
}"#;

const PARAPHRASE_SCHEMA: &str = r#"{
  "paraphrases": {
    "formal":"...",
    "friendly":"...",
    "concise":"...",
    "academic":"..."
  },
  "notes":["..."]
}"#;

const COMPARE_SCHEMA: &str = r#"{
  "comparison_table":[
    {"title":"...","funding":"...","ielts":"...","deadline":"...","best_for":"..."}
  ],
  "recommendation":"..."
}"#;

const INTERVIEW_SCHEMA: &str = r#"{
  "questions":[ {"q":"...","purpose":"...","ideal_points":["..."],"sample_answer":"..."} ],
  "advice":"..."
}"#;

const TRANSLATE_SCHEMA: &str = r#"{
  "translated":"...",
  "notes":"..."
}"#;

const SUMMARIZE_URL_SCHEMA: &str = r#"{
  "title":"...",
  "summary":"...",
  "key_points":["..."],
  "links":["..."]
}"#;

const GENERIC_SCHEMA: &str = r#"{
  "summary":"...",
  "details":"...",
  "suggestions":["..."],
  "links":["..."]
}"#;
