use super::RuleSpec;

const BAD_KEYWORDS: &str = r"(?i)\b(baba(ji)?|nike|vashikaran|sumer|kolcak|porn|molvi|judi bola|itubola\.com|lost lover)\b";
const PHONE_NUMBER: &str = r"\+\d{10}|\+?\d{2}[\s\-]?\d{8,10}";
const OFFENSIVE: &str = r"(?i)\b(nigga|nigger|niga|asshole|crap|fag|fuck(ing?)?|idiot|shit|whore)s?\b";

/// The stock rule set, highest priority first.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec::Pattern {
            name: "Bad keyword".into(),
            pattern: BAD_KEYWORDS.into(),
        },
        RuleSpec::Pattern {
            name: "Phone number".into(),
            pattern: PHONE_NUMBER.into(),
        },
        RuleSpec::Pattern {
            name: "Offensive".into(),
            pattern: OFFENSIVE.into(),
        },
        RuleSpec::AllCaps {
            name: "Allcaps title / long allcaps line".into(),
            min_line_length: 15,
        },
        RuleSpec::LowReputation {
            name: "New user, link in post".into(),
            below: 6,
            pattern: "http://".into(),
        },
    ]
}
