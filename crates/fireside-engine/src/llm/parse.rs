//! Best-effort JSON recovery from free-form model text.
//!
//! Models wrap JSON in prose and code fences more often than not. Extraction
//! runs an ordered list of strategies, most precise first; the first candidate
//! that parses and carries the required keys wins. Kept free of business
//! logic so the ladder can be tested (and fuzzed) on its own.

use regex::Regex;
use serde::Deserialize;

/// Wire shape of a sufficiency verdict embedded in model output.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VerdictWire {
    pub is_complete: bool,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    pub feedback: String,
}

/// Wire shape of a `{name, age}` extraction result. Models sometimes send the
/// age as a string or a float; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NameAgeWire {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    age: Option<AgeField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AgeField {
    Number(u32),
    Float(f64),
    Text(String),
}

impl NameAgeWire {
    pub fn age(&self) -> Option<u32> {
        match &self.age {
            Some(AgeField::Number(n)) => Some(*n),
            Some(AgeField::Float(f)) if *f > 0.0 => Some(*f as u32),
            Some(AgeField::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Strip markdown code fences from a response
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// Try to fix common JSON issues from LLM responses
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();

    // Remove trailing commas before ] or }
    fixed = fixed.replace(",]", "]");
    fixed = fixed.replace(",}", "}");

    // Smart quotes to regular quotes
    fixed = fixed.replace('\u{201C}', "\"");
    fixed = fixed.replace('\u{201D}', "\"");
    fixed = fixed.replace('\u{2018}', "'");
    fixed = fixed.replace('\u{2019}', "'");

    // Remove any control characters that might have slipped in
    fixed = fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    fixed
}

/// Balanced-brace scan from the first `{` to its matching `}`, tracking
/// nesting depth and ignoring braces inside strings.
fn extract_balanced_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut start_idx = None;

    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        if c == '{' {
            if depth == 0 {
                start_idx = Some(i);
            }
            depth += 1;
        } else if c == '}' {
            depth -= 1;
            if depth == 0 {
                if let Some(start) = start_idx {
                    return Some(text[start..=i].to_string());
                }
            }
        }
    }

    None
}

/// Narrow regex anchored on the `is_complete` key, for responses where the
/// balanced scan is thrown off by unmatched braces in surrounding prose.
fn extract_keyed_object(text: &str) -> Option<String> {
    let re = Regex::new(r#"(?s)\{[^{}]*"is_complete"[^{}]*\}"#)
        .expect("keyed-object regex should compile");
    re.find(text).map(|m| m.as_str().to_string())
}

/// Last resort: the first `{...}` span, nesting ignored.
fn extract_first_braced_span(text: &str) -> Option<String> {
    let re = Regex::new(r"(?s)\{[^}]*\}").expect("braced-span regex should compile");
    re.find(text).map(|m| m.as_str().to_string())
}

/// Ordered extraction strategies; earlier entries are more precise.
const STRATEGIES: &[fn(&str) -> Option<String>] = &[
    extract_balanced_object,
    extract_keyed_object,
    extract_first_braced_span,
];

fn candidates(text: &str) -> Vec<String> {
    let clean = strip_markdown_fences(text);
    let mut out: Vec<String> = Vec::new();
    for strategy in STRATEGIES {
        if let Some(candidate) = strategy(clean) {
            let fixed = fix_json_issues(strip_markdown_fences(&candidate));
            if !out.contains(&fixed) {
                out.push(fixed);
            }
        }
    }
    out
}

/// Recover a structured verdict from model output. The first extraction that
/// parses and contains both `is_complete` and `feedback` wins.
pub(crate) fn parse_verdict(text: &str) -> Option<VerdictWire> {
    candidates(text)
        .into_iter()
        .find_map(|c| serde_json::from_str::<VerdictWire>(&c).ok())
}

/// Recover a `{name, age}` object from model output.
pub(crate) fn parse_name_age(text: &str) -> Option<NameAgeWire> {
    candidates(text)
        .into_iter()
        .find_map(|c| serde_json::from_str::<NameAgeWire>(&c).ok())
}

/// Salvage a bare `feedback` string when no structured verdict is recoverable.
pub(crate) fn salvage_feedback(text: &str) -> Option<String> {
    let patterns = [
        r#""?feedback"?\s*:\s*"([^"]+)""#,
        r#""?feedback"?\s*:\s*([^\n,}]+)"#,
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).expect("feedback salvage regex should compile");
        if let Some(captures) = re.captures(text) {
            let feedback = captures.get(1)?.as_str().trim().trim_matches('"').trim();
            if !feedback.is_empty() {
                return Some(feedback.to_string());
            }
        }
    }
    None
}

/// Keywords that mark a raw response as declaring the answer complete.
const COMPLETION_KEYWORDS: &[&str] = &["complete", "all set", "covered everything", "nothing missing"];

/// Infer completeness from raw text when no structured verdict parsed.
/// Negated forms ("incomplete", "not complete") are discounted first.
pub(crate) fn infer_completion(text: &str) -> bool {
    let lower = text
        .to_lowercase()
        .replace("incomplete", "")
        .replace("not complete", "");
    COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_verdict() {
        let wire = parse_verdict(
            r#"{"is_complete": false, "missing_elements": ["the feeling"], "feedback": "Tell me more!"}"#,
        )
        .unwrap();
        assert!(!wire.is_complete);
        assert_eq!(wire.missing_elements, vec!["the feeling"]);
        assert_eq!(wire.feedback, "Tell me more!");
    }

    #[test]
    fn parses_fenced_verdict_with_prose() {
        let text = "Here is my analysis:\n```json\n{\"is_complete\": true, \"missing_elements\": [], \"feedback\": \"Great answer!\"}\n```\nHope that helps.";
        let wire = parse_verdict(text).unwrap();
        assert!(wire.is_complete);
        assert_eq!(wire.feedback, "Great answer!");
    }

    #[test]
    fn balanced_scan_handles_nested_arrays() {
        let text = r#"Sure! {"is_complete": false, "missing_elements": ["a", "b"], "feedback": "More {detail} please"} done"#;
        let wire = parse_verdict(text).unwrap();
        assert_eq!(wire.missing_elements.len(), 2);
        assert_eq!(wire.feedback, "More {detail} please");
    }

    #[test]
    fn keyed_regex_recovers_after_stray_open_brace() {
        // A stray `{` earlier in the prose breaks the balanced scan; the
        // keyed strategy still finds the object.
        let text = r#"note { unclosed ... {"is_complete": true, "feedback": "ok"}"#;
        let wire = parse_verdict(text).unwrap();
        assert!(wire.is_complete);
    }

    #[test]
    fn trailing_commas_and_smart_quotes_are_repaired() {
        let text = "{\"is_complete\": false, \"missing_elements\": [\"x\",], \"feedback\": \u{201C}tell me more\u{201D},}";
        let wire = parse_verdict(text).unwrap();
        assert_eq!(wire.missing_elements, vec!["x"]);
        assert_eq!(wire.feedback, "tell me more");
    }

    #[test]
    fn missing_required_keys_yields_none() {
        assert!(parse_verdict(r#"{"is_complete": true}"#).is_none());
        assert!(parse_verdict("no json at all").is_none());
    }

    #[test]
    fn missing_elements_defaults_to_empty() {
        let wire = parse_verdict(r#"{"is_complete": true, "feedback": "done"}"#).unwrap();
        assert!(wire.missing_elements.is_empty());
    }

    #[test]
    fn name_age_accepts_number_string_and_null() {
        let wire = parse_name_age(r#"{"name": "Alex", "age": 10}"#).unwrap();
        assert_eq!(wire.name.as_deref(), Some("Alex"));
        assert_eq!(wire.age(), Some(10));

        let wire = parse_name_age(r#"{"name": "Sam", "age": "12"}"#).unwrap();
        assert_eq!(wire.age(), Some(12));

        let wire = parse_name_age(r#"{"name": null, "age": null}"#).unwrap();
        assert!(wire.name.is_none());
        assert!(wire.age().is_none());
    }

    #[test]
    fn salvages_bare_feedback_line() {
        let text = "I couldn't format that, but feedback: \"Ask about the feeling too\" overall";
        assert_eq!(
            salvage_feedback(text).as_deref(),
            Some("Ask about the feeling too")
        );
        assert!(salvage_feedback("nothing useful").is_none());
    }

    #[test]
    fn completion_inference_ignores_negated_forms() {
        assert!(infer_completion("The answer is complete."));
        assert!(!infer_completion("The answer is incomplete."));
        assert!(!infer_completion("This is not complete yet."));
        assert!(infer_completion("All set, covered everything!"));
    }
}
