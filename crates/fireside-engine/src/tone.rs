//! Feedback tone normalization.
//!
//! Judge feedback is relayed verbatim to a child, so model output passes
//! through an ordered rewrite-rule list that enforces the informal register.
//! The rules are data: they rewrite text only and never touch the verdict.

/// Ordered (pattern, replacement) rewrites applied in sequence.
const TONE_RULES: &[(&str, &str)] = &[
    ("Your answer covers", "I can see you talked about"),
    ("your answer covers", "I can see you talked about"),
    ("Your answer", "What you shared"),
    ("your answer", "what you shared"),
    ("You have not specified", "You didn't say"),
    ("you have not specified", "you didn't say"),
    ("You have not mentioned", "You didn't say"),
    ("you have not mentioned", "you didn't say"),
    ("You should", "You could"),
    ("you should", "you could"),
    ("You must", "You could"),
    ("you must", "you could"),
    ("Please provide", "Tell me"),
    ("please provide", "tell me"),
    ("Please ", ""),
    ("please ", ""),
    ("Kindly ", ""),
    ("kindly ", ""),
    ("elaborate on", "say more about"),
    ("elaborate", "say a bit more"),
    ("specify", "tell me"),
    ("However, ", "But "),
    ("Furthermore, ", "Also, "),
    ("Additionally, ", "And "),
];

/// Lowercased prefixes that already read as a friendly acknowledgment.
const ACK_OPENERS: &[&str] = &[
    "awesome", "great", "nice", "cool", "wow", "good", "fun", "love", "i love", "i see",
    "i can see", "that's", "thats", "thanks", "sounds", "what you shared", "interesting", "ooh",
];

/// (trigger, appended example) pairs for open-ended questions without examples.
const EXAMPLE_RULES: &[(&str, &str)] = &[
    ("learn", " Like English, drawing, or math?"),
    ("feel", " Like happy, excited, or proud?"),
    ("game", " Like tag, video games, or puzzles?"),
    ("boring", " Like long worksheets, or sitting still too long?"),
];

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prepend an acknowledging opener when the message jumps straight to asking.
/// The opener is picked from what the subject actually talked about.
fn ensure_acknowledgment(text: String, answer: &str) -> String {
    let lower = text.to_lowercase();
    if ACK_OPENERS.iter().any(|opener| lower.starts_with(opener)) {
        return text;
    }

    let answer_lower = answer.to_lowercase();
    let opener = if answer_lower.contains("learn") || answer_lower.contains("read") {
        "I love hearing about what you're learning! ✨"
    } else if answer_lower.contains("play") || answer_lower.contains("game") {
        "That sounds like fun! ✨"
    } else {
        "Thanks for telling me! 😊"
    };
    format!("{} {}", opener, text)
}

/// Append a tiny example to an open question that doesn't offer one.
fn append_example(text: &mut String) {
    if !text.contains('?') {
        return;
    }
    let lower = text.to_lowercase();
    if lower.contains("like ") || lower.contains("for example") || lower.contains("such as") {
        return;
    }
    for (trigger, example) in EXAMPLE_RULES {
        if lower.contains(trigger) {
            text.push_str(example);
            return;
        }
    }
}

/// Normalize model feedback into the persona's informal register.
///
/// Pure text rewriting: callers keep `is_complete` and `missing_elements`
/// exactly as judged.
pub(crate) fn normalize_feedback(feedback: &str, answer: &str) -> String {
    let mut text = feedback.trim().to_string();
    for (pattern, replacement) in TONE_RULES {
        text = text.replace(pattern, replacement);
    }
    let text = collapse_whitespace(&text);
    let mut text = ensure_acknowledgment(text, answer);
    append_example(&mut text);
    text
}
