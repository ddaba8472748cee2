//! Canned persona text and identity-intent matchers.
//!
//! The matchers run on every turn before any state logic, so they stay cheap
//! keyword checks and never call the model. All texts are data.

pub const INTRODUCTION: &str = "Hi! I'm Ember 😊 I love hearing how kids like to learn, and I have a few fun questions for you. There are no wrong answers — just tell me about you!\n\nFirst things first: what's your name, and how old are you? You can say something like \"I'm Alex and I'm 10\".";

pub const WHO_ARE_YOU_RESPONSE: &str = "I'm Ember — a friendly companion who chats with you about how you like to learn, so the grown-ups helping you can do it even better. 😊";

pub const ABOUT_SYSTEM_RESPONSE: &str = "This is a short, friendly interview: I ask a few questions about how you like to learn, and when we're done I put together some notes for your supervisor. Nothing you tell me goes anywhere else.";

pub const COMPLETION_MESSAGE: &str = "And that was the last question — thank you! 🎉 You told me so many cool things today. We're all done; your supervisor will get a little summary of what we talked about.";

pub const ALREADY_FINISHED_MESSAGE: &str = "We already finished the interview! Send /start if you'd like to do it again, or ask me anything else. 😊";

const WHO_ARE_YOU_PATTERNS: &[&str] = &[
    "who are you",
    "who r u",
    "what are you",
    "what's your name",
    "whats your name",
    "your name?",
    "who is ember",
];

const ABOUT_SYSTEM_PATTERNS: &[&str] = &[
    "about the system",
    "about this system",
    "how do you work",
    "how does this work",
    "what is this bot",
    "what is this for",
    "what happens to my answers",
    "why are you asking",
];

const MOTIVATIONAL_TRANSITIONS: &[&str] = &[
    "You're doing great — let's keep going!",
    "Awesome answers so far! 🌟",
    "I'm loving this. Next one!",
    "High five! ✋ Here comes another one.",
    "You're on a roll!",
    "This is so interesting! One more coming up.",
];

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    let lower = message.to_lowercase();
    patterns.iter().any(|pattern| lower.contains(pattern))
}

pub fn is_who_are_you(message: &str) -> bool {
    matches_any(message, WHO_ARE_YOU_PATTERNS)
}

pub fn is_about_system(message: &str) -> bool {
    matches_any(message, ABOUT_SYSTEM_PATTERNS)
}

/// Transition phrase for the question at `index`. Deterministic so transcripts
/// and tests are stable.
pub fn motivational_transition(index: usize) -> &'static str {
    MOTIVATIONAL_TRANSITIONS[index % MOTIVATIONAL_TRANSITIONS.len()]
}
