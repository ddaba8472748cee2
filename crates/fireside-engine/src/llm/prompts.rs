//! Prompt content for the interview judge and the learning analyst.
//!
//! All persona and instruction text lives here as data, away from the state
//! machine, so tone and rules can be tuned without touching control flow.

use fireside_core::Question;

/// System prompt shared by every conversational model call.
pub const PERSONA_SYSTEM: &str = r#"You are Ember, a warm and playful learning companion chatting with a child.

Rules:
- Speak informally, like a close friend. Say "you", never "the user".
- Never write "your answer", "please", or other formal phrasing.
- Acknowledge what the child already said before asking anything new.
- Use short sentences and simple words a child understands.
- Ask one thing at a time and offer tiny examples ("like English? or drawing?").
- A light emoji here and there is fine, never more than a couple per message."#;

/// Leniency tier applied to a completeness judgment. Tiers only loosen as the
/// subject keeps replying, so nobody gets trapped in an endless follow-up loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeniencyTier {
    /// First or second try: near-total coverage required.
    Strict,
    /// Two follow-up rounds consumed: 80% coverage is enough.
    Relaxed,
    /// Three or more rounds: 60% coverage is enough.
    Lenient,
}

impl LeniencyTier {
    pub fn for_follow_ups(count: u32) -> Self {
        if count >= 3 {
            LeniencyTier::Lenient
        } else if count == 2 {
            LeniencyTier::Relaxed
        } else {
            LeniencyTier::Strict
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            LeniencyTier::Strict => {
                "This is the child's first or second try. Be strict: mark is_complete true only when every required element is genuinely covered."
            }
            LeniencyTier::Relaxed => {
                "The child has already replied twice for this question. If at least 80% of the required elements are covered, mark is_complete true."
            }
            LeniencyTier::Lenient => {
                "The child has replied three or more times for this question. If at least 60% of the required elements are covered, mark is_complete true."
            }
        }
    }
}

/// Judgment prompt for one question's accumulated answer.
pub fn judgment_prompt(question: &Question, accumulated_answer: &str, tier: LeniencyTier) -> String {
    let elements = question
        .elements
        .iter()
        .map(|e| format!("- {}", e.label))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are judging whether a child's answer to an interview question is complete enough.

QUESTION:
{question}

THE CHILD'S ANSWER SO FAR (all replies for this question, combined):
{answer}

REQUIRED ELEMENTS (the answer should cover these):
{elements}

{leniency}

For each required element, check whether the answer covers it. Count covered
elements, never re-ask for things the child already said, and accept "I don't
know" or "I don't remember" as covering an element.

OUTPUT (JSON object only, no extra text):
{{
  "is_complete": true/false,
  "missing_elements": ["element label", "..."],
  "feedback": "What you say back to the child"
}}

FEEDBACK RULES:
- First acknowledge something the child said ("Cool, you told me about...").
- Then ask only about what is genuinely missing, one simple question per gap.
- Give tiny concrete examples so the child knows what you mean.
- 2-4 short sentences, informal, no greetings (the conversation is mid-flow).
- If is_complete is true, the feedback is a short cheerful acknowledgment."#,
        question = question.text,
        answer = accumulated_answer,
        elements = elements,
        leniency = tier.instruction(),
    )
}

/// One-shot extraction prompt for the name/age capture fallback.
pub fn name_age_prompt(message: &str) -> String {
    format!(
        r#"A child was asked for their name and age and replied:

{message}

Extract the name and age. Respond with this JSON object only:
{{
    "name": "the name",
    "age": number
}}

Use null for anything you cannot find. Return only the JSON."#,
        message = message
    )
}

/// System prompt for the learning-profile analyst pass.
pub const ANALYST_SYSTEM: &str = r#"You are an educational analyst writing for a supervising adult.

Rules:
- Write a clear, warm, professional narrative in plain language.
- Ground every observation in what the child actually said; quote briefly.
- Organize into short titled sections; separate sections with blank lines.
- Cover: learning motivators, preferred methods, social preference, feedback
  preference, things to avoid, and concrete suggestions.
- No diagnoses, no labels, no made-up details."#;

/// Analysis prompt for a finished interview transcript.
pub fn report_prompt(name: &str, age: u32, sections: &[(String, String)]) -> String {
    let answers = sections
        .iter()
        .map(|(label, answer)| {
            let answer = if answer.trim().is_empty() { "(no answer)" } else { answer.as_str() };
            format!("## {}\n{}", label, answer)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Write a learning-profile report about {name}, age {age}, based on this interview:

{answers}

The report goes to {name}'s supervisor. Describe how {name} seems to learn
best, what sparks their motivation, what drains it, and how to give them
feedback — each as its own short section, with practical suggestions at the
end."#,
        name = name,
        age = age,
        answers = answers,
    )
}
