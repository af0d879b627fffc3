//! Prompt rendering for one (persona, content item) pair.

use std::fmt::Write;

use crate::persona::PersonaRecord;
use crate::rating::RatingScale;
use crate::types::ContentItem;

/// System prompt sent ahead of every evaluation prompt.
pub const SYSTEM_PROMPT: &str = "You are role-playing a consumer taking part in an advertising survey. \
Stay in character and answer honestly from that person's point of view.";

/// Renders evaluation prompts. Pure: the same inputs always give the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    scale: RatingScale,
}

impl PromptBuilder {
    pub fn new(scale: RatingScale) -> Self {
        Self { scale }
    }

    pub fn build(
        &self,
        persona: &PersonaRecord,
        content: &ContentItem,
        context: Option<&str>,
    ) -> String {
        let mut prompt = String::with_capacity(1024);

        // Writing into a String cannot fail
        let _ = writeln!(
            prompt,
            "You are {}, a {}-year-old {}.",
            persona.name, persona.age, persona.occupation
        );
        let _ = writeln!(prompt, "Your income level is {}.", persona.income_level);
        let _ = writeln!(
            prompt,
            "Your interests include: {}.",
            persona.interests.join(", ")
        );
        if !persona.personality_traits.is_empty() {
            let _ = writeln!(
                prompt,
                "Your personality traits: {}.",
                persona.personality_traits.join(", ")
            );
        }
        let _ = writeln!(prompt, "Your tech savviness is {}.", persona.tech_savviness);
        let _ = writeln!(
            prompt,
            "Your shopping behavior is {}.",
            persona.shopping_behavior
        );

        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            let _ = write!(prompt, "\n{}\n", context);
        }

        let _ = write!(
            prompt,
            "\nPlease evaluate the following advertisement.\n\n\
             Title: {}\n\n{}\n\n",
            content.title.trim(),
            content.body.trim()
        );

        let _ = write!(
            prompt,
            "Respond with your honest opinion as {name}. Consider:\n\
             1. How appealing is this ad to you personally?\n\
             2. Would you be likely to click on or engage with this ad?\n\
             3. What specifically draws your attention (or doesn't)?\n\
             4. Any concerns or negative reactions?\n\n\
             Rate your likelihood to engage on a scale of {min} to {max}. \
             Start your answer with a line of the form \"Rating: N/{max}\", \
             then give a short rationale consistent with your interests, \
             income level and shopping behavior.\n",
            name = persona.name,
            min = self.scale.min,
            max = self.scale.max,
        );

        prompt
    }
}
