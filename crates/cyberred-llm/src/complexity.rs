//! Task complexity tiers, generalized from `war_room.py`'s four named
//! personas (architect/engineer/strategist/ghost) to the three-tier enum
//! named in spec.md §4.O.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskComplexity {
    Fast,
    Standard,
    Complex,
}

const COMPLEX_MARKERS: &[&str] = &["strategy", "plan", "architecture", "multi-step", "chain of"];
const FAST_MAX_LEN: usize = 200;

/// Infers complexity from a request's prompt text. Short prompts with no
/// planning-language markers route to `Fast`; prompts mentioning strategic
/// language route to `Complex`; everything else is `Standard`. This is a
/// heuristic, not a classifier — callers that know their own complexity
/// should set it explicitly rather than rely on inference.
pub fn infer_complexity(prompt: &str) -> TaskComplexity {
    let lowered = prompt.to_lowercase();
    if COMPLEX_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return TaskComplexity::Complex;
    }
    if prompt.len() <= FAST_MAX_LEN {
        return TaskComplexity::Fast;
    }
    TaskComplexity::Standard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_is_fast() {
        assert_eq!(infer_complexity("list open ports"), TaskComplexity::Fast);
    }

    #[test]
    fn strategic_language_is_complex() {
        assert_eq!(
            infer_complexity("draft a multi-step attack strategy for this host"),
            TaskComplexity::Complex
        );
    }

    #[test]
    fn long_plain_prompt_is_standard() {
        let prompt = "a".repeat(400);
        assert_eq!(infer_complexity(&prompt), TaskComplexity::Standard);
    }
}
