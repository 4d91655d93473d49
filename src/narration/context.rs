use super::{Language, Narration};

/// How many prior narrations are summarized into each batch context.
pub const SUMMARY_WINDOW: usize = 5;
/// Characters kept from each prior narration.
pub const SUMMARY_CHARS: usize = 100;

/// Append-only record of accepted narrations, in slide order.
#[derive(Debug, Default, Clone)]
pub struct NarrationLog {
    entries: Vec<Narration>,
}

impl NarrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, narration: Narration) {
        self.entries.push(narration);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[Narration] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn into_inner(self) -> Vec<Narration> {
        self.entries
    }
}

/// Coarse position of a batch inside the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckSection {
    Early,
    Middle,
    Late,
}

impl DeckSection {
    /// `first_slide` is 1-based.
    pub fn for_batch(first_slide: usize, total: usize) -> Self {
        let ratio = first_slide as f64 / total.max(1) as f64;
        if ratio <= 0.3 {
            DeckSection::Early
        } else if ratio <= 0.7 {
            DeckSection::Middle
        } else {
            DeckSection::Late
        }
    }

    fn hint(self, language: Language) -> &'static str {
        match (language, self) {
            (Language::Chinese, DeckSection::Early) => "这是演讲的前期部分，请做好铺垫",
            (Language::Chinese, DeckSection::Middle) => "这是演讲的中间部分，请深入展开",
            (Language::Chinese, DeckSection::Late) => "这是演讲的后期部分，请注意总结",
            (Language::English, DeckSection::Early) => {
                "This is the early part of the talk, lay the groundwork"
            }
            (Language::English, DeckSection::Middle) => {
                "This is the middle of the talk, go into depth"
            }
            (Language::English, DeckSection::Late) => {
                "This is the late part of the talk, start drawing conclusions"
            }
        }
    }
}

/// First `SUMMARY_CHARS` characters, with `...` when anything was cut.
pub fn summarize(text: &str) -> String {
    if text.chars().count() > SUMMARY_CHARS {
        let head: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Context handed to the model for slides `first..=last` (1-based) of `total`.
pub fn build_batch_context(
    base: &str,
    log: &NarrationLog,
    first: usize,
    last: usize,
    total: usize,
    language: Language,
) -> String {
    let mut parts: Vec<String> = vec![base.to_string()];

    parts.push(match language {
        Language::Chinese => format!("\n当前处理第{first}-{last}页（共{total}页）"),
        Language::English => format!("\nNow processing slides {first}-{last} (of {total})"),
    });
    parts.push(DeckSection::for_batch(first, total).hint(language).to_string());

    if !log.is_empty() {
        parts.push(match language {
            Language::Chinese => "\n=== 已生成的演讲稿概要 ===".to_string(),
            Language::English => "\n=== Summary of narrations so far ===".to_string(),
        });

        for narration in log.recent(SUMMARY_WINDOW) {
            let summary = summarize(&narration.transcript);
            parts.push(match language {
                Language::Chinese => format!("第{}页: {summary}", narration.slide_number),
                Language::English => format!("Slide {}: {summary}", narration.slide_number),
            });
        }

        parts.push(match language {
            Language::Chinese => "\n请继续生成演讲稿，保持连贯性。".to_string(),
            Language::English => {
                "\nPlease continue the narration and keep it coherent with the above.".to_string()
            }
        });
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narration(slide: usize, text: &str) -> Narration {
        Narration {
            slide_number: slide,
            transcript: text.to_string(),
        }
    }

    #[test]
    fn first_batch_has_no_summaries() {
        let context = build_batch_context("BASE", &NarrationLog::new(), 1, 5, 12, Language::Chinese);
        assert_eq!(
            context,
            "BASE\n\n当前处理第1-5页（共12页）\n这是演讲的前期部分，请做好铺垫"
        );
    }

    #[test]
    fn context_summarizes_at_most_five_recent_narrations() {
        let mut log = NarrationLog::new();
        for slide in 1..=7 {
            log.push(narration(slide, &format!("text {slide}")));
        }

        let context = build_batch_context("BASE", &log, 8, 10, 10, Language::English);
        assert!(!context.contains("Slide 2: text 2"));
        for slide in 3..=7 {
            assert!(context.contains(&format!("Slide {slide}: text {slide}")));
        }
        assert!(context.contains("late part of the talk"));
        assert!(context.ends_with("keep it coherent with the above."));
    }

    #[test]
    fn summaries_count_characters_not_bytes() {
        let long: String = "讲".repeat(150);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), SUMMARY_CHARS + 3);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize("short"), "short");
    }

    #[test]
    fn section_thresholds_are_inclusive() {
        assert_eq!(DeckSection::for_batch(3, 10), DeckSection::Early);
        assert_eq!(DeckSection::for_batch(4, 10), DeckSection::Middle);
        assert_eq!(DeckSection::for_batch(7, 10), DeckSection::Middle);
        assert_eq!(DeckSection::for_batch(8, 10), DeckSection::Late);
    }
}
