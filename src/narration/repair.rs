use super::templates::NarrationTemplates;

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Append the slide's filler paragraph until `text` reaches `min_chars`.
/// Existing text is never shortened.
pub fn extend_to_minimum(
    text: &str,
    slide: usize,
    total: usize,
    min_chars: usize,
    templates: &NarrationTemplates,
) -> String {
    let mut repaired = text.trim().to_string();
    if char_len(&repaired) >= min_chars {
        return repaired;
    }

    let filler = templates.filler(slide, total);
    let filler = filler.trim();
    if filler.is_empty() {
        return repaired;
    }

    while char_len(&repaired) < min_chars {
        if repaired.is_empty() {
            repaired.push_str(filler);
        } else {
            repaired.push_str("\n\n");
            repaired.push_str(filler);
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::Language;

    #[test]
    fn long_enough_text_is_untouched() {
        let templates = NarrationTemplates::for_language(Language::English);
        let text = "x".repeat(50);
        assert_eq!(extend_to_minimum(&text, 2, 5, 50, &templates), text);
    }

    #[test]
    fn short_text_gets_its_band_filler() {
        let templates = NarrationTemplates::for_language(Language::Chinese);
        let repaired = extend_to_minimum("简短。", 1, 5, 50, &templates);
        assert!(repaired.starts_with("简短。\n\n各位朋友，欢迎大家参加今天的分享。"));
        assert!(char_len(&repaired) >= 50);
    }

    #[test]
    fn filler_repeats_until_minimum_is_met() {
        let mut templates = NarrationTemplates::for_language(Language::English);
        templates.filler.middle = "0123456789".to_string();

        let repaired = extend_to_minimum("seed", 5, 10, 40, &templates);
        assert!(char_len(&repaired) >= 40);
        assert_eq!(repaired.matches("0123456789").count(), 3);
        assert!(repaired.starts_with("seed\n\n"));
    }
}
