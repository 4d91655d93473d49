//! Canned texts used when the model output is short, malformed or missing.
//!
//! Every string may contain `{slide}`, replaced with the 1-based slide number.
//! Built-in sets exist for Chinese and English; a TOML file can override any
//! subset of fields:
//!
//! ```toml
//! [filler]
//! middle = "Let us look more closely at slide {slide}."
//!
//! [placeholders]
//! missing = "[slide {slide} was skipped]"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::Language;

/// Position of a slide for filler purposes. Five mutually exclusive bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerBand {
    Opening,
    Early,
    Middle,
    Late,
    Closing,
}

impl FillerBand {
    pub fn for_slide(slide: usize, total: usize) -> Self {
        if slide <= 1 {
            return FillerBand::Opening;
        }
        if slide >= total {
            return FillerBand::Closing;
        }
        let ratio = slide as f64 / total as f64;
        if ratio < 0.3 {
            FillerBand::Early
        } else if ratio < 0.7 {
            FillerBand::Middle
        } else {
            FillerBand::Late
        }
    }
}

/// Which static narration stands in for a slide the model never described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRole {
    First,
    Middle,
    Last,
}

impl FallbackRole {
    pub fn for_slide(slide: usize, total: usize) -> Self {
        if slide <= 1 {
            FallbackRole::First
        } else if slide >= total {
            FallbackRole::Last
        } else {
            FallbackRole::Middle
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerTemplates {
    pub opening: String,
    pub early: String,
    pub middle: String,
    pub late: String,
    pub closing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTemplates {
    pub first: String,
    pub middle: String,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderTemplates {
    /// JSON response held fewer usable items than slides
    pub missing: String,
    /// Marker split found no section for this slide
    pub unparsed: String,
    /// Response could not be split at all
    pub batch_failed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationTemplates {
    pub filler: FillerTemplates,
    pub fallback: FallbackTemplates,
    pub placeholders: PlaceholderTemplates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateOverrides {
    filler: FillerOverrides,
    fallback: FallbackOverrides,
    placeholders: PlaceholderOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FillerOverrides {
    opening: Option<String>,
    early: Option<String>,
    middle: Option<String>,
    late: Option<String>,
    closing: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FallbackOverrides {
    first: Option<String>,
    middle: Option<String>,
    last: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlaceholderOverrides {
    missing: Option<String>,
    unparsed: Option<String>,
    batch_failed: Option<String>,
}

fn overlay(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn render(template: &str, slide: usize) -> String {
    template.replace("{slide}", &slide.to_string())
}

impl NarrationTemplates {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Chinese => Self::chinese(),
            Language::English => Self::english(),
        }
    }

    /// Built-in set for `language`, with any fields from `path` applied on top.
    pub fn load(language: Language, path: Option<&Path>) -> Result<Self> {
        let mut templates = Self::for_language(language);
        let Some(path) = path else {
            return Ok(templates);
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading narration templates from {}", path.display()))?;
        let overrides: TemplateOverrides = toml::from_str(&contents)
            .with_context(|| format!("parsing narration templates at {}", path.display()))?;
        templates.apply(overrides);

        let blank = templates.blank_fields();
        if !blank.is_empty() {
            bail!(
                "narration templates at {} leave {} empty; fillers and fallbacks need text",
                path.display(),
                blank.join(", ")
            );
        }
        Ok(templates)
    }

    /// Filler and fallback fields with no text. Repair relies on both.
    fn blank_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("filler.opening", &self.filler.opening),
            ("filler.early", &self.filler.early),
            ("filler.middle", &self.filler.middle),
            ("filler.late", &self.filler.late),
            ("filler.closing", &self.filler.closing),
            ("fallback.first", &self.fallback.first),
            ("fallback.middle", &self.fallback.middle),
            ("fallback.last", &self.fallback.last),
        ];
        fields
            .into_iter()
            .filter(|(_, text)| text.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    fn apply(&mut self, overrides: TemplateOverrides) {
        let TemplateOverrides {
            filler,
            fallback,
            placeholders,
        } = overrides;

        overlay(&mut self.filler.opening, filler.opening);
        overlay(&mut self.filler.early, filler.early);
        overlay(&mut self.filler.middle, filler.middle);
        overlay(&mut self.filler.late, filler.late);
        overlay(&mut self.filler.closing, filler.closing);

        overlay(&mut self.fallback.first, fallback.first);
        overlay(&mut self.fallback.middle, fallback.middle);
        overlay(&mut self.fallback.last, fallback.last);

        overlay(&mut self.placeholders.missing, placeholders.missing);
        overlay(&mut self.placeholders.unparsed, placeholders.unparsed);
        overlay(&mut self.placeholders.batch_failed, placeholders.batch_failed);
    }

    pub fn filler(&self, slide: usize, total: usize) -> String {
        let template = match FillerBand::for_slide(slide, total) {
            FillerBand::Opening => &self.filler.opening,
            FillerBand::Early => &self.filler.early,
            FillerBand::Middle => &self.filler.middle,
            FillerBand::Late => &self.filler.late,
            FillerBand::Closing => &self.filler.closing,
        };
        render(template, slide)
    }

    pub fn fallback(&self, slide: usize, total: usize) -> String {
        let template = match FallbackRole::for_slide(slide, total) {
            FallbackRole::First => &self.fallback.first,
            FallbackRole::Middle => &self.fallback.middle,
            FallbackRole::Last => &self.fallback.last,
        };
        render(template, slide)
    }

    pub fn missing(&self, slide: usize) -> String {
        render(&self.placeholders.missing, slide)
    }

    pub fn unparsed(&self, slide: usize) -> String {
        render(&self.placeholders.unparsed, slide)
    }

    pub fn batch_failed(&self, slide: usize) -> String {
        render(&self.placeholders.batch_failed, slide)
    }

    fn chinese() -> Self {
        Self {
            filler: FillerTemplates {
                opening: "各位朋友，欢迎大家参加今天的分享。在开始之前，我想先简要介绍一下今天演讲的背景和目的。\n\
我们将深入探讨这个主题的各个方面，从基础概念到实际应用，力求为大家提供全面而深入的理解。\n\
在接下来的内容中，我会通过具体的案例和详细的分析，帮助大家更好地掌握相关知识。\n\
让我们一起开始这段学习之旅。"
                    .to_string(),
                early: "在这一部分，我们将建立对这个主题的基础理解。\n\
这些概念虽然看似简单，但它们是理解后续内容的关键基础。\n\
让我们仔细分析每个要点，确保大家都能够充分理解。\n\
这将为我们后面的深入讨论打下坚实的基础。\n\
请大家注意这些关键概念之间的联系，它们共同构成了我们理解这个领域的框架。"
                    .to_string(),
                middle: "现在让我们深入探讨这个话题的核心内容。\n\
这一页展示的信息非常关键，它直接关系到我们如何理解和应用相关技术。\n\
我想通过几个具体的例子来说明这些概念的实际意义。\n\
大家可以看到，这里的每个要点都有其独特的价值和应用场景。\n\
让我们逐一分析，看看它们如何相互配合，形成一个完整的解决方案。\n\
这种系统性的理解对于我们掌握整体框架至关重要。"
                    .to_string(),
                late: "基于前面的讨论，我们现在可以看到更完整的图景。\n\
这些内容不仅总结了我们之前探讨的要点，还指出了未来的发展方向。\n\
让我们思考一下这些知识在实际应用中的意义。\n\
通过将理论与实践相结合，我们能够更好地解决实际问题。\n\
这里展示的方法和技巧，都是经过验证的最佳实践。\n\
希望大家能够将这些内容应用到自己的工作中。"
                    .to_string(),
                closing: "到这里，我们的分享就接近尾声了。让我们回顾一下今天讨论的主要内容。\n\
通过这次演讲，我们深入了解了相关的理论基础和实践方法，\n\
探讨了如何将这些知识应用到实际工作中，以及未来的发展方向。\n\
希望今天的分享能够对大家有所启发，帮助大家在各自的领域取得更好的成果。\n\
如果大家有任何问题或想进一步交流，请随时与我联系。\n\
再次感谢大家的参与和支持！"
                    .to_string(),
            },
            fallback: FallbackTemplates {
                first: "欢迎大家来到今天的技术分享会。我将为大家介绍本次演讲的主题内容。\n\
这是一个非常有价值的话题，涉及到当前技术发展的重要方向。\n\
在接下来的时间里，我们将一起探讨相关的概念、方法和实践经验。\n\
希望通过这次分享，能够为大家带来新的思考和启发。"
                    .to_string(),
                middle: "现在我们来看第{slide}页的内容。这一页展示了非常重要的概念和信息。\n\
让我们仔细分析页面上的每个要点，理解它们之间的关联和意义。\n\
这些内容与我们之前讨论的主题紧密相关，是整体知识框架中不可或缺的一部分。\n\
通过深入理解这些概念，我们能够更好地把握技术的本质和应用方向。\n\
请大家注意这里的关键信息，它们将在后续的内容中发挥重要作用。"
                    .to_string(),
                last: "这就是今天要分享的全部内容。通过前面的讲解，\n\
我们系统地了解了相关的理论知识和实践方法。\n\
希望这些内容能够帮助大家在实际工作中更好地应用这些技术。\n\
如果大家有任何疑问或想要深入讨论的地方，欢迎随时提出。\n\
感谢大家的时间和关注，祝大家工作顺利！"
                    .to_string(),
            },
            placeholders: PlaceholderTemplates {
                missing: "[错误：未能生成第{slide}页的讲稿]".to_string(),
                unparsed: "[错误：未能解析第{slide}页的讲稿]".to_string(),
                batch_failed: "[错误：批量生成失败，请尝试单独生成]".to_string(),
            },
        }
    }

    fn english() -> Self {
        Self {
            filler: FillerTemplates {
                opening: "Welcome, everyone, and thank you for joining today's session. Before we begin, \
let me briefly set out the background and the goal of this talk. We will look at the topic from \
several angles, from the basic concepts all the way to practical applications, so that you leave \
with a complete picture. Along the way I will use concrete examples and careful analysis to make \
each idea easy to follow. Let's get started."
                    .to_string(),
                early: "In this part we build a shared foundation for the rest of the talk. These ideas \
may look simple, but everything that follows depends on them. Let's go through each point carefully \
so that nobody is left behind, and pay attention to how these concepts connect, because together \
they form the framework we will keep coming back to."
                    .to_string(),
                middle: "Now let's dig into the core of the topic. The information on this slide is \
central to how we understand and apply the ideas we are discussing. A few concrete examples help \
show what these concepts mean in practice. Each point here has its own value and its own use cases, \
so let's go through them one by one and see how they fit together into a complete solution."
                    .to_string(),
                late: "Building on everything we have discussed, the bigger picture is now coming into \
view. This part draws together the points we covered earlier and also shows where things are heading \
next. Think about what this knowledge means in day-to-day work: by combining the theory with practice, \
we can solve real problems more effectively. I hope you can put these approaches to use in your own work."
                    .to_string(),
                closing: "That brings us close to the end of today's talk, so let's recap the main points. \
We covered the underlying theory and the practical methods, discussed how to apply them in real work, \
and looked at where the field is heading. I hope today's session gives you some fresh ideas for your \
own projects. If you have any questions or would like to continue the discussion, please reach out. \
Thank you again for your time and attention."
                    .to_string(),
            },
            fallback: FallbackTemplates {
                first: "Welcome to today's presentation. I will walk you through the main topic of this talk. \
It is a valuable subject that touches on an important direction in current practice. Over the next \
few minutes we will explore the relevant concepts, methods and lessons learned together. I hope this \
session gives you new ideas and some useful inspiration."
                    .to_string(),
                middle: "Let's turn to slide {slide}. This slide presents some important concepts and \
information. We will go through each point on the page and look at how they relate to one another. \
This content ties closely to what we discussed earlier and is an essential part of the overall picture. \
Keep these key points in mind, as they will matter in the sections that follow."
                    .to_string(),
                last: "That is everything I wanted to share today. Over the course of this talk we have \
looked at the relevant background and the practical methods in a structured way. I hope this helps \
you apply these ideas in your own work. If you have any questions or would like to discuss anything \
in more depth, please feel free to ask. Thank you for your time and attention."
                    .to_string(),
            },
            placeholders: PlaceholderTemplates {
                missing: "[Error: no narration was generated for slide {slide}]".to_string(),
                unparsed: "[Error: the narration for slide {slide} could not be parsed]".to_string(),
                batch_failed: "[Error: batch generation failed, try generating slides individually]"
                    .to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filler_bands_are_mutually_exclusive() {
        assert_eq!(FillerBand::for_slide(1, 10), FillerBand::Opening);
        assert_eq!(FillerBand::for_slide(2, 10), FillerBand::Early);
        assert_eq!(FillerBand::for_slide(3, 10), FillerBand::Middle);
        assert_eq!(FillerBand::for_slide(6, 10), FillerBand::Middle);
        assert_eq!(FillerBand::for_slide(7, 10), FillerBand::Late);
        assert_eq!(FillerBand::for_slide(9, 10), FillerBand::Late);
        assert_eq!(FillerBand::for_slide(10, 10), FillerBand::Closing);
        assert_eq!(FillerBand::for_slide(1, 1), FillerBand::Opening);
    }

    #[test]
    fn fallback_roles_cover_first_middle_last() {
        assert_eq!(FallbackRole::for_slide(1, 3), FallbackRole::First);
        assert_eq!(FallbackRole::for_slide(2, 3), FallbackRole::Middle);
        assert_eq!(FallbackRole::for_slide(3, 3), FallbackRole::Last);
    }

    #[test]
    fn middle_fallback_names_the_slide() {
        let templates = NarrationTemplates::for_language(Language::Chinese);
        assert!(templates.fallback(4, 9).starts_with("现在我们来看第4页的内容"));
        assert_eq!(templates.missing(7), "[错误：未能生成第7页的讲稿]");
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("templates.toml");
        fs::write(
            &path,
            "[filler]\nmiddle = \"extra for {slide}\"\n\n[placeholders]\nmissing = \"gap {slide}\"\n",
        )
        .unwrap();

        let templates = NarrationTemplates::load(Language::English, Some(&path)).unwrap();
        let builtin = NarrationTemplates::for_language(Language::English);
        assert_eq!(templates.filler(5, 10), "extra for 5");
        assert_eq!(templates.missing(2), "gap 2");
        assert_eq!(templates.filler.opening, builtin.filler.opening);
        assert_eq!(templates.fallback, builtin.fallback);
    }

    #[test]
    fn blank_filler_override_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("templates.toml");
        fs::write(&path, "[filler]\nmiddle = \"\"\n\n[fallback]\nlast = \"  \"\n").unwrap();

        let err = NarrationTemplates::load(Language::English, Some(&path)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("filler.middle"), "{message}");
        assert!(message.contains("fallback.last"), "{message}");
    }

    #[test]
    fn built_in_sets_have_no_blank_fields() {
        for language in [Language::Chinese, Language::English] {
            assert!(NarrationTemplates::for_language(language).blank_fields().is_empty());
        }
    }
}
