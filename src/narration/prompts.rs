use super::Language;
use crate::config::NarrationStyle;

fn persona(style: NarrationStyle, language: Language) -> &'static str {
    match (language, style) {
        (Language::Chinese, NarrationStyle::Professional) => {
            "你是一位专业的演讲者，擅长清晰、简洁地传达信息。"
        }
        (Language::Chinese, NarrationStyle::Casual) => {
            "你是一位轻松友好的演讲者，喜欢用通俗易懂的语言。"
        }
        (Language::Chinese, NarrationStyle::Academic) => "你是一位学术演讲者，注重准确性和深度。",
        (Language::Chinese, NarrationStyle::Storytelling) => {
            "你是一位善于讲故事的演讲者，擅长用生动的叙述吸引听众。"
        }
        (Language::English, NarrationStyle::Professional) => {
            "You are a professional speaker who conveys information clearly and concisely."
        }
        (Language::English, NarrationStyle::Casual) => {
            "You are a relaxed, friendly speaker who prefers plain, approachable language."
        }
        (Language::English, NarrationStyle::Academic) => {
            "You are an academic speaker who values precision and depth."
        }
        (Language::English, NarrationStyle::Storytelling) => {
            "You are a storyteller who keeps the audience engaged with vivid narration."
        }
    }
}

/// System prompt for a multi-slide request answered as a JSON array.
pub fn batch_system_prompt(style: NarrationStyle, language: Language) -> String {
    let persona = persona(style, language);
    match language {
        Language::Chinese => format!(
            "{persona}\n你需要根据提供的多页PPT内容，为每一页生成相应的演讲稿。\n\n要求：\n\
1. 为每一页单独生成演讲稿\n\
2. 使用JSON格式返回，格式为：[{{\"slide_number\": 1, \"transcript\": \"演讲稿内容\"}}, ...]\n\
3. 语言流畅自然，适合口语表达\n\
4. 内容准确，不要编造信息\n\
5. 适当展开，但不要过于冗长\n\
6. 保持整体演讲的连贯性和逻辑性\n\
7. 注意前后页面的内容衔接"
        ),
        Language::English => format!(
            "{persona}\nYou need to generate speech scripts for multiple PPT slides.\n\nRequirements:\n\
1. Generate a separate script for each slide\n\
2. Return in JSON format: [{{\"slide_number\": 1, \"transcript\": \"speech content\"}}, ...]\n\
3. Use natural, fluent language suitable for speaking\n\
4. Be accurate, don't make up information\n\
5. Elaborate appropriately but don't be too verbose\n\
6. Maintain coherence and logic throughout the presentation\n\
7. Ensure smooth transitions between slides"
        ),
    }
}

/// System prompt for a single slide answered in plain text.
pub fn single_system_prompt(style: NarrationStyle, language: Language) -> String {
    let persona = persona(style, language);
    match language {
        Language::Chinese => format!(
            "{persona}\n你需要根据PPT页面的内容生成相应的演讲稿。\n要求：\n\
1. 语言流畅自然，适合口语表达\n\
2. 内容准确，不要编造信息\n\
3. 适当展开，但不要过于冗长\n\
4. 如果是标题页，简要介绍主题\n\
5. 如果有图表，解释其含义\n\
6. 保持与整体演讲的连贯性"
        ),
        Language::English => format!(
            "{persona}\nYou need to generate a speech script based on the PPT slide content.\nRequirements:\n\
1. Use natural, fluent language suitable for speaking\n\
2. Be accurate, don't make up information\n\
3. Elaborate appropriately but don't be too verbose\n\
4. For title slides, briefly introduce the topic\n\
5. For charts/diagrams, explain their meaning\n\
6. Maintain coherence with the overall presentation"
        ),
    }
}

pub fn batch_user_prompt(slide_count: usize, context: Option<&str>, language: Language) -> String {
    let context = context.map(str::trim).filter(|c| !c.is_empty());
    match language {
        Language::Chinese => {
            let mut prompt = format!("以下是{slide_count}页PPT的内容。");
            if let Some(context) = context {
                prompt.push_str(&format!("\n演讲背景：{context}"));
            }
            prompt.push_str("\n请为每一页生成合适的演讲稿，以JSON格式返回。");
            prompt
        }
        Language::English => {
            let mut prompt = format!("Here are {slide_count} PPT slides.");
            if let Some(context) = context {
                prompt.push_str(&format!("\nPresentation context: {context}"));
            }
            prompt.push_str(
                "\nPlease generate appropriate speech scripts for each slide and return in JSON format.",
            );
            prompt
        }
    }
}

pub fn single_user_prompt(
    slide: usize,
    total: usize,
    context: Option<&str>,
    language: Language,
) -> String {
    let context = context.map(str::trim).filter(|c| !c.is_empty());
    match language {
        Language::Chinese => {
            let mut prompt = format!("这是第{slide}页，共{total}页。");
            if let Some(context) = context {
                prompt.push_str(&format!("\n演讲背景：{context}"));
            }
            prompt.push_str("\n请为这一页生成合适的演讲稿。");
            prompt
        }
        Language::English => {
            let mut prompt = format!("This is slide {slide} of {total}.");
            if let Some(context) = context {
                prompt.push_str(&format!("\nPresentation context: {context}"));
            }
            prompt.push_str("\nPlease generate an appropriate speech script for this slide.");
            prompt
        }
    }
}

/// Label placed before each image so the model can refer to slides by number.
pub fn slide_label(slide: usize, language: Language) -> String {
    match language {
        Language::Chinese => format!("[第{slide}页]"),
        Language::English => format!("[Slide {slide}]"),
    }
}

/// Base instructions asking for long, detailed narration, prefixed by the
/// caller's own context when given.
pub fn detailed_instructions(user_context: Option<&str>, language: Language) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(context) = user_context.map(str::trim).filter(|c| !c.is_empty()) {
        parts.push(context);
    }

    let guidance: &[&str] = match language {
        Language::Chinese => &[
            "请为每一页PPT生成详细的演讲稿。",
            "每页的演讲稿应该：",
            "1. 至少阅读两分钟",
            "2. 详细解释页面上的所有要点",
            "3. 适当展开和补充相关信息",
            "4. 使用流畅自然的口语表达",
            "5. 包含适当的过渡语句连接前后内容",
            "6. 如果是标题页，要介绍演讲的背景和目的",
            "7. 如果有图表或数据，要详细解释其含义和重要性",
            "请确保演讲稿内容丰富、表达完整。",
        ],
        Language::English => &[
            "Please write a detailed narration for every slide.",
            "Each slide's narration should:",
            "1. Take at least two minutes to read aloud",
            "2. Explain every point on the slide in detail",
            "3. Expand on the content and add relevant background",
            "4. Use fluent, natural spoken language",
            "5. Include transitions that connect to the surrounding slides",
            "6. For a title slide, introduce the background and purpose of the talk",
            "7. For charts or data, explain what they mean and why they matter",
            "Make sure the narration is rich in content and complete.",
        ],
    };
    parts.extend_from_slice(guidance);
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_prompt_requests_json_array() {
        let prompt = batch_system_prompt(NarrationStyle::Academic, Language::English);
        assert!(prompt.starts_with("You are an academic speaker"));
        assert!(prompt.contains(r#"[{"slide_number": 1, "transcript": "speech content"}, ...]"#));
    }

    #[test]
    fn labels_follow_language() {
        assert_eq!(slide_label(3, Language::Chinese), "[第3页]");
        assert_eq!(slide_label(3, Language::English), "[Slide 3]");
    }

    #[test]
    fn user_prompt_skips_blank_context() {
        let prompt = batch_user_prompt(4, Some("   "), Language::Chinese);
        assert_eq!(prompt, "以下是4页PPT的内容。\n请为每一页生成合适的演讲稿，以JSON格式返回。");
    }

    #[test]
    fn detailed_instructions_lead_with_user_context() {
        let text = detailed_instructions(Some("Internal training"), Language::English);
        assert!(text.starts_with("Internal training\nPlease write a detailed narration"));
    }
}
