use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;

/// Replays canned responses in order; once exhausted it repeats the last one.
struct ScriptedVision {
    responses: Mutex<Vec<Result<String, VisionError>>>,
    requests: Mutex<Vec<VisionRequest>>,
}

impl ScriptedVision {
    fn new(responses: Vec<Result<String, VisionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self::new(vec![Err(VisionError::Unavailable("down".to_string()))])
    }

    fn requests(&self) -> Vec<VisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn clone_result(result: &Result<String, VisionError>) -> Result<String, VisionError> {
    match result {
        Ok(text) => Ok(text.clone()),
        Err(err) => Err(VisionError::Unavailable(err.to_string())),
    }
}

#[async_trait]
impl VisionClient for ScriptedVision {
    async fn complete(&self, request: &VisionRequest) -> Result<String, VisionError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            clone_result(&responses[0])
        }
    }
}

fn slides(count: usize) -> Vec<Slide> {
    (1..=count)
        .map(|number| Slide {
            number,
            image_path: PathBuf::from(format!("/tmp/slide_{number:03}.png")),
        })
        .collect()
}

fn settings(batch_size: usize, min_chars: usize, language: Language) -> NarrationSettings {
    NarrationSettings {
        style: NarrationStyle::Professional,
        language,
        min_chars,
        batch_size,
        max_tokens: 1000,
        temperature: 0.5,
    }
}

fn json_batch(first: usize, count: usize, text: &str) -> String {
    let items: Vec<serde_json::Value> = (first..first + count)
        .map(|n| serde_json::json!({ "slide_number": n, "transcript": format!("{text} {n}") }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn generator<'a>(client: &'a ScriptedVision, settings: NarrationSettings) -> NarrationGenerator<'a> {
    let templates = NarrationTemplates::for_language(settings.language);
    NarrationGenerator::new(client, settings, templates, RetryPolicy::immediate(2))
}

#[tokio::test]
async fn narrations_cover_every_slide_in_order_for_any_batch_size() {
    for batch_size in [1, 2, 3, 5, 7] {
        let responses = (0..7)
            .step_by(batch_size)
            .map(|start| Ok(json_batch(start + 1, batch_size.min(7 - start), "body")))
            .collect();
        let client = ScriptedVision::new(responses);
        let narrations = generator(&client, settings(batch_size, 0, Language::English))
            .narrate_deck(&slides(7), None)
            .await;

        let numbers: Vec<usize> = narrations.iter().map(|n| n.slide_number).collect();
        assert_eq!(numbers, (1..=7).collect::<Vec<_>>(), "batch size {batch_size}");
        assert_eq!(narrations[6].transcript, "body 7");
    }
}

#[tokio::test]
async fn short_model_output_is_extended_to_the_minimum() {
    let client = ScriptedVision::new(vec![Ok(json_batch(1, 3, "tiny"))]);
    let narrations = generator(&client, settings(5, 120, Language::English))
        .narrate_deck(&slides(3), None)
        .await;

    for narration in &narrations {
        assert!(narration.transcript.chars().count() >= 120);
        assert!(narration.transcript.starts_with("tiny"));
    }
}

#[tokio::test]
async fn total_outage_yields_role_fallbacks() {
    let client = ScriptedVision::failing();
    let templates = NarrationTemplates::for_language(Language::Chinese);
    let narrations = generator(&client, settings(5, 0, Language::Chinese))
        .narrate_deck(&slides(3), None)
        .await;

    assert_eq!(narrations.len(), 3);
    assert_eq!(narrations[0].transcript, templates.fallback(1, 3));
    assert_eq!(narrations[1].transcript, templates.fallback(2, 3));
    assert_eq!(narrations[2].transcript, templates.fallback(3, 3));
    assert!(narrations[1].transcript.contains("第2页"));

    // one batch request plus one per slide, each attempted twice
    assert_eq!(client.requests().len(), 2 + 3 * 2);
}

#[tokio::test]
async fn failed_batch_falls_back_to_single_slide_requests() {
    let client = ScriptedVision::new(vec![
        Err(VisionError::Unavailable("busy".to_string())),
        Err(VisionError::Unavailable("busy".to_string())),
        Ok("first slide words".to_string()),
        Ok("second slide words".to_string()),
    ]);
    let narrations = generator(&client, settings(5, 0, Language::English))
        .narrate_deck(&slides(2), None)
        .await;

    assert_eq!(narrations[0].transcript, "first slide words");
    assert_eq!(narrations[1].transcript, "second slide words");

    let requests = client.requests();
    assert_eq!(requests[0].image_count(), 2);
    assert_eq!(requests[2].image_count(), 1);
    assert!(requests[3].system.contains("speech script based on the PPT slide"));
}

#[tokio::test]
async fn later_batches_carry_summaries_of_earlier_ones() {
    let client = ScriptedVision::new(vec![
        Ok(json_batch(1, 2, "opening")),
        Ok(json_batch(3, 2, "ending")),
    ]);
    generator(&client, settings(2, 0, Language::English))
        .narrate_deck(&slides(4), Some("Team offsite"))
        .await;

    let requests = client.requests();
    let ContentPart::Text(second_prompt) = &requests[1].parts[0] else {
        panic!("first part should be the prompt");
    };
    assert!(second_prompt.contains("Team offsite"));
    assert!(second_prompt.contains("Now processing slides 3-4 (of 4)"));
    assert!(second_prompt.contains("Slide 2: opening 2"));

    let labels: Vec<&ContentPart> = requests[1].parts.iter().skip(1).step_by(2).collect();
    assert_eq!(labels[0], &ContentPart::Text("[Slide 3]".to_string()));
}

#[tokio::test]
async fn malformed_json_still_yields_one_narration_per_slide() {
    let client = ScriptedVision::new(vec![Ok("{ not json at all".to_string())]);
    let narrations = generator(&client, settings(5, 0, Language::Chinese))
        .narrate_deck(&slides(3), None)
        .await;

    assert_eq!(narrations.len(), 3);
    assert!(
        narrations
            .iter()
            .all(|n| n.transcript == "[错误：批量生成失败，请尝试单独生成]")
    );
}

#[test]
fn language_follows_tag_prefix() {
    assert_eq!(Language::from_tag("zh-CN"), Language::Chinese);
    assert_eq!(Language::from_tag("ZH-tw"), Language::Chinese);
    assert_eq!(Language::from_tag("en-US"), Language::English);
    assert_eq!(Language::from_tag("fr"), Language::English);
}
