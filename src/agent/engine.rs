//! Per-step orchestration: prompt assembly, provider call, response
//! recovery, action materialization, display callbacks.

use std::sync::Arc;
use std::time::Instant;

use crate::agent::actions::{self, UiAction};
use crate::agent::output::{OutputSink, Sender};
use crate::agent::prompt::build_system_prompt;
use crate::agent::steplog::{StepLog, StepRecord};
use crate::agent::trimmer;
use crate::errors::PilotResult;
use crate::llm::provider::VlmProvider;
use crate::llm::registry::CallProfile;
use crate::llm::types::{ContentItem, Message, VlmRequest};
use crate::perception::marker::draw_click_marker;
use crate::perception::types::{ParsedScreen, Point};
use crate::response::directive::ActionDirective;
use crate::response::{extract, repair};

/// Monotonic usage counters, updated only by [`VlmAgent::step`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageTotals {
    pub steps: u32,
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// Product of one agent step. The caller appends `assistant` to its history
/// before the next step and executes `action`.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub directive: ActionDirective,
    pub action: UiAction,
    pub coordinate: Option<Point>,
    pub assistant: Message,
    pub raw_response: String,
    pub tokens: u64,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Screenshot retention budget; `None` disables trimming.
    pub only_recent_images: Option<usize>,
    /// Directory the screen parser writes screenshots into; the engine only
    /// ever concatenates it into message content, never reads it.
    pub output_dir: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            only_recent_images: None,
            output_dir: "./tmp/outputs".to_string(),
        }
    }
}

pub struct VlmAgent {
    provider: Arc<dyn VlmProvider>,
    profile: CallProfile,
    output: Arc<dyn OutputSink>,
    options: AgentOptions,
    steplog: StepLog,
    usage: UsageTotals,
}

impl VlmAgent {
    pub fn new(
        provider: Arc<dyn VlmProvider>,
        profile: CallProfile,
        output: Arc<dyn OutputSink>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            profile,
            output,
            options,
            steplog: StepLog::new(),
            usage: UsageTotals::default(),
        }
    }

    pub fn usage(&self) -> UsageTotals {
        self.usage
    }

    /// Run one agent step against the current screen. `history` is mutated
    /// in place: old screenshots are trimmed and the new ones appended.
    ///
    /// A malformed model response never fails the step — it degrades to the
    /// observe action. The only errors that escape are genuine contract
    /// violations: an unrecognized action name, or `type` without a value.
    pub async fn step(
        &mut self,
        history: &mut Vec<Message>,
        screen: &ParsedScreen,
    ) -> PilotResult<StepOutcome> {
        self.usage.steps += 1;
        let step = self.usage.steps;
        self.output
            .emit(&format!("-- Step {step}: --"), Sender::Bot);

        let system = build_system_prompt(&screen.screen_info);

        trimmer::remove_marked_images(history);
        trimmer::retain_recent_images(history, self.options.only_recent_images);

        if history.is_empty() {
            history.push(Message::user(Vec::new()));
        }
        let out_dir = &self.options.output_dir;
        let last = history.last_mut().expect("history is non-empty");
        last.content.push(ContentItem::Image {
            path: format!("{out_dir}/screenshot_{}.png", screen.screenshot_uuid),
        });
        last.content.push(ContentItem::Image {
            path: format!("{out_dir}/screenshot_som_{}.png", screen.screenshot_uuid),
        });

        let start = Instant::now();
        let reply = self
            .provider
            .complete(&VlmRequest {
                system: &system,
                messages: history,
                model: &self.profile.model,
                max_tokens: self.profile.max_tokens,
                temperature: self.profile.temperature,
            })
            .await;
        let latency_vlm = start.elapsed().as_secs_f64();
        self.output.emit(
            &format!(
                "LLM: {latency_vlm:.2}s, screen parser: {:.2}s",
                screen.latency
            ),
            Sender::Bot,
        );

        self.usage.total_tokens += reply.tokens;
        self.usage.total_cost += reply.tokens as f64 * self.profile.price_per_mtok / 1e6;
        tracing::info!(
            step,
            tokens = reply.tokens,
            total_tokens = self.usage.total_tokens,
            total_cost = self.usage.total_cost,
            "usage updated"
        );

        let extraction = extract::extract(&reply.text, "json");
        tracing::debug!(
            method = ?extraction.method,
            attempted = ?extraction.attempted,
            "candidate extracted"
        );
        let repaired = repair::repair_and_parse(&extraction.text);
        for diag in &repaired.diagnostics {
            tracing::debug!(status = ?repaired.status, "repair: {diag}");
        }
        let directive = repaired.directive;

        let coordinate = actions::resolve_centroid(
            &directive,
            &screen.parsed_content_list,
            screen.width,
            screen.height,
        );

        // Annotated preview: marker drawing failures degrade to the
        // unmarked image, never abort the step.
        let preview = match coordinate {
            Some(point) => match draw_click_marker(&screen.som_image_base64, point) {
                Ok(marked) => marked,
                Err(e) => {
                    tracing::warn!(error = %e, "click marker failed, showing unmarked image");
                    screen.som_image_base64.clone()
                }
            },
            None => screen.som_image_base64.clone(),
        };
        self.output.emit(
            &format!("<img src=\"data:image/png;base64,{preview}\">"),
            Sender::Bot,
        );
        self.output.emit(
            &format!(
                "<details><summary>Parsed screen elements</summary><pre>{}</pre></details>",
                screen.screen_info
            ),
            Sender::Bot,
        );

        let action = actions::decode_action(&directive, coordinate)?;

        let plan = directive.plan_text(coordinate.map(|p| (p.x, p.y)));
        let assistant = Message::assistant(plan);

        self.steplog.push(StepRecord {
            ts: chrono::Utc::now().timestamp_millis(),
            step,
            action: serde_json::to_value(&action).unwrap_or_default(),
            tokens: reply.tokens,
        });
        if let Err(e) = self.steplog.flush() {
            tracing::warn!(error = %e, "step log flush failed");
        }

        Ok(StepOutcome {
            directive,
            action,
            coordinate,
            assistant,
            raw_response: reply.text,
            tokens: reply.tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::output::testing::BufferSink;
    use crate::errors::PilotError;
    use crate::llm::types::VlmReply;
    use crate::perception::types::ScreenElement;
    use async_trait::async_trait;
    use base64::Engine as _;

    struct CannedProvider {
        text: String,
        tokens: u64,
    }

    #[async_trait]
    impl VlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &VlmRequest<'_>) -> VlmReply {
            VlmReply {
                text: self.text.clone(),
                tokens: self.tokens,
            }
        }
    }

    fn tiny_png_base64() -> String {
        let canvas = image::RgbaImage::from_pixel(64, 64, image::Rgba([0, 0, 0, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(canvas)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(&out)
    }

    fn screen() -> ParsedScreen {
        ParsedScreen {
            original_screenshot_base64: tiny_png_base64(),
            som_image_base64: tiny_png_base64(),
            screen_info: "Box ID 5: the whole screen".into(),
            screenshot_uuid: "ab12".into(),
            width: 800,
            height: 600,
            parsed_content_list: (0..6)
                .map(|_| ScreenElement {
                    bbox: [0.0, 0.0, 1.0, 1.0],
                    content: None,
                })
                .collect(),
            latency: 0.5,
        }
    }

    fn agent(text: &str, tokens: u64) -> (VlmAgent, Arc<BufferSink>) {
        let sink = Arc::new(BufferSink::default());
        let agent = VlmAgent::new(
            Arc::new(CannedProvider {
                text: text.into(),
                tokens,
            }),
            CallProfile {
                model: "gpt-4o-2024-11-20".into(),
                max_tokens: 4096,
                temperature: 0.0,
                price_per_mtok: 2.5,
            },
            sink.clone(),
            AgentOptions {
                only_recent_images: Some(2),
                ..AgentOptions::default()
            },
        );
        (agent, sink)
    }

    #[tokio::test]
    async fn fenced_response_with_trailing_comma_becomes_click() {
        let raw = "```json\n{\"Reasoning\":\"x\",\"Next Action\":\"left_click\",\"Box ID\":5,}\n```";
        let (mut agent, sink) = agent(raw, 1200);
        let mut history = Vec::new();

        let outcome = agent.step(&mut history, &screen()).await.unwrap();
        assert_eq!(outcome.coordinate, Some(Point { x: 400, y: 300 }));
        assert_eq!(
            outcome.action,
            UiAction::LeftClick {
                coordinate: Some(Point { x: 400, y: 300 })
            }
        );
        assert_eq!(outcome.tokens, 1200);

        let usage = agent.usage();
        assert_eq!(usage.steps, 1);
        assert_eq!(usage.total_tokens, 1200);
        assert!((usage.total_cost - 1200.0 * 2.5 / 1e6).abs() < 1e-12);

        // Both screenshot paths were appended for the provider.
        let images: Vec<&str> = history
            .last()
            .unwrap()
            .content
            .iter()
            .filter_map(|c| match c {
                ContentItem::Image { path } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            images,
            [
                "./tmp/outputs/screenshot_ab12.png",
                "./tmp/outputs/screenshot_som_ab12.png"
            ]
        );

        let emitted = sink.emitted.lock().unwrap();
        assert!(emitted[0].0.contains("-- Step 1: --"));
        assert!(emitted.iter().any(|(c, _)| c.starts_with("<img src=")));
        assert!(emitted.iter().any(|(c, _)| c.contains("<details>")));
    }

    #[tokio::test]
    async fn prose_response_degrades_to_observe_action() {
        let (mut agent, _) = agent("I clicked the button", 10);
        let mut history = Vec::new();

        let outcome = agent.step(&mut history, &screen()).await.unwrap();
        assert_eq!(outcome.action, UiAction::Screenshot);
        assert_eq!(outcome.coordinate, None);
        assert_eq!(outcome.directive.next_action, "screenshot");
        assert!(outcome.directive.reasoning.contains("JSON parsing failed"));
    }

    #[tokio::test]
    async fn stop_directive_ends_the_loop() {
        let raw = "```json\n{\"Reasoning\":\"done\",\"Next Action\":\"None\"}\n```";
        let (mut agent, _) = agent(raw, 50);
        let mut history = Vec::new();

        let outcome = agent.step(&mut history, &screen()).await.unwrap();
        assert!(outcome.action.is_terminal());
    }

    #[tokio::test]
    async fn unrecognized_action_propagates() {
        let raw = "```json\n{\"Next Action\":\"teleport\"}\n```";
        let (mut agent, _) = agent(raw, 50);
        let mut history = Vec::new();

        let err = agent.step(&mut history, &screen()).await.unwrap_err();
        assert!(matches!(err, PilotError::UnrecognizedAction(_)));
    }

    #[tokio::test]
    async fn history_is_trimmed_before_the_call() {
        let raw = "```json\n{\"Next Action\":\"wait\"}\n```";
        let (mut agent, _) = agent(raw, 50);

        // Three old screenshots plus a som leftover; budget is 2.
        let mut history = vec![
            Message::user(vec![
                ContentItem::Text { text: "goal".into() },
                ContentItem::Image { path: "s0.png".into() },
                ContentItem::Image { path: "screenshot_som_0.png".into() },
            ]),
            Message::user(vec![ContentItem::Image { path: "s1.png".into() }]),
            Message::user(vec![ContentItem::Image { path: "s2.png".into() }]),
        ];

        agent.step(&mut history, &screen()).await.unwrap();

        let paths: Vec<&str> = history
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| match c {
                ContentItem::Image { path } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        // som leftover removed unconditionally, s0 trimmed by the budget,
        // then the two fresh screenshots appended.
        assert_eq!(
            paths,
            [
                "s1.png",
                "s2.png",
                "./tmp/outputs/screenshot_ab12.png",
                "./tmp/outputs/screenshot_som_ab12.png"
            ]
        );
    }

    #[tokio::test]
    async fn assistant_plan_reads_reasoning_first() {
        let raw = "```json\n{\"Reasoning\":\"click the ok button\",\"Next Action\":\"left_click\",\"Box ID\":5}\n```";
        let (mut agent, _) = agent(raw, 50);
        let mut history = Vec::new();

        let outcome = agent.step(&mut history, &screen()).await.unwrap();
        match &outcome.assistant.content[0] {
            ContentItem::Text { text } => {
                assert!(text.starts_with("click the ok button"));
                assert!(text.contains("Next Action: left_click"));
                assert!(text.contains("box_centroid_coordinate: [400, 300]"));
            }
            other => panic!("unexpected content: {other:?}"),
        }
        assert_eq!(outcome.assistant.role, "assistant");
    }
}
