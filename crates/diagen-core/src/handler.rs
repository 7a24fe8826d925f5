//! Inbound event handling: the structured request/response envelope
//! around one pipeline invocation.
//!
//! The handler never returns an error. Exhausted retries and upload
//! failures each map to a structured response body; nothing here panics
//! or propagates an exception to the hosting platform.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::mapping::ServiceMap;
use crate::pipeline::DiagramPipeline;
use crate::publish::{ArtifactPublisher, ObjectStore};
use crate::retry::RetryOutcome;
use crate::synth::ScriptSynthesizer;

/// Inbound action-group event.
///
/// Only `input_text` feeds generation; the remaining fields are echoed
/// back in the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub message_version: String,
    pub action_group: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub parameters: Vec<EventParameter>,
    #[serde(default)]
    pub input_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub value: String,
}

/// Outbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub message_version: String,
    pub response: ActionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_group: String,
    pub function: String,
    pub function_response: FunctionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub response_body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "TEXT")]
    pub text: TextBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl ResponseBody {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: TextBody { body: body.into() },
        }
    }
}

/// Drives the pipeline for inbound events and publishes the result.
pub struct EventHandler<S: ScriptSynthesizer, O: ObjectStore> {
    pipeline: DiagramPipeline<S>,
    publisher: ArtifactPublisher<O>,
}

impl<S: ScriptSynthesizer, O: ObjectStore> EventHandler<S, O> {
    pub fn new(config: PipelineConfig, services: ServiceMap, synthesizer: S, store: O) -> Self {
        let publisher = ArtifactPublisher::new(store, config.key_prefix.clone());
        let pipeline = DiagramPipeline::new(config, services, synthesizer);
        Self {
            pipeline,
            publisher,
        }
    }

    /// Handle one event end to end. Infallible by design: every terminal
    /// state becomes a structured response body.
    pub async fn handle(&self, event: &AgentEvent) -> AgentResponse {
        info!(
            event = "handler.received",
            action_group = %event.action_group,
            function = %event.function,
        );

        let body = match self.pipeline.generate(&event.input_text).await {
            RetryOutcome::Completed {
                value: artifact,
                attempts,
            } => {
                info!(event = "handler.generated", attempts, file_name = %artifact.file_name);
                match self.publisher.publish(&artifact).await {
                    Ok(published) => json!({ "image_url": published.url }).to_string(),
                    Err(err) => {
                        warn!(event = "handler.upload_failed", error = %err);
                        "Error uploading to storage".to_string()
                    }
                }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(
                    event = "handler.exhausted",
                    attempts,
                    last_error = %last_error,
                );
                "Error generating diagram".to_string()
            }
        };

        AgentResponse {
            message_version: event.message_version.clone(),
            response: ActionResponse {
                action_group: event.action_group.clone(),
                function: event.function.clone(),
                function_response: FunctionResponse {
                    response_body: ResponseBody::text(body),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::FsObjectStore;
    use crate::synth::StaticSynthesizer;

    fn sample_event() -> AgentEvent {
        AgentEvent {
            message_version: "1.0".to_string(),
            action_group: "diagram_tools".to_string(),
            function: "generate_diagram".to_string(),
            parameters: vec![],
            input_text: "draw me a vpc".to_string(),
        }
    }

    #[test]
    fn test_event_deserializes_from_wire_shape() {
        let json = r#"{
            "messageVersion": "1.0",
            "actionGroup": "diagram_tools",
            "function": "generate_diagram",
            "parameters": [{"name": "style", "type": "string", "value": "simple"}],
            "inputText": "a web tier"
        }"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.action_group, "diagram_tools");
        assert_eq!(event.parameters[0].name, "style");
        assert_eq!(event.input_text, "a web tier");
    }

    #[test]
    fn test_event_tolerates_missing_optional_fields() {
        let json = r#"{"messageVersion": "1.0", "actionGroup": "diagram_tools"}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert!(event.function.is_empty());
        assert!(event.parameters.is_empty());
    }

    #[test]
    fn test_response_serializes_to_wire_shape() {
        let response = AgentResponse {
            message_version: "1.0".to_string(),
            response: ActionResponse {
                action_group: "diagram_tools".to_string(),
                function: "generate_diagram".to_string(),
                function_response: FunctionResponse {
                    response_body: ResponseBody::text("ok"),
                },
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["messageVersion"], "1.0");
        assert_eq!(
            value["response"]["functionResponse"]["responseBody"]["TEXT"]["body"],
            "ok"
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_structured_error() {
        let scratch = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default()
            .with_interpreter("/bin/sh")
            .with_scratch_root(scratch.path());
        config.max_attempts = 2;
        config.initial_delay_ms = 1;

        // Denylisted construct: every attempt is rejected at validation.
        let handler = EventHandler::new(
            config,
            ServiceMap::builtin(),
            StaticSynthesizer::new("eval('1')\n"),
            FsObjectStore::new(store_dir.path()).unwrap(),
        );

        let response = handler.handle(&sample_event()).await;
        assert_eq!(
            response.response.function_response.response_body.text.body,
            "Error generating diagram"
        );
        assert_eq!(response.message_version, "1.0");
        assert_eq!(response.response.action_group, "diagram_tools");
    }
}
