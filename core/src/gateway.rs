//! Model gateway: the only place the pipeline leaves the process.
//!
//! [`CompletionModel`] is the seam: the reviewer only ever sees the trait,
//! so tests swap in a scripted model and production uses
//! [`OpenAiGateway`] against any OpenAI-compatible chat endpoint.

use crate::{
    config::ModelConfig,
    error::{ReviewError, ReviewResult},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Temperature for free-form chat and plain-language explanations.
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Temperature for structured, conservative analysis.
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Fixed template behind [`CompletionModel::analyze`].
pub fn analysis_prompt(claim_text: &str, context_text: &str) -> String {
    format!(
        "You are a fraud detection expert. Analyze this claim:\n\n\
         Claim Data: {claim_text}\n\
         Context: {context_text}\n\n\
         Provide:\n\
         1. Fraud likelihood score (1-10)\n\
         2. Key red flags\n\
         3. Investigation priority (Low/Medium/High/Critical)\n"
    )
}

/// A text-completion backend. Calls may block on the network and may fail.
pub trait CompletionModel: Send + Sync {
    /// Send `messages` and return the completion text.
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> ReviewResult<String>;

    /// Single user prompt at the chat temperature.
    fn chat(&self, prompt: &str) -> ReviewResult<String> {
        self.complete(&[ChatMessage::user(prompt)], CHAT_TEMPERATURE)
    }

    /// Fraud analysis of free-form claim text at the analysis temperature.
    fn analyze(&self, claim_text: &str, context_text: &str) -> ReviewResult<String> {
        let prompt = analysis_prompt(claim_text, context_text);
        self.complete(&[ChatMessage::user(prompt)], ANALYSIS_TEMPERATURE)
    }
}

impl<M: CompletionModel + ?Sized> CompletionModel for Box<M> {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> ReviewResult<String> {
        (**self).complete(messages, temperature)
    }
}

impl<M: CompletionModel + ?Sized> CompletionModel for std::sync::Arc<M> {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> ReviewResult<String> {
        (**self).complete(messages, temperature)
    }
}

pub fn check_temperature(temperature: f32) -> ReviewResult<()> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(ReviewError::Config(format!(
            "temperature {temperature} outside [0, 1]"
        )))
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pull the first non-empty completion text out of a response body.
pub fn extract_completion(body: &str) -> ReviewResult<String> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ReviewError::ModelResponseInvalid(format!("unparseable body: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ReviewError::ModelResponseInvalid("no completion text".into()))
}

// ── HTTP gateway ─────────────────────────────────────────────────────────────

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiGateway {
    pub fn new(config: &ModelConfig) -> ReviewResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ReviewError::Config("model base_url is empty".into()));
        }
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReviewError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport(&self, err: reqwest::Error) -> ReviewError {
        if err.is_timeout() {
            ReviewError::ModelTimeout {
                after_secs: self.timeout.as_secs(),
            }
        } else {
            ReviewError::ModelUnavailable(err.to_string())
        }
    }
}

impl CompletionModel for OpenAiGateway {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> ReviewResult<String> {
        check_temperature(temperature)?;
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let payload = serde_json::to_string(&request)?;
        debug!(
            "POST {url} model={} messages={} temperature={temperature} bytes={}",
            self.model,
            messages.len(),
            payload.len()
        );
        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let resp = builder.send().map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| self.map_transport(e))?;
        if !status.is_success() {
            return Err(ReviewError::ModelUnavailable(format!(
                "server returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = extract_completion(&body)?;
        info!("Completion received ({} chars)", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn config_for(base_url: String, timeout_secs: u64) -> ModelConfig {
        ModelConfig {
            base_url,
            api_key: "test-key".into(),
            timeout_secs,
            ..ModelConfig::default()
        }
    }

    /// Serve one canned HTTP response and hand back the raw request.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut payload = vec![0u8; content_length];
            reader.read_exact(&mut payload).unwrap();
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            head + &String::from_utf8_lossy(&payload)
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Looks suspicious."}}]}"#;
        assert_eq!(extract_completion(body).unwrap(), "Looks suspicious.");
    }

    #[test]
    fn empty_choices_are_invalid() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{}"#,
            "not json",
        ] {
            let err = extract_completion(body).unwrap_err();
            assert!(
                matches!(err, ReviewError::ModelResponseInvalid(_)),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn temperature_must_be_in_unit_range() {
        assert!(check_temperature(0.0).is_ok());
        assert!(check_temperature(1.0).is_ok());
        assert!(check_temperature(1.5).is_err());
        assert!(check_temperature(-0.1).is_err());
    }

    #[test]
    fn gateway_trims_trailing_slash() {
        let gw = OpenAiGateway::new(&config_for("http://localhost:4000/v1/".into(), 5)).unwrap();
        assert_eq!(gw.base_url, "http://localhost:4000/v1");
    }

    #[test]
    fn completes_against_compatible_endpoint() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"FRAUD LIKELIHOOD: 6"}}]}"#,
        );
        let gw = OpenAiGateway::new(&config_for(base, 5)).unwrap();
        let text = gw
            .complete(&[ChatMessage::user("hello")], ANALYSIS_TEMPERATURE)
            .unwrap();
        assert_eq!(text, "FRAUD LIKELIHOOD: 6");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /chat/completions"));
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.contains("authorization: bearer test-key"));
        assert!(lowered.contains("content-type: application/json"));
        assert!(request.contains("\"temperature\":0.3"));
        assert!(request.contains("\"content\":\"hello\""));
    }

    #[test]
    fn server_error_is_unavailable() {
        let (base, server) = serve_once("503 Service Unavailable", r#"{"error":"overloaded"}"#);
        let gw = OpenAiGateway::new(&config_for(base, 5)).unwrap();
        let err = gw.chat("hello").unwrap_err();
        assert!(matches!(err, ReviewError::ModelUnavailable(ref m) if m.contains("503")));
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let gw = OpenAiGateway::new(&config_for(format!("http://{addr}"), 5)).unwrap();
        let err = gw.chat("hello").unwrap_err();
        assert!(matches!(err, ReviewError::ModelUnavailable(_)), "{err:?}");
    }

    #[test]
    fn silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });
        let gw = OpenAiGateway::new(&config_for(format!("http://{addr}"), 1)).unwrap();
        let err = gw.chat("hello").unwrap_err();
        assert!(
            matches!(err, ReviewError::ModelTimeout { after_secs: 1 }),
            "{err:?}"
        );
        holder.join().unwrap();
    }

    #[test]
    fn analysis_template_embeds_both_texts() {
        let prompt = analysis_prompt("claim body", "history");
        assert!(prompt.contains("Claim Data: claim body"));
        assert!(prompt.contains("Context: history"));
        assert!(prompt.contains("(1-10)"));
    }
}
