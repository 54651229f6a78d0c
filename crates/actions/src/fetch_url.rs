//! URL fetcher: GET a page and hand back its text.
//!
//! HTML is reduced to visible text and the result truncated so a single
//! page cannot flood the conversation.

use async_trait::async_trait;
use autoclaw_core::{
    Action, ActionContext, ActionDefinition, ActionError, ActionParams, ActionResult, ParamKind,
    ParamSpec,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const NAME: &str = "fetch_url";

const DEFAULT_MAX_CHARS: usize = 4000;

pub struct FetchUrlAction {
    client: reqwest::Client,
}

impl FetchUrlAction {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for FetchUrlAction {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct FetchParams {
    url: String,
    #[serde(default)]
    max_chars: Option<usize>,
}

#[async_trait]
impl Action for FetchUrlAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new(NAME, "Fetch a web page and return its text content.")
            .required_param("url", ParamSpec::string("The http(s) URL to fetch"))
            .param(
                "max_chars",
                ParamSpec::new(ParamKind::Integer, "Truncate the text to this many characters"),
            )
    }

    async fn run(&self, ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
        let p: FetchParams = params
            .unmarshal()
            .map_err(|e| ActionError::InvalidArguments(e.to_string()))?;

        if !p.url.starts_with("http://") && !p.url.starts_with("https://") {
            return Err(ActionError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        debug!(url = %p.url, "Fetching URL");

        let fetch = async {
            let response = self.client.get(&p.url).send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        };

        let (status, content_type, body) = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(ActionError::Cancelled(NAME.into())),
            res = fetch => res.map_err(|e| ActionError::ExecutionFailed {
                action: NAME.into(),
                reason: e.to_string(),
            })?,
        };

        let text = if content_type.contains("html") {
            strip_html(&body)
        } else {
            body
        };
        let max = p.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
        let text = truncate_chars(&text, max);

        let mut result = ActionResult::text(format!("HTTP {}\n{}", status.as_u16(), text));
        result.metadata.insert("url".into(), p.url.into());
        result.metadata.insert("status".into(), status.as_u16().into());
        Ok(result)
    }
}

/// Drop tags, `<script>`/`<style>` bodies and collapse whitespace.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;
    let lower = html.to_ascii_lowercase();
    let mut i = 0;
    let bytes = html.as_bytes();

    while i < bytes.len() {
        if let Some(end) = skip_until {
            match lower[i..].find(end) {
                Some(pos) => {
                    i += pos + end.len();
                    skip_until = None;
                }
                None => break,
            }
            continue;
        }
        let c = bytes[i];
        if c == b'<' {
            if lower[i..].starts_with("<script") {
                skip_until = Some("</script>");
                continue;
            }
            if lower[i..].starts_with("<style") {
                skip_until = Some("</style>");
                continue;
            }
            in_tag = true;
            out.push(' ');
        } else if c == b'>' && in_tag {
            in_tag = false;
        } else if !in_tag {
            // Copy the full UTF-8 sequence starting here.
            let ch_len = utf8_len(c);
            if let Some(s) = html.get(i..i + ch_len) {
                out.push_str(s);
            }
            i += ch_len;
            continue;
        }
        i += 1;
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}… [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}
