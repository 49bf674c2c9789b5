use crate::core::config::{Config, OptimizeContract};
use crate::core::error::{ApiError, ApiResult, ErrorKind};
use crate::core::model::{AdvancedFields, ChatMessage, Novel, NovelDetail, StoryFields};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

#[cfg(not(target_arch = "wasm32"))]
pub type ByteStream = futures_util::stream::BoxStream<'static, ApiResult<Vec<u8>>>;
#[cfg(target_arch = "wasm32")]
pub type ByteStream = futures_util::stream::LocalBoxStream<'static, ApiResult<Vec<u8>>>;

#[cfg(target_arch = "wasm32")]
pub trait ApiBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> ApiBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait ApiBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> ApiBounds for T {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeRequest {
    /// Wire name of the field; not restricted to the known fields.
    pub field: String,
    pub original: String,
    pub instruction: String,
}

impl OptimizeRequest {
    pub fn payload(&self, contract: OptimizeContract) -> Value {
        match contract {
            OptimizeContract::Instruction => json!({
                "original": self.original,
                "instruction": self.instruction,
                "field": self.field,
            }),
            OptimizeContract::Legacy => json!({
                "text": self.original,
                "field": self.field,
            }),
        }
    }
}

/// One request/response cycle per call: no retries, no caching.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait NovelApi: ApiBounds {
    /// When false, chat goes through `send_chat` instead of `send_chat_stream`.
    fn supports_streaming(&self) -> bool;

    async fn list_novels(&self) -> ApiResult<Vec<Novel>>;
    async fn create_novel(&self, title: &str) -> ApiResult<Novel>;
    async fn get_novel(&self, id: &str) -> ApiResult<NovelDetail>;
    async fn save_story(&self, id: &str, fields: &StoryFields) -> ApiResult<()>;
    async fn save_advanced(&self, id: &str, fields: &AdvancedFields) -> ApiResult<()>;
    async fn optimize(&self, request: &OptimizeRequest) -> ApiResult<String>;
    async fn chat_history(&self) -> ApiResult<Vec<ChatMessage>>;
    async fn send_chat(&self, message: &str) -> ApiResult<ChatMessage>;
    async fn send_chat_stream(&self, message: &str, use_search: bool) -> ApiResult<ByteStream>;
    async fn clear_chat(&self) -> ApiResult<()>;
}

#[derive(Deserialize)]
struct OptimizeResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatHistoryResponse {
    #[serde(default)]
    messages: Option<Vec<ChatMessage>>,
}

// `Reply` goes first: a message object tolerates missing keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChatReply {
    Reply { reply: String },
    Message(ChatMessage),
}

#[derive(Serialize)]
struct StreamRequest<'a> {
    message: &'a str,
    use_search: bool,
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::with_detail(ErrorKind::MalformedResponse, e.to_string()))
}

fn transport(kind: ErrorKind) -> impl Fn(reqwest::Error) -> ApiError {
    move |e| ApiError::with_detail(kind, e.to_string())
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    supports_streaming: bool,
    optimize_contract: OptimizeContract,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let mut base = Url::parse(config.base_url.trim())
            .with_context(|| format!("Invalid base_url: {}", config.base_url))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("base_url cannot carry a path: {}", config.base_url));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base,
            supports_streaming: config.supports_streaming,
            optimize_contract: config.optimize_contract,
        })
    }

    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, kind: ErrorKind) -> ApiResult<T> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await.map_err(transport(kind))?;
        Self::read_json(resp, kind).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B, kind: ErrorKind) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport(kind))?;
        Self::read_json(resp, kind).await
    }

    fn check_status(resp: Response, kind: ErrorKind) -> ApiResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let url = resp.url().clone();
        warn!("{} returned {} ({})", url, status, kind);
        Err(ApiError::with_detail(kind, format!("HTTP {}", status.as_u16())))
    }

    async fn read_json<T: DeserializeOwned>(resp: Response, kind: ErrorKind) -> ApiResult<T> {
        let resp = Self::check_status(resp, kind)?;
        let body = resp.bytes().await.map_err(transport(kind))?;
        decode_json(&body)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl NovelApi for HttpApi {
    fn supports_streaming(&self) -> bool {
        self.supports_streaming
    }

    async fn list_novels(&self) -> ApiResult<Vec<Novel>> {
        self.get_json(self.endpoint(&["api", "novels"]), ErrorKind::LoadFailed)
            .await
    }

    async fn create_novel(&self, title: &str) -> ApiResult<Novel> {
        self.post_json(
            self.endpoint(&["api", "novels"]),
            &json!({ "title": title }),
            ErrorKind::CreateFailed,
        )
        .await
    }

    async fn get_novel(&self, id: &str) -> ApiResult<NovelDetail> {
        self.get_json(self.endpoint(&["api", "novels", id]), ErrorKind::LoadFailed)
            .await
    }

    async fn save_story(&self, id: &str, fields: &StoryFields) -> ApiResult<()> {
        let _ack: Value = self
            .post_json(
                self.endpoint(&["api", "novels", id, "story"]),
                fields,
                ErrorKind::SaveFailed,
            )
            .await?;
        Ok(())
    }

    async fn save_advanced(&self, id: &str, fields: &AdvancedFields) -> ApiResult<()> {
        let _ack: Value = self
            .post_json(
                self.endpoint(&["api", "novels", id, "advanced"]),
                fields,
                ErrorKind::SaveFailed,
            )
            .await?;
        Ok(())
    }

    async fn optimize(&self, request: &OptimizeRequest) -> ApiResult<String> {
        let payload = request.payload(self.optimize_contract);
        let resp: OptimizeResponse = self
            .post_json(
                self.endpoint(&["api", "optimize"]),
                &payload,
                ErrorKind::OptimizeFailed,
            )
            .await?;
        Ok(resp.text.unwrap_or_default())
    }

    async fn chat_history(&self) -> ApiResult<Vec<ChatMessage>> {
        let resp: ChatHistoryResponse = self
            .get_json(self.endpoint(&["api", "chat", "history"]), ErrorKind::ChatFailed)
            .await?;
        Ok(resp.messages.unwrap_or_default())
    }

    async fn send_chat(&self, message: &str) -> ApiResult<ChatMessage> {
        let reply: ChatReply = self
            .post_json(
                self.endpoint(&["api", "chat", "send"]),
                &json!({ "message": message }),
                ErrorKind::ChatFailed,
            )
            .await?;
        Ok(match reply {
            ChatReply::Message(msg) => msg,
            ChatReply::Reply { reply } => ChatMessage::assistant(reply),
        })
    }

    async fn send_chat_stream(&self, message: &str, use_search: bool) -> ApiResult<ByteStream> {
        if !self.supports_streaming {
            return Err(ApiError::new(ErrorKind::ChatStreamUnsupported));
        }

        let url = self.endpoint(&["api", "chat", "send_stream"]);
        debug!("POST {} (stream)", url);
        let resp = self
            .client
            .post(url)
            .json(&StreamRequest {
                message,
                use_search,
            })
            .send()
            .await
            .map_err(transport(ErrorKind::ChatFailed))?;
        let resp = Self::check_status(resp, ErrorKind::ChatFailed)?;

        let stream = resp.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(transport(ErrorKind::ChatFailed))
        });

        #[cfg(not(target_arch = "wasm32"))]
        let stream = stream.boxed();
        #[cfg(target_arch = "wasm32")]
        let stream = stream.boxed_local();

        Ok(stream)
    }

    async fn clear_chat(&self) -> ApiResult<()> {
        let _ack: Value = self
            .post_json(
                self.endpoint(&["api", "chat", "clear"]),
                &json!({}),
                ErrorKind::ChatFailed,
            )
            .await?;
        Ok(())
    }
}
