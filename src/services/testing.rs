//! In-memory `NovelApi` used by the controller tests.

use crate::core::error::{ApiError, ApiResult, ErrorKind};
use crate::core::model::{AdvancedFields, ChatMessage, Novel, NovelDetail, StoryFields};
use crate::services::api::{ByteStream, NovelApi, OptimizeRequest};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    novels: Vec<Novel>,
    stories: HashMap<String, StoryFields>,
    advanced: HashMap<String, AdvancedFields>,
    chat: Vec<ChatMessage>,
    story_saves: Vec<(String, StoryFields)>,
    advanced_saves: Vec<(String, AdvancedFields)>,
    optimize_requests: Vec<OptimizeRequest>,
    stream_requests: Vec<(String, bool)>,
}

pub struct MemoryApi {
    state: Mutex<State>,
    fail: Option<ErrorKind>,
    streaming: bool,
    stream_chunks: Vec<Vec<u8>>,
    stream_error: Option<ErrorKind>,
    optimize_reply: Option<String>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail: None,
            streaming: true,
            stream_chunks: Vec::new(),
            stream_error: None,
            optimize_reply: None,
        }
    }

    /// Every call fails with `kind`.
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        self.fail = Some(kind);
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn with_stream_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.stream_chunks = chunks;
        self
    }

    /// The stream yields its chunks, then this error.
    pub fn with_stream_error(mut self, kind: ErrorKind) -> Self {
        self.stream_error = Some(kind);
        self
    }

    pub fn with_optimize_reply(mut self, text: &str) -> Self {
        self.optimize_reply = Some(text.to_string());
        self
    }

    pub fn seed_chat(&self, messages: Vec<ChatMessage>) {
        self.state.lock().unwrap().chat = messages;
    }

    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().chat.clone()
    }

    pub fn story_saves(&self) -> Vec<(String, StoryFields)> {
        self.state.lock().unwrap().story_saves.clone()
    }

    pub fn advanced_saves(&self) -> Vec<(String, AdvancedFields)> {
        self.state.lock().unwrap().advanced_saves.clone()
    }

    pub fn optimize_requests(&self) -> Vec<OptimizeRequest> {
        self.state.lock().unwrap().optimize_requests.clone()
    }

    pub fn stream_requests(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().stream_requests.clone()
    }

    fn check(&self) -> ApiResult<()> {
        match self.fail {
            Some(kind) => Err(ApiError::with_detail(kind, "HTTP 500")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NovelApi for MemoryApi {
    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn list_novels(&self) -> ApiResult<Vec<Novel>> {
        self.check()?;
        Ok(self.state.lock().unwrap().novels.clone())
    }

    async fn create_novel(&self, title: &str) -> ApiResult<Novel> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let novel = Novel {
            id: format!("novel-{}", state.novels.len() + 1),
            title: title.trim().to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        state.novels.push(novel.clone());
        Ok(novel)
    }

    async fn get_novel(&self, id: &str) -> ApiResult<NovelDetail> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let novel = state
            .novels
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| ApiError::with_detail(ErrorKind::LoadFailed, "HTTP 404"))?;
        Ok(NovelDetail {
            novel,
            story: state.stories.get(id).cloned().unwrap_or_default(),
            advanced: state.advanced.get(id).cloned().unwrap_or_default(),
        })
    }

    async fn save_story(&self, id: &str, fields: &StoryFields) -> ApiResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.story_saves.push((id.to_string(), fields.clone()));
        state.stories.insert(id.to_string(), fields.clone());
        Ok(())
    }

    async fn save_advanced(&self, id: &str, fields: &AdvancedFields) -> ApiResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.advanced_saves.push((id.to_string(), fields.clone()));
        state.advanced.insert(id.to_string(), fields.clone());
        Ok(())
    }

    async fn optimize(&self, request: &OptimizeRequest) -> ApiResult<String> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .optimize_requests
            .push(request.clone());
        Ok(self
            .optimize_reply
            .clone()
            .unwrap_or_else(|| format!("优化：{}", request.original)))
    }

    async fn chat_history(&self) -> ApiResult<Vec<ChatMessage>> {
        self.check()?;
        Ok(self.state.lock().unwrap().chat.clone())
    }

    async fn send_chat(&self, message: &str) -> ApiResult<ChatMessage> {
        self.check()?;
        let reply = ChatMessage::assistant(format!("回复：{}", message));
        let mut state = self.state.lock().unwrap();
        state.chat.push(ChatMessage::user(message));
        state.chat.push(reply.clone());
        Ok(reply)
    }

    async fn send_chat_stream(&self, message: &str, use_search: bool) -> ApiResult<ByteStream> {
        self.check()?;
        if !self.streaming {
            return Err(ApiError::new(ErrorKind::ChatStreamUnsupported));
        }
        self.state
            .lock()
            .unwrap()
            .stream_requests
            .push((message.to_string(), use_search));

        let mut items: Vec<ApiResult<Vec<u8>>> =
            self.stream_chunks.iter().cloned().map(Ok).collect();
        if let Some(kind) = self.stream_error {
            items.push(Err(ApiError::new(kind)));
        }
        Ok(futures_util::stream::iter(items).boxed())
    }

    async fn clear_chat(&self) -> ApiResult<()> {
        self.check()?;
        self.state.lock().unwrap().chat.clear();
        Ok(())
    }
}
