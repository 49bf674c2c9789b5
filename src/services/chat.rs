use crate::core::config::Config;
use crate::core::error::ApiResult;
use crate::core::model::{ChatMessage, MessageId};
use crate::services::api::{ByteStream, NovelApi};
use crate::utils::clock::{sleep_ms, Clock, FrameThrottle};
use crate::utils::utf8::Utf8StreamDecoder;
use futures_util::future::{self, Either};
use futures_util::StreamExt;
use std::future::Future;
use log::{debug, warn};

pub const CHAT_FAILURE_TEXT: &str = "发送失败，请稍后再试。";
pub const THINKING_TEXT: &str = "正在思考";

/// Ordered chat messages, capped to the most recent `limit` entries.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    limit: usize,
}

impl ChatLog {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(..excess);
        }
    }

    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages.clear();
        for message in messages {
            self.push(message);
        }
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == Some(id))
    }

    /// Updates the message carrying `id` in place; false when it is gone.
    pub fn update(&mut self, id: MessageId, content: String, loading: bool) -> bool {
        match self.messages.iter_mut().find(|m| m.id == Some(id)) {
            Some(message) => {
                message.content = content;
                message.loading = loading;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Receives the log whenever it should be redrawn.
pub trait ChatView {
    fn render(&mut self, log: &ChatLog);
}

impl<F: FnMut(&ChatLog)> ChatView for F {
    fn render(&mut self, log: &ChatLog) {
        self(log)
    }
}

/// The assistant side of one in-flight turn.
#[derive(Debug)]
pub struct PendingTurn {
    pub id: MessageId,
    pub message: String,
    decoder: Utf8StreamDecoder,
    text: String,
    throttle: FrameThrottle,
}

impl PendingTurn {
    /// Appends a decoded chunk and marks the text for rendering.
    pub fn push(&mut self, chunk: &[u8]) {
        let decoded = self.decoder.decode(chunk);
        if !decoded.is_empty() {
            self.text.push_str(&decoded);
            self.throttle.mark_dirty();
        }
    }

    /// The accumulated text when a render is due at `now_ms`.
    pub fn take_render(&mut self, now_ms: f64) -> Option<&str> {
        if self.throttle.poll(now_ms) {
            Some(&self.text)
        } else {
            None
        }
    }

    /// Milliseconds until held-back text should be rendered.
    pub fn flush_delay(&self, now_ms: f64) -> Option<u64> {
        self.throttle.delay(now_ms)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flushes the decoder and hands back the final text.
    pub fn finish(mut self) -> String {
        let tail = self.decoder.finish();
        self.text.push_str(&tail);
        self.text
    }
}

/// Reads a streamed reply into `turn`, calling `on_text` at most once per frame.
///
/// Text held back by the throttle is rendered when its frame ends, whether or not
/// another chunk has arrived. `wait` resolves after the given number of milliseconds.
pub async fn read_stream<C, W, Fut, F>(
    mut stream: ByteStream,
    mut turn: PendingTurn,
    clock: &C,
    mut wait: W,
    mut on_text: F,
) -> ApiResult<String>
where
    C: Clock + ?Sized,
    W: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
    F: FnMut(MessageId, &str),
{
    let id = turn.id;
    loop {
        let next = match turn.flush_delay(clock.now_ms()) {
            None => stream.next().await,
            Some(ms) => {
                let deadline = Box::pin(wait(ms));
                match future::select(stream.next(), deadline).await {
                    Either::Left((next, _)) => next,
                    Either::Right(((), _)) => {
                        if let Some(text) = turn.take_render(clock.now_ms()) {
                            on_text(id, text);
                        }
                        continue;
                    }
                }
            }
        };
        let Some(chunk) = next else {
            break;
        };
        turn.push(&chunk?);
        if let Some(text) = turn.take_render(clock.now_ms()) {
            on_text(id, text);
        }
    }
    Ok(turn.finish())
}

/// Fetches the assistant reply for `turn`, streamed when the API supports it.
pub async fn fetch_reply<A, C, F>(
    api: &A,
    turn: PendingTurn,
    use_search: bool,
    clock: &C,
    on_text: F,
) -> ApiResult<String>
where
    A: NovelApi + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(MessageId, &str),
{
    if !api.supports_streaming() {
        return api.send_chat(&turn.message).await.map(|reply| reply.content);
    }
    let stream = api.send_chat_stream(&turn.message, use_search).await?;
    read_stream(stream, turn, clock, sleep_ms, on_text).await
}

/// Chat state for one page session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    log: ChatLog,
    frame_ms: u64,
    history_loaded: bool,
    in_flight: bool,
}

impl ChatSession {
    pub fn new(limit: usize, frame_ms: u64) -> Self {
        Self {
            log: ChatLog::new(limit),
            frame_ms,
            history_loaded: false,
            in_flight: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chat_history_limit, config.frame_ms)
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True the first time only; the caller then fetches and calls `apply_history`.
    pub fn take_history_request(&mut self) -> bool {
        !std::mem::replace(&mut self.history_loaded, true)
    }

    /// A failure leaves an empty log.
    pub fn apply_history(&mut self, result: ApiResult<Vec<ChatMessage>>) {
        match result {
            Ok(messages) => {
                debug!("loaded {} chat messages", messages.len());
                self.log.replace_all(messages);
            }
            Err(e) => {
                warn!("chat history unavailable: {}", e);
                self.log.clear();
            }
        }
    }

    /// Loads server history once per session.
    pub async fn ensure_history<A: NovelApi + ?Sized>(&mut self, api: &A) {
        if self.take_history_request() {
            let result = api.chat_history().await;
            self.apply_history(result);
        }
    }

    /// Appends the user message and a loading placeholder.
    ///
    /// Returns `None` for blank input or while another turn is in flight.
    pub fn begin_turn(&mut self, input: &str, now_ms: f64) -> Option<PendingTurn> {
        let text = input.trim();
        if text.is_empty() || self.in_flight {
            return None;
        }
        self.in_flight = true;

        let id = MessageId::generate(now_ms);
        self.log.push(ChatMessage::user(text));
        self.log.push(ChatMessage::pending(id));

        Some(PendingTurn {
            id,
            message: text.to_string(),
            decoder: Utf8StreamDecoder::new(),
            text: String::new(),
            throttle: FrameThrottle::new(self.frame_ms),
        })
    }

    pub fn show_progress(&mut self, id: MessageId, text: &str) {
        self.log.update(id, text.to_string(), false);
    }

    pub fn complete_turn(&mut self, id: MessageId, text: String) {
        if !self.log.update(id, text, false) {
            debug!("pending message already gone, discarding reply");
        }
        self.in_flight = false;
    }

    pub fn fail_turn(&mut self, id: MessageId) {
        self.log.update(id, CHAT_FAILURE_TEXT.to_string(), false);
        self.in_flight = false;
    }

    /// Runs one full turn: placeholder, streamed (or one-shot) reply, finalize.
    ///
    /// Returns false when the input was ignored.
    pub async fn send<A, C, V>(
        &mut self,
        api: &A,
        input: &str,
        use_search: bool,
        clock: &C,
        view: &mut V,
    ) -> bool
    where
        A: NovelApi + ?Sized,
        C: Clock + ?Sized,
        V: ChatView + ?Sized,
    {
        let Some(turn) = self.begin_turn(input, clock.now_ms()) else {
            return false;
        };
        let id = turn.id;
        view.render(&self.log);

        let log = &mut self.log;
        let result = fetch_reply(api, turn, use_search, clock, |id, text| {
            log.update(id, text.to_string(), false);
            view.render(&*log);
        })
        .await;

        match result {
            Ok(text) => self.complete_turn(id, text),
            Err(e) => {
                warn!("chat turn failed: {}", e);
                self.fail_turn(id);
            }
        }
        view.render(&self.log);
        true
    }

    /// Clears server history, then the local log.
    pub async fn clear<A: NovelApi + ?Sized>(&mut self, api: &A) -> ApiResult<()> {
        api.clear_chat().await?;
        self.clear_log();
        Ok(())
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}
