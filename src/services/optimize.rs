use crate::core::error::ApiResult;
use crate::core::model::{default_instruction_for, Field};
use crate::services::api::{NovelApi, OptimizeRequest};
use crate::services::editor::Editor;
use log::{debug, info, warn};

pub const STATUS_GENERATING: &str = "AI 优化中...";
pub const STATUS_READY: &str = "AI 优化完成，可保留或撤销";
pub const STATUS_FAILED: &str = "AI 优化失败";
pub const STATUS_APPLIED: &str = "已保留 AI 结果";
pub const STATUS_REVERTED: &str = "已撤销 AI 结果";

const LOADING_BASE: &str = "生成中";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeState {
    Closed,
    Editing,
    Generating,
    ResultReady,
    Failed(String),
}

/// Animated `生成中` placeholder, one more dot per tick up to three.
#[derive(Debug, Clone)]
pub struct LoadingDots {
    interval_ms: f64,
    started_at: f64,
}

impl LoadingDots {
    pub fn new(interval_ms: u64, started_at: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(1) as f64,
            started_at,
        }
    }

    pub fn frame(&self, now_ms: f64) -> String {
        let ticks = ((now_ms - self.started_at).max(0.0) / self.interval_ms) as usize;
        format!("{}{}", LOADING_BASE, ".".repeat(ticks % 4))
    }

    /// One full cycle of frames, in display order.
    pub fn cycle() -> Vec<String> {
        (0..4).map(|n| format!("{}{}", LOADING_BASE, ".".repeat(n))).collect()
    }
}

/// The optimize modal for one field.
///
/// `original` is a snapshot taken on open; the editor's live value is only touched by
/// [`OptimizeSession::apply`].
#[derive(Debug, Clone)]
pub struct OptimizeSession {
    state: OptimizeState,
    field: String,
    original: String,
    instruction: String,
    candidate: String,
    // Bumped on every open/close so a response for an older modal can be recognised.
    ticket: u64,
}

impl Default for OptimizeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizeSession {
    pub fn new() -> Self {
        Self {
            state: OptimizeState::Closed,
            field: String::new(),
            original: String::new(),
            instruction: String::new(),
            candidate: String::new(),
            ticket: 0,
        }
    }

    pub fn state(&self) -> &OptimizeState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != OptimizeState::Closed
    }

    pub fn is_generating(&self) -> bool {
        self.state == OptimizeState::Generating
    }

    /// Apply and revert are only offered once a result is in.
    pub fn can_decide(&self) -> bool {
        self.state == OptimizeState::ResultReady
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn field_label(&self) -> &str {
        Field::from_name(&self.field)
            .map(|f| f.label())
            .unwrap_or(&self.field)
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.instruction = instruction.into();
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    /// Text for the result pane.
    pub fn result_text(&self) -> String {
        match &self.state {
            OptimizeState::Failed(e) => format!("生成失败：{}", e),
            _ => self.candidate.clone(),
        }
    }

    pub fn open(&mut self, field: &str, value: &str) {
        self.ticket += 1;
        self.state = OptimizeState::Editing;
        self.field = field.to_string();
        self.original = value.to_string();
        self.instruction = default_instruction_for(field).to_string();
        self.candidate.clear();
        debug!("optimize opened for {}", field);
    }

    /// Moves to `Generating` and hands back the request plus a ticket for
    /// [`OptimizeSession::finish`]. `None` when closed or already generating.
    pub fn begin_generate(&mut self) -> Option<(u64, OptimizeRequest)> {
        match self.state {
            OptimizeState::Closed | OptimizeState::Generating => return None,
            _ => {}
        }
        self.state = OptimizeState::Generating;
        self.candidate.clear();
        Some((
            self.ticket,
            OptimizeRequest {
                field: self.field.clone(),
                original: self.original.clone(),
                instruction: self.instruction.clone(),
            },
        ))
    }

    /// Records a response. Returns false if the modal was closed or reopened since
    /// `ticket` was issued; the response is then dropped.
    pub fn finish(&mut self, ticket: u64, result: ApiResult<String>) -> bool {
        if ticket != self.ticket || self.state != OptimizeState::Generating {
            debug!("dropping stale optimize response");
            return false;
        }
        match result {
            Ok(text) => {
                self.candidate = text;
                self.state = OptimizeState::ResultReady;
            }
            Err(e) => {
                warn!("optimize failed: {}", e);
                self.candidate.clear();
                self.state = OptimizeState::Failed(e.to_string());
            }
        }
        true
    }

    /// Writes a non-empty candidate into the editor and closes. Returns whether the
    /// field changed.
    pub fn apply(&mut self, editor: &mut Editor) -> bool {
        if self.state != OptimizeState::ResultReady {
            return false;
        }
        let applied = match Field::from_name(&self.field) {
            Some(field) if !self.candidate.is_empty() => {
                editor.set_value(field, self.candidate.clone());
                true
            }
            _ => false,
        };
        if applied {
            info!("applied optimized text to {}", self.field);
        }
        editor.set_status(STATUS_APPLIED);
        self.close();
        applied
    }

    /// Drops the candidate; the field keeps its value.
    pub fn revert(&mut self, editor: &mut Editor) {
        if self.state == OptimizeState::ResultReady {
            editor.set_status(STATUS_REVERTED);
        }
        self.close();
    }

    pub fn close(&mut self) {
        self.ticket += 1;
        self.state = OptimizeState::Closed;
        self.candidate.clear();
    }

    /// One request round trip for callers that hold the session across the await.
    pub async fn generate<A: NovelApi + ?Sized>(&mut self, api: &A) -> Option<&OptimizeState> {
        let (ticket, request) = self.begin_generate()?;
        let result = api.optimize(&request).await;
        self.finish(ticket, result);
        Some(&self.state)
    }
}

pub fn status_for(state: &OptimizeState) -> &'static str {
    match state {
        OptimizeState::Generating => STATUS_GENERATING,
        OptimizeState::ResultReady => STATUS_READY,
        OptimizeState::Failed(_) => STATUS_FAILED,
        OptimizeState::Closed | OptimizeState::Editing => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ApiError, ErrorKind};
    use crate::services::testing::MemoryApi;

    #[test]
    fn test_open_seeds_default_instruction() {
        let mut session = OptimizeSession::new();
        session.open("background", "原文");
        assert_eq!(session.state(), &OptimizeState::Editing);
        assert_eq!(session.original(), "原文");
        assert_eq!(
            session.instruction(),
            Field::Background.default_instruction()
        );
        assert_eq!(session.field_label(), "背景设定");

        session.open("unknown_field", "x");
        assert_eq!(session.instruction(), "");
        assert_eq!(session.field_label(), "unknown_field");
    }

    #[test]
    fn test_generate_refused_while_busy_or_closed() {
        let mut session = OptimizeSession::new();
        assert!(session.begin_generate().is_none());

        session.open("style", "v");
        let (_, request) = session.begin_generate().unwrap();
        assert_eq!(request.field, "style");
        assert_eq!(request.original, "v");
        assert!(session.begin_generate().is_none());
        assert_eq!(status_for(session.state()), STATUS_GENERATING);
    }

    #[test]
    fn test_failure_shows_message_and_blocks_apply() {
        let mut session = OptimizeSession::new();
        session.open("style", "v");
        let (ticket, _) = session.begin_generate().unwrap();
        session.finish(ticket, Err(ApiError::with_detail(ErrorKind::OptimizeFailed, "HTTP 500")));

        assert!(session.result_text().starts_with("生成失败："));
        assert!(session.result_text().contains("optimize_failed"));
        assert!(!session.can_decide());
        assert_eq!(status_for(session.state()), STATUS_FAILED);

        // A retry is allowed after a failure.
        assert!(session.begin_generate().is_some());
    }

    #[test]
    fn test_late_response_after_close_is_dropped() {
        let mut session = OptimizeSession::new();
        session.open("style", "v");
        let (ticket, _) = session.begin_generate().unwrap();
        session.close();
        assert!(!session.finish(ticket, Ok("late".to_string())));
        assert_eq!(session.candidate(), "");

        session.open("style", "v2");
        assert!(!session.finish(ticket, Ok("late".to_string())));
        assert_eq!(session.state(), &OptimizeState::Editing);
    }

    #[tokio::test]
    async fn test_apply_and_revert() {
        let api = MemoryApi::new().with_optimize_reply("更好的风格");
        let novel = api.create_novel("Demo").await.unwrap();
        let mut editor = Editor::load(&api, &novel.id).await.unwrap();
        editor.set_value(Field::Style, "旧风格");

        let mut session = OptimizeSession::new();
        session.open("style", editor.value(Field::Style));
        session.generate(&api).await.unwrap();
        assert!(session.can_decide());
        session.revert(&mut editor);
        assert_eq!(editor.value(Field::Style), "旧风格");
        assert_eq!(editor.status(), STATUS_REVERTED);
        assert!(!session.is_open());

        session.open("style", editor.value(Field::Style));
        session.generate(&api).await.unwrap();
        assert!(session.apply(&mut editor));
        assert_eq!(editor.value(Field::Style), "更好的风格");
        assert_eq!(editor.status(), STATUS_APPLIED);

        let sent = api.optimize_requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].original, "旧风格");
        assert_eq!(sent[0].instruction, Field::Style.default_instruction());
    }

    #[tokio::test]
    async fn test_empty_candidate_leaves_field_untouched() {
        let api = MemoryApi::new().with_optimize_reply("");
        let novel = api.create_novel("Demo").await.unwrap();
        let mut editor = Editor::load(&api, &novel.id).await.unwrap();
        editor.set_value(Field::Reversal, "保留");

        let mut session = OptimizeSession::new();
        session.open("reversal", "保留");
        session.generate(&api).await.unwrap();
        assert!(!session.apply(&mut editor));
        assert_eq!(editor.value(Field::Reversal), "保留");
        assert!(!session.is_open());
    }

    #[test]
    fn test_loading_dots_cycle() {
        let dots = LoadingDots::new(350, 1000.0);
        assert_eq!(dots.frame(1000.0), "生成中");
        assert_eq!(dots.frame(1350.0), "生成中.");
        assert_eq!(dots.frame(1700.0), "生成中..");
        assert_eq!(dots.frame(2050.0), "生成中...");
        assert_eq!(dots.frame(2400.0), "生成中");
    }

    #[test]
    fn test_loading_dots_cycle_matches_frames() {
        let dots = LoadingDots::new(100, 0.0);
        let cycle = LoadingDots::cycle();
        assert_eq!(cycle, vec!["生成中", "生成中.", "生成中..", "生成中..."]);
        for (i, frame) in cycle.iter().enumerate() {
            assert_eq!(&dots.frame(i as f64 * 100.0), frame);
        }
    }
}
