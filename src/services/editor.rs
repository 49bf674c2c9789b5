use crate::core::error::ApiResult;
use crate::core::model::{AdvancedFields, Field, Novel, NovelDetail, Section, StoryFields};
use crate::services::api::NovelApi;
use crate::services::toast::{ToastKind, ToastSlot};
use log::{info, warn};

pub const STATUS_LOAD_FAILED: &str = "加载失败";
pub const STATUS_SAVING: &str = "保存中...";
pub const STATUS_SAVED: &str = "已保存";
pub const STATUS_SAVE_FAILED: &str = "保存失败";
pub const TOAST_SAVED: &str = "保存成功";

/// What a save sends: exactly one section, every field of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePayload {
    Story(StoryFields),
    Advanced(AdvancedFields),
}

/// In-memory state of the novel page.
///
/// Field values live here until an explicit save; nothing else writes them to
/// the server.
#[derive(Debug, Clone)]
pub struct Editor {
    novel_id: String,
    novel: Option<Novel>,
    story: StoryFields,
    advanced: AdvancedFields,
    active: Section,
    status: String,
    saving: bool,
}

impl Editor {
    pub fn new(novel_id: impl Into<String>) -> Self {
        Self {
            novel_id: novel_id.into(),
            novel: None,
            story: StoryFields::default(),
            advanced: AdvancedFields::default(),
            active: Section::Story,
            status: String::new(),
            saving: false,
        }
    }

    pub async fn load<A: NovelApi + ?Sized>(api: &A, novel_id: &str) -> ApiResult<Self> {
        let detail = api.get_novel(novel_id).await?;
        let mut editor = Self::new(novel_id);
        editor.apply_detail(detail);
        Ok(editor)
    }

    pub fn apply_detail(&mut self, detail: NovelDetail) {
        info!("loaded novel {} ({})", detail.novel.id, detail.novel.title);
        self.story = detail.story;
        self.advanced = detail.advanced;
        self.novel = Some(detail.novel);
    }

    pub fn novel_id(&self) -> &str {
        &self.novel_id
    }

    pub fn novel_title(&self) -> &str {
        self.novel
            .as_ref()
            .map(|n| n.title.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(Section::Story.title())
    }

    pub fn active_section(&self) -> Section {
        self.active
    }

    /// Switches the visible group; never saves.
    pub fn set_active_section(&mut self, section: Section) {
        self.active = section;
        self.status.clear();
    }

    pub fn header_title(&self) -> &'static str {
        self.active.title()
    }

    pub fn header_subtitle(&self) -> &'static str {
        self.active.subtitle()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Background => &self.story.background,
            Field::Mainline => &self.story.mainline,
            Field::Darkline => &self.story.darkline,
            Field::Style => &self.advanced.style,
            Field::CoreDesign => &self.advanced.core_design,
            Field::Reversal => &self.advanced.reversal,
            Field::Highlights => &self.advanced.highlights,
        }
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Background => &mut self.story.background,
            Field::Mainline => &mut self.story.mainline,
            Field::Darkline => &mut self.story.darkline,
            Field::Style => &mut self.advanced.style,
            Field::CoreDesign => &mut self.advanced.core_design,
            Field::Reversal => &mut self.advanced.reversal,
            Field::Highlights => &mut self.advanced.highlights,
        };
        *slot = value.into();
    }

    pub fn payload(&self) -> SavePayload {
        match self.active {
            Section::Story => SavePayload::Story(self.story.clone()),
            Section::Advanced => SavePayload::Advanced(self.advanced.clone()),
        }
    }

    /// Marks a save as running and returns what to send; `None` while one is running.
    pub fn begin_save(&mut self) -> Option<SavePayload> {
        if self.saving {
            return None;
        }
        self.saving = true;
        self.status = STATUS_SAVING.to_string();
        Some(self.payload())
    }

    pub fn finish_save(&mut self, result: &ApiResult<()>, toasts: &mut ToastSlot, now_ms: f64) {
        match result {
            Ok(()) => {
                info!("saved {} section of {}", self.active.name(), self.novel_id);
                self.status = STATUS_SAVED.to_string();
                toasts.show(TOAST_SAVED, ToastKind::Success, now_ms);
            }
            Err(e) => {
                warn!("save failed: {}", e);
                self.status = STATUS_SAVE_FAILED.to_string();
                toasts.show(STATUS_SAVE_FAILED, ToastKind::Error, now_ms);
            }
        }
        self.saving = false;
    }

    /// Saves the active section. Ignored (returns `None`) while a save is running.
    pub async fn save<A: NovelApi + ?Sized>(
        &mut self,
        api: &A,
        toasts: &mut ToastSlot,
        now_ms: f64,
    ) -> Option<ApiResult<()>> {
        let payload = self.begin_save()?;
        let result = send_payload(api, &self.novel_id, &payload).await;
        self.finish_save(&result, toasts, now_ms);
        Some(result)
    }
}

pub async fn send_payload<A: NovelApi + ?Sized>(
    api: &A,
    novel_id: &str,
    payload: &SavePayload,
) -> ApiResult<()> {
    match payload {
        SavePayload::Story(fields) => api.save_story(novel_id, fields).await,
        SavePayload::Advanced(fields) => api.save_advanced(novel_id, fields).await,
    }
}
