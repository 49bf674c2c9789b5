use crate::core::error::ApiResult;
use crate::core::model::Novel;
use crate::services::api::NovelApi;
use log::{info, warn};

pub const EMPTY_STATE: &str = "暂无小说，创建第一本吧";
pub const LOAD_FAILED: &str = "加载失败";
pub const CREATE_FAILED: &str = "创建失败";

/// Novel list plus the create form.
#[derive(Debug, Clone, Default)]
pub struct HomeController {
    novels: Vec<Novel>,
    loaded: bool,
    creating: bool,
    error: Option<String>,
}

impl HomeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn novels(&self) -> &[Novel] {
        &self.novels
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Placeholder text when the list is known to be empty.
    pub fn empty_state(&self) -> Option<&'static str> {
        (self.loaded && self.novels.is_empty() && self.error.is_none()).then_some(EMPTY_STATE)
    }

    pub fn apply_list(&mut self, result: ApiResult<Vec<Novel>>) -> ApiResult<()> {
        match result {
            Ok(novels) => {
                info!("listed {} novels", novels.len());
                self.novels = novels;
                self.loaded = true;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("failed to list novels: {}", e);
                self.error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    pub async fn load<A: NovelApi + ?Sized>(&mut self, api: &A) -> ApiResult<()> {
        let result = api.list_novels().await;
        self.apply_list(result)
    }

    /// The trimmed title to create, or `None` for a blank title or while a create runs.
    pub fn begin_create(&mut self, title: &str) -> Option<String> {
        let title = title.trim();
        if title.is_empty() || self.creating {
            return None;
        }
        self.creating = true;
        Some(title.to_string())
    }

    pub fn finish_create(&mut self, result: ApiResult<Novel>) -> Option<Novel> {
        self.creating = false;
        match result {
            Ok(novel) => {
                info!("created novel {} ({})", novel.id, novel.title);
                Some(novel)
            }
            Err(e) => {
                warn!("failed to create novel: {}", e);
                self.error = Some(CREATE_FAILED.to_string());
                None
            }
        }
    }

    /// Creates a novel and refreshes the list. Returns the new novel to navigate to,
    /// or `None` for a blank title, a create already running, or a failure.
    pub async fn create<A: NovelApi + ?Sized>(&mut self, api: &A, title: &str) -> Option<Novel> {
        let title = self.begin_create(title)?;
        let result = api.create_novel(&title).await;
        let novel = self.finish_create(result)?;
        // A failed refresh still lets the caller navigate.
        let _ = self.load(api).await;
        Some(novel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::services::testing::MemoryApi;

    #[tokio::test]
    async fn test_empty_list_shows_placeholder() {
        let api = MemoryApi::new();
        let mut home = HomeController::new();
        assert_eq!(home.empty_state(), None);
        home.load(&api).await.unwrap();
        assert_eq!(home.empty_state(), Some(EMPTY_STATE));
    }

    #[tokio::test]
    async fn test_create_trims_and_relists() {
        let api = MemoryApi::new();
        let mut home = HomeController::new();
        home.load(&api).await.unwrap();

        let novel = home.create(&api, "  Demo  ").await.unwrap();
        assert_eq!(novel.title, "Demo");
        assert_eq!(home.novels().len(), 1);
        assert_eq!(home.novels()[0].id, novel.id);
        assert_eq!(home.empty_state(), None);
    }

    #[tokio::test]
    async fn test_blank_title_is_ignored() {
        let api = MemoryApi::new();
        let mut home = HomeController::new();
        assert!(home.create(&api, "   ").await.is_none());
        assert!(api.list_novels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_set_error() {
        let api = MemoryApi::new().failing(ErrorKind::CreateFailed);
        let mut home = HomeController::new();
        assert!(home.create(&api, "Demo").await.is_none());
        assert_eq!(home.error(), Some(CREATE_FAILED));
        assert!(home.load(&api).await.is_err());
        assert_eq!(home.error(), Some(LOAD_FAILED));
        assert!(!home.is_creating());
    }
}
