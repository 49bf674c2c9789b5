#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn class(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: f64,
}

/// A single toast slot: showing a new toast replaces the current one, and a toast
/// is hidden `duration_ms` after it was shown.
#[derive(Debug, Clone)]
pub struct ToastSlot {
    current: Option<Toast>,
    duration_ms: f64,
    generation: u64,
}

impl ToastSlot {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            current: None,
            duration_ms: duration_ms as f64,
            generation: 0,
        }
    }

    /// Returns a generation token; a dismiss timer only fires for its own toast.
    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind, now_ms: f64) -> u64 {
        self.generation += 1;
        self.current = Some(Toast {
            message: message.into(),
            kind,
            shown_at: now_ms,
        });
        self.generation
    }

    pub fn visible(&self, now_ms: f64) -> Option<&Toast> {
        self.current
            .as_ref()
            .filter(|t| now_ms - t.shown_at < self.duration_ms)
    }

    /// Hides the toast if `generation` is still the one on screen.
    pub fn dismiss(&mut self, generation: u64) {
        if generation == self.generation {
            self.current = None;
        }
    }

    /// Token of the most recent `show`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_toast_replaces_current() {
        let mut slot = ToastSlot::new(1800);
        slot.show("已复制", ToastKind::Success, 0.0);
        slot.show("复制失败", ToastKind::Error, 100.0);
        let toast = slot.visible(200.0).unwrap();
        assert_eq!(toast.message, "复制失败");
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn test_toast_expires_after_duration() {
        let mut slot = ToastSlot::new(1800);
        slot.show("保存成功", ToastKind::Success, 1000.0);
        assert!(slot.visible(2799.0).is_some());
        assert!(slot.visible(2800.0).is_none());
    }

    #[test]
    fn test_stale_dismiss_keeps_newer_toast() {
        let mut slot = ToastSlot::new(1800);
        let first = slot.show("a", ToastKind::Success, 0.0);
        let second = slot.show("b", ToastKind::Success, 10.0);
        slot.dismiss(first);
        assert_eq!(slot.visible(20.0).unwrap().message, "b");
        slot.dismiss(second);
        assert!(slot.visible(20.0).is_none());
    }
}
