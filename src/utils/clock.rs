/// Millisecond wall clock, injectable so throttling and toasts can be tested.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Resolves after `ms` milliseconds.
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep_ms(ms: u64) {
    let timeout = ms.min(i32::MAX as u64) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().and_then(|window| {
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, timeout)
                .ok()
        });
        if scheduled.is_none() {
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// Renders at most once per frame however many updates arrive in between.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    frame_ms: f64,
    last_render: Option<f64>,
    dirty: bool,
}

impl FrameThrottle {
    pub fn new(frame_ms: u64) -> Self {
        Self {
            frame_ms: frame_ms as f64,
            last_render: None,
            dirty: false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Milliseconds until a held-back render becomes due; `None` when nothing is dirty.
    pub fn delay(&self, now_ms: f64) -> Option<u64> {
        if !self.dirty {
            return None;
        }
        let remaining = match self.last_render {
            Some(last) => (last + self.frame_ms - now_ms).max(0.0),
            None => 0.0,
        };
        Some(remaining.ceil() as u64)
    }

    /// True when a render is due at `now_ms`; taking it clears the dirty flag.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if !self.dirty {
            return false;
        }
        if let Some(last) = self.last_render {
            if now_ms - last < self.frame_ms {
                return false;
            }
        }
        self.last_render = Some(now_ms);
        self.dirty = false;
        true
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_most_one_render_per_frame() {
        let mut throttle = FrameThrottle::new(16);
        assert!(!throttle.poll(0.0), "nothing to render yet");

        throttle.mark_dirty();
        assert!(throttle.poll(0.0));

        let mut renders = 0;
        for t in 1..16 {
            throttle.mark_dirty();
            if throttle.poll(t as f64) {
                renders += 1;
            }
        }
        assert_eq!(renders, 0);
        assert!(throttle.is_dirty());
        assert!(throttle.poll(16.0));
        assert!(!throttle.is_dirty());
    }

    #[test]
    fn test_delay_counts_down_to_next_frame() {
        let mut throttle = FrameThrottle::new(16);
        assert_eq!(throttle.delay(0.0), None);

        throttle.mark_dirty();
        assert_eq!(throttle.delay(0.0), Some(0));
        assert!(throttle.poll(0.0));
        assert_eq!(throttle.delay(5.0), None);

        throttle.mark_dirty();
        assert!(!throttle.poll(5.0));
        assert_eq!(throttle.delay(5.0), Some(11));
        assert_eq!(throttle.delay(40.0), Some(0));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now_ms() > 0.0);
    }
}
