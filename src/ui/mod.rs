mod chat;
mod home;
mod novel;

use crate::core::config::Config;
use crate::services::api::{HttpApi, NovelApi};
use crate::services::toast::{ToastKind, ToastSlot};
use crate::utils::clock::{Clock, SystemClock};
use anyhow::{anyhow, Result};
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;

/// A controller shared between event handlers, plus a signal bumped on every change.
pub(crate) struct Shared<T: 'static> {
    inner: Rc<RefCell<T>>,
    version: RwSignal<u64>,
}

impl<T: 'static> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            version: self.version,
        }
    }
}

impl<T: 'static> Shared<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            version: create_rw_signal(0),
        }
    }

    /// Reads and subscribes the current reactive scope.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.version.get();
        f(&self.inner.borrow())
    }

    pub(crate) fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = self.update_untracked(f);
        self.notify();
        result
    }

    /// Mutates without re-rendering; pair with [`Shared::notify`] once every borrow is released.
    pub(crate) fn update_untracked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub(crate) fn notify(&self) {
        self.version.update(|v| *v += 1);
    }
}

#[derive(Clone)]
pub(crate) struct Toasts {
    slot: Shared<ToastSlot>,
}

impl Toasts {
    pub(crate) fn new(duration_ms: u64) -> Self {
        Self {
            slot: Shared::new(ToastSlot::new(duration_ms)),
        }
    }

    pub(crate) fn show(&self, message: &str, kind: ToastKind) {
        let now = SystemClock.now_ms();
        let generation = self.slot.update(|slot| slot.show(message, kind, now));
        self.schedule_dismiss(generation);
    }

    /// For controllers that post their own toast.
    pub(crate) fn with_slot(&self, f: impl FnOnce(&mut ToastSlot)) {
        let generation = self.slot.update(|slot| {
            f(slot);
            slot.generation()
        });
        self.schedule_dismiss(generation);
    }

    fn schedule_dismiss(&self, generation: u64) {
        let slot = self.slot.clone();
        let delay = slot.peek(|s| s.duration_ms()) as u64;
        set_timeout(
            move || slot.update(|s| s.dismiss(generation)),
            Duration::from_millis(delay),
        );
    }
}

#[component]
pub(crate) fn ToastView(toasts: Toasts) -> impl IntoView {
    move || {
        toasts
            .slot
            .with(|s| s.visible(SystemClock.now_ms()).cloned())
            .map(|toast| {
                view! { <div id="toast" class=format!("toast show {}", toast.kind.class())>{toast.message}</div> }
            })
    }
}

pub(crate) fn navigate_to_novel(id: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().set_href(&format!("/novel/{}", id)) {
        log::warn!("navigation failed: {:?}", e);
    }
}

/// Defaults, with the server being the page's own origin.
fn web_config() -> Result<Config> {
    let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow!("no origin: {:?}", e))?;
    let mut config = Config::default();
    config.apply_base_url_override(&origin);
    Ok(config)
}

/// Reads `data-page` / `data-novel-id` from `<body>` and mounts into `#app`.
pub fn mount() -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow!("no document"))?;
    let body = document.body().ok_or_else(|| anyhow!("no <body>"))?;
    let page = body
        .get_attribute("data-page")
        .ok_or_else(|| anyhow!("<body> has no data-page"))?;
    let anchor: web_sys::HtmlElement = document
        .get_element_by_id("app")
        .ok_or_else(|| anyhow!("no #app element"))?
        .dyn_into()
        .map_err(|_| anyhow!("#app is not an html element"))?;

    let config = web_config()?;
    let api: Rc<dyn NovelApi> = Rc::new(HttpApi::new(&config)?);
    log::info!("mounting {} page against {}", page, config.base_url);

    match page.as_str() {
        "home" => mount_to(anchor, move || view! { <home::HomePage api=api/> }),
        "novel" => {
            let novel_id = body
                .get_attribute("data-novel-id")
                .filter(|id| !id.is_empty())
                .ok_or_else(|| anyhow!("<body> has no data-novel-id"))?;
            mount_to(anchor, move || {
                view! { <novel::NovelPage api=api config=config novel_id=novel_id/> }
            })
        }
        other => return Err(anyhow!("unknown page kind {}", other)),
    }
    Ok(())
}
