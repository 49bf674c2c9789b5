use crate::services::api::ApiBounds;
use crate::services::toast::{ToastKind, ToastSlot};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

pub const COPY_OK: &str = "已复制";
pub const COPY_FAILED: &str = "复制失败";

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ClipboardProvider: ApiBounds {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Ordered provider chain; the first provider that succeeds wins.
pub struct Clipboard {
    providers: Vec<Box<dyn ClipboardProvider>>,
}

impl Clipboard {
    pub fn new(providers: Vec<Box<dyn ClipboardProvider>>) -> Self {
        Self { providers }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn system() -> Self {
        let mut providers: Vec<Box<dyn ClipboardProvider>> = native::CommandClipboard::all()
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn ClipboardProvider>)
            .collect();
        providers.push(Box::new(native::Osc52Clipboard));
        Self::new(providers)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn system() -> Self {
        Self::new(vec![
            Box::new(web::NavigatorClipboard),
            Box::new(web::ExecCommandClipboard),
        ])
    }

    pub async fn copy(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        for provider in self.providers.iter().filter(|p| p.is_available()) {
            match provider.write_text(text).await {
                Ok(()) => {
                    debug!("copied {} bytes via {}", text.len(), provider.name());
                    return true;
                }
                Err(e) => warn!("clipboard provider {} failed: {:#}", provider.name(), e),
            }
        }
        false
    }

    /// Copies and reports the outcome as a toast.
    pub async fn copy_with_toast(&self, text: &str, toasts: &mut ToastSlot, now_ms: f64) -> bool {
        let ok = self.copy(text).await;
        if ok {
            toasts.show(COPY_OK, ToastKind::Success, now_ms);
        } else {
            toasts.show(COPY_FAILED, ToastKind::Error, now_ms);
        }
        ok
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::ClipboardProvider;
    use anyhow::{anyhow, Context, Result};
    use async_trait::async_trait;
    use base64::Engine;
    use std::io::Write;
    use std::process::Stdio;
    use tokio::io::AsyncWriteExt;
    use tokio::process::Command;

    /// A clipboard utility fed through stdin.
    pub struct CommandClipboard {
        program: &'static str,
        args: &'static [&'static str],
        // Display variable the tool needs, if any.
        display_env: Option<&'static str>,
    }

    impl CommandClipboard {
        pub fn all() -> Vec<Self> {
            vec![
                Self { program: "wl-copy", args: &[], display_env: Some("WAYLAND_DISPLAY") },
                Self {
                    program: "xclip",
                    args: &["-selection", "clipboard", "-i"],
                    display_env: Some("DISPLAY"),
                },
                Self {
                    program: "xsel",
                    args: &["--clipboard", "--input"],
                    display_env: Some("DISPLAY"),
                },
                Self { program: "pbcopy", args: &[], display_env: None },
                Self { program: "clip.exe", args: &[], display_env: None },
            ]
        }
    }

    fn on_path(program: &str) -> bool {
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }

    #[async_trait]
    impl ClipboardProvider for CommandClipboard {
        fn name(&self) -> &str {
            self.program
        }

        fn is_available(&self) -> bool {
            let display_ok = self
                .display_env
                .map(|var| std::env::var_os(var).is_some())
                .unwrap_or(true);
            display_ok && on_path(self.program)
        }

        async fn write_text(&self, text: &str) -> Result<()> {
            let mut child = Command::new(self.program)
                .args(self.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .with_context(|| format!("spawn {} failed", self.program))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes()).await?;
            }
            let status = child.wait().await?;
            if !status.success() {
                return Err(anyhow!("{} exited with {}", self.program, status));
            }
            Ok(())
        }
    }

    /// Terminal clipboard escape; works over SSH in terminals that honour it.
    pub struct Osc52Clipboard;

    pub fn osc52_sequence(text: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{}\x07", encoded)
    }

    #[async_trait]
    impl ClipboardProvider for Osc52Clipboard {
        fn name(&self) -> &str {
            "osc52"
        }

        fn is_available(&self) -> bool {
            std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false)
        }

        async fn write_text(&self, text: &str) -> Result<()> {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(osc52_sequence(text).as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use super::ClipboardProvider;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{HtmlDocument, HtmlTextAreaElement};

    fn js_err(e: wasm_bindgen::JsValue) -> anyhow::Error {
        anyhow!("{:?}", e)
    }

    /// Async Clipboard API; only offered in a secure context or on localhost.
    pub struct NavigatorClipboard;

    #[async_trait(?Send)]
    impl ClipboardProvider for NavigatorClipboard {
        fn name(&self) -> &str {
            "navigator.clipboard"
        }

        fn is_available(&self) -> bool {
            let Some(window) = web_sys::window() else {
                return false;
            };
            let localhost = window
                .location()
                .hostname()
                .map(|h| h == "localhost")
                .unwrap_or(false);
            window.is_secure_context() || localhost
        }

        async fn write_text(&self, text: &str) -> Result<()> {
            let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
            let promise = window.navigator().clipboard().write_text(text);
            JsFuture::from(promise).await.map_err(js_err)?;
            Ok(())
        }
    }

    /// Hidden read-only textarea plus `execCommand("copy")`.
    pub struct ExecCommandClipboard;

    #[async_trait(?Send)]
    impl ClipboardProvider for ExecCommandClipboard {
        fn name(&self) -> &str {
            "execCommand"
        }

        fn is_available(&self) -> bool {
            web_sys::window().and_then(|w| w.document()).is_some()
        }

        async fn write_text(&self, text: &str) -> Result<()> {
            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or_else(|| anyhow!("no document"))?;
            let body = document.body().ok_or_else(|| anyhow!("no body"))?;

            let area: HtmlTextAreaElement = document
                .create_element("textarea")
                .map_err(js_err)?
                .dyn_into()
                .map_err(|_| anyhow!("not a textarea"))?;
            area.set_value(text);
            area.set_attribute("readonly", "").map_err(js_err)?;
            area.set_attribute("style", "position:fixed;top:0;left:-9999px;opacity:0")
                .map_err(js_err)?;
            body.append_child(&area).map_err(js_err)?;
            area.select();

            let copied = document
                .dyn_ref::<HtmlDocument>()
                .ok_or_else(|| anyhow!("not an html document"))
                .and_then(|doc| doc.exec_command("copy").map_err(js_err));
            area.remove();

            match copied? {
                true => Ok(()),
                false => Err(anyhow!("execCommand copy refused")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        available: bool,
        succeed: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl ClipboardProvider for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn write_text(&self, _text: &str) -> Result<()> {
            self.calls.lock().unwrap().push(self.name);
            if self.succeed {
                Ok(())
            } else {
                Err(anyhow!("{} failed", self.name))
            }
        }
    }

    fn chain(setup: &[(&'static str, bool, bool)]) -> (Clipboard, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = setup
            .iter()
            .map(|&(name, available, succeed)| {
                Box::new(Recording { name, available, succeed, calls: calls.clone() })
                    as Box<dyn ClipboardProvider>
            })
            .collect();
        (Clipboard::new(providers), calls)
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let (clipboard, calls) =
            chain(&[("modern", false, true), ("broken", true, false), ("legacy", true, true)]);
        assert!(clipboard.copy("hello").await);
        assert_eq!(*calls.lock().unwrap(), vec!["broken", "legacy"]);
    }

    #[tokio::test]
    async fn test_empty_text_is_not_copied() {
        let (clipboard, calls) = chain(&[("modern", true, true)]);
        assert!(!clipboard.copy("  \n").await);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toast_reports_outcome() {
        let mut toasts = ToastSlot::new(1800);
        let (ok, _) = chain(&[("modern", true, true)]);
        assert!(ok.copy_with_toast("x", &mut toasts, 0.0).await);
        assert_eq!(toasts.visible(1.0).unwrap().message, COPY_OK);

        let (bad, _) = chain(&[("modern", true, false)]);
        assert!(!bad.copy_with_toast("x", &mut toasts, 2.0).await);
        let toast = toasts.visible(3.0).unwrap();
        assert_eq!(toast.message, COPY_FAILED);
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn test_osc52_sequence() {
        assert_eq!(native::osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }
}
