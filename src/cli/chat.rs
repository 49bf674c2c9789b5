use super::{answered, print_toast};
use crate::core::config::Config;
use crate::core::model::{ChatMessage, Role};
use crate::services::api::NovelApi;
use crate::services::chat::{ChatLog, ChatSession, THINKING_TEXT};
use crate::services::clipboard::Clipboard;
use crate::services::toast::ToastSlot;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::markdown::markdown_to_html;
use anyhow::Result;
use inquire::Text;
use log::warn;
use std::io::Write;

const WRAP_WIDTH: usize = 80;
const HELP: &str = "/search 切换联网搜索  /copy 复制最后一条回复  /clear 清空对话  空行返回";

/// Chat markdown as wrapped terminal text.
pub(crate) fn render_message(message: &ChatMessage) -> String {
    let html = markdown_to_html(&message.content);
    match html2text::from_read(html.as_bytes(), WRAP_WIDTH) {
        Ok(text) => text.trim_end().to_string(),
        Err(e) => {
            warn!("failed to render chat message: {}", e);
            message.content.clone()
        }
    }
}

fn print_log(log: &ChatLog) {
    for message in log.messages() {
        let body = if message.loading {
            format!("{}...", THINKING_TEXT)
        } else {
            render_message(message)
        };
        println!("{}: {}", message.role.label(), body);
    }
}

pub(crate) struct ChatPage {
    session: ChatSession,
    clipboard: Clipboard,
    use_search: bool,
}

impl ChatPage {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            session: ChatSession::from_config(config),
            clipboard: Clipboard::system(),
            use_search: false,
        }
    }

    pub(crate) async fn run<A: NovelApi + ?Sized>(
        &mut self,
        api: &A,
        toasts: &mut ToastSlot,
    ) -> Result<()> {
        self.session.ensure_history(api).await;
        print_log(self.session.log());
        println!("{}", HELP);

        loop {
            let prompt = if self.use_search { "你 (联网)" } else { "你" };
            let Some(input) = answered(Text::new(prompt).prompt())? else {
                return Ok(());
            };
            match input.trim() {
                "" => return Ok(()),
                "/search" => {
                    self.use_search = !self.use_search;
                }
                "/copy" => {
                    let last = self
                        .session
                        .log()
                        .messages()
                        .iter()
                        .rev()
                        .find(|m| m.role == Role::Assistant && m.can_copy())
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    self.clipboard
                        .copy_with_toast(&last, toasts, SystemClock.now_ms())
                        .await;
                    print_toast(toasts);
                }
                "/clear" => {
                    if let Err(e) = self.session.clear(api).await {
                        eprintln!("清空失败: {}", e);
                    }
                }
                text => self.send(api, text).await,
            }
        }
    }

    async fn send<A: NovelApi + ?Sized>(&mut self, api: &A, text: &str) {
        let mut shown = String::new();
        let mut view = |log: &ChatLog| {
            let Some(last) = log.messages().last() else {
                return;
            };
            if last.role != Role::Assistant || last.loading {
                return;
            }
            let mut out = std::io::stdout().lock();
            if shown.is_empty() {
                let _ = write!(out, "\r\x1b[2KAI: ");
            }
            if let Some(delta) = last.content.strip_prefix(shown.as_str()) {
                let _ = write!(out, "{}", delta);
            } else {
                let _ = write!(out, "\n{}", last.content);
            }
            let _ = out.flush();
            shown = last.content.clone();
        };
        print!("AI: {}...\r", THINKING_TEXT);
        let _ = std::io::stdout().flush();

        self.session
            .send(api, text, self.use_search, &SystemClock, &mut view)
            .await;
        println!();
    }
}
