mod chat;
mod home;
mod novel;

use crate::core::config::Config;
use crate::services::api::NovelApi;
use crate::services::toast::{ToastKind, ToastSlot};
use crate::utils::clock::{Clock, SystemClock};
use anyhow::Result;
use inquire::InquireError;

/// Where the prompt loop goes next.
pub(crate) enum Page {
    Home,
    Novel(String),
    Exit,
}

/// Interactive terminal front end: home page, then novel pages.
pub async fn run<A: NovelApi + ?Sized>(
    config: &Config,
    api: &A,
    novel_id: Option<String>,
) -> Result<()> {
    let mut page = match novel_id {
        Some(id) => Page::Novel(id),
        None => Page::Home,
    };
    loop {
        page = match page {
            Page::Home => home::run(api).await?,
            Page::Novel(id) => novel::run(config, api, &id).await?,
            Page::Exit => return Ok(()),
        };
    }
}

/// Esc / Ctrl-C on a prompt means "back", not an error.
pub(crate) fn answered<T>(result: Result<T, InquireError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn print_toast(toasts: &ToastSlot) {
    if let Some(toast) = toasts.visible(SystemClock.now_ms()) {
        match toast.kind {
            ToastKind::Success => println!("✔ {}", toast.message),
            ToastKind::Error => eprintln!("✘ {}", toast.message),
        }
    }
}
