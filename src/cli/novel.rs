use super::{answered, chat, print_toast, Page};
use crate::core::config::Config;
use crate::core::model::{Field, Section};
use crate::services::api::NovelApi;
use crate::services::editor::Editor;
use crate::services::optimize::{status_for, LoadingDots, OptimizeSession, STATUS_GENERATING};
use crate::services::toast::ToastSlot;
use crate::utils::clock::{Clock, SystemClock};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Editor as TextEditor, Select, Text};
use std::fmt;
use std::time::Duration;

enum Action {
    Edit(Field),
    Optimize(Field),
    Switch(Section),
    Save,
    Chat,
    Back,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Edit(field) => write!(f, "编辑 {}", field.label()),
            Action::Optimize(field) => write!(f, "AI 优化 {}", field.label()),
            Action::Switch(section) => write!(f, "切换到 {}", section.title()),
            Action::Save => write!(f, "保存"),
            Action::Chat => write!(f, "AI 助手"),
            Action::Back => write!(f, "返回列表"),
        }
    }
}

fn preview(value: &str) -> String {
    let line = value.lines().next().unwrap_or_default();
    let short: String = line.chars().take(40).collect();
    if short.len() < value.len() {
        format!("{}…", short)
    } else {
        short
    }
}

pub(crate) async fn run<A: NovelApi + ?Sized>(config: &Config, api: &A, id: &str) -> Result<Page> {
    let mut editor = match Editor::load(api, id).await {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("加载失败: {}", e);
            return Ok(Page::Home);
        }
    };
    let mut toasts = ToastSlot::new(config.toast_ms);
    let mut optimize = OptimizeSession::new();
    let mut chat = chat::ChatPage::new(config);

    loop {
        println!();
        println!("《{}》 {} · {}", editor.novel_title(), editor.header_title(), editor.header_subtitle());
        for field in editor.active_section().fields() {
            println!("  {}: {}", field.label(), preview(editor.value(*field)));
        }
        if !editor.status().is_empty() {
            println!("  [{}]", editor.status());
        }

        let mut actions: Vec<Action> = Vec::new();
        for field in editor.active_section().fields() {
            actions.push(Action::Edit(*field));
            actions.push(Action::Optimize(*field));
        }
        for section in Section::ALL {
            if section != editor.active_section() {
                actions.push(Action::Switch(section));
            }
        }
        actions.extend([Action::Save, Action::Chat, Action::Back]);

        let Some(action) = answered(Select::new("操作", actions).prompt())? else {
            return Ok(Page::Home);
        };

        match action {
            Action::Edit(field) => {
                let edited = TextEditor::new(field.label())
                    .with_predefined_text(editor.value(field))
                    .prompt();
                if let Some(value) = answered(edited)? {
                    editor.set_value(field, value);
                }
            }
            Action::Optimize(field) => {
                run_optimize(config, api, &mut editor, &mut optimize, field).await?;
            }
            Action::Switch(section) => editor.set_active_section(section),
            Action::Save => {
                editor.save(api, &mut toasts, SystemClock.now_ms()).await;
                print_toast(&toasts);
            }
            Action::Chat => chat.run(api, &mut toasts).await?,
            Action::Back => return Ok(Page::Home),
        }
    }
}

async fn run_optimize<A: NovelApi + ?Sized>(
    config: &Config,
    api: &A,
    editor: &mut Editor,
    session: &mut OptimizeSession,
    field: Field,
) -> Result<()> {
    session.open(field.name(), editor.value(field));
    let instruction = Text::new("优化指令")
        .with_initial_value(session.instruction())
        .prompt();
    let Some(instruction) = answered(instruction)? else {
        session.close();
        return Ok(());
    };
    session.set_instruction(instruction);

    let frames = LoadingDots::cycle();
    // the last tick string is shown once the spinner finishes
    let ticks: Vec<&str> = frames.iter().map(String::as_str).chain([""]).collect();

    loop {
        editor.set_status(STATUS_GENERATING);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green}")?
                .tick_strings(&ticks),
        );
        spinner.enable_steady_tick(Duration::from_millis(config.loading_dot_interval_ms));
        let state = session.generate(api).await.cloned();
        spinner.finish_and_clear();

        let Some(state) = state else {
            return Ok(());
        };
        editor.set_status(status_for(&state));
        println!("{}", status_for(&state));
        println!("{}", session.result_text());

        if session.can_decide() {
            let choice = answered(Select::new("结果", vec!["保留", "撤销"]).prompt())?;
            match choice {
                Some("保留") => {
                    session.apply(editor);
                }
                _ => session.revert(editor),
            }
            return Ok(());
        }

        let retry = answered(Select::new("操作", vec!["重试", "关闭"]).prompt())?;
        if retry != Some("重试") {
            session.close();
            return Ok(());
        }
    }
}
