use super::chat::ChatPanel;
use super::{Shared, ToastView, Toasts};
use crate::core::config::Config;
use crate::core::model::{Field, Section};
use crate::services::api::NovelApi;
use crate::services::chat::ChatSession;
use crate::services::editor::{send_payload, Editor, STATUS_LOAD_FAILED, STATUS_SAVING};
use crate::services::optimize::{status_for, LoadingDots, OptimizeSession, STATUS_GENERATING};
use crate::utils::clock::{Clock, SystemClock};
use leptos::*;
use std::rc::Rc;
use std::time::Duration;

#[component]
pub fn NovelPage(api: Rc<dyn NovelApi>, config: Config, novel_id: String) -> impl IntoView {
    let editor = Shared::new(Editor::new(novel_id.clone()));
    let optimize = Shared::new(OptimizeSession::new());
    let chat = Shared::new(ChatSession::from_config(&config));
    let toasts = Toasts::new(config.toast_ms);

    {
        let api = api.clone();
        let editor = editor.clone();
        let chat = chat.clone();
        spawn_local(async move {
            if chat.update(|c| c.take_history_request()) {
                let history = api.chat_history().await;
                chat.update(|c| c.apply_history(history));
            }
            match api.get_novel(&novel_id).await {
                Ok(detail) => editor.update(|e| e.apply_detail(detail)),
                Err(e) => {
                    log::warn!("failed to load novel {}: {}", novel_id, e);
                    editor.update(|ed| ed.set_status(STATUS_LOAD_FAILED));
                }
            }
        });
    }

    let on_save = {
        let api = api.clone();
        let editor = editor.clone();
        let toasts = toasts.clone();
        move |_| {
            let Some(payload) = editor.update(|e| e.begin_save()) else {
                return;
            };
            let api = api.clone();
            let editor = editor.clone();
            let toasts = toasts.clone();
            spawn_local(async move {
                let id = editor.peek(|e| e.novel_id().to_string());
                let result = send_payload(&*api, &id, &payload).await;
                let now = SystemClock.now_ms();
                toasts.with_slot(|slot| {
                    editor.update_untracked(|e| e.finish_save(&result, slot, now))
                });
                editor.notify();
            });
        }
    };

    let menu = {
        let editor = editor.clone();
        Section::ALL
            .iter()
            .map(|&section| {
                let active = editor.clone();
                let target = editor.clone();
                view! {
                    <div
                        class="menu-item"
                        class:active=move || active.with(|e| e.active_section() == section)
                        on:click=move |_| target.update(|e| e.set_active_section(section))
                    >
                        {section.title()}
                    </div>
                }
            })
            .collect_view()
    };

    let groups = Section::ALL
        .iter()
        .map(|&section| {
            let shown = editor.clone();
            let fields = section
                .fields()
                .iter()
                .map(|&field| field_view(field, editor.clone(), optimize.clone()))
                .collect_view();
            view! {
                <div
                    class="section-group"
                    class:active=move || shown.with(|e| e.active_section() == section)
                >
                    {fields}
                </div>
            }
        })
        .collect_view();

    let header = editor.clone();
    let sub = editor.clone();
    let status = editor.clone();
    let saving = editor.clone();
    let saving_label = editor.clone();

    view! {
        <div class="layout">
            <aside class="menu">{menu}</aside>
            <main class="content">
                <div class="content-header">
                    <h1 id="novel-title">{move || header.with(|e| e.header_title())}</h1>
                    <div class="sub">{move || sub.with(|e| e.header_subtitle())}</div>
                </div>
                {groups}
                <div class="content-footer">
                    <button
                        id="save-btn"
                        class:btn-loading=move || saving.with(|e| e.is_saving())
                        disabled=move || saving.with(|e| e.is_saving())
                        on:click=on_save
                    >
                        {move || if saving_label.with(|e| e.is_saving()) { STATUS_SAVING } else { "保存" }}
                    </button>
                    <span id="status">{move || status.with(|e| e.status().to_string())}</span>
                </div>
            </main>
        </div>
        <OptimizeModal
            api=api
            editor=editor
            optimize=optimize
            chat=chat
            toasts=toasts.clone()
            dot_interval_ms=config.loading_dot_interval_ms
        />
        <ToastView toasts=toasts/>
    }
}

fn field_view(field: Field, editor: Shared<Editor>, optimize: Shared<OptimizeSession>) -> impl IntoView {
    let value = editor.clone();
    let input = editor.clone();
    view! {
        <div class="field">
            <div class="field-header">
                <label for=field.name()>{field.label()}</label>
                <button
                    class="ghost"
                    data-optimize=field.name()
                    on:click=move |_| {
                        let current = editor.peek(|e| e.value(field).to_string());
                        optimize.update(|o| o.open(field.name(), &current));
                    }
                >
                    "AI 优化"
                </button>
            </div>
            <textarea
                id=field.name()
                rows="6"
                prop:value=move || value.with(|e| e.value(field).to_string())
                on:input=move |ev| input.update(|e| e.set_value(field, event_target_value(&ev)))
            ></textarea>
        </div>
    }
}

#[component]
fn OptimizeModal(
    api: Rc<dyn NovelApi>,
    editor: Shared<Editor>,
    optimize: Shared<OptimizeSession>,
    chat: Shared<ChatSession>,
    toasts: Toasts,
    dot_interval_ms: u64,
) -> impl IntoView {
    let started = create_rw_signal(0.0);
    let now = create_rw_signal(0.0);
    let ticker = store_value(None::<IntervalHandle>);
    let stop_ticker = move || {
        if let Some(handle) = ticker.get_value() {
            handle.clear();
        }
        ticker.set_value(None);
    };

    let on_generate = {
        let api = api.clone();
        let editor = editor.clone();
        let optimize = optimize.clone();
        move |_| {
            let Some((ticket, request)) = optimize.update(|o| o.begin_generate()) else {
                return;
            };
            editor.update(|e| e.set_status(STATUS_GENERATING));
            let t0 = SystemClock.now_ms();
            started.set(t0);
            now.set(t0);
            stop_ticker();
            let handle = set_interval_with_handle(
                move || now.set(SystemClock.now_ms()),
                Duration::from_millis(dot_interval_ms),
            );
            ticker.set_value(handle.ok());

            let api = api.clone();
            let editor = editor.clone();
            let optimize = optimize.clone();
            spawn_local(async move {
                let result = api.optimize(&request).await;
                stop_ticker();
                if optimize.update(|o| o.finish(ticket, result)) {
                    let status = optimize.peek(|o| status_for(o.state()));
                    editor.update(|e| e.set_status(status));
                }
            });
        }
    };

    let decide = {
        let editor = editor.clone();
        let optimize = optimize.clone();
        move |keep: bool| {
            optimize.update_untracked(|o| {
                editor.update_untracked(|e| {
                    if keep {
                        o.apply(e);
                    } else {
                        o.revert(e);
                    }
                })
            });
            optimize.notify();
            editor.notify();
        }
    };
    let on_apply = {
        let decide = decide.clone();
        move |_| decide(true)
    };
    let on_revert = move |_| decide(false);

    let on_close = {
        let optimize = optimize.clone();
        move |_| {
            stop_ticker();
            optimize.update(|o| o.close());
        }
    };

    let open = optimize.clone();
    let label = optimize.clone();
    let prompt = optimize.clone();
    let prompt_input = optimize.clone();
    let result = optimize.clone();
    let busy = optimize.clone();
    let undecided = optimize.clone();
    let undecided_revert = optimize.clone();

    view! {
        <Show when=move || open.with(|o| o.is_open())>
            <div id="optimize-modal" class="modal active">
                <div class="modal-content modal-split">
                    <button class="modal-close-x" type="button" title="关闭" on:click=on_close.clone()>
                        "×"
                    </button>
                    <div class="modal-left">
                        <div class="modal-header">
                            <div class="modal-title">"AI 优化 · " {let label = label.clone(); move || label.with(|o| o.field_label().to_string())}</div>
                            <div class="modal-sub">"补充提示词与要求"</div>
                        </div>
                        <div class="modal-body">
                            <label class="modal-label" for="optimize-prompt">"提示词"</label>
                            <textarea
                                id="optimize-prompt"
                                rows="4"
                                placeholder="输入优化方向、要求、风格等"
                                prop:value={let prompt = prompt.clone(); move || prompt.with(|o| o.instruction().to_string())}
                                on:input={let prompt_input = prompt_input.clone(); move |ev| prompt_input.update(|o| o.set_instruction(event_target_value(&ev)))}
                            ></textarea>
                            <label class="modal-label" for="optimize-result">"AI 结果"</label>
                            <textarea
                                id="optimize-result"
                                rows="10"
                                placeholder="等待生成结果"
                                readonly
                                prop:value={let result = result.clone(); move || {
                                    if result.with(|o| o.is_generating()) {
                                        LoadingDots::new(dot_interval_ms, started.get()).frame(now.get())
                                    } else {
                                        result.with(|o| o.result_text())
                                    }
                                }}
                            ></textarea>
                        </div>
                        <div class="modal-actions">
                            <button
                                id="optimize-submit"
                                disabled={let busy = busy.clone(); move || busy.with(|o| o.is_generating())}
                                on:click=on_generate.clone()
                            >
                                "生成优化"
                            </button>
                            <button
                                id="optimize-apply"
                                class="ghost"
                                disabled={let undecided = undecided.clone(); move || !undecided.with(|o| o.can_decide())}
                                on:click=on_apply.clone()
                            >
                                "保留"
                            </button>
                            <button
                                id="optimize-revert"
                                class="ghost"
                                disabled={let undecided = undecided_revert.clone(); move || !undecided.with(|o| o.can_decide())}
                                on:click=on_revert.clone()
                            >
                                "撤销"
                            </button>
                        </div>
                    </div>
                    <div class="modal-right">
                        <ChatPanel api=api.clone() chat=chat.clone() toasts=toasts.clone()/>
                    </div>
                </div>
            </div>
        </Show>
    }
}
