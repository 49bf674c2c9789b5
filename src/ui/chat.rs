use super::{Shared, Toasts};
use crate::core::model::{ChatMessage, Role};
use crate::services::api::NovelApi;
use crate::services::chat::{fetch_reply, ChatSession, THINKING_TEXT};
use crate::services::clipboard::{Clipboard, COPY_FAILED, COPY_OK};
use crate::services::toast::ToastKind;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::markdown::markdown_to_html;
use leptos::*;
use std::rc::Rc;

fn bubble_html(message: &ChatMessage) -> String {
    if message.loading {
        format!(
            r#"<span class="thinking">{}<span class="thinking-dots"><span>.</span><span>.</span><span>.</span></span></span>"#,
            THINKING_TEXT
        )
    } else {
        markdown_to_html(&message.content)
    }
}

#[component]
pub fn ChatPanel(api: Rc<dyn NovelApi>, chat: Shared<ChatSession>, toasts: Toasts) -> impl IntoView {
    let input = create_rw_signal(String::new());
    let use_search = create_rw_signal(false);
    let clipboard = Rc::new(Clipboard::system());

    let send = {
        let api = api.clone();
        let chat = chat.clone();
        move || {
            let text = input.get_untracked();
            let Some(turn) = chat.update(|c| c.begin_turn(&text, SystemClock.now_ms())) else {
                return;
            };
            input.set(String::new());
            let api = api.clone();
            let chat = chat.clone();
            let search = use_search.get_untracked();
            spawn_local(async move {
                let id = turn.id;
                let result = fetch_reply(&*api, turn, search, &SystemClock, |id, text| {
                    chat.update(|c| c.show_progress(id, text))
                })
                .await;
                match result {
                    Ok(text) => chat.update(|c| c.complete_turn(id, text)),
                    Err(e) => {
                        log::warn!("chat turn failed: {}", e);
                        chat.update(|c| c.fail_turn(id));
                    }
                }
            });
        }
    };
    let send_click = send.clone();
    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    let clearing = create_rw_signal(false);
    let on_clear = {
        let chat = chat.clone();
        move |_| {
            clearing.set(true);
            let api = api.clone();
            let chat = chat.clone();
            spawn_local(async move {
                match api.clear_chat().await {
                    Ok(()) => chat.update(|c| c.clear_log()),
                    Err(e) => log::warn!("failed to clear chat: {}", e),
                }
                clearing.set(false);
            });
        }
    };

    let history = chat.clone();
    let busy = chat.clone();

    view! {
        <div class="chat-panel">
            <div class="chat-title">"对话"</div>
            <div id="chat-history" class="chat-history">
                {move || {
                    history
                        .with(|c| c.log().messages().to_vec())
                        .into_iter()
                        .map(|message| {
                            let role = match message.role {
                                Role::User => "user",
                                Role::Assistant => "assistant",
                            };
                            let copy_text = message.content.clone();
                            let clipboard = clipboard.clone();
                            let toasts = toasts.clone();
                            let on_copy = move |ev: ev::MouseEvent| {
                                ev.prevent_default();
                                ev.stop_propagation();
                                let text = copy_text.clone();
                                let clipboard = clipboard.clone();
                                let toasts = toasts.clone();
                                spawn_local(async move {
                                    if clipboard.copy(&text).await {
                                        toasts.show(COPY_OK, ToastKind::Success);
                                    } else {
                                        toasts.show(COPY_FAILED, ToastKind::Error);
                                    }
                                });
                            };
                            view! {
                                <div class=format!("chat-msg {}", role)>
                                    <div class="chat-meta">{message.role.label()}</div>
                                    <div class="chat-bubble" inner_html=bubble_html(&message)></div>
                                    <div class="chat-actions-row">
                                        <button
                                            type="button"
                                            class="chat-copy"
                                            title="复制"
                                            aria-label="复制"
                                            disabled=!message.can_copy()
                                            on:click=on_copy
                                        >
                                            "复制"
                                        </button>
                                    </div>
                                </div>
                            }
                        })
                        .collect_view()
                }}
            </div>
            <div class="chat-footer">
                <textarea
                    id="chat-input"
                    rows="3"
                    placeholder="输入你的问题"
                    prop:value=move || input.get()
                    on:input=move |ev| input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                ></textarea>
                <div class="chat-actions">
                    <label class="chat-toggle">
                        <input
                            id="chat-search"
                            type="checkbox"
                            prop:checked=move || use_search.get()
                            on:change=move |ev| use_search.set(event_target_checked(&ev))
                        />
                        "搜索"
                    </label>
                    <button
                        id="chat-send"
                        disabled=move || busy.with(|c| c.is_in_flight())
                        on:click=move |_| send_click()
                    >
                        "发送"
                    </button>
                    <button id="chat-clear" class="ghost" disabled=move || clearing.get() on:click=on_clear>
                        "清空"
                    </button>
                </div>
            </div>
        </div>
    }
}
