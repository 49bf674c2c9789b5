use super::{navigate_to_novel, Shared};
use crate::services::api::NovelApi;
use crate::services::home::HomeController;
use leptos::*;
use std::rc::Rc;

#[component]
pub fn HomePage(api: Rc<dyn NovelApi>) -> impl IntoView {
    let home = Shared::new(HomeController::new());
    let title = create_rw_signal(String::new());

    {
        let api = api.clone();
        let home = home.clone();
        spawn_local(async move {
            let result = api.list_novels().await;
            let _ = home.update(|h| h.apply_list(result));
        });
    }

    let on_create = {
        let home = home.clone();
        move |_| {
            let Some(name) = home.update(|h| h.begin_create(&title.get_untracked())) else {
                return;
            };
            let api = api.clone();
            let home = home.clone();
            spawn_local(async move {
                let result = api.create_novel(&name).await;
                let Some(novel) = home.update(|h| h.finish_create(result)) else {
                    return;
                };
                title.set(String::new());
                let listed = api.list_novels().await;
                let _ = home.update(|h| h.apply_list(listed));
                navigate_to_novel(&novel.id);
            });
        }
    };

    let list_home = home.clone();
    let error_home = home.clone();

    view! {
        <div class="create-row">
            <input
                id="novel-title"
                type="text"
                placeholder="输入小说标题"
                prop:value=move || title.get()
                on:input=move |ev| title.set(event_target_value(&ev))
            />
            <button id="create-btn" on:click=on_create disabled=move || home.with(|h| h.is_creating())>
                "创建"
            </button>
        </div>
        {move || error_home.with(|h| h.error().map(|e| view! { <div class="status">{e.to_string()}</div> }))}
        {move || {
            list_home.with(|h| match h.empty_state() {
                Some(empty) => view! {
                    <div id="novel-list" class="empty"><div class="empty-state">{empty}</div></div>
                }.into_view(),
                None => {
                    let cards = h
                        .novels()
                        .iter()
                        .map(|n| {
                            let id = n.id.clone();
                            view! {
                                <div class="novel-card" on:click=move |_| navigate_to_novel(&id)>
                                    <div class="novel-title">{n.title.clone()}</div>
                                    <div class="novel-meta">{n.created_at.clone()}</div>
                                </div>
                            }
                        })
                        .collect_view();
                    view! { <div id="novel-list">{cards}</div> }.into_view()
                }
            })
        }}
    }
}
