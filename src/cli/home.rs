use super::{answered, Page};
use crate::services::api::NovelApi;
use crate::services::home::HomeController;
use anyhow::Result;
use inquire::{Select, Text};

const CREATE: &str = "+ 新建小说";
const QUIT: &str = "退出";

pub(crate) async fn run<A: NovelApi + ?Sized>(api: &A) -> Result<Page> {
    let mut home = HomeController::new();
    if home.load(api).await.is_err() {
        eprintln!("{}", home.error().unwrap_or_default());
    }

    loop {
        if let Some(empty) = home.empty_state() {
            println!("{}", empty);
        }

        let mut options: Vec<String> = home
            .novels()
            .iter()
            .map(|n| format!("{}  ({})", n.title, n.created_at))
            .collect();
        options.push(CREATE.to_string());
        options.push(QUIT.to_string());

        let Some(choice) = answered(Select::new("小说列表", options).raw_prompt())? else {
            return Ok(Page::Exit);
        };

        if choice.index < home.novels().len() {
            return Ok(Page::Novel(home.novels()[choice.index].id.clone()));
        }
        match choice.value.as_str() {
            CREATE => {
                let Some(title) = answered(Text::new("小说标题").prompt())? else {
                    continue;
                };
                if let Some(novel) = home.create(api, &title).await {
                    return Ok(Page::Novel(novel.id));
                }
                if let Some(error) = home.error() {
                    eprintln!("{}", error);
                }
            }
            _ => return Ok(Page::Exit),
        }
    }
}
