#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use novel_studio::core::config::Config;
    use novel_studio::services::api::HttpApi;

    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please check 'config.yml' or remove it to use the defaults.");
            return Err(e);
        }
    };
    log::info!("using server {}", config.base_url);

    let api = HttpApi::new(&config).context("Failed to create API client")?;
    let novel_id = std::env::args().nth(1);

    novel_studio::cli::run(&config, &api, novel_id).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
