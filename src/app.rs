use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config;
use crate::data::{
    GoodVibesLeaderboardService, GoodVibesService, LeaderboardService, MockLeaderboardService,
    MockVibeService, VibeService,
};
use crate::goodvibes;
use crate::logging;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub demo: bool,
}

struct Services {
    vibes: Arc<dyn VibeService>,
    leaderboard: Arc<dyn LeaderboardService>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    if let Err(err) = logging::init() {
        eprintln!("warning: {err:#}");
    }

    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    info!(
        config = %friendly_path(config_path.as_ref()),
        base_url = %cfg.api.base_url,
        demo = opts.demo,
        "configuration loaded"
    );

    let services = if opts.demo {
        Services {
            vibes: Arc::new(MockVibeService::default()),
            leaderboard: Arc::new(MockLeaderboardService),
        }
    } else {
        remote_services(&cfg)?
    };

    let status_message = if opts.demo {
        "Loading demo Good Vibes…".to_string()
    } else {
        format!("Loading Good Vibes from {}…", cfg.api.base_url)
    };

    let options = ui::Options {
        settings: cfg.carousel_settings(),
        vibe_service: services.vibes,
        leaderboard_service: Some(services.leaderboard),
        show_leaderboard: cfg.ui.show_leaderboard,
        leaderboard_limit: cfg.ui.leaderboard_limit,
        api_base_url: cfg.api.base_url.clone(),
        status_message,
    };

    let mut model = ui::Model::new(options);
    model.run()?;
    info!("good vibes stopped");

    Ok(())
}

fn remote_services(cfg: &config::Config) -> Result<Services> {
    let client = goodvibes::Client::new(goodvibes::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("create good vibes client")?;
    let client = Arc::new(client);
    Ok(Services {
        vibes: Arc::new(GoodVibesService::new(Arc::clone(&client))),
        leaderboard: Arc::new(GoodVibesLeaderboardService::new(client)),
    })
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/good-vibes/config.yaml".to_string()
    }
}
