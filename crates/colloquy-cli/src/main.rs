mod cli;
mod demo;
mod repl;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use colloquy_common::{ColloquyError, SessionId};
use colloquy_config::ColloquyConfig;
use colloquy_session::controller::ControllerSettings;
use colloquy_session::{
    ActivityPolicy, InMemoryRepository, JsonDirRepository, MessageRepository, RuntimeSettings,
    Session, SessionController, SessionHandle, SessionServices,
};

use crate::cli::Args;
use crate::demo::DemoBackend;

fn main() {
    let args = cli::parse();

    // Logging needs the configured level, so config errors are reported after init.
    let loaded = match &args.config {
        Some(path) => colloquy_config::load_config_from(path),
        None => colloquy_config::load_config(),
    };

    let log_directive = match (&args.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(config)) => config.logging.level.as_directive().to_string(),
        (None, Err(_)) => "info".to_string(),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("failed to load config: {e}, using defaults");
            ColloquyConfig::default()
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(args, config)) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args, config: ColloquyConfig) -> Result<(), ColloquyError> {
    let repository: Arc<dyn MessageRepository> = if args.ephemeral {
        Arc::new(InMemoryRepository::new())
    } else {
        let repository = JsonDirRepository::from_config(&config.storage)
            .map_err(|e| ColloquyError::Session(e.to_string()))?;
        tracing::info!(dir = %repository.dir().display(), "storing sessions");
        Arc::new(repository)
    };

    let backend = Arc::new(DemoBackend::new(
        config.context.default_budget_tokens,
        Duration::from_millis(args.word_delay_ms),
    ));
    let services = SessionServices::new(backend.clone(), backend, repository)
        .with_settings(RuntimeSettings::from_config(&config));

    let mut session = Session::new(config.context.default_budget_tokens);
    if let Some(id) = args.session.as_deref() {
        session.id = SessionId::from(id);
    }
    let controller = SessionController::from_parts(
        session,
        Vec::new(),
        ControllerSettings::from_config(&config),
        Arc::new(ActivityPolicy::from_config(&config.activity)),
    )
    .with_model(args.model);

    let handle = SessionHandle::open(controller, services)
        .await
        .map_err(|e| ColloquyError::Session(e.user_message()))?;
    let restored = handle.messages().await.map(|m| m.len()).unwrap_or(0);
    println!("session {} ({restored} message(s))", handle.id());

    repl::run(handle).await
}
