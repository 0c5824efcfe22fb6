//! Shared setup for every command: config, logging, engine, request context

use std::path::PathBuf;

use registree_core::logging_facility;
use registree_core::{CommandCoordinator, EngineConfig, ExError, RequestContext};
use registree_store::{open_engine, SqliteRecordStore};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub db: PathBuf,
    pub config: Option<PathBuf>,
    pub actor: Option<String>,
}

pub struct Session {
    pub config: EngineConfig,
    pub engine: CommandCoordinator<SqliteRecordStore>,
    pub ctx: RequestContext,
}

/// Config file (or defaults), then `REGISTREE_*` overrides
pub fn load_config(options: &SessionOptions) -> CliResult<EngineConfig> {
    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path).map_err(ExError::from)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides().map_err(ExError::from)?;
    Ok(config)
}

pub fn open(options: &SessionOptions) -> CliResult<Session> {
    let config = load_config(options)?;
    logging_facility::init(config.profile().map_err(ExError::from)?);

    let engine = open_engine(&options.db, |calendar| config.lock_engine(calendar))?;
    let actor = options
        .actor
        .clone()
        .unwrap_or_else(|| config.default_actor.clone());
    tracing::debug!(db = %options.db.display(), actor = %actor, "session opened");

    Ok(Session {
        config,
        engine,
        ctx: RequestContext::new(actor),
    })
}
