//! Per-invocation session: workspace, config, store and acting user

use miette::Result;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Actor, Config, Store, Workspace};

pub struct Session {
    pub workspace: Workspace,
    pub config: Config,
    pub store: Store,
    pub actor: Actor,
    /// Output format with `auto` resolved against the config
    pub format: OutputFormat,
}

impl Session {
    /// Discover the workspace and open its store
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = match global.workspace {
            Some(ref path) => Workspace::discover_from(path),
            None => Workspace::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;

        let config = Config::load(Some(&workspace));
        let db_path = config.database_path(&workspace);
        tracing::debug!("opening store at {}", db_path.display());
        let store = Store::open(&db_path)?;

        let actor = config.actor(global.as_user.as_deref());
        tracing::debug!(user = %actor.username, role = %actor.role, "acting identity");

        let format = global.format.resolve(config.default_format.as_deref());

        Ok(Self {
            workspace,
            config,
            store,
            actor,
            format,
        })
    }
}
