//! Client state: the stores and the application root that wires them.

pub mod auth;
pub mod bouts;
pub mod fighters;

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::ClientConfig,
    error::InitError,
    live::{Connector, LiveChannel, WebSocketConnector},
    routes::Router,
    services::{ApiClient, Services},
    session::{FileStore, KeyValueStore, MemoryStore, SessionContext},
};

pub use self::{
    auth::{AuthStore, LoginOutcome},
    bouts::{BoutCollections, BoutStore, BoutSubscription},
    fighters::FighterStore,
};

/// Handle shared by every task.
pub type SharedState = Arc<AppState>;

/// Application root owning every client component.
pub struct AppState {
    config: ClientConfig,
    session: SessionContext,
    router: Arc<Router>,
    services: Services,
    live: LiveChannel,
    auth: AuthStore,
    bouts: BoutStore,
    fighters: FighterStore,
}

impl AppState {
    /// Build the client from configuration: file-backed session when a
    /// storage path is set, WebSocket transport for the live channel.
    pub fn new(config: ClientConfig) -> Result<SharedState, InitError> {
        let store: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => {
                let store = FileStore::open(path)?;
                debug!(path = %store.path().display(), "using file-backed session");
                Arc::new(store)
            }
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_parts(config, store, Arc::new(WebSocketConnector))
    }

    /// Build the client over explicit storage and transport.
    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<SharedState, InitError> {
        let session = SessionContext::new(store);
        if session.sanitize() {
            info!("persisted session was invalid and has been cleared");
        }

        let router = Arc::new(Router::new(session.clone()));
        let api = ApiClient::new(&config, session.clone(), router.clone())?;
        let services = Services::new(api);
        let live = LiveChannel::new(config.live(), connector);

        let auth = AuthStore::new(services.auth.clone());
        let bouts = BoutStore::new(services.bouts.clone(), live.clone());
        let fighters = FighterStore::new(services.fighters.clone());

        Ok(Arc::new(Self {
            config,
            session,
            router,
            services,
            live,
            auth,
            bouts,
            fighters,
        }))
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Persisted session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Navigation state.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// REST services.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The single live channel, shared by reference.
    pub fn live(&self) -> &LiveChannel {
        &self.live
    }

    /// Authentication store.
    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Bout store.
    pub fn bouts(&self) -> &BoutStore {
        &self.bouts
    }

    /// Fighter store.
    pub fn fighters(&self) -> &FighterStore {
        &self.fighters
    }
}
