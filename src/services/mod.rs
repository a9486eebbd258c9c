//! REST resource layer: one service per backend resource over a shared
//! [`ApiClient`].

/// Authenticated HTTP transport shared by every service.
pub mod api_client;
/// Login and session lookups.
pub mod auth_service;
/// Bout resource and judge workflow.
pub mod bout_service;
/// Public events.
pub mod event_service;
/// Fighter resource with shape translation.
pub mod fighter_service;
/// Platform statistics.
pub mod stats_service;

pub use self::{
    api_client::ApiClient, auth_service::AuthService, bout_service::BoutService,
    event_service::EventService, fighter_service::FighterService, stats_service::StatsService,
};

/// Every resource service, built over one client.
#[derive(Clone)]
pub struct Services {
    /// Login and session.
    pub auth: AuthService,
    /// Fighters.
    pub fighters: FighterService,
    /// Bouts and judging.
    pub bouts: BoutService,
    /// Events.
    pub events: EventService,
    /// Statistics.
    pub stats: StatsService,
}

impl Services {
    /// Build every service over clones of `api`.
    pub fn new(api: ApiClient) -> Self {
        Self {
            auth: AuthService::new(api.clone()),
            fighters: FighterService::new(api.clone()),
            bouts: BoutService::new(api.clone()),
            events: EventService::new(api.clone()),
            stats: StatsService::new(api),
        }
    }
}
