//! Client-side route table, navigation guard and the navigator used for
//! forced redirects.

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::{dto::Role, session::SessionContext};

mod table;

pub use self::table::{Route, RouteMeta};

/// Query parameter carrying the requested path to the login screen.
pub const REDIRECT_PARAM: &str = "redirect";

/// Errors raised when navigating.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// No route matches the path.
    #[error("no route matches `{0}`")]
    UnknownPath(String),
}

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Target route.
    pub route: Route,
    /// Path to return to after logging in.
    pub redirect: Option<String>,
}

impl Location {
    /// Location without a redirect.
    pub fn new(route: Route) -> Self {
        Self {
            route,
            redirect: None,
        }
    }

    /// Full path including the redirect query, if any. The redirect is
    /// form-encoded so its own query survives intact.
    pub fn full_path(&self) -> String {
        match &self.redirect {
            Some(redirect) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(REDIRECT_PARAM, redirect)
                    .finish();
                format!("{}?{query}", self.route.path())
            }
            None => self.route.path(),
        }
    }
}

/// Outcome of running the guard for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Enter the requested route.
    Proceed,
    /// Go here instead.
    Redirect(Location),
}

/// Decide whether the session may enter `to`. `full_path` is what the user
/// asked for, kept so login can send them back.
pub fn guard(to: &Route, full_path: &str, session: &SessionContext) -> GuardDecision {
    let meta = to.meta();
    let authenticated = session.is_authenticated();
    let role = session.role();

    if meta.requires_auth && !authenticated {
        return GuardDecision::Redirect(Location {
            route: Route::Login,
            redirect: Some(full_path.to_owned()),
        });
    }
    if meta.requires_admin && role != Some(Role::Admin) {
        return GuardDecision::Redirect(Location::new(Route::Home));
    }
    if meta.requires_judge && role != Some(Role::Judge) {
        return GuardDecision::Redirect(Location::new(Route::Home));
    }
    if meta.requires_guest && authenticated {
        return GuardDecision::Redirect(Location::new(Route::Home));
    }

    GuardDecision::Proceed
}

/// Sink for navigations forced from outside the UI flow.
pub trait Navigator: Send + Sync {
    /// Leave whatever is on screen and go to the login entry point.
    fn redirect_to_login(&self);
}

/// Tracks the current location and applies the guard on every push.
pub struct Router {
    session: SessionContext,
    current: watch::Sender<Location>,
}

impl Router {
    /// Router starting at home, guarding with `session`.
    pub fn new(session: SessionContext) -> Self {
        let (current, _rx) = watch::channel(Location::new(Route::Home));
        Self { session, current }
    }

    /// Navigate to `path`, following at most one guard redirect.
    pub fn push(&self, path: &str) -> Result<Location, RouteError> {
        let route = Route::parse(path).ok_or_else(|| RouteError::UnknownPath(path.to_owned()))?;
        let location = match guard(&route, path, &self.session) {
            GuardDecision::Proceed => Location::new(route),
            GuardDecision::Redirect(target) => {
                debug!(from = %path, to = %target.full_path(), "navigation redirected by guard");
                target
            }
        };
        self.current.send_replace(location.clone());
        Ok(location)
    }

    /// Location last navigated to.
    pub fn current(&self) -> Location {
        self.current.borrow().clone()
    }

    /// Subscribe to location changes.
    pub fn watch(&self) -> watch::Receiver<Location> {
        self.current.subscribe()
    }
}

impl Navigator for Router {
    fn redirect_to_login(&self) {
        // Hard navigation: no guard, no redirect query.
        info!("session rejected by backend; returning to login");
        self.current.send_replace(Location::new(Route::Login));
    }
}
