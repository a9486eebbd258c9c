use std::fmt;

/// Every screen the client can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`
    Home,
    /// `/login`
    Login,
    /// `/fighters`
    Fighters,
    /// `/fighters/:id`
    FighterDetail(String),
    /// `/bouts`
    Bouts,
    /// `/bouts/live`
    LiveBouts,
    /// `/bouts/:id`
    BoutDetail(String),
    /// `/dashboard`, signed-in users only.
    Dashboard,
    /// `/admin/fighters`, admins only.
    AdminFighters,
    /// `/admin/bouts`, admins only.
    AdminBouts,
    /// `/judge/bouts`, judges only.
    JudgeBouts,
}

/// Access requirements attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteMeta {
    /// A session is required.
    pub requires_auth: bool,
    /// The `ADMIN` role is required.
    pub requires_admin: bool,
    /// The `JUDGE` role is required.
    pub requires_judge: bool,
    /// Only reachable while signed out.
    pub requires_guest: bool,
    /// Render without the navigation bar.
    pub hide_nav: bool,
}

impl Route {
    /// Resolve a path (query string ignored) to a route.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["fighters"] => Route::Fighters,
            ["fighters", id] => Route::FighterDetail((*id).to_owned()),
            ["bouts"] => Route::Bouts,
            // Must win over the `:id` pattern below.
            ["bouts", "live"] => Route::LiveBouts,
            ["bouts", id] => Route::BoutDetail((*id).to_owned()),
            ["dashboard"] => Route::Dashboard,
            ["admin", "fighters"] => Route::AdminFighters,
            ["admin", "bouts"] => Route::AdminBouts,
            ["judge", "bouts"] => Route::JudgeBouts,
            _ => return None,
        };
        Some(route)
    }

    /// Canonical path of the route.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".into(),
            Route::Login => "/login".into(),
            Route::Fighters => "/fighters".into(),
            Route::FighterDetail(id) => format!("/fighters/{id}"),
            Route::Bouts => "/bouts".into(),
            Route::LiveBouts => "/bouts/live".into(),
            Route::BoutDetail(id) => format!("/bouts/{id}"),
            Route::Dashboard => "/dashboard".into(),
            Route::AdminFighters => "/admin/fighters".into(),
            Route::AdminBouts => "/admin/bouts".into(),
            Route::JudgeBouts => "/judge/bouts".into(),
        }
    }

    /// Stable route name.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Login",
            Route::Fighters => "Fighters",
            Route::FighterDetail(_) => "FighterDetail",
            Route::Bouts => "Bouts",
            Route::LiveBouts => "LiveBouts",
            Route::BoutDetail(_) => "BoutDetail",
            Route::Dashboard => "Dashboard",
            Route::AdminFighters => "AdminFighters",
            Route::AdminBouts => "AdminBouts",
            Route::JudgeBouts => "JudgeBouts",
        }
    }

    /// Access requirements of the route.
    pub fn meta(&self) -> RouteMeta {
        match self {
            Route::Login => RouteMeta {
                requires_guest: true,
                hide_nav: true,
                ..RouteMeta::default()
            },
            Route::Dashboard => RouteMeta {
                requires_auth: true,
                ..RouteMeta::default()
            },
            Route::AdminFighters | Route::AdminBouts => RouteMeta {
                requires_auth: true,
                requires_admin: true,
                ..RouteMeta::default()
            },
            Route::JudgeBouts => RouteMeta {
                requires_auth: true,
                requires_judge: true,
                ..RouteMeta::default()
            },
            Route::Home
            | Route::Fighters
            | Route::FighterDetail(_)
            | Route::Bouts
            | Route::LiveBouts
            | Route::BoutDetail(_) => RouteMeta::default(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
