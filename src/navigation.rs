//! Page routes and the redirect rules around authentication.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every front end applies the same unauthenticated redirect: a protected page
//! visited without a user goes to the login page. Sign-in lands on the
//! dashboard and sign-out on the landing page.

use crate::types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    Dashboard,
    Profile,
    Debug,
}

impl Route {
    pub const ALL: [Self; 6] = [Self::Landing, Self::Login, Self::Register, Self::Dashboard, Self::Profile, Self::Debug];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Profile => "/profile",
            Self::Debug => "/debug",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Pages that need a signed-in user.
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Dashboard | Self::Profile)
    }
}

/// Where to send a visitor of `route`, or `None` to let the visit through.
#[must_use]
pub fn guard(route: Route, user: Option<&User>) -> Option<Route> {
    (route.is_protected() && user.is_none()).then_some(Route::Login)
}

#[must_use]
pub fn after_sign_in() -> Route {
    Route::Dashboard
}

#[must_use]
pub fn after_sign_out() -> Route {
    Route::Landing
}

/// Navigation bar entries for the current auth state.
#[must_use]
pub fn nav_links(user: Option<&User>) -> &'static [Route] {
    if user.is_some() { &[Route::Dashboard, Route::Profile] } else { &[Route::Login, Route::Register] }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
