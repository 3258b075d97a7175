//! Client-side pages and the navigation guard.
//!
//! Every navigation resolves the location to a [`Page`] first and then
//! re-evaluates [`guard`] against the caller's current [`AuthState`], so
//! `/admin/` and `/admin?tab=users` are guarded exactly like `/admin`.

use strum::{Display, EnumString};

// ─── Auth state ──────────────────────────────────────────────────────────────

/// What the server said about the session. The client awaits the
/// current-user check before guarding, so there is no undecided state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuthState {
  Anonymous,
  Member,
  Admin,
}

/// Routes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &["/", "/welcome", "/login", "/register", "/registration-complete"];

pub const ONBOARDING: &str = "/";
pub const HOME: &str = "/home";
pub const ADMIN: &str = "/admin";

// ─── Guard ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
  Stay,
  Redirect(&'static str),
}

/// Decide whether `page` may be shown for `auth`.
///
/// Anonymous callers are confined to the public routes, administrators to
/// the dashboard plus the public routes, and members are kept off the
/// dashboard.
pub fn guard(page: &Page, auth: AuthState) -> Navigation {
  let is_admin_page = *page == Page::Admin;
  match auth {
    AuthState::Anonymous if !page.is_public() => Navigation::Redirect(ONBOARDING),
    AuthState::Admin if !is_admin_page && !page.is_public() => Navigation::Redirect(ADMIN),
    AuthState::Member if is_admin_page => Navigation::Redirect(HOME),
    _ => Navigation::Stay,
  }
}

// ─── Pages ───────────────────────────────────────────────────────────────────

/// Sections of the settings area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SettingsSection {
  General,
  Accounts,
  History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
  Onboarding,
  Welcome,
  Login,
  Register,
  RegistrationComplete,
  Home,
  /// Analysis of the product with this registration number.
  Product(String),
  Profile,
  EditProfile,
  ManageAllergens,
  Settings,
  SettingsDetail(SettingsSection),
  Education,
  EducationResources,
  Admin,
  NotFound(String),
}

impl Page {
  /// Map a location to its page. Unknown locations resolve to
  /// [`Page::NotFound`].
  pub fn resolve(location: &str) -> Self {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let trimmed = if path.len() > 1 { path.trim_end_matches('/') } else { path };

    match trimmed {
      "/" => Self::Onboarding,
      "/welcome" => Self::Welcome,
      "/login" => Self::Login,
      "/register" => Self::Register,
      "/registration-complete" => Self::RegistrationComplete,
      "/home" => Self::Home,
      "/profile" => Self::Profile,
      "/profile/edit" => Self::EditProfile,
      "/profile/allergens" => Self::ManageAllergens,
      "/settings" => Self::Settings,
      "/education" => Self::Education,
      "/education/resources" => Self::EducationResources,
      "/admin" => Self::Admin,
      other => {
        if let Some(number) = other.strip_prefix("/product/")
          && !number.is_empty()
          && !number.contains('/')
        {
          return Self::Product(number.to_owned());
        }
        if let Some(section) = other.strip_prefix("/settings/")
          && let Ok(section) = section.parse()
        {
          return Self::SettingsDetail(section);
        }
        Self::NotFound(other.to_owned())
      }
    }
  }

  pub fn is_public(&self) -> bool { PUBLIC_ROUTES.contains(&self.location().as_str()) }

  pub fn location(&self) -> String {
    match self {
      Self::Onboarding => "/".into(),
      Self::Welcome => "/welcome".into(),
      Self::Login => "/login".into(),
      Self::Register => "/register".into(),
      Self::RegistrationComplete => "/registration-complete".into(),
      Self::Home => HOME.into(),
      Self::Product(number) => format!("/product/{number}"),
      Self::Profile => "/profile".into(),
      Self::EditProfile => "/profile/edit".into(),
      Self::ManageAllergens => "/profile/allergens".into(),
      Self::Settings => "/settings".into(),
      Self::SettingsDetail(section) => format!("/settings/{section}"),
      Self::Education => "/education".into(),
      Self::EducationResources => "/education/resources".into(),
      Self::Admin => ADMIN.into(),
      Self::NotFound(path) => path.clone(),
    }
  }
}
