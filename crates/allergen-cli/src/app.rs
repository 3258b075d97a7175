//! Application state: the API client, the query cache, and page dispatch.
//!
//! Reads go through [`QueryCache`] keyed by the API path they came from.
//! Every mutation invalidates the keys it can have changed.

use allergen_core::{
  analysis::Analysis,
  catalog::{Allergen, Product},
  history::{DEFAULT_HISTORY_LIMIT, SearchHistoryEntry},
  user::User,
};

use crate::{
  cache::{QueryCache, Retry},
  client::{AllergenDraft, ApiClient, ProductDraft, ProfileUpdate, Registration, Result},
  router::{self, AuthState, Navigation, Page, SettingsSection},
  views,
};

/// Redirect hops followed before giving up on a navigation.
const MAX_REDIRECTS: usize = 3;

// ─── App ─────────────────────────────────────────────────────────────────────

pub struct App {
  pub client: ApiClient,
  cache:      QueryCache,
}

impl App {
  pub fn new(client: ApiClient) -> Self { Self { client, cache: QueryCache::new() } }

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// Ask the server who we are. Never retried, so an expired session shows
  /// up as [`AuthState::Anonymous`] straight away.
  pub async fn auth_state(&self) -> Result<(AuthState, Option<User>)> {
    let client = &self.client;
    match self.cache.fetch("/user", Retry::Never, move || client.current_user()).await {
      Ok(user) if user.is_admin => Ok((AuthState::Admin, Some(user))),
      Ok(user) => Ok((AuthState::Member, Some(user))),
      Err(e) if e.is_unauthorized() => Ok((AuthState::Anonymous, None)),
      Err(e) => Err(e),
    }
  }

  /// Guard `location`, follow any redirects, and render the page that ends
  /// up showing. Returns the final location with the rendered text.
  pub async fn navigate(&self, location: &str) -> Result<(String, String)> {
    let mut page = Page::resolve(location);
    let mut hops = 0;
    loop {
      let (auth, user) = self.auth_state().await?;
      match router::guard(&page, auth) {
        Navigation::Redirect(to) if hops < MAX_REDIRECTS => {
          tracing::debug!(from = %page.location(), %to, %auth, "redirected");
          page = Page::resolve(to);
          hops += 1;
        }
        _ => {
          let text = self.render(&page, user.as_ref()).await?;
          return Ok((page.location(), text));
        }
      }
    }
  }

  async fn render(&self, page: &Page, user: Option<&User>) -> Result<String> {
    let text = match (page, user) {
      (Page::Onboarding, _) => views::onboarding(),
      (Page::Welcome, _) => views::welcome(),
      (Page::Login, _) => views::login(),
      (Page::Register, _) => views::register(),
      (Page::RegistrationComplete, user) => views::registration_complete(user),
      (Page::Education, _) => views::education(),
      (Page::EducationResources, _) => views::education_resources(),
      (Page::Settings, _) => views::settings(),
      (Page::SettingsDetail(SettingsSection::General), _) => views::settings_general(),
      (Page::NotFound(location), _) => views::not_found(location),

      // The guard has already turned anonymous callers away from these.
      (_, None) => views::onboarding(),

      (Page::Home, Some(user)) => {
        let recent = self.history(DEFAULT_HISTORY_LIMIT).await?;
        views::home(user, &recent)
      }
      (Page::Product(number), Some(_)) => views::product(&self.lookup(number).await?),
      (Page::Profile, Some(user)) => views::profile(user, &self.user_allergens().await?),
      (Page::EditProfile, Some(user)) => views::edit_profile(user),
      (Page::ManageAllergens, Some(_)) => {
        views::manage_allergens(&self.allergens().await?, &self.user_allergens().await?)
      }
      (Page::SettingsDetail(SettingsSection::Accounts), Some(user)) => views::settings_accounts(user),
      (Page::SettingsDetail(SettingsSection::History), Some(_)) => {
        views::history_list("Search history", &self.history(50).await?)
      }
      (Page::Admin, Some(_)) => {
        views::admin(&self.users().await?, &self.products().await?, &self.allergens().await?)
      }
    };
    Ok(text)
  }

  // ── Cached reads ──────────────────────────────────────────────────────────

  pub async fn allergens(&self) -> Result<Vec<Allergen>> {
    let client = &self.client;
    self.cache.fetch("/allergens", Retry::Default, move || client.allergens()).await
  }

  pub async fn user_allergens(&self) -> Result<Vec<Allergen>> {
    let client = &self.client;
    self.cache.fetch("/user/allergens", Retry::Default, move || client.user_allergens()).await
  }

  pub async fn history(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
    let client = &self.client;
    let key = format!("/user/history?limit={limit}");
    self.cache.fetch(&key, Retry::Default, move || client.history(Some(limit))).await
  }

  pub async fn search(&self, name: &str) -> Result<Vec<Product>> {
    let client = &self.client;
    let key = format!("/products/search?name={name}");
    self.cache.fetch(&key, Retry::Default, move || client.search_products(name)).await
  }

  pub async fn users(&self) -> Result<Vec<User>> {
    let client = &self.client;
    self.cache.fetch("/admin/users", Retry::Default, move || client.users()).await
  }

  pub async fn products(&self) -> Result<Vec<Product>> {
    let client = &self.client;
    self.cache.fetch("/products", Retry::Default, move || client.products()).await
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Registers and signs in. Returns where to go next.
  pub async fn register(&self, registration: &Registration) -> Result<&'static str> {
    self.client.register(registration).await?;
    self.cache.clear();
    Ok("/registration-complete")
  }

  pub async fn login(&self, username: &str, password: &str) -> Result<&'static str> {
    let user = self.client.login(username, password).await?;
    self.cache.clear();
    Ok(if user.is_admin { router::ADMIN } else { router::HOME })
  }

  pub async fn logout(&self) -> Result<String> {
    let message = self.client.logout().await?;
    self.cache.clear();
    Ok(message)
  }

  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
    let user = self.client.update_profile(update).await?;
    self.cache.invalidate("/user");
    Ok(user)
  }

  pub async fn add_allergens(&self, ids: &[i64]) -> Result<String> {
    let message = self.client.add_user_allergens(ids).await?;
    self.cache.invalidate("/user/allergens");
    Ok(message)
  }

  pub async fn remove_allergen(&self, id: i64) -> Result<String> {
    let message = self.client.remove_user_allergen(id).await?;
    self.cache.invalidate("/user/allergens");
    Ok(message)
  }

  /// Resolve a registration number and analyse it for the current user.
  /// The server records the lookup, so cached history is dropped.
  pub async fn lookup(&self, registration_number: &str) -> Result<Analysis> {
    let client = &self.client;
    let key = format!("/products/registration/{registration_number}");
    let product: Product = self
      .cache
      .fetch(&key, Retry::Default, move || client.product_by_registration(registration_number))
      .await?;
    let analysis = self.client.analyze(product.id).await?;
    self.cache.invalidate("/user/history");
    Ok(analysis)
  }

  pub async fn create_allergen(&self, draft: &AllergenDraft) -> Result<Allergen> {
    let allergen = self.client.create_allergen(draft).await?;
    self.cache.invalidate("/allergens");
    Ok(allergen)
  }

  pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
    let product = self.client.create_product(draft).await?;
    self.cache.invalidate("/products");
    Ok(product)
  }

  pub async fn link_product_allergens(&self, product_id: i64, ids: &[i64]) -> Result<String> {
    let message = self.client.link_product_allergens(product_id, ids).await?;
    self.cache.invalidate("/products");
    Ok(message)
  }

  pub async fn link_alternatives(&self, product_id: i64, ids: &[i64]) -> Result<String> {
    let message = self.client.link_alternatives(product_id, ids).await?;
    self.cache.invalidate("/products");
    Ok(message)
  }
}
