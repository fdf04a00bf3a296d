//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::products::ProductView;
use crate::state::AppState;

// =============================================================================
// Hero Configuration (static landing content)
// =============================================================================

/// Static hero content for the landing page.
#[derive(Clone)]
pub struct HeroContent {
    pub eyebrow: String,
    pub title: String,
    pub subtitle: String,
    pub button_text: String,
    pub button_url: String,
}

impl Default for HeroContent {
    fn default() -> Self {
        Self {
            eyebrow: "Velora Skincare".to_string(),
            title: "Skin that keeps its word".to_string(),
            subtitle: "Small-batch formulas built around barrier repair, not trends. \
                       Cleansers, serums and creams that do what the label says."
                .to_string(),
            button_text: "Shop the range".to_string(),
            button_url: "/products".to_string(),
        }
    }
}

/// Number of products featured on the landing page.
const FEATURED_COUNT: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub hero: HeroContent,
    pub featured: Vec<ProductView>,
    /// Lifetime page view count, absent when the counter endpoint is down.
    pub page_views: Option<u64>,
    pub signed_in: bool,
}

/// Display the home page.
///
/// The view counter is decorative; when its endpoint misbehaves the page
/// renders without it rather than failing.
#[instrument(skip(state, auth))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let featured = state.api().products().await.map_or_else(
        |error| {
            tracing::error!(%error, "Failed to fetch featured products");
            Vec::new()
        },
        |products| {
            products
                .iter()
                .take(FEATURED_COUNT)
                .map(ProductView::from)
                .collect()
        },
    );

    let page_views = match state.api().page_views().await {
        Ok(count) => Some(count),
        Err(error) => {
            tracing::warn!(%error, "Failed to fetch the page view counter");
            None
        }
    };

    HomeTemplate {
        hero: HeroContent::default(),
        featured,
        page_views,
        signed_in: auth.is_some(),
    }
}
