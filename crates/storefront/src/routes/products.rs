//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use velora_api::products::{Product, ProductQuery};
use velora_core::{Price, ProductId};

use crate::error::{AppError, user_message};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: Option<String>,
    pub stock: Option<u32>,
    /// False only when the API reports a zero stock level.
    pub in_stock: bool,
    pub image: Option<String>,
}

/// Format a price for display.
fn format_price(price: Price) -> String {
    format!("${price}")
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_str().to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: format_price(product.price),
            category: product.category.clone(),
            stock: product.stock,
            in_stock: product.stock.is_none_or(|stock| stock > 0),
            image: product.image.clone(),
        }
    }
}

/// A category filter chip on the listing page.
#[derive(Clone)]
pub struct CategoryChip {
    pub name: String,
    pub active: bool,
}

/// Listing filter query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

/// Live search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryChip>,
    pub active_category: Option<String>,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub signed_in: bool,
}

/// Product grid fragment template (for HTMX search).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub products: Vec<ProductView>,
}

/// Distinct category labels across the catalog, sorted for stable chips.
fn collect_categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products
        .iter()
        .filter_map(|product| product.category.clone())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}

/// Display the product listing page, optionally filtered by category.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let mut error = None;

    // The unfiltered list feeds the category chips either way, and it is
    // cached, so fetching it alongside a filtered view costs little.
    let catalog = match state.api().products().await {
        Ok(products) => products,
        Err(api_error) => {
            tracing::error!(%api_error, "Failed to load catalog");
            error = Some(user_message(&api_error));
            Vec::new()
        }
    };
    let active_category = query.category.filter(|category| !category.trim().is_empty());
    let categories = collect_categories(&catalog)
        .into_iter()
        .map(|name| CategoryChip {
            active: active_category.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    let products = match &active_category {
        Some(category) => match state
            .api()
            .search_products(&ProductQuery::Category(category.clone()))
            .await
        {
            Ok(filtered) => filtered,
            Err(api_error) => {
                tracing::error!(%api_error, "Failed to filter catalog by category");
                error = Some(user_message(&api_error));
                Vec::new()
            }
        },
        None => catalog,
    };

    ProductsIndexTemplate {
        products: products.iter().map(ProductView::from).collect(),
        categories,
        active_category,
        error,
        signed_in: auth.is_some(),
    }
}

/// Live search fragment (HTMX).
///
/// An empty query renders the full catalog, so clearing the box restores
/// the grid without a page load.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let term = query.q.unwrap_or_default().trim().to_string();

    let result = if term.is_empty() {
        state.api().products().await
    } else {
        state.api().search_products(&ProductQuery::Name(term)).await
    };

    let products = result.unwrap_or_else(|error| {
        tracing::error!(%error, "Product search failed");
        Vec::new()
    });

    ProductGridTemplate {
        products: products.iter().map(ProductView::from).collect(),
    }
}

/// Display the product detail page.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalAuth(auth): OptionalAuth,
) -> Response {
    let id = ProductId::new(id);
    match state.api().product(&id).await {
        Ok(product) => ProductShowTemplate {
            product: ProductView::from(&product),
            signed_in: auth.is_some(),
        }
        .into_response(),
        Err(error) => {
            tracing::warn!(%error, product_id = %id, "Failed to load product");
            AppError::from(error).into_response()
        }
    }
}
