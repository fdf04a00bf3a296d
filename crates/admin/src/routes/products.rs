//! Product management: list, create, edit, delete.
//!
//! Create and edit forms post as multipart so an image file can ride along;
//! the fields are forwarded to the API as-is and the catalog cache is
//! invalidated there. Validation failures re-render the form with the typed
//! values intact, so a rejected price doesn't cost an admin the description
//! they wrote.

use askama::Template;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use velora_api::products::{ImageUpload, Product, ProductInput};
use velora_core::{Price, ProductId};

use crate::error::user_message;
use crate::filters;
use crate::middleware::{RequireAdminAuth, expire_admin};
use crate::routes::render;
use crate::state::AppState;

/// Largest accepted image upload, in bytes.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// =============================================================================
// Views
// =============================================================================

/// Product row for the listing table.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub stock: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: format!("${}", product.price),
            category: product.category.clone().unwrap_or_default(),
            stock: product
                .stock
                .map(|stock| stock.to_string())
                .unwrap_or_default(),
            image: product.image.clone(),
        }
    }
}

/// Raw form values, echoed back into the form on a failed submit.
#[derive(Debug, Clone, Default)]
pub struct ProductFormValues {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub stock: String,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            category: product.category.clone().unwrap_or_default(),
            stock: product.stock.unwrap_or(0).to_string(),
        }
    }
}

impl ProductFormValues {
    /// Validate into the API input type.
    ///
    /// Returns the message to show the admin when a field doesn't parse.
    fn to_input(&self) -> Result<ProductInput, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required.".to_string());
        }
        let price: Price = self
            .price
            .parse()
            .map_err(|_| "Price must be a non-negative number like 19.99.".to_string())?;
        let stock: u32 = self
            .stock
            .trim()
            .parse()
            .map_err(|_| "Stock must be a whole number.".to_string())?;

        Ok(ProductInput {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
            category: self.category.trim().to_lowercase(),
            stock,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Query parameters carrying a banner code after a redirect.
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

fn success_text(code: &str) -> String {
    match code {
        "created" => "Product created.".to_string(),
        "updated" => "Product updated.".to_string(),
        "deleted" => "Product deleted.".to_string(),
        other => other.to_string(),
    }
}

/// Product listing template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_email: String,
    pub current_path: &'static str,
    pub products: Vec<ProductRowView>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Shared create/edit form template.
#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub admin_email: String,
    pub current_path: &'static str,
    pub heading: &'static str,
    pub action: String,
    pub values: ProductFormValues,
    pub existing_image: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Multipart decoding
// =============================================================================

/// What a product form submit carries: the text fields plus an optional
/// image part (present only when the admin picked a file).
struct ProductFormData {
    values: ProductFormValues,
    image: Option<ImageUpload>,
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductFormData, String> {
    let mut values = ProductFormValues::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Couldn't read the form: {e}"))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "name" => values.name = read_text(field).await?,
            "description" => values.description = read_text(field).await?,
            "price" => values.price = read_text(field).await?,
            "category" => values.category = read_text(field).await?,
            "stock" => values.stock = read_text(field).await?,
            "image" => {
                // Browsers send an empty image part when no file is chosen.
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Couldn't read the image: {e}"))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err("Image is too large (5 MB max).".to_string());
                }
                if !file_name.is_empty() && !bytes.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(ProductFormData { values, image })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, String> {
    field
        .text()
        .await
        .map_err(|e| format!("Couldn't read the form: {e}"))
}

// =============================================================================
// Handlers
// =============================================================================

/// Product listing page.
///
/// GET /products
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> Response {
    let (products, error) = match state.api().products().await {
        Ok(products) => (
            products.iter().map(ProductRowView::from).collect(),
            query.error,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch products");
            (Vec::new(), Some(user_message(&e)))
        }
    };

    let template = ProductsIndexTemplate {
        admin_email: admin.email,
        current_path: "/products",
        products,
        success: query.success.as_deref().map(success_text),
        error,
    };
    render(&template).into_response()
}

/// Empty create form.
///
/// GET /products/new
pub async fn new_form(RequireAdminAuth(admin): RequireAdminAuth) -> Response {
    let template = ProductFormTemplate {
        admin_email: admin.email,
        current_path: "/products",
        heading: "New product",
        action: "/products".to_string(),
        values: ProductFormValues::default(),
        existing_image: None,
        error: None,
    };
    render(&template).into_response()
}

/// Handle the create form.
///
/// POST /products
#[instrument(skip(admin, state, session, multipart))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let form = match read_product_form(multipart).await {
        Ok(form) => form,
        Err(message) => return create_form_error(admin.email, ProductFormValues::default(), message),
    };

    let input = match form.values.to_input() {
        Ok(input) => input,
        Err(message) => return create_form_error(admin.email, form.values, message),
    };

    match state
        .api()
        .create_product(&admin.token, input, form.image)
        .await
    {
        Ok(()) => {
            tracing::info!(name = %form.values.name, "Product created");
            Redirect::to("/products?success=created").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to create product");
            create_form_error(admin.email, form.values, user_message(&error))
        }
    }
}

fn create_form_error(admin_email: String, values: ProductFormValues, message: String) -> Response {
    let template = ProductFormTemplate {
        admin_email,
        current_path: "/products",
        heading: "New product",
        action: "/products".to_string(),
        values,
        existing_image: None,
        error: Some(message),
    };
    render(&template).into_response()
}

/// Prefilled edit form.
///
/// GET /products/{id}/edit
#[instrument(skip(admin, state), fields(id = %id))]
pub async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Response {
    let product = match state.api().product(&id).await {
        Ok(product) => product,
        Err(error) => {
            tracing::warn!(%error, "Failed to load product for editing");
            return Redirect::to(&format!(
                "/products?error={}",
                urlencoding::encode(&user_message(&error))
            ))
            .into_response();
        }
    };

    let template = ProductFormTemplate {
        admin_email: admin.email,
        current_path: "/products",
        heading: "Edit product",
        action: format!("/products/{id}"),
        values: ProductFormValues::from(&product),
        existing_image: product.image,
        error: None,
    };
    render(&template).into_response()
}

/// Handle the edit form.
///
/// POST /products/{id}
#[instrument(skip(admin, state, session, multipart), fields(id = %id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Response {
    let form = match read_product_form(multipart).await {
        Ok(form) => form,
        Err(message) => {
            return update_form_error(admin.email, &id, ProductFormValues::default(), message);
        }
    };

    let input = match form.values.to_input() {
        Ok(input) => input,
        Err(message) => return update_form_error(admin.email, &id, form.values, message),
    };

    match state
        .api()
        .update_product(&admin.token, &id, input, form.image)
        .await
    {
        Ok(()) => {
            tracing::info!("Product updated");
            Redirect::to("/products?success=updated").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to update product");
            update_form_error(admin.email, &id, form.values, user_message(&error))
        }
    }
}

fn update_form_error(
    admin_email: String,
    id: &ProductId,
    values: ProductFormValues,
    message: String,
) -> Response {
    let template = ProductFormTemplate {
        admin_email,
        current_path: "/products",
        heading: "Edit product",
        action: format!("/products/{id}"),
        values,
        existing_image: None,
        error: Some(message),
    };
    render(&template).into_response()
}

/// Delete a product.
///
/// POST /products/{id}/delete
#[instrument(skip(admin, state, session), fields(id = %id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Response {
    match state.api().delete_product(&admin.token, &id).await {
        Ok(()) => {
            tracing::info!("Product deleted");
            Redirect::to("/products?success=deleted").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to delete product");
            Redirect::to(&format!(
                "/products?error={}",
                urlencoding::encode(&user_message(&error))
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn form_values_validate_into_input() {
        let values = ProductFormValues {
            name: "  Dew Serum ".to_string(),
            description: "Light daily serum".to_string(),
            price: "28.00".to_string(),
            category: "Serum".to_string(),
            stock: "12".to_string(),
        };
        let input = values.to_input().unwrap();
        assert_eq!(input.name, "Dew Serum");
        assert_eq!(input.category, "serum");
        assert_eq!(input.price.to_string(), "28.00");
        assert_eq!(input.stock, 12);
    }

    #[test]
    fn bad_fields_report_which_one() {
        let mut values = ProductFormValues {
            name: "Mist".to_string(),
            price: "free".to_string(),
            stock: "3".to_string(),
            ..ProductFormValues::default()
        };
        assert!(values.to_input().unwrap_err().contains("Price"));

        values.price = "12".to_string();
        values.stock = "-1".to_string();
        assert!(values.to_input().unwrap_err().contains("Stock"));

        values.stock = "3".to_string();
        values.name = "   ".to_string();
        assert!(values.to_input().unwrap_err().contains("Name"));
    }

    #[test]
    fn row_views_preformat() {
        let product: Product = serde_json::from_str(
            r#"{"_id": "p1", "name": "Dew Serum", "price": "28", "stock": 4}"#,
        )
        .unwrap();
        let row = ProductRowView::from(&product);
        assert_eq!(row.price, "$28.00");
        assert_eq!(row.stock, "4");
        assert_eq!(row.category, "");
    }
}
