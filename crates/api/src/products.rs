//! Catalog types and product endpoints.
//!
//! Public reads (list, by id, search) need no token and go through the
//! catalog cache; search results are never cached because every query is
//! different. Admin mutations are multipart (the create/edit form carries an
//! optional image file) and invalidate the cache on success.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use velora_core::{BearerToken, Price, ProductId};

use crate::cache::CacheValue;
use crate::client::{ApiClient, decode_json};
use crate::error::ApiError;

// =============================================================================
// Types
// =============================================================================

/// A catalog product as the API reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Document id.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description, may be empty.
    #[serde(default)]
    pub description: String,
    /// Unit price.
    #[serde(default)]
    pub price: Price,
    /// Category label, e.g. "cleanser" or "serum".
    #[serde(default)]
    pub category: Option<String>,
    /// Units in stock, when the API reports it.
    #[serde(default)]
    pub stock: Option<u32>,
    /// Image URL, when one has been uploaded.
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
}

/// Fields for creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub stock: u32,
}

/// An image file to attach to a product create/update.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// The list endpoints answer either a bare array or a `{"products": [...]}`
/// envelope depending on the route; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductListPayload {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl ProductListPayload {
    fn into_products(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Wrapped { products } => products,
        }
    }
}

impl From<ProductInput> for Form {
    fn from(input: ProductInput) -> Self {
        Self::new()
            .text("name", input.name)
            .text("description", input.description)
            .text("price", input.price.to_string())
            .text("category", input.category)
            .text("stock", input.stock.to_string())
    }
}

fn attach_image(form: Form, image: Option<ImageUpload>) -> Result<Form, ApiError> {
    let Some(image) = image else {
        return Ok(form);
    };
    let part = Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.content_type)?;
    Ok(form.part("image", part))
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// Get the full product list (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products:all".to_string();

        if let Some(CacheValue::Products(products)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let payload: ProductListPayload = self.get_json("/api/products", None).await?;
        let products = payload.into_products();

        self.cache()
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .get_json(&format!("/api/products/{id}"), None)
            .await?;

        self.cache()
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Search products by name or category (never cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/products/search", None)
            .query(&query.as_params());
        let response = self.execute(builder).await?;
        let payload: ProductListPayload = decode_json(response).await?;
        Ok(payload.into_products())
    }

    /// Create a product (admin, multipart).
    ///
    /// # Errors
    ///
    /// Returns an error if the token lacks admin access or the API rejects
    /// the input.
    #[instrument(skip(self, token, input, image), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        token: &BearerToken,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<(), ApiError> {
        let form = attach_image(Form::from(input), image)?;
        self.execute(
            self.request(Method::POST, "/api/products", Some(token))
                .multipart(form),
        )
        .await?;

        self.invalidate_catalog();
        Ok(())
    }

    /// Update a product (admin, multipart).
    ///
    /// # Errors
    ///
    /// Returns an error if the token lacks admin access or the API rejects
    /// the input.
    #[instrument(skip(self, token, input, image), fields(id = %id))]
    pub async fn update_product(
        &self,
        token: &BearerToken,
        id: &ProductId,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<(), ApiError> {
        let form = attach_image(Form::from(input), image)?;
        self.execute(
            self.request(Method::PUT, &format!("/api/products/{id}"), Some(token))
                .multipart(form),
        )
        .await?;

        self.invalidate_catalog();
        Ok(())
    }

    /// Delete a product (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the token lacks admin access or the API request
    /// fails.
    #[instrument(skip(self, token), fields(id = %id))]
    pub async fn delete_product(
        &self,
        token: &BearerToken,
        id: &ProductId,
    ) -> Result<(), ApiError> {
        self.delete_ack::<()>(&format!("/api/products/{id}"), Some(token), None)
            .await?;

        self.invalidate_catalog();
        Ok(())
    }

    /// Drop every cached catalog entry.
    ///
    /// Mutations call this so the next read sees fresh data; reads re-fill
    /// the cache on demand. Other processes converge via the 5-minute TTL.
    pub fn invalidate_catalog(&self) {
        self.cache().invalidate_all();
    }
}

// =============================================================================
// Search query
// =============================================================================

/// A product search: by name or by category, exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductQuery {
    Name(String),
    Category(String),
}

impl ProductQuery {
    fn as_params(&self) -> [(&'static str, &str); 1] {
        match self {
            Self::Name(name) => [("name", name.as_str())],
            Self::Category(category) => [("category", category.as_str())],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn product_list_accepts_bare_arrays() {
        let json = r#"[{"_id": "p1", "name": "Dew Serum", "price": 28}]"#;
        let payload: ProductListPayload = serde_json::from_str(json).unwrap();
        let products = payload.into_products();
        assert_eq!(products.len(), 1);
        assert_eq!(products.first().unwrap().id, ProductId::new("p1"));
    }

    #[test]
    fn product_list_accepts_envelopes() {
        let json = r#"{"products": [{"id": "p2", "name": "Night Cream", "price": "34.50"}]}"#;
        let payload: ProductListPayload = serde_json::from_str(json).unwrap();
        let products = payload.into_products();
        assert_eq!(products.len(), 1);
        assert_eq!(
            products.first().unwrap().price.to_string(),
            "34.50"
        );
    }

    #[test]
    fn product_defaults_for_optional_fields() {
        let json = r#"{"_id": "p3", "name": "Mist"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Price::ZERO);
        assert!(product.description.is_empty());
        assert!(product.category.is_none());
        assert!(product.image.is_none());
        assert!(product.stock.is_none());
    }

    #[test]
    fn image_url_alias_resolves() {
        let json = r#"{"_id": "p4", "name": "Toner", "imageUrl": "/img/toner.jpg"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.image.as_deref(), Some("/img/toner.jpg"));
    }

    #[test]
    fn search_params_pick_one_axis() {
        assert_eq!(
            ProductQuery::Name("serum".to_string()).as_params(),
            [("name", "serum")]
        );
        assert_eq!(
            ProductQuery::Category("cleanser".to_string()).as_params(),
            [("category", "cleanser")]
        );
    }

    #[test]
    fn image_upload_debug_hides_bytes() {
        let upload = ImageUpload {
            file_name: "a.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0; 4096],
        };
        let debug = format!("{upload:?}");
        assert!(debug.contains("4096"));
        assert!(!debug.contains("[0,"));
    }
}
