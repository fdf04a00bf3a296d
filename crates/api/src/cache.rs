//! Cached value types for the catalog cache.
//!
//! One moka cache holds every cached read, keyed by strings like
//! `"products:all"` and `"product:{id}"`. The enum keeps the value type
//! uniform; large variants are boxed so a cache entry stays small.

use crate::products::Product;

/// A value stored in the catalog cache.
#[derive(Debug, Clone)]
pub(crate) enum CacheValue {
    /// A single product, keyed by `product:{id}`.
    Product(Box<Product>),
    /// The full product list, keyed by `products:all`.
    Products(Vec<Product>),
}
