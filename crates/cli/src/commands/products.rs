//! Catalog commands.

use velora_core::ProductId;

use super::{CliError, admin_token, client};

/// Print the whole catalog, one product per line.
pub async fn list() -> Result<(), CliError> {
    let api = client()?;
    let products = api.products().await?;

    if products.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }

    println!("{:<26} {:>9} {:>6}  NAME", "ID", "PRICE", "STOCK");
    for product in &products {
        let stock = product
            .stock
            .map_or_else(|| "-".to_string(), |stock| stock.to_string());
        let price = format!("${}", product.price);
        println!(
            "{:<26} {price:>9} {stock:>6}  {}",
            product.id, product.name
        );
    }
    println!("{} product(s)", products.len());
    Ok(())
}

/// Print one product in full.
pub async fn show(id: &ProductId) -> Result<(), CliError> {
    let api = client()?;
    let product = api.product(id).await?;

    println!("ID:          {}", product.id);
    println!("Name:        {}", product.name);
    println!("Price:       ${}", product.price);
    if let Some(category) = &product.category {
        println!("Category:    {category}");
    }
    if let Some(stock) = product.stock {
        println!("Stock:       {stock}");
    }
    if let Some(image) = &product.image {
        println!("Image:       {image}");
    }
    println!("Description: {}", product.description);
    Ok(())
}

/// Delete a product from the catalog.
pub async fn delete(id: &ProductId) -> Result<(), CliError> {
    let api = client()?;
    let token = admin_token()?;

    api.delete_product(&token, id).await?;
    println!("Deleted product {id}.");
    Ok(())
}
