//! Order commands. Everything here needs the admin token.

use velora_core::{OrderId, OrderStatus};

use super::{CliError, admin_token, client};

/// Print every order the API knows about.
pub async fn list() -> Result<(), CliError> {
    let api = client()?;
    let token = admin_token()?;
    let orders = api.all_orders(&token).await?;

    if orders.is_empty() {
        println!("No orders.");
        return Ok(());
    }

    println!("{:<26} {:<12} {:>9} {:>6}  CUSTOMER", "ID", "STATUS", "TOTAL", "LINES");
    for order in &orders {
        let customer = order.customer_email.as_deref().unwrap_or("-");
        let status = order.status.to_string();
        let total = format!("${}", order.total_amount());
        println!(
            "{:<26} {status:<12} {total:>9} {:>6}  {customer}",
            order.id,
            order.items.len(),
        );
    }
    println!("{} order(s)", orders.len());
    Ok(())
}

/// Move an order to the given lifecycle status.
pub async fn set_status(id: &OrderId, status: OrderStatus) -> Result<(), CliError> {
    let api = client()?;
    let token = admin_token()?;

    api.set_order_status(&token, id, status).await?;
    println!("Order {id} is now {status}.");
    Ok(())
}
