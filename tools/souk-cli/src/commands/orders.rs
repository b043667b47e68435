//! List orders from a store snapshot.

use std::fs;

use anyhow::{Context as _, Result};
use souk_commerce::order::OrderStatus;
use souk_store::StoreSnapshot;

use super::OrdersArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.snapshot);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot = StoreSnapshot::from_json(&raw)?;

    let status: Option<OrderStatus> = args.status.as_deref().map(str::parse).transpose()?;

    let mut orders = snapshot.orders;
    orders.retain(|o| !matches!(status, Some(s) if s != o.status));
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return Ok(());
    }

    ctx.output.header(&format!("{} order(s)", orders.len()));
    let widths = [14, 20, 10, 6, 12];
    ctx.output.table_row(&["NUMBER", "PLACED", "TOTAL", "ITEMS", "STATUS"], &widths);
    for order in &orders {
        ctx.output.table_row(
            &[
                order.order_number.as_str(),
                &order.created_at.format("%Y-%m-%d %H:%M").to_string(),
                &order.total.display_amount(),
                &order.item_count().to_string(),
                &status_badge(order.status.as_str()),
            ],
            &widths,
        );
    }

    Ok(())
}
