//! Checkout and order history commands.

use clap::{Args, Subcommand};
use tracing::info;

use recraft_core::{OrderId, OrderStatus, PaymentMethod};
use recraft_storefront::db::OrderRepository;
use recraft_storefront::models::Order;
use recraft_storefront::services::{CheckoutForm, CheckoutService};

use super::{CommandError, Context};

/// Shipping and payment details for `orders checkout`.
#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    address1: String,
    #[arg(long, default_value = "")]
    address2: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    pincode: String,
    #[arg(long, default_value = "")]
    notes: String,
    /// `cod`, `upi` or `card`
    #[arg(long, default_value = "cod")]
    payment: PaymentMethod,
    #[arg(long)]
    coupon: Option<String>,
}

impl From<CheckoutArgs> for CheckoutForm {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            full_name: args.full_name,
            phone: args.phone,
            email: args.email,
            address1: args.address1,
            address2: args.address2,
            city: args.city,
            state: args.state,
            pincode: args.pincode,
            notes: args.notes,
            payment_method: args.payment,
            coupon: args.coupon,
        }
    }
}

/// `recraft orders` subcommands.
#[derive(Subcommand)]
pub enum OrdersAction {
    /// Place an order for the whole cart
    Checkout(Box<CheckoutArgs>),
    /// List orders, newest first
    List {
        /// Match order ids and item titles
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Show one order
    Show { id: OrderId },
    /// Remove stored orders if they are all legacy demo orders
    PurgeDemo,
}

fn report(action: &str, order: &Order) {
    info!(
        id = %order.id,
        status = %order.status,
        items = order.items.len(),
        total = %order.total,
        created_at = %order.created_at,
        "{action}"
    );
}

/// Run an orders command.
///
/// # Errors
///
/// Returns the checkout or repository error of the failed operation, or
/// `CommandError::Usage` for an unknown order.
pub async fn run(ctx: &Context, action: OrdersAction) -> Result<(), Box<dyn std::error::Error>> {
    let orders = OrderRepository::new(ctx.store());

    match action {
        OrdersAction::Checkout(args) => {
            let form = CheckoutForm::from(*args);
            let order = CheckoutService::new(ctx.store()).place_order(&form).await?;
            report("Order placed", &order);
            info!(
                subtotal = %order.subtotal,
                discount = %order.discount,
                shipping = %order.shipping,
                payment = ?order.payment_method,
                "ship to {}, {}",
                order.shipping_to.name,
                order.shipping_to.city
            );
        }
        OrdersAction::List { query, status } => {
            let found = orders.search(query.as_deref().unwrap_or_default(), status).await;
            for order in &found {
                report("Order", order);
            }
            info!(count = found.len(), "orders");
        }
        OrdersAction::Show { id } => {
            let order = orders
                .get(&id)
                .await
                .ok_or_else(|| CommandError::Usage(format!("No order with id {id}")))?;
            report("Order", &order);
            for item in &order.items {
                info!(id = %item.id, qty = item.qty, price = %item.price, "{}", item.title);
            }
        }
        OrdersAction::PurgeDemo => {
            let removed = orders.purge_demo().await?;
            info!(removed, "Demo orders purged");
        }
    }
    Ok(())
}
