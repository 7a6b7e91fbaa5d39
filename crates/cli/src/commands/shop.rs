//! Storefront browsing, cart and wishlist commands.

use clap::Subcommand;
use tracing::info;

use recraft_core::ProductId;
use recraft_storefront::db::{CartRepository, UserProductRepository, WishlistRepository};
use recraft_storefront::models::Product;
use recraft_storefront::services::{CartTotals, CheckoutService, Coupon};

use super::{CommandError, Context};

/// `recraft catalog` subcommands.
#[derive(Subcommand)]
pub enum CatalogAction {
    /// List storefront products
    List {
        /// Only products whose name contains this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one product
    Show { id: ProductId },
}

/// `recraft cart` subcommands.
#[derive(Subcommand)]
pub enum CartAction {
    /// Add a product (quantity is clamped to stock)
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Set the quantity of a line
    Update { id: ProductId, qty: u32 },
    /// Remove a line
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
    /// Show the cart and its totals
    Show {
        #[arg(short, long)]
        coupon: Option<String>,
    },
}

/// `recraft wishlist` subcommands.
#[derive(Subcommand)]
pub enum WishlistAction {
    /// Save a product
    Add { id: ProductId },
    /// Remove a saved product
    Remove { id: ProductId },
    /// List saved products
    Show,
}

fn report_product(product: &Product) {
    info!(
        id = %product.id,
        price = %product.price,
        stock = product.stock,
        location = %product.location,
        "{}",
        product.name
    );
}

async fn product(ctx: &Context, id: ProductId) -> Result<Product, CommandError> {
    UserProductRepository::new(ctx.store())
        .get(id)
        .await
        .ok_or_else(|| CommandError::Usage(format!("No product with id {id}")))
}

/// Run a catalog command.
pub async fn catalog(ctx: &Context, action: CatalogAction) {
    let products = UserProductRepository::new(ctx.store()).storefront().await;
    match action {
        CatalogAction::List { query } => {
            let query = query.unwrap_or_default().to_lowercase();
            let shown: Vec<&Product> = products
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&query))
                .collect();
            for product in &shown {
                report_product(product);
            }
            info!(count = shown.len(), "products");
        }
        CatalogAction::Show { id } => match products.iter().find(|p| p.id == id) {
            Some(product) => {
                report_product(product);
                info!(quality = %product.quality, rating = product.rating, "{}", product.description);
            }
            None => info!(%id, "Product not found"),
        },
    }
}

/// Run a cart command.
///
/// # Errors
///
/// Returns `CommandError::Usage` for unknown products or coupons, or the
/// repository error of a failed write.
pub async fn cart(ctx: &Context, action: CartAction) -> Result<(), Box<dyn std::error::Error>> {
    let cart = CartRepository::new(ctx.store());

    match action {
        CartAction::Add { id, qty } => {
            let product = product(ctx, id).await?;
            let line = cart.add(product, qty).await?;
            info!(id = %line.product.id, qty = line.qty, "Added {}", line.product.name);
        }
        CartAction::Update { id, qty } => match cart.update_qty(id, qty).await? {
            Some(line) => info!(id = %id, qty = line.qty, "Quantity updated"),
            None => return Err(CommandError::Usage(format!("Product {id} is not in the cart")).into()),
        },
        CartAction::Remove { id } => {
            cart.remove(id).await?;
            info!(%id, "Removed from cart");
        }
        CartAction::Clear => {
            cart.clear().await?;
            info!("Cart cleared");
        }
        CartAction::Show { coupon } => {
            let coupon = coupon
                .map(|code| {
                    code.parse::<Coupon>()
                        .map_err(|_| CommandError::Usage("Invalid coupon".to_owned()))
                })
                .transpose()?;
            let items = cart.items().await;
            for line in &items {
                info!(
                    id = %line.product.id,
                    qty = line.qty,
                    line_total = %line.line_total(),
                    "{}",
                    line.product.name
                );
            }
            let CartTotals {
                subtotal,
                discount,
                shipping,
                total,
            } = CheckoutService::new(ctx.store()).totals(coupon).await;
            info!(
                items = items.len(),
                subtotal = %subtotal,
                discount = %discount,
                shipping = %shipping,
                total = %total,
                "cart totals"
            );
        }
    }
    Ok(())
}

/// Run a wishlist command.
///
/// # Errors
///
/// Returns `CommandError::Usage` for unknown products, or the repository
/// error of a failed write.
pub async fn wishlist(ctx: &Context, action: WishlistAction) -> Result<(), Box<dyn std::error::Error>> {
    let wishlist = WishlistRepository::new(ctx.store());

    match action {
        WishlistAction::Add { id } => {
            let product = product(ctx, id).await?;
            let name = product.name.clone();
            if wishlist.add(product).await? {
                info!(%id, "Saved {name}");
            } else {
                info!(%id, "{name} is already saved");
            }
        }
        WishlistAction::Remove { id } => {
            wishlist.remove(id).await?;
            info!(%id, "Removed from wishlist");
        }
        WishlistAction::Show => {
            let items = wishlist.items().await;
            for product in &items {
                report_product(product);
            }
            info!(count = items.len(), "saved products");
        }
    }
    Ok(())
}
