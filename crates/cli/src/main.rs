//! ReCraft CLI - marketplace management against a data directory.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (signs it in)
//! recraft account register -n "Asha" -e asha@example.com -p secret1
//!
//! # Browse the storefront and fill the cart
//! recraft catalog list
//! recraft cart add 3 --qty 2
//! recraft cart show --coupon GREEN10
//!
//! # List something for sale
//! recraft listing create --product-name "Tyre Planter" ... --photo planter.jpg
//!
//! # Check out
//! recraft orders checkout --full-name "Asha Rao" --phone 9876543210 ...
//!
//! # Donate waste material
//! recraft donate --material Plastic --quantity "3 kg" --condition clean --consent
//!
//! # Check pickup serviceability
//! recraft pincode 560001
//! ```
//!
//! # Commands
//!
//! - `account` - Register, sign in and manage the profile
//! - `catalog` - Browse storefront products
//! - `cart` / `wishlist` - Shopping cart and saved products
//! - `listing` - Seller listings
//! - `orders` - Checkout and order history
//! - `donate` - Record a waste donation
//! - `pincode` - Pickup serviceability lookup
//!
//! The data directory comes from `--data-dir`, else `RECRAFT_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use recraft_storefront::config::StorefrontConfig;

mod commands;

use commands::{
    AccountAction, CartAction, CatalogAction, Context, DonateArgs, ListingAction, OrdersAction,
    WishlistAction,
};

#[derive(Parser)]
#[command(name = "recraft")]
#[command(author, version, about = "ReCraft marketplace CLI")]
struct Cli {
    /// Data directory (overrides `RECRAFT_DATA_DIR`)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in account
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Browse storefront products
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Manage seller listings
    Listing {
        #[command(subcommand)]
        action: ListingAction,
    },
    /// Check out and review orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Record a waste donation
    Donate(DonateArgs),
    /// Check whether a pincode is serviceable for pickup
    Pincode {
        /// Six-digit pincode
        code: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.upload_dir = data_dir.join("uploads");
        config.data_dir = data_dir;
    }
    let ctx = Context::open(&config).await?;

    match cli.command {
        Commands::Account { action } => commands::account::run(&ctx, action).await?,
        Commands::Catalog { action } => commands::shop::catalog(&ctx, action).await,
        Commands::Cart { action } => commands::shop::cart(&ctx, action).await?,
        Commands::Wishlist { action } => commands::shop::wishlist(&ctx, action).await?,
        Commands::Listing { action } => commands::listing::run(&ctx, action).await?,
        Commands::Orders { action } => commands::orders::run(&ctx, action).await?,
        Commands::Donate(args) => commands::donate::run(&ctx, args).await?,
        Commands::Pincode { code } => commands::donate::pincode(&ctx, &code).await?,
    }
    Ok(())
}
