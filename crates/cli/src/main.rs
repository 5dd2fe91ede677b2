//! Mauve CLI - the cart and checkout from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart for this device
//! mauve cart show
//!
//! # Add a product (repeat to raise the quantity)
//! mauve cart add "Forever Aloe Vera Gel" --price 25,000
//!
//! # Remove a line, or everything
//! mauve cart remove "Forever Aloe Vera Gel"
//! mauve cart clear
//!
//! # Order over WhatsApp, clearing the cart once sent
//! mauve checkout whatsapp --clear
//!
//! # Open a Paystack card payment
//! mauve checkout paystack --name "Ada Obi" --email ada@example.com \
//!     --phone 08031234567 --address "12 Allen Avenue, Ikeja"
//!
//! # Create the cart_items table
//! mauve migrate
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mauve_storefront::config::StorefrontConfig;
use mauve_storefront::error::AppError;
use mauve_storefront::telemetry;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "mauve")]
#[command(author, version, about = "Mauve storefront cart")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change this device's cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Turn the cart into an order
    Checkout {
        #[command(subcommand)]
        method: CheckoutMethod,
    },
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
enum CartAction {
    /// List lines, totals and item count
    Show {
        /// Print the cart as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one unit of a product
    Add {
        /// Product name (lines are keyed by name)
        name: String,

        /// Unit price, e.g. `25000` or `25,000`
        #[arg(short, long, default_value = "0")]
        price: String,

        /// Image URL or path
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Remove a line by name
    Remove {
        /// Product name
        name: String,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum CheckoutMethod {
    /// Print a WhatsApp order link
    Whatsapp {
        /// Clear the cart after printing the link
        #[arg(long)]
        clear: bool,
    },
    /// Open a Paystack card payment for the cart total
    Paystack {
        /// Full name
        #[arg(long)]
        name: String,

        /// Email for the receipt
        #[arg(long)]
        email: String,

        /// Phone number
        #[arg(long)]
        phone: String,

        /// Delivery address
        #[arg(long)]
        address: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Loaded before tracing so Sentry can be initialized first
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(telemetry::init_sentry);
    telemetry::init_tracing(config.as_ref().is_ok_and(|c| c.log_json));

    let result = match (cli.command, config) {
        // Needs only a database URL, not a full storefront config
        (Commands::Migrate, _) => commands::migrate::run().await,
        (_, Err(e)) => Err(AppError::from(e)),
        (Commands::Cart { action }, Ok(config)) => cart(action, &config).await,
        (Commands::Checkout { method }, Ok(config)) => checkout(method, &config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            output::failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn cart(action: CartAction, config: &StorefrontConfig) -> Result<(), AppError> {
    let cart = commands::cart::open(config).await?;
    let result = match action {
        CartAction::Show { json } => commands::cart::show(&cart, json).await,
        CartAction::Add { name, price, image } => {
            commands::cart::add(&cart, name, &price, image).await
        }
        CartAction::Remove { name } => commands::cart::remove(&cart, &name).await,
        CartAction::Clear => commands::cart::clear(&cart).await,
    };
    cart.close();
    result
}

async fn checkout(method: CheckoutMethod, config: &StorefrontConfig) -> Result<(), AppError> {
    let cart = commands::cart::open(config).await?;
    let result = match method {
        CheckoutMethod::Whatsapp { clear } => {
            commands::checkout::whatsapp(&cart, config, clear).await
        }
        CheckoutMethod::Paystack {
            name,
            email,
            phone,
            address,
        } => {
            let customer = mauve_storefront::checkout::CustomerDetails {
                name,
                email,
                phone,
                address,
            };
            commands::checkout::paystack(&cart, config, &customer).await
        }
    };
    cart.close();
    result
}
