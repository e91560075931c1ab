//! basket-watch - follow a PocketBase collection from the terminal.
//!
//! Loads the configured collection, then logs the list every time the change
//! feed alters it. Stops on Ctrl-C.

use std::sync::Arc;

use basket_client::{CollectionSync, Config, PocketBaseClient};
use basket_engine::{models, Product, Record, ShoppingListItem, SyncState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "basket_client=debug,basket_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Watching {} on {}",
        config.collection,
        config.backend_url
    );

    let api = Arc::new(PocketBaseClient::from_config(&config)?);
    let sync = CollectionSync::new(api, config.collection.clone(), config.options.clone());
    let mut changes = sync.watch();

    sync.load().await;
    report(&config.collection, &sync.state());

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                report(&config.collection, &state);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    sync.destroy().await;
    Ok(())
}

fn report(collection: &str, state: &SyncState) {
    if state.loading {
        return;
    }
    if !state.error.is_empty() {
        tracing::error!("{}", state.error);
        return;
    }

    let labels: Vec<String> = state
        .items
        .iter()
        .map(|record| label(collection, record))
        .collect();
    tracing::info!(count = labels.len(), "{}", labels.join(", "));
}

fn label(collection: &str, record: &Record) -> String {
    match collection {
        models::PRODUCTS => match Product::try_from(record) {
            Ok(product) => format!("{} ({}x)", product.name, product.shopping_cart_usages),
            Err(_) => record.id.clone(),
        },
        models::SHOPPING_LIST => match ShoppingListItem::try_from(record) {
            Ok(item) => format!("{} x{}", item.name, item.quantity),
            Err(_) => record.id.clone(),
        },
        _ => record
            .get_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| record.id.clone()),
    }
}
