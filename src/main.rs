use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coloc_client::clients::{FileKvStore, FirebaseAuth, HttpListingsApi};
use coloc_client::listings::{Bounds, Furnished, ListingsCache, SourceChain};
use coloc_client::models::{PropertyType, Service};
use coloc_client::{Config, ListingFilters, ListingsQuery, Session};

/// Browse published room-rental listings
#[derive(Parser, Debug)]
#[command(name = "coloc", version, about)]
struct Args {
    /// Free-text search over city, street, title and description
    #[arg(long)]
    search: Option<String>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Ignore the local cache
    #[arg(long)]
    refresh: bool,

    /// Maximum monthly rent
    #[arg(long)]
    max_rent: Option<f64>,

    /// apartment, house or studio
    #[arg(long)]
    property_type: Option<PropertyType>,

    /// Only furnished listings
    #[arg(long)]
    furnished: bool,

    /// Required service, repeatable (e.g. --service wifi --service parking)
    #[arg(long = "service")]
    services: Vec<Service>,

    /// Output JSON file
    #[arg(long, default_value = "listings.json")]
    output: PathBuf,

    #[arg(long, requires = "password")]
    email: Option<String>,

    #[arg(long, requires = "email")]
    password: Option<String>,
}

impl Args {
    fn filters(&self) -> ListingFilters {
        ListingFilters {
            price: Bounds {
                min: None,
                max: self.max_rent,
            },
            area: Bounds::default(),
            property_type: self.property_type,
            furnished: if self.furnished { Furnished::Yes } else { Furnished::All },
            services: self.services.iter().copied().collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("🏠 Colocation listings");
    info!("API: {}", config.listings_api_url);

    let auth = Arc::new(FirebaseAuth::new(config.firebase_api_key.as_deref().unwrap_or_default())?);
    let session = match (&args.email, &args.password) {
        (Some(email), Some(password)) => {
            if config.firebase_api_key.is_none() {
                anyhow::bail!("FIREBASE_API_KEY is required to sign in");
            }
            let session = Session::sign_in(auth, email, password)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            info!("Signed in as {}", email);
            session
        }
        _ => Session::restore(auth).await,
    };

    let pipeline = config.pipeline();
    let api = Arc::new(HttpListingsApi::new(&config.listings_api_url, pipeline.api_timeout)?);
    // No direct database access from the CLI, so an API outage is reported as such
    let sources = SourceChain::remote_only(api, pipeline.api_timeout);
    let cache = ListingsCache::new(Arc::new(FileKvStore::new(&config.cache_dir)), pipeline.cache_ttl);
    let query = ListingsQuery::new(session, sources, cache, pipeline);

    let filters = args.filters();
    if !filters.is_default() {
        query.apply_filters(filters).await?;
    } else if args.refresh {
        query.refresh().await?;
    } else {
        query.mount().await?;
    }

    for _ in 1..args.pages {
        match query.load_more().await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                warn!("Stopped paginating: {}", e.user_message());
                break;
            }
        }
    }

    if let Some(text) = &args.search {
        query.set_search(text);
    }

    let listings = query.visible();
    let snapshot = query.snapshot();
    info!(
        "\n✅ {} listings ({} loaded, source: {})\n",
        listings.len(),
        snapshot.items.len(),
        snapshot.source.unwrap_or("none")
    );

    for (i, listing) in listings.iter().enumerate() {
        println!("{}. {} ({} €/mois)", i + 1, listing.details.title, listing.details.rent);
        println!(
            "   {}, {} {}",
            listing.location.street, listing.location.postal_code, listing.location.city
        );
        println!(
            "   {} colocataires, {} m², {}",
            listing.housing.total_roommates,
            listing.housing.total_area,
            listing
                .details
                .property_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        let services: Vec<&str> = listing.services.enabled().map(|s| s.label()).collect();
        if !services.is_empty() {
            println!("   Services: {}", services.join(", "));
        }
        println!("   ID: {}", listing.id);
        println!();
    }

    let json = serde_json::to_string_pretty(&listings)?;
    tokio::fs::write(&args.output, json)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("💾 Saved {} listings to {}", listings.len(), args.output.display());

    Ok(())
}
