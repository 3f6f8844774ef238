use anyhow::Context;
use clap::{Parser, Subcommand};
use rental_sync::config::{Config, APP_NAME};
use rental_sync::models::{
    group_conversations, Entity, Favorite, Image, Message, Property, PropertyKind, Resource,
    SearchFilter, User,
};
use rental_sync::sync::{
    ConnectivityProbe, Filter, HttpProbe, ItemState, LocalStore, ResourceSync, StaticProbe,
    StdinConfirm, SyncContext,
};
use rental_sync::RestClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rental-sync")]
#[command(about = "Offline-first cache for the rental API", long_about = None)]
struct Args {
    /// Directory holding rental-sync.toml and .env
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Behave as if there were no network connection
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the local tables
    Init,

    /// Read a resource collection, syncing it from the server when online
    Sync {
        /// users, properties, images, messages or favorites
        resource: String,

        /// Only the items belonging to this parent id
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Show a single item
    Show { resource: String, id: i64 },

    /// Search listings
    Search {
        /// Part of the city name
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        min_price: Option<f64>,

        #[arg(long)]
        max_price: Option<f64>,

        /// Minimum number of bedrooms
        #[arg(long)]
        bedrooms: Option<i64>,

        /// Minimum number of bathrooms
        #[arg(long)]
        bathrooms: Option<i64>,

        /// Apartment, Room, House, Townhouse or the numeric code
        #[arg(long)]
        kind: Option<PropertyKind>,
    },

    /// List a user's conversations
    Conversations {
        #[arg(long)]
        user: i64,
    },

    /// Delete an item on the server after confirmation
    Delete {
        resource: String,
        id: i64,

        /// Parent whose collection is refreshed afterwards
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Print the locally cached rows of a table
    Dump { table: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(&args.config_dir)?;
    let ctx = build_context(&config, args.offline)?;
    ctx.init().await?;

    let mut notices = ctx.notices.subscribe();

    match args.command {
        Command::Init => {
            let location = ctx
                .store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string());
            println!("Local tables ready in {}", location);
        }
        Command::Sync { resource, parent } => match resource.as_str() {
            "users" => cmd_sync::<User>(&ctx, parent).await?,
            "properties" => cmd_sync::<Property>(&ctx, parent).await?,
            "images" => cmd_sync::<Image>(&ctx, parent).await?,
            "messages" => cmd_sync::<Message>(&ctx, parent).await?,
            "favorites" => cmd_sync::<Favorite>(&ctx, parent).await?,
            other => anyhow::bail!("Unknown resource '{}'", other),
        },
        Command::Show { resource, id } => match resource.as_str() {
            "users" => cmd_show::<User>(&ctx, id).await?,
            "properties" => cmd_show::<Property>(&ctx, id).await?,
            "images" => cmd_show::<Image>(&ctx, id).await?,
            "messages" => cmd_show::<Message>(&ctx, id).await?,
            "favorites" => cmd_show::<Favorite>(&ctx, id).await?,
            other => anyhow::bail!("Unknown resource '{}'", other),
        },
        Command::Search {
            city,
            min_price,
            max_price,
            bedrooms,
            bathrooms,
            kind,
        } => {
            let filter = SearchFilter {
                city,
                min_price,
                max_price,
                min_bedrooms: bedrooms,
                min_bathrooms: bathrooms,
                kind,
            };
            cmd_search(&ctx, &filter).await?
        }
        Command::Conversations { user } => cmd_conversations(&ctx, user).await?,
        Command::Delete {
            resource,
            id,
            parent,
        } => match resource.as_str() {
            "users" => cmd_delete::<User>(&ctx, id, parent).await?,
            "properties" => cmd_delete::<Property>(&ctx, id, parent).await?,
            "images" => cmd_delete::<Image>(&ctx, id, parent).await?,
            "messages" => cmd_delete::<Message>(&ctx, id, parent).await?,
            "favorites" => cmd_delete::<Favorite>(&ctx, id, parent).await?,
            other => anyhow::bail!("Unknown resource '{}'", other),
        },
        Command::Dump { table } => cmd_dump(&ctx, &table).await?,
    }

    while let Ok(notice) = notices.try_recv() {
        eprintln!("! {} ({})", notice.message, notice.resource);
    }

    Ok(())
}

fn build_context(config: &Config, offline: bool) -> anyhow::Result<SyncContext> {
    let store = match &config.store.path {
        Some(path) => LocalStore::open(path)?,
        None => LocalStore::open_default(APP_NAME)?,
    };

    let mut client = RestClient::new(&config.api.base_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    if let Some(token) = config.token() {
        client.set_token(token);
    }

    let probe: Arc<dyn ConnectivityProbe> = if offline {
        Arc::new(StaticProbe::new(false))
    } else {
        Arc::new(HttpProbe::new(
            &config.api.base_url,
            &config.connectivity.probe_path,
            config.probe_timeout(),
        )
        .context("Failed to build connectivity probe")?)
    };

    Ok(SyncContext::new(store, Arc::new(client), probe)
        .with_confirm(Arc::new(StdinConfirm))
        .with_depth(config.sync.depth))
}

async fn cmd_sync<T: Resource>(ctx: &SyncContext, parent: Option<i64>) -> anyhow::Result<()> {
    let sync = ResourceSync::<T>::new(ctx.clone())?;
    let fetched = match parent {
        Some(parent_id) => sync.read_all_by_parent(parent_id, true).await,
        None => sync.read_all(true).await,
    };

    println!("{}: {} items ({})", T::TABLE, fetched.data.len(), fetched.status);
    for item in &fetched.data {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

async fn cmd_show<T: Resource>(ctx: &SyncContext, id: i64) -> anyhow::Result<()> {
    let sync = ResourceSync::<T>::new(ctx.clone())?;
    let fetched = sync.read_one(id).await;

    match fetched.data {
        ItemState::Loaded(item) => println!("{}", serde_json::to_string_pretty(&item)?),
        ItemState::Absent => println!("{} #{} does not exist", T::TABLE, id),
        ItemState::Unloaded => println!("{} #{} is not available ({})", T::TABLE, id, fetched.status),
    }
    Ok(())
}

async fn cmd_search(ctx: &SyncContext, filter: &SearchFilter) -> anyhow::Result<()> {
    let sync = ResourceSync::<Property>::new(ctx.clone())?;
    let fetched = sync.read_all(false).await;
    let found = filter.apply(&fetched.data);

    if found.is_empty() {
        println!("No properties found. Try adjusting your filters.");
    }
    for property in found {
        println!(
            "#{} {} | {} | {} | {}/month | {} bd {} ba",
            property.id.unwrap_or_default(),
            property.title.as_deref().unwrap_or(""),
            property.city.as_deref().unwrap_or(""),
            property.kind().map(|k| k.label()).unwrap_or("-"),
            property.price_per_month.unwrap_or_default(),
            property.num_bedrooms.unwrap_or_default(),
            property.num_bathrooms.unwrap_or_default(),
        );
    }
    Ok(())
}

async fn cmd_conversations(ctx: &SyncContext, user: i64) -> anyhow::Result<()> {
    let sync = ResourceSync::<Message>::new(ctx.clone())?;
    let fetched = sync.read_all_by_parent(user, false).await;

    for conversation in group_conversations(&fetched.data, user) {
        let last = conversation
            .last_message()
            .and_then(|m| m.text.as_deref())
            .unwrap_or("");
        let property = conversation
            .property_id
            .map(|id| format!("property #{}", id))
            .unwrap_or_else(|| "no property".to_string());
        println!(
            "user #{} about {}: {} messages, last: {}",
            conversation.counterpart_id,
            property,
            conversation.messages.len(),
            last
        );
    }
    Ok(())
}

async fn cmd_delete<T: Resource>(
    ctx: &SyncContext,
    id: i64,
    parent: Option<i64>,
) -> anyhow::Result<()> {
    let sync = ResourceSync::<T>::new(ctx.clone())?;
    if sync.delete(id, parent).await {
        println!("Deleted {} #{}", T::TABLE, id);
    } else {
        println!("{} #{} was not deleted", T::TABLE, id);
    }
    Ok(())
}

async fn cmd_dump(ctx: &SyncContext, table: &str) -> anyhow::Result<()> {
    let hydrator = ctx.hydrator();
    let rows = hydrator.load(table, &Filter::All, 0).await?;
    for row in rows {
        println!("{}", Entity::from_row(table, row)?);
    }
    Ok(())
}
