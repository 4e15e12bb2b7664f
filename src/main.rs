use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use scorebook::auth::{AuthContext, CurrentUser, StaticAuth};
use scorebook::core::to_fields;
use scorebook::services::{
    ActivityKind, MatchActivity, MatchActivityLog, MatchSummary, ProfileService, UserMatchNotes,
};
use scorebook::{
    Condition, Document, InMemoryStore, LiveState, SortDirection, SortKey, StoreConfig, Value,
    ViewModel,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const UPDATE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "scorebook")]
#[command(about = "Live match data layer running against an in-memory store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a user's activity feed while mutations happen
    Demo {
        #[arg(long, default_value = "u1")]
        user: String,
    },
    /// Run a one-shot query against the seeded sample data
    Query {
        collection: String,
        /// Condition as field:op:value, e.g. status:==:live
        #[arg(long = "where")]
        conditions: Vec<String>,
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        desc: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = StoreConfig::from_env().context("failed to load store configuration")?;
    info!(url = %config.to_url(), policy = %config.update_policy, "using in-memory store");
    let store = Arc::new(InMemoryStore::new(config));
    seed_sample_data(&store).await?;

    match cli.command {
        Command::Demo { user } => run_demo(store, &user).await,
        Command::Query {
            collection,
            conditions,
            order_by,
            desc,
        } => run_query(store, &collection, &conditions, order_by.as_deref(), desc).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scorebook=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn seed_sample_data(store: &InMemoryStore) -> Result<()> {
    let matches = [
        ("m1", json!({"title": "IND vs AUS", "status": "live", "overs": 34.2, "teams": ["IND", "AUS"]})),
        ("m2", json!({"title": "ENG vs NZ", "status": "completed", "overs": 50, "teams": ["ENG", "NZ"]})),
        ("m3", json!({"title": "PAK vs SA", "status": "upcoming", "teams": ["PAK", "SA"]})),
        ("m4", json!({"title": "SL vs BAN", "status": "live", "overs": 12.5, "teams": ["SL", "BAN"]})),
    ];
    for (id, data) in matches {
        store.seed("matches", id, to_fields(&data)?).await;
    }
    store
        .seed("users", "u1", to_fields(&json!({"name": "Alice", "favoriteTeam": "IND"}))?)
        .await;
    Ok(())
}

fn parse_condition(raw: &str) -> Result<Condition> {
    let mut parts = raw.splitn(3, ':');
    let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow!("condition '{}' is not field:op:value", raw));
    };
    // JSON literals (numbers, booleans, arrays) first, bare words as text
    let value = serde_json::from_str::<serde_json::Value>(value)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(value));
    Ok(Condition::parse(field, op, value)?)
}

async fn run_query(
    store: Arc<InMemoryStore>,
    collection: &str,
    raw_conditions: &[String],
    order_by: Option<&str>,
    desc: bool,
) -> Result<()> {
    let conditions = raw_conditions
        .iter()
        .map(|raw| parse_condition(raw))
        .collect::<Result<Vec<_>>>()?;
    let sort = order_by.map(|field| {
        let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
        SortKey::new(field, direction)
    });

    let view = ViewModel::new(store, collection);
    let docs = view
        .fetch_all(&conditions, sort)
        .await
        .with_context(|| format!("query on '{}' failed", collection))?;

    let rows: Vec<_> = docs.iter().map(|doc| doc.to_json()).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn wait_for<T, F>(rx: &mut watch::Receiver<LiveState<T>>, what: &str, predicate: F) -> Result<LiveState<T>>
where
    T: Clone,
    F: FnMut(&LiveState<T>) -> bool,
{
    let state = tokio::time::timeout(UPDATE_TIMEOUT, rx.wait_for(predicate))
        .await
        .with_context(|| format!("timed out waiting for {}", what))?
        .context("hook closed")?;
    Ok(state.clone())
}

fn print_feed(state: &LiveState<Vec<Document>>) -> Result<()> {
    let activities = state
        .data
        .iter()
        .map(|doc| doc.decode::<MatchActivity>())
        .collect::<scorebook::Result<Vec<_>>>()?;
    println!("feed ({} entries):", activities.len());
    for activity in activities {
        println!(
            "  {:?} {} {}",
            activity.activity_type,
            activity.match_title,
            activity.details.unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_demo(store: Arc<InMemoryStore>, uid: &str) -> Result<()> {
    let auth = Arc::new(StaticAuth::signed_in(CurrentUser::new(uid)));
    let user = auth.require_user()?;
    let log = MatchActivityLog::new(store.clone());
    let notes = UserMatchNotes::new(store.clone(), auth.clone());
    let profiles = ProfileService::new(store.clone(), auth.clone());

    let outcome = profiles.record_sign_in().await?;
    info!(uid = user.uid(), ?outcome, "signed in");

    let mut feed = log.watch_user_activity(user.uid())?;
    let mut rx = feed.watch();
    print_feed(&wait_for(&mut rx, "initial feed", |s| !s.loading).await?)?;

    log.log_activity(user.uid(), "m1", "IND vs AUS", ActivityKind::View, None)
        .await?;
    print_feed(&wait_for(&mut rx, "view activity", |s| s.data.len() == 1).await?)?;

    let favorite = notes.toggle_favorite("m1").await?;
    log.log_activity(user.uid(), "m1", "IND vs AUS", ActivityKind::Favorite, None)
        .await?;
    print_feed(&wait_for(&mut rx, "favorite activity", |s| s.data.len() == 2).await?)?;
    println!("m1 favorite: {}", favorite);

    let summary = MatchSummary {
        id: "m4".into(),
        title: "SL vs BAN".into(),
        teams: vec!["SL".into(), "BAN".into()],
        status: "live".into(),
        venue: None,
    };
    log.sync_match(user.uid(), &summary).await?;
    print_feed(&wait_for(&mut rx, "share activity", |s| s.data.len() == 3).await?)?;

    store.set_offline(true).await;
    let state = wait_for(&mut rx, "offline error", |s| s.is_error()).await?;
    if let Some(err) = &state.error {
        warn!(error = %err, cached = state.data.len(), "feed offline, keeping cached entries");
    }

    store.set_offline(false).await;
    feed.refresh();
    let state = wait_for(&mut rx, "reconnect", |s| !s.loading && !s.is_error()).await?;
    print_feed(&state)?;

    feed.unmount();
    info!(listeners = store.listener_count().await, "demo finished");
    Ok(())
}
