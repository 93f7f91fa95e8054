use std::{process, sync::Arc};

use fresca::{
    application::{
        error::AppError,
        posts::{self, CREATE_POST, DELETE_POST, LIST_POSTS, PostsApi, UPDATE_POST},
        posts_store::PostsStore,
    },
    cache::{CacheConfig, QueryCache, QuerySnapshot},
    config::{self, Command, CreateArgs, DeleteArgs, FetchArgs, ListArgs, UpdateArgs},
    domain::entities::PostRecord,
    infra::{
        http::{HttpPostsApi, RestClient},
        telemetry,
    },
    presentation::views,
};
use fresca_api_types::PostPayload;
use serde_json::{Value, json};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::List(ListArgs::default()));

    telemetry::init(&settings.logging)?;

    let client = RestClient::new(&settings.api)?;
    let api: Arc<dyn PostsApi> = Arc::new(HttpPostsApi::new(client));
    let cache = QueryCache::new(
        posts::endpoints(Arc::clone(&api)),
        &CacheConfig::from(&settings.cache),
    );

    match command {
        Command::List(args) => run_list(&cache, args).await,
        Command::Fetch(args) => run_fetch(api, args).await,
        Command::Create(args) => run_create(&cache, args).await,
        Command::Update(args) => run_update(&cache, args).await,
        Command::Delete(args) => run_delete(&cache, args).await,
    }
}

async fn run_list(cache: &QueryCache<PostRecord>, args: ListArgs) -> Result<(), AppError> {
    let mut subscription = cache.subscribe(LIST_POSTS, Value::Null)?;
    if !args.json {
        print!("{}", views::query_view(&subscription.snapshot()));
    }
    let snapshot = subscription.settled().await;
    render_snapshot(&snapshot, args.json)
}

async fn run_fetch(api: Arc<dyn PostsApi>, args: FetchArgs) -> Result<(), AppError> {
    let store = PostsStore::new(api);
    if !args.json {
        print!("{}", views::post_list(true, []));
    }
    store.refresh().await?;
    let posts = store.select_all();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else {
        print!("{}", views::post_list(false, &posts));
    }
    Ok(())
}

async fn run_create(cache: &QueryCache<PostRecord>, args: CreateArgs) -> Result<(), AppError> {
    let mut subscription = cache.subscribe(LIST_POSTS, Value::Null)?;
    subscription.settled().await;

    let payload = PostPayload::new(args.id, args.title, args.desc);
    cache
        .mutate(CREATE_POST, serde_json::to_value(&payload)?)
        .await?;

    let snapshot = subscription.settled().await;
    render_snapshot(&snapshot, false)
}

async fn run_update(cache: &QueryCache<PostRecord>, args: UpdateArgs) -> Result<(), AppError> {
    let mut subscription = cache.subscribe(LIST_POSTS, Value::Null)?;
    subscription.settled().await;

    let payload = PostPayload::new(args.id, args.title, args.desc);
    cache
        .mutate(UPDATE_POST, serde_json::to_value(&payload)?)
        .await?;

    let snapshot = subscription.settled().await;
    render_snapshot(&snapshot, false)
}

async fn run_delete(cache: &QueryCache<PostRecord>, args: DeleteArgs) -> Result<(), AppError> {
    let mut subscription = cache.subscribe(LIST_POSTS, Value::Null)?;
    subscription.settled().await;

    cache.mutate(DELETE_POST, json!(args.id)).await?;

    // Deletes only invalidate their entity tag; the list refetches when the
    // post was in it and stays as-is otherwise.
    let snapshot = subscription.settled().await;
    render_snapshot(&snapshot, false)
}

fn render_snapshot(snapshot: &QuerySnapshot<PostRecord>, json: bool) -> Result<(), AppError> {
    if let Some(err) = &snapshot.error {
        return Err(AppError::Query(err.clone()));
    }
    if json {
        let posts: Vec<&PostRecord> = snapshot
            .data
            .as_deref()
            .map(|collection| collection.iter().collect())
            .unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else {
        print!("{}", views::query_view(snapshot));
    }
    Ok(())
}
