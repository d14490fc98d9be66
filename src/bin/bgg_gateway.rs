use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bgg_gateway::config::{ConfigLoader, StorageKind};
use bgg_gateway::domain::{CollectionSubtype, PlaysQuery, ThingType};
use bgg_gateway::error::GatewayError;
use bgg_gateway::gateway::BggGateway;
use bgg_gateway::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "bgg-gateway")]
#[command(about = "Rate-limited, cached access to the BoardGameGeek XML API")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    storage: Option<StorageKind>,

    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up one or more things by id")]
    Thing(ThingArgs),
    #[command(about = "Search things by name")]
    Search(SearchArgs),
    #[command(about = "Look up a user profile")]
    User(UserArgs),
    #[command(about = "Fetch a user's collection")]
    Collection(CollectionArgs),
    #[command(about = "Fetch a page of a user's logged plays")]
    Plays(PlaysArgs),
    #[command(about = "Fetch a geeklist by id")]
    Geeklist(GeeklistArgs),
    #[command(about = "List a user's geeklists")]
    Geeklists(GeeklistsArgs),
    #[command(about = "Show the hot list")]
    Hot(HotArgs),
    #[command(about = "Drop a raw cache key from both tiers")]
    Invalidate(InvalidateArgs),
}

#[derive(Args)]
struct ThingArgs {
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Args)]
struct SearchArgs {
    query: String,

    #[arg(long = "type")]
    thing_type: Option<ThingType>,

    #[arg(long)]
    exact: bool,
}

#[derive(Args)]
struct UserArgs {
    username: String,
}

#[derive(Args)]
struct CollectionArgs {
    username: String,

    #[arg(long)]
    subtype: Option<CollectionSubtype>,
}

#[derive(Args)]
struct PlaysArgs {
    username: String,

    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    min_date: Option<String>,

    #[arg(long)]
    max_date: Option<String>,

    #[arg(long)]
    page: Option<u32>,
}

#[derive(Args)]
struct GeeklistArgs {
    id: String,
}

#[derive(Args)]
struct GeeklistsArgs {
    username: String,

    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[derive(Args)]
struct HotArgs {
    #[arg(long = "type")]
    item_type: Option<String>,
}

#[derive(Args)]
struct InvalidateArgs {
    key: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GatewayError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GatewayError) -> u8 {
    match error {
        GatewayError::RateLimited { .. } | GatewayError::NetworkTransient { .. } => 75,
        GatewayError::ServerError { .. } | GatewayError::ParseError(_) => 3,
        GatewayError::ConfigRead(_)
        | GatewayError::ConfigParse(_)
        | GatewayError::InvalidArgument(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.compact {
        OutputMode::Compact
    } else {
        OutputMode::Pretty
    };

    let mut resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(kind) = cli.storage {
        resolved.storage.kind = kind;
    }
    let gateway = BggGateway::from_config(&resolved)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(execute(cli.command, &gateway, output_mode))
}

async fn execute(
    command: Commands,
    gateway: &BggGateway,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        Commands::Thing(args) => {
            if let [id] = args.ids.as_slice() {
                let thing = gateway.get_thing(id).await?;
                print(&thing, output_mode)
            } else {
                let things = gateway.get_things(&args.ids).await?;
                print(&things, output_mode)
            }
        }
        Commands::Search(args) => {
            let things = gateway
                .search_things(&args.query, args.thing_type, args.exact)
                .await?;
            print(&things, output_mode)
        }
        Commands::User(args) => {
            let user = gateway.get_user(&args.username).await?;
            print(&user, output_mode)
        }
        Commands::Collection(args) => {
            let collection = gateway
                .get_user_collection(&args.username, args.subtype)
                .await?;
            print(&collection, output_mode)
        }
        Commands::Plays(args) => {
            let query = PlaysQuery {
                id: args.id,
                min_date: args.min_date,
                max_date: args.max_date,
                page: args.page,
            };
            let plays = gateway.get_user_plays(&args.username, &query).await?;
            print(&plays, output_mode)
        }
        Commands::Geeklist(args) => {
            let geeklist = gateway.get_geeklist(&args.id).await?;
            print(&geeklist, output_mode)
        }
        Commands::Geeklists(args) => {
            let geeklists = gateway.get_geeklists(&args.username, args.page).await?;
            print(&geeklists, output_mode)
        }
        Commands::Hot(args) => {
            let items = gateway.get_hot_items(args.item_type.as_deref()).await?;
            print(&items, output_mode)
        }
        Commands::Invalidate(args) => {
            gateway.cache().remove(&args.key).await;
            eprintln!("Invalidated {}", args.key);
            Ok(())
        }
    }
}

fn print<T: serde::Serialize>(value: &T, output_mode: OutputMode) -> miette::Result<()> {
    JsonOutput::print(value, output_mode).into_diagnostic()
}
