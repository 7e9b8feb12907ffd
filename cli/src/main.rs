use std::path::PathBuf;
use std::sync::Arc;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tpm_client::resources::COLLECTIONS;
use tpm_client::{ApiClient, ClientConfig, ClientError, FileStore, Navigator, RouteTracker};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not signed in; run `tpm login` first")]
    NotSignedIn,
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tpm", about = "Trade promotion management API CLI")]
struct Cli {
    /// Overrides the resolved API base URL.
    #[arg(long, env = "TPM_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "TPM_SESSION_FILE", default_value = ".tpm-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long, env = "TPM_EMAIL")]
        email: String,
        #[arg(long, env = "TPM_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    Api(ApiCommand),
    Resource(ResourceCommand),
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Get {
        path: String,
    },
    Post {
        path: String,
        #[arg(long, default_value = "{}")]
        data: String,
    },
    Put {
        path: String,
        #[arg(long)]
        data: String,
    },
    Patch {
        path: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        path: String,
    },
}

#[derive(Args, Debug)]
struct ResourceCommand {
    #[arg(value_parser = PossibleValuesParser::new(COLLECTIONS))]
    collection: String,

    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    List {
        #[arg(long = "filter", value_parser = parse_filter, help = "Query filter as key=value")]
        filters: Vec<(String, String)>,
    },
    Read {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let store = Arc::new(FileStore::new(cli.session_file));
    let navigator = Arc::new(RouteTracker::new("/"));
    let client = ApiClient::from_config(&config, store, navigator.clone())?;

    let result = match cli.command {
        Command::Login { email, password } => run_login(&client, &email, &password).await,
        Command::Logout => {
            client.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => run_whoami(&client),
        Command::Api(api) => run_api(&client, api).await,
        Command::Resource(resource) => run_resource(&client, resource).await,
    };

    if navigator.current_route() == client.login_route() {
        eprintln!("session expired; run `tpm login` to sign in again");
    }
    result
}

async fn run_login(client: &ApiClient, email: &str, password: &str) -> Result<(), CliError> {
    let session = client.login(email, password).await?;
    print_json(&session.user)
}

fn run_whoami(client: &ApiClient) -> Result<(), CliError> {
    let session = client.session().ok_or(CliError::NotSignedIn)?;
    print_json(&session.user)
}

async fn run_api(client: &ApiClient, api: ApiCommand) -> Result<(), CliError> {
    let json = match api.command {
        ApiSubcommand::Get { path } => client.get(&path).await?,
        ApiSubcommand::Post { path, data } => client.post(&path, parse_data(&data)?).await?,
        ApiSubcommand::Put { path, data } => client.put(&path, parse_data(&data)?).await?,
        ApiSubcommand::Patch { path, data } => client.patch(&path, parse_data(&data)?).await?,
        ApiSubcommand::Delete { path } => client.delete(&path).await?,
    };
    print_json(&json)
}

async fn run_resource(client: &ApiClient, command: ResourceCommand) -> Result<(), CliError> {
    let resource = client.resource(&command.collection);
    let json = match command.command {
        ResourceSubcommand::List { filters } => {
            let filters: Vec<(&str, &str)> = filters
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            Value::Array(resource.list::<Value>(&filters).await?)
        }
        ResourceSubcommand::Read { id } => resource.read::<Value>(&id).await?.unwrap_or(Value::Null),
        ResourceSubcommand::Create { data } => resource
            .create::<Value>(parse_data(&data)?)
            .await?
            .unwrap_or(Value::Null),
        ResourceSubcommand::Update { id, data } => resource
            .update::<Value>(&id, parse_data(&data)?)
            .await?
            .unwrap_or(Value::Null),
        ResourceSubcommand::Delete { id } => {
            resource.remove(&id).await?;
            println!("deleted {}", resource.item_path(&id));
            return Ok(());
        }
    };
    print_json(&json)
}

fn parse_data(data: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str::<Value>(data)?)
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty filter key in `{raw}`"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_filter_splits_on_first_equals() {
        assert_eq!(parse_filter("status=a=b").unwrap(), ("status".to_owned(), "a=b".to_owned()));
    }

    #[test]
    fn parse_filter_rejects_missing_separator_or_key() {
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=active").is_err());
    }

    #[test]
    fn cli_accepts_known_collection_only() {
        assert!(Cli::try_parse_from(["tpm", "resource", "budgets", "list", "--filter", "year=2024"]).is_ok());
        assert!(Cli::try_parse_from(["tpm", "resource", "widgets", "list"]).is_err());
    }

    #[test]
    fn cli_parses_api_post_with_default_body() {
        let cli = Cli::try_parse_from(["tpm", "api", "post", "/budgets/recalculate"]).unwrap();
        let Command::Api(ApiCommand { command: ApiSubcommand::Post { path, data } }) = cli.command else {
            panic!("expected api post");
        };
        assert_eq!(path, "/budgets/recalculate");
        assert_eq!(data, "{}");
    }
}
