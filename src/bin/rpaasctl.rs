use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rpaas_sdk::{
    Block, Certificate, ClientError, CreateInstance, File, PurgeRequest, Route, RpaasClient, UpdateInstance,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "rpaasctl")]
#[command(about = "Management CLI for rpaas instances", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9999")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available plans
    Plans,
    /// List available flavors
    Flavors,
    /// Create an instance
    Create {
        name: String,
        #[arg(long)]
        team: String,
        #[arg(long, default_value = "")]
        plan: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Change team, plan, description or tags of an instance
    Update {
        name: String,
        #[arg(long)]
        team: String,
        #[arg(long, default_value = "")]
        plan: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an instance and the objects it owns
    Delete { name: String },
    /// Show instance details
    Info { instance: String },
    /// Show per-replica status
    Status { instance: String },
    /// Set the replica count
    Scale { instance: String, quantity: i32 },
    /// Bind an application host
    Bind { instance: String, app_host: String },
    /// Remove the bound application host
    Unbind { instance: String },
    /// Manage configuration blocks
    #[command(subcommand)]
    Block(BlockCommands),
    /// Manage location rules
    #[command(subcommand)]
    Route(RouteCommands),
    /// Manage TLS certificates
    #[command(subcommand)]
    Certificate(CertificateCommands),
    /// Manage extra files
    #[command(subcommand)]
    Files(FileCommands),
    /// Purge a cached path on every ready replica
    Purge {
        instance: String,
        path: String,
        #[arg(long)]
        preserve_path: bool,
    },
}

#[derive(Subcommand)]
enum BlockCommands {
    List { instance: String },
    Update { instance: String, name: String, content: String },
    Delete { instance: String, name: String },
}

#[derive(Subcommand)]
enum RouteCommands {
    List {
        instance: String,
    },
    Update {
        instance: String,
        path: String,
        #[arg(long, default_value = "")]
        destination: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        https_only: bool,
    },
    Delete {
        instance: String,
        path: String,
    },
}

#[derive(Subcommand)]
enum CertificateCommands {
    List {
        instance: String,
    },
    Update {
        instance: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        cert: PathBuf,
        #[arg(long)]
        key: PathBuf,
    },
    Delete {
        instance: String,
        name: String,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    List {
        instance: String,
    },
    /// Upload local files; each is stored under its given path
    Add {
        instance: String,
        paths: Vec<PathBuf>,
    },
    /// Replace the content of existing files
    Update {
        instance: String,
        paths: Vec<PathBuf>,
    },
    Delete {
        instance: String,
        names: Vec<String>,
    },
}

fn read_files(paths: &[PathBuf]) -> std::io::Result<Vec<File>> {
    paths
        .iter()
        .map(|path| {
            Ok(File {
                name: path.to_string_lossy().into_owned(),
                content: std::fs::read(path)?,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = RpaasClient::new(&cli.url);

    match cli.command {
        Commands::Plans => print_result(client.plans().await)?,
        Commands::Flavors => print_result(client.flavors().await)?,
        Commands::Create {
            name,
            team,
            plan,
            description,
            tags,
        } => {
            let args = CreateInstance {
                name,
                team,
                plan,
                description,
                tags,
            };
            print_result(client.create_instance(&args).await)?
        }
        Commands::Update {
            name,
            team,
            plan,
            description,
            tags,
        } => {
            let args = UpdateInstance {
                team,
                plan,
                description,
                tags,
            };
            print_result(client.update_instance(&name, &args).await)?
        }
        Commands::Delete { name } => print_result(client.delete_instance(&name).await)?,
        Commands::Info { instance } => print_result(client.info(&instance).await)?,
        Commands::Status { instance } => print_result(client.status(&instance).await)?,
        Commands::Scale { instance, quantity } => print_result(client.scale(&instance, quantity).await)?,
        Commands::Bind { instance, app_host } => print_result(client.bind_app(&instance, &app_host).await)?,
        Commands::Unbind { instance } => print_result(client.unbind_app(&instance).await)?,
        Commands::Block(cmd) => match cmd {
            BlockCommands::List { instance } => print_result(client.blocks(&instance).await)?,
            BlockCommands::Update {
                instance,
                name,
                content,
            } => print_result(client.update_block(&instance, &Block { name, content }).await)?,
            BlockCommands::Delete { instance, name } => {
                print_result(client.delete_block(&instance, &name).await)?
            }
        },
        Commands::Route(cmd) => match cmd {
            RouteCommands::List { instance } => print_result(client.routes(&instance).await)?,
            RouteCommands::Update {
                instance,
                path,
                destination,
                content,
                https_only,
            } => {
                let route = Route {
                    path,
                    destination,
                    content,
                    https_only,
                };
                print_result(client.update_route(&instance, &route).await)?
            }
            RouteCommands::Delete { instance, path } => {
                print_result(client.delete_route(&instance, &path).await)?
            }
        },
        Commands::Certificate(cmd) => match cmd {
            CertificateCommands::List { instance } => print_result(client.certificates(&instance).await)?,
            CertificateCommands::Update {
                instance,
                name,
                cert,
                key,
            } => {
                let certificate = Certificate {
                    name,
                    certificate: std::fs::read_to_string(cert)?,
                    key: std::fs::read_to_string(key)?,
                };
                print_result(client.update_certificate(&instance, &certificate).await)?
            }
            CertificateCommands::Delete { instance, name } => {
                print_result(client.delete_certificate(&instance, &name).await)?
            }
        },
        Commands::Files(cmd) => match cmd {
            FileCommands::List { instance } => print_result(client.files(&instance).await)?,
            FileCommands::Add { instance, paths } => {
                print_result(client.create_files(&instance, &read_files(&paths)?).await)?
            }
            FileCommands::Update { instance, paths } => {
                print_result(client.update_files(&instance, &read_files(&paths)?).await)?
            }
            FileCommands::Delete { instance, names } => {
                print_result(client.delete_files(&instance, &names).await)?
            }
        },
        Commands::Purge {
            instance,
            path,
            preserve_path,
        } => {
            let request = PurgeRequest { path, preserve_path };
            print_result(client.purge(&instance, &request).await)?
        }
    }

    Ok(())
}

fn print_result<T: Serialize>(result: Result<T, ClientError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(value) => {
            let json = serde_json::to_value(&value)?;
            if !json.is_null() {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Err(ClientError::Api { status, message }) => {
            eprintln!("Error: API returned status {}", status);
            eprintln!("Response: {}", message);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
