pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "catalog-api")]
#[command(about = "Catalog API - categories and products over HTTP")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides CATALOG_API_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Create or update the catalog schema in DATABASE_URL")]
    Migrate,

    #[command(about = "Create a user that can obtain tokens")]
    CreateUser {
        #[arg(help = "Login name")]
        username: String,
        #[arg(long, help = "Login password")]
        password: String,
        #[arg(long, help = "Grant every catalog permission")]
        staff: bool,
        #[arg(long = "permission", help = "Permission codename, e.g. add_product (repeatable)")]
        permissions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(port).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::CreateUser {
            username,
            password,
            staff,
            permissions,
        } => commands::user::handle(username, password, staff, permissions, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_user() {
        let cli = Cli::try_parse_from([
            "catalog-api",
            "create-user",
            "editor",
            "--password",
            "pw",
            "--permission",
            "add_product",
            "--permission",
            "change_product",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::CreateUser { username, staff, permissions, .. }) => {
                assert_eq!(username, "editor");
                assert!(!staff);
                assert_eq!(permissions, vec!["add_product", "change_product"]);
            }
            _ => panic!("expected create-user"),
        }
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["catalog-api"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["catalog-api", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(8080) })));
    }
}
