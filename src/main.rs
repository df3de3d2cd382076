mod api;
mod commands;
mod config;
mod debounce;
mod notify;
mod search;
mod state;
mod upload;

use std::process::ExitCode;

use clap::Parser;

use api::types::{MedicineInput, RegisterRequest};
use commands::CommandError;
use config::Config;
use state::AppState;

mod cli {
    use std::path::PathBuf;

    use clap::{Parser, Subcommand};

    #[derive(Parser, Debug)]
    #[command(name = "pharmacy-client", version, about = "Terminal client for the Pharmacy AI backend")]
    pub struct Args {
        /// Backend origin, e.g. http://localhost:8000 (overrides PHARMACY_API_URL)
        #[arg(long, global = true)]
        pub api_url: Option<String>,

        /// Keep tokens in memory for this run instead of the OS keychain
        #[arg(long, global = true)]
        pub no_keychain: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Sign in and store the issued tokens
        Login {
            #[arg(long)]
            username: String,
            #[arg(long, env = "PHARMACY_PASSWORD", hide_env_values = true)]
            password: String,
        },
        /// Create an account and sign in with it
        Register {
            #[arg(long)]
            username: String,
            #[arg(long, env = "PHARMACY_PASSWORD", hide_env_values = true)]
            password: String,
            #[arg(long)]
            email: Option<String>,
            /// `staff` (backend default) or `admin`
            #[arg(long)]
            role: Option<String>,
        },
        /// Refresh the access token from the stored refresh token
        Refresh,
        /// Forget stored tokens
        Logout,
        /// Upload a prescription image or PDF
        Upload { file: Option<PathBuf> },
        /// List your uploaded prescriptions
        History,
        /// Search medicines by name, composition or manufacturer
        Search {
            query: Option<String>,
            /// Treat each stdin line as a keystroke-level input change
            #[arg(long)]
            interactive: bool,
        },
        /// Manage the medicine inventory (admin only)
        #[command(subcommand)]
        Medicines(MedicineCommand),
    }

    #[derive(Subcommand, Debug)]
    pub enum MedicineCommand {
        List,
        /// Show one medicine
        Show { id: u64 },
        Create {
            #[arg(long)]
            name: String,
            #[arg(long)]
            composition: Option<String>,
            #[arg(long)]
            stock: Option<i64>,
            #[arg(long)]
            manufacturer: Option<String>,
        },
        Update {
            id: u64,
            #[arg(long)]
            name: Option<String>,
            #[arg(long)]
            composition: Option<String>,
            #[arg(long)]
            stock: Option<i64>,
            #[arg(long)]
            manufacturer: Option<String>,
        },
        Delete { id: u64 },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = cli::Args::parse();

    let mut config = Config::from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if args.no_keychain {
        config.use_keychain = false;
    }
    log::info!("Pharmacy client starting (backend: {})", config.api_url);

    let state = AppState::initialize(&config).await;

    let result = run(&state, args.command).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Reported) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: cli::Command) -> commands::CommandResult {
    use cli::{Command, MedicineCommand};

    match command {
        Command::Login { username, password } => commands::login(state, &username, &password).await,
        Command::Register {
            username,
            password,
            email,
            role,
        } => {
            let request = RegisterRequest {
                username,
                password,
                email,
                role,
            };
            commands::register(state, request).await
        }
        Command::Refresh => commands::refresh(state).await,
        Command::Logout => commands::logout(state).await,
        Command::Upload { file } => commands::upload(state, file.as_deref()).await,
        Command::History => commands::history(state).await,
        Command::Search { query, interactive } => {
            commands::search(state, query.as_deref(), interactive).await
        }
        Command::Medicines(MedicineCommand::List) => commands::list_medicines(state).await,
        Command::Medicines(MedicineCommand::Show { id }) => commands::show_medicine(state, id).await,
        Command::Medicines(MedicineCommand::Create {
            name,
            composition,
            stock,
            manufacturer,
        }) => {
            let input = MedicineInput {
                name: Some(name),
                composition,
                stock_quantity: stock,
                manufacturer,
            };
            commands::create_medicine(state, input).await
        }
        Command::Medicines(MedicineCommand::Update {
            id,
            name,
            composition,
            stock,
            manufacturer,
        }) => {
            let input = MedicineInput {
                name,
                composition,
                stock_quantity: stock,
                manufacturer,
            };
            commands::update_medicine(state, id, input).await
        }
        Command::Medicines(MedicineCommand::Delete { id }) => {
            commands::delete_medicine(state, id).await
        }
    }
}
