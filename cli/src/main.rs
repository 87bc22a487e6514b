mod context;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::{Value, json};
use supadash::config::{self, BackendConfig};
use supadash::diagnostics::{self, ConfigSummary};
use supadash::navigation::{self, Route};
use supadash::validation::validate_password;
use supadash::{AuthError, Client, ClientProvider, FileStore, Metadata, SessionStore, Todo, User};
use uuid::Uuid;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "supadash", about = "Accounts and todos on a self-hosted Supabase backend")]
struct Cli {
    #[arg(long, env = "SUPABASE_URL", global = true)]
    url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", global = true, hide_env_values = true)]
    anon_key: Option<String>,

    #[arg(long, env = "SUPADASH_SESSION_FILE", global = true)]
    session_file: Option<PathBuf>,

    /// Repeat for more log output on stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account, then sign in.
    Register(RegisterArgs),
    /// Sign in with a password, a phone code, or anonymously.
    Login(LoginArgs),
    /// Finish a phone sign-in with the code from the SMS.
    Verify {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Email a password-reset link.
    ResetPassword {
        #[arg(long)]
        email: Option<String>,
    },
    Todo(TodoCommand),
    Debug(DebugCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm_password: String,
    /// Display name stored in the user's metadata.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("method").required(true).args(["email", "phone", "anonymous"])))]
struct LoginArgs {
    #[arg(long, requires = "password")]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Send a one-time code to this number.
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    anonymous: bool,
}

#[derive(Args, Debug)]
struct TodoCommand {
    #[command(subcommand)]
    command: TodoSubcommand,
}

#[derive(Subcommand, Debug)]
enum TodoSubcommand {
    List,
    Add { title: String },
    Done { id: i64 },
    Undo { id: i64 },
    Toggle { id: i64 },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct DebugCommand {
    #[command(subcommand)]
    command: DebugSubcommand,
}

#[derive(Subcommand, Debug)]
enum DebugSubcommand {
    /// Request the REST root and report status and headers.
    Probe,
    /// Decode a JWT (the public key when omitted).
    Jwt { token: Option<String> },
    /// Show the resolved configuration with masked keys.
    Config,
    /// Register a throwaway `test_<millis>@example.com` account.
    Signup,
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    DeleteUser {
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so clap's env fallbacks see the local file.
    let env_file = config::load_local_env_file();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "using local env file");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.render());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(context::log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = context::resolve_config(cli.url, cli.anon_key, BackendConfig::from_env_vars());
    let session_path = cli.session_file.unwrap_or_else(|| {
        context::default_session_path(std::env::var_os("HOME").map(PathBuf::from).as_deref())
    });
    tracing::debug!(?config, session_file = %session_path.display(), "resolved configuration");

    let store: Arc<dyn SessionStore> = Arc::new(FileStore::new(session_path));
    let provider = ClientProvider::application(config.clone(), Some(store));

    match cli.command {
        Command::Register(args) => run_register(&provider.get_client(), args).await,
        Command::Login(args) => run_login(&provider.get_client(), args).await,
        Command::Verify { phone, code } => {
            let session = provider.get_client().verify_otp(&phone, &code).await?;
            print_signed_in(&session.user)
        }
        Command::Logout => run_logout(&provider.get_client()).await,
        Command::Whoami => {
            let user = require_user(&provider.get_client(), Route::Profile).await?;
            print_json(&context::user_json(&user))
        }
        Command::ResetPassword { email } => run_reset_password(&provider.get_client(), email).await,
        Command::Todo(todo) => run_todo(&provider.get_client(), todo).await,
        Command::Debug(debug) => run_debug(&config, debug).await,
        Command::Admin(admin) => run_admin(config, admin).await,
    }
}

// =============================================================================
// AUTH
// =============================================================================

async fn run_register(client: &Client, args: RegisterArgs) -> Result<(), CliError> {
    validate_password(&args.password, &args.confirm_password)?;
    let metadata = args.name.map(|name| {
        let mut metadata = Metadata::new();
        metadata.insert("display_name".to_owned(), Value::String(name));
        metadata
    });

    let outcome = client.sign_up(&args.email, &args.password, metadata).await?;
    if outcome.session.is_some() {
        return print_signed_in(&outcome.user);
    }
    match client.sign_in(&args.email, &args.password).await {
        Ok(session) => print_signed_in(&session.user),
        Err(AuthError::UnconfirmedAccount(_)) => print_json(&json!({
            "user": context::user_json(&outcome.user),
            "next": "confirm the account from the email we sent, then run `supadash login`",
        })),
        Err(e) => Err(e.into()),
    }
}

async fn run_login(client: &Client, args: LoginArgs) -> Result<(), CliError> {
    if args.anonymous {
        let session = client.sign_in_anonymously(None).await?;
        return print_signed_in(&session.user);
    }
    if let Some(phone) = args.phone {
        client.sign_in_with_otp(&phone).await?;
        return print_json(&json!({
            "sent": true,
            "next": format!("run `supadash verify --phone {phone} --code <code>`"),
        }));
    }
    let (Some(email), Some(password)) = (args.email, args.password) else {
        return Err(AuthError::Validation("email and password are required".to_owned()).into());
    };
    let session = client.sign_in(&email, &password).await?;
    print_signed_in(&session.user)
}

async fn run_logout(client: &Client) -> Result<(), CliError> {
    if let Err(e) = client.sign_out().await {
        tracing::warn!(error = %e, "backend did not confirm sign-out; local session removed");
    }
    print_json(&json!({ "signed_out": true, "next": navigation::after_sign_out().path() }))
}

async fn run_reset_password(client: &Client, email: Option<String>) -> Result<(), CliError> {
    let email = match email {
        Some(email) => email,
        None => client
            .get_current_user()
            .await
            .and_then(|u| u.email)
            .ok_or(CliError::MissingEmail)?,
    };
    client.reset_password(&email, None).await?;
    print_json(&json!({ "sent": true, "email": email }))
}

/// The current user, or `NotSignedIn` when `route` would redirect to login.
async fn require_user(client: &Client, route: Route) -> Result<User, CliError> {
    let user = client.get_current_user().await;
    if let Some(redirect) = navigation::guard(route, user.as_ref()) {
        tracing::debug!(from = route.path(), to = redirect.path(), "redirecting unauthenticated command");
        return Err(CliError::NotSignedIn);
    }
    user.ok_or(CliError::NotSignedIn)
}

fn print_signed_in(user: &User) -> Result<(), CliError> {
    print_json(&json!({
        "user": context::user_json(user),
        "next": navigation::after_sign_in().path(),
    }))
}

// =============================================================================
// TODOS
// =============================================================================

async fn run_todo(client: &Client, todo: TodoCommand) -> Result<(), CliError> {
    let user = require_user(client, Route::Dashboard).await?;
    match todo.command {
        TodoSubcommand::List => {
            let todos = client.list_todos(user.id).await?;
            print_json(&serde_json::to_value(todos)?)
        }
        TodoSubcommand::Add { title } => {
            let created = client.insert_todo(user.id, &title).await?;
            print_json(&serde_json::to_value(created)?)
        }
        TodoSubcommand::Done { id } => set_completed(client, id, true).await,
        TodoSubcommand::Undo { id } => set_completed(client, id, false).await,
        TodoSubcommand::Toggle { id } => {
            let current = find_todo(client, user.id, id).await?;
            let toggled = client.toggle_todo(&current).await?;
            print_json(&serde_json::to_value(toggled)?)
        }
        TodoSubcommand::Delete { id } => {
            client.delete_todo(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn set_completed(client: &Client, id: i64, completed: bool) -> Result<(), CliError> {
    client.update_todo_completion(id, completed).await?;
    print_json(&json!({ "id": id, "completed": completed }))
}

async fn find_todo(client: &Client, user_id: Uuid, id: i64) -> Result<Todo, CliError> {
    client
        .list_todos(user_id)
        .await?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or(CliError::Data(supadash::DataError::NotFound(id)))
}

// =============================================================================
// DEBUG
// =============================================================================

async fn run_debug(config: &BackendConfig, debug: DebugCommand) -> Result<(), CliError> {
    match debug.command {
        DebugSubcommand::Probe => {
            let report = diagnostics::probe(config).await;
            print_json(&serde_json::to_value(report)?)
        }
        DebugSubcommand::Jwt { token } => {
            let token = token.unwrap_or_else(|| config.anon_key.clone());
            let decoded = diagnostics::decode_jwt(&token)?;
            print_json(&serde_json::to_value(decoded)?)
        }
        DebugSubcommand::Config => print_json(&serde_json::to_value(ConfigSummary::from(config))?),
        DebugSubcommand::Signup => {
            let client = ClientProvider::request(config.clone()).get_client();
            let check = diagnostics::test_sign_up(&client).await;
            print_json(&serde_json::to_value(check)?)
        }
    }
}

// =============================================================================
// ADMIN
// =============================================================================

async fn run_admin(config: BackendConfig, admin: AdminCommand) -> Result<(), CliError> {
    let admin_client = ClientProvider::request(config).admin_client()?;
    match admin.command {
        AdminSubcommand::CreateUser { email, password, name } => {
            let mut metadata = Metadata::new();
            if let Some(name) = name {
                metadata.insert("display_name".to_owned(), Value::String(name));
            }
            let user = admin_client.create_user(&email, &password, metadata).await?;
            print_json(&context::user_json(&user))
        }
        AdminSubcommand::DeleteUser { id } => {
            admin_client.delete_user(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
