use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use pushfan::config::{DEFAULT_SUBSCRIPTIONS_TABLE, DEFAULT_VAPID_SUBJECT};

const DEFAULT_LOG_FILTER: &str = "pushfan=info";

pub(crate) enum RunOutcome {
    Serve(pushfan::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    pushfan::logging::init_tracing(DEFAULT_LOG_FILTER, cli.log_json);

    let supabase = match resolve_supabase_config(&cli) {
        Ok(supabase) => supabase,
        Err(err) => {
            tracing::error!("{err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(pushfan::config::AppConfig {
        bind: cli.bind,
        vapid_private_key: cli.vapid_private_key,
        vapid_public_key: cli.vapid_public_key,
        vapid_subject: cli.vapid_subject,
        supabase,
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "pushfan",
    version,
    about = "Web push subscription registry and broadcast server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "PUSHFAN_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, env = "PUSHFAN_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "PUSHFAN_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "PUSHFAN_VAPID_SUBJECT", default_value = DEFAULT_VAPID_SUBJECT)]
    vapid_subject: String,
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY")]
    supabase_key: Option<String>,
    #[arg(long, env = "PUSHFAN_SUBSCRIPTIONS_TABLE", default_value = DEFAULT_SUBSCRIPTIONS_TABLE)]
    subscriptions_table: String,
    #[arg(long, env = "PUSHFAN_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh VAPID key pair.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match pushfan::VapidCredentials::generate() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => (DEFAULT_VAPID_SUBJECT.to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("PUSHFAN_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("PUSHFAN_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("PUSHFAN_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace PUSHFAN_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn resolve_supabase_config(
    cli: &Cli,
) -> Result<Option<pushfan::config::SupabaseConfig>, String> {
    let url = cli
        .supabase_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    let key = cli
        .supabase_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());

    match (url, key) {
        (None, None) => Ok(None),
        (Some(url), Some(key)) => {
            let table = cli.subscriptions_table.trim();
            if table.is_empty() {
                return Err("subscriptions table name cannot be empty".to_string());
            }
            Ok(Some(pushfan::config::SupabaseConfig {
                url: url.to_string(),
                service_key: key.to_string(),
                table: table.to_string(),
            }))
        }
        (Some(_), None) => Err("--supabase-url is set but --supabase-key is missing".to_string()),
        (None, Some(_)) => Err("--supabase-key is set but --supabase-url is missing".to_string()),
    }
}
