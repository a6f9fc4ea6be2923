//! Desktop command line for exporting a Ridibooks library
//!
//! ```bash
//! ridisync-cli auth login
//! ridisync-cli books --name "Rust"
//! ridisync-cli export --all -o ./decrypted --jobs 4
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use ridi_core::auth::{format_last_used, login_url, parse_device_list, UserDevice};
use ridi_core::book::{available_books, library_path, BookRecord};
use ridi_core::export::{BatchExporter, BookFilter, ExportProgress, ExportState};
use ridi_core::file::FileManager;
use ridi_core::storage::{ConfigStore, UserData};
use ridi_core::RidiError;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ridisync-cli", version, about = "Ridi Books DRM Remover CLI Utility")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.ridi_auth.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage authentication
    #[command(subcommand)]
    Auth(AuthCommand),

    /// List downloaded books
    Books(BookArgs),

    /// Export and decrypt books
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Login to Ridi account
    Login,
    /// Logout current account
    Logout,
    /// Switch the active account
    Switch {
        /// Account id as shown by `auth list`
        id: String,
    },
    /// List accounts
    List,
}

#[derive(Args)]
struct BookArgs {
    /// Filter by book title (partial match)
    #[arg(short, long)]
    name: Option<String>,

    /// Filter by book ID (exact match)
    #[arg(short, long)]
    id: Option<String>,

    /// Library directory (default: the reader app's library for the active user)
    #[arg(long)]
    library: Option<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    books: BookArgs,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Export all books
    #[arg(short, long)]
    all: bool,

    /// Books decrypted concurrently
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
}

impl BookArgs {
    fn filter(&self) -> BookFilter {
        BookFilter {
            id: self.id.clone(),
            title: self.name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .format_timestamp(None)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

/// 2 for setup problems (no account, no library, bad output directory),
/// 1 for anything else
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RidiError>() {
        Some(e) if !e.is_per_book() => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => ConfigStore::default_path()?,
    };
    let mut store = ConfigStore::load(config_path);

    match cli.command {
        Command::Auth(cmd) => run_auth(cmd, &mut store),
        Command::Books(args) => run_books(args, &store),
        Command::Export(args) => run_export(args, &store).await,
    }
}

fn run_auth(cmd: AuthCommand, store: &mut ConfigStore) -> Result<()> {
    match cmd {
        AuthCommand::Login => login(store),
        AuthCommand::Logout => {
            let Some(active) = store.config.active_user.clone() else {
                info!("No active user.");
                return Ok(());
            };
            if store.remove_user(&active)? {
                info!("User removed.");
            }
            Ok(())
        }
        AuthCommand::Switch { id } => {
            if store.switch_user(&id)? {
                info!("Switched to user {}", id);
                Ok(())
            } else {
                bail!("No such user: {}", id)
            }
        }
        AuthCommand::List => {
            if store.list_users().is_empty() {
                info!("No users found.");
                return Ok(());
            }
            let active = store.config.active_user.as_deref();
            println!("\nRegistered Users:");
            for user in store.list_users() {
                let marker = if Some(user.id.as_str()) == active { "*" } else { " " };
                println!(
                    "{} [{}] User: {}, Device: {}",
                    marker,
                    user.id,
                    user.user_idx,
                    user.device_name.as_deref().unwrap_or("Unknown Device")
                );
            }
            Ok(())
        }
    }
}

fn login(store: &mut ConfigStore) -> Result<()> {
    println!("Open this URL in your browser:\n\n  {}\n", login_url());
    println!("=== Login Instructions ===");
    println!("1. Log in to Ridi Books in the browser window.");
    println!("2. After logging in, you will be redirected to a page showing JSON text (device list).");
    println!("3. Copy ALL the JSON text displayed on that page.");
    println!("4. Paste it below and press Enter.");

    let devices = parse_device_list(&prompt("\nPaste JSON > ")?)?;
    print_devices(&devices);

    let device = loop {
        let line = prompt("\nEnter number: ")?;
        match line.parse::<usize>() {
            Ok(n) if (1..=devices.len()).contains(&n) => break &devices[n - 1],
            Ok(_) => warn!("Invalid selection."),
            Err(_) => warn!("Please enter a number."),
        }
    };

    let (Some(user_idx), Some(device_id)) = (&device.user_idx, &device.device_id) else {
        bail!("Invalid device data in selection.");
    };

    store.add_user(user_idx, device_id, device.device_nick.as_deref())?;
    info!("Successfully added user {} (Device: {})", user_idx, device_id);
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_devices(devices: &[UserDevice]) {
    println!("\nSelect the device you are using for this machine:");
    println!("{:<4} {:<20} {:<40} {:<10} {}", "No.", "Device Name", "Device ID", "Code", "Last Used");
    println!("{}", "-".repeat(100));
    for (idx, dev) in devices.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:<40} {:<10} {}",
            idx + 1,
            dev.display_name(),
            dev.device_id.as_deref().unwrap_or(""),
            dev.device_code.as_deref().unwrap_or(""),
            format_last_used(dev.last_used.as_deref())
        );
    }
}

fn active_user(store: &ConfigStore) -> Result<&UserData> {
    Ok(store.active_user().ok_or(RidiError::NoActiveUser)?)
}

fn load_books(args: &BookArgs, user: &UserData) -> Result<Vec<BookRecord>> {
    let root = match &args.library {
        Some(path) => path.clone(),
        None => library_path(&user.user_idx)?,
    };
    if !root.exists() {
        return Err(RidiError::LibraryNotFound { path: root })
            .context("Ensure you have downloaded books via the Ridi Reader app.");
    }

    let records = available_books(&root);
    if records.is_empty() {
        return Err(RidiError::NoBooksFound.into());
    }
    Ok(records)
}

fn run_books(args: BookArgs, store: &ConfigStore) -> Result<()> {
    let user = active_user(store)?;
    let records = load_books(&args, user)?;

    let rows = args.filter().scan_titles(records, &user.credential());

    if rows.is_empty() {
        warn!("No books matched criteria.");
        return Ok(());
    }

    println!("{:<12} | {:<4} | Title", "ID", "Type");
    println!("{}", "-".repeat(60));
    for row in rows {
        let title = match (&row.title, &row.error) {
            (_, Some(e)) => format!("[Error: {}]", e),
            (Some(t), None) => t.clone(),
            (None, None) => "Unknown Title".to_string(),
        };
        println!("{:<12} | {:<4} | {}", row.book_id, row.format, title);
    }
    Ok(())
}

async fn run_export(args: ExportArgs, store: &ConfigStore) -> Result<()> {
    let filter = args.books.filter();
    if !args.all && filter.is_empty() {
        bail!("Choose books to export with --all, --name or --id");
    }

    let user = active_user(store)?;
    let records = load_books(&args.books, user)?;
    info!("Found {} books. Preparing to export...", records.len());

    let files = FileManager::new(&args.output)?;
    let exporter = BatchExporter::new(user.credential(), files)
        .with_filter(filter)
        .with_progress(Arc::new(print_progress));

    let summary = if args.jobs > 1 {
        exporter.run_parallel(records, args.jobs).await
    } else {
        exporter.run(records)
    };

    if summary.total == 0 {
        warn!("No books found matching criteria.");
        return Ok(());
    }

    let out = args.output.canonicalize().unwrap_or(args.output);
    info!(
        "Export completed. {}/{} books exported to {}",
        summary.succeeded,
        summary.total,
        out.display()
    );
    Ok(())
}

fn print_progress(progress: ExportProgress) {
    match progress.state {
        ExportState::Completed => println!("\u{28ff} Decrypting \"{}\" \u{2714}\u{fe0e}", progress.file_name),
        ExportState::Failed => println!("\u{28ff} Decrypting \"{}\" \u{2718}", progress.file_name),
        ExportState::Queued | ExportState::Decrypting => {}
    }
}
