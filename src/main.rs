use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

mod commands;

/// uppm - a decentralized package manager for script-driven target applications
#[derive(Parser)]
#[command(name = "uppm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold ~/.uppm/config.toml if it doesn't exist yet
    Init,

    /// Install one or more package references into the active target app
    Install {
        /// Package references, e.g. "widget:2.3@https://example.com/repo.git"
        references: Vec<String>,

        /// Target app to install into, if more than one is configured
        #[arg(long)]
        app: Option<String>,

        /// Never prompt; take the documented default for every confirmation
        #[arg(long)]
        unattended: bool,

        /// Keep installing remaining references after one fails
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Uninstall a package reference (thin wrapper over `run-action uninstall`)
    Uninstall {
        reference: String,

        #[arg(long)]
        app: Option<String>,
    },

    /// Run an arbitrary action against a package's dependency tree
    RunAction {
        /// Action name, e.g. "build" or "clean"
        action: String,

        reference: String,

        #[arg(long)]
        app: Option<String>,

        /// Run the action over the resolved dependency tree, not just the root
        #[arg(long, default_value_t = true)]
        recursive: bool,
    },

    /// Dry-run the dependency resolver and print the resolved tree
    Resolve {
        reference: String,

        #[arg(long)]
        app: Option<String>,

        #[arg(long)]
        unattended: bool,
    },

    /// Explain why a package is present in a reference's resolved tree
    Why {
        /// Root package reference to resolve
        root_reference: String,

        /// Name of the dependency to explain
        dependency_name: String,

        #[arg(long)]
        app: Option<String>,
    },

    /// List packages installed into the active target app
    List {
        #[arg(long)]
        app: Option<String>,

        /// "global" or "local"; defaults to both
        #[arg(long)]
        scope: Option<String>,
    },

    /// Manage configured repositories
    Repositories {
        #[command(subcommand)]
        action: RepositoriesAction,
    },

    /// Manage configured target applications
    #[command(name = "target-apps")]
    TargetApps {
        #[command(subcommand)]
        action: TargetAppsAction,
    },

    /// Check repository reachability and target app validity
    Doctor,

    /// Inspect or edit the on-disk configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RepositoriesAction {
    /// List configured repositories
    List,
    /// Add a repository by URL
    Add {
        url: String,
        /// Accept any TLS certificate for this repository (Git only)
        #[arg(long)]
        accept_all_certificates: bool,
    },
    /// Re-probe every configured repository and print its catalog status
    Refresh,
}

#[derive(Subcommand)]
enum TargetAppsAction {
    /// List configured target apps
    List,
    /// Register a new target app
    Add {
        short_name: String,
        app_folder: PathBuf,
        default_repository_url: String,
    },
    /// Make a target app the default for commands that omit --app
    #[command(name = "set-current")]
    SetCurrent { short_name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set the unattended default
    SetUnattended { value: bool },
    /// Set the resolver's force-resync flag
    SetForceResync { value: bool },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Install { references, app, unattended, continue_on_error } => {
            commands::install::run(references, app, unattended, continue_on_error)
        }
        Commands::Uninstall { reference, app } => commands::uninstall::run(reference, app),
        Commands::RunAction { action, reference, app, recursive } => commands::run_action::run(action, reference, app, recursive),
        Commands::Resolve { reference, app, unattended } => commands::resolve::run(reference, app, unattended),
        Commands::Why { root_reference, dependency_name, app } => commands::why::run(root_reference, dependency_name, app),
        Commands::List { app, scope } => commands::list::run(app, scope),
        Commands::Repositories { action } => match action {
            RepositoriesAction::List => commands::repositories::list(),
            RepositoriesAction::Add { url, accept_all_certificates } => commands::repositories::add(url, accept_all_certificates),
            RepositoriesAction::Refresh => commands::repositories::refresh(),
        },
        Commands::TargetApps { action } => match action {
            TargetAppsAction::List => commands::target_apps::list(),
            TargetAppsAction::Add { short_name, app_folder, default_repository_url } => {
                commands::target_apps::add(short_name, app_folder, default_repository_url)
            }
            TargetAppsAction::SetCurrent { short_name } => commands::target_apps::set_current(short_name),
        },
        Commands::Doctor => commands::doctor::run(),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::SetUnattended { value } => commands::config::set_unattended(value),
            ConfigAction::SetForceResync { value } => commands::config::set_force_resync(value),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
