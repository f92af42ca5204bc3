mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tfbuilder_core::model::{Provider, ServiceType};

#[derive(Parser)]
#[command(name = "tfbuilder")]
#[command(about = "Compose cloud services and render them as Terraform", long_about = None)]
struct Cli {
    /// Project document (defaults to discovery from the current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new project document
    Init {
        #[arg(long, default_value = "aws")]
        provider: Provider,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        template: Option<String>,
        /// Overwrite an existing document
        #[arg(short, long)]
        yes: bool,
    },
    /// List catalog services by category
    Services {
        #[arg(long)]
        provider: Option<Provider>,
    },
    /// List project templates
    Templates {
        #[arg(long)]
        provider: Option<Provider>,
    },
    /// Enable a service and its dependencies
    Enable { service: ServiceType },
    /// Disable a service and everything that depends on it
    Disable { service: ServiceType },
    /// Change a project field
    Set {
        field: commands::ProjectField,
        value: String,
    },
    /// Merge a YAML patch into a service's configuration
    Configure {
        service: ServiceType,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Replace the service selection with a template
    Template { id: String },
    /// Switch cloud provider (clears all services)
    Provider { provider: Provider },
    /// Render the Terraform project
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "terraform")]
        out: PathBuf,
        /// Only print the file paths
        #[arg(long, conflicts_with = "json")]
        list: bool,
        /// Print the generated tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one generated file
    Show { path: String },
    /// Validate the catalogs and the project document
    Check,
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let project = cli.project.as_deref();
    match cli.command {
        Commands::Init {
            provider,
            name,
            template,
            yes,
        } => commands::run_init(project, provider, name, template, yes),
        Commands::Services { provider } => commands::run_services(project, provider),
        Commands::Templates { provider } => commands::run_templates(project, provider),
        Commands::Enable { service } => commands::run_toggle(project, service, true),
        Commands::Disable { service } => commands::run_toggle(project, service, false),
        Commands::Set { field, value } => commands::run_set(project, field, value),
        Commands::Configure { service, file } => commands::run_configure(project, service, &file),
        Commands::Template { id } => commands::run_template(project, &id),
        Commands::Provider { provider } => commands::run_provider(project, provider),
        Commands::Generate { out, list, json } => {
            commands::run_generate(project, &out, list, json)
        }
        Commands::Show { path } => commands::run_show(project, &path),
        Commands::Check => commands::run_check(project),
    }
}
