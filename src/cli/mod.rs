pub mod args;
pub mod commands;
pub mod create;

pub use args::{
    ComposeArgs, ComposeOptions, CreateArgs, MigrateArgs, UpdateQgisPluginsArgs, UseArgs,
};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
DEPLOYMENT COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "gisquick-cli")]
#[command(version = crate::VERSION)]
#[command(about = "Generate and manage Gisquick docker compose deployments")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: create a deployment, regenerate its compose file with compose when options change, then run docker compose up."
)]
pub struct Args {
    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Create a new deployment directory",
        long_about = "Create writes the environment files, publish directory, service configuration and gisquick.toml into a new directory, then generates its compose file.",
        after_help = "Example:\n    gisquick-cli create mysite --server-url https://maps.example.com --profile public"
    )]
    Create(CreateArgs),
    #[command(
        about = "Generate a compose file from the template",
        long_about = "Compose applies the profile, database backend, development overrides and optional services to the compose template and writes the result into the deployment directory.",
        after_help = "Examples:\n    gisquick-cli compose --backend sqlite\n    gisquick-cli compose --dev app=../gisquick/go -o docker-compose.dev.yml"
    )]
    Compose(ComposeArgs),
    #[command(
        about = "Make a compose file the default one",
        long_about = "Use points docker-compose.yml at the given file with a symlink. A regular docker-compose.yml is never replaced.",
        after_help = "Example:\n    gisquick-cli use docker-compose.dev.yml"
    )]
    Use(UseArgs),
    #[command(
        about = "Run database migrations",
        long_about = "Migrate runs the migrate/migrate image on the deployment network with the credentials from postgres.env.",
        after_help = "Examples:\n    gisquick-cli migrate up\n    gisquick-cli migrate --print down 1"
    )]
    Migrate(MigrateArgs),
    #[command(
        about = "Replace the QGIS server plugins with the template's copy",
        after_help = "Example:\n    gisquick-cli update-qgis-plugins --dir mysite"
    )]
    UpdateQgisPlugins(UpdateQgisPluginsArgs),
}

pub fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Create(create_args) => create::run(create_args),
        Command::Compose(compose_args) => commands::compose(compose_args),
        Command::Use(use_args) => commands::use_compose_file(use_args),
        Command::Migrate(migrate_args) => commands::migrate(migrate_args),
        Command::UpdateQgisPlugins(update_args) => commands::update_qgis_plugins(update_args),
    }
}
