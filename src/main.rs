use clap::Parser;
use credvault::cli::{commands, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let settings = match credvault::cli::load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            credvault::cli::output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    let level = if cli.verbose {
        "debug"
    } else {
        settings.log_level.as_str()
    };
    credvault::logging::init(level);

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli, &settings),
        Commands::Add {
            ref service,
            ref fields,
            ref secrets,
            ttl,
        } => commands::add::execute(&cli, &settings, service, fields, secrets, ttl),
        Commands::Get {
            ref service,
            reveal,
        } => commands::get::execute(&cli, &settings, service, reveal),
        Commands::Fields { ref service } => commands::fields::execute(&cli, &settings, service),
        Commands::Update {
            ref service,
            ref fields,
            ref secrets,
            ttl,
            no_expiry,
        } => commands::update::execute(&cli, &settings, service, fields, secrets, ttl, no_expiry),
        Commands::List { all } => commands::list::execute(&cli, &settings, all),
        Commands::Delete { ref service, force } => {
            commands::delete::execute(&cli, &settings, service, force)
        }
        Commands::Purge => commands::purge::execute(&cli, &settings),
        Commands::Dump => commands::dump::execute(&cli, &settings),
    };

    if let Err(e) = result {
        credvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
