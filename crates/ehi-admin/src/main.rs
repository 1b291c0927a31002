#![forbid(unsafe_code)]

//! # ehi
//!
//! Text shell for the Ehi Centre admin dashboard.
//!
//! ## Usage
//!
//! ```bash
//! ehi                       # interactive shell
//! ehi run script.ehi        # replay shell commands
//! ehi routes                # list routes and modules
//! ehi check                 # render every route, fail on errors
//! ehi export-assets web/    # write the built-in templates to disk
//! ```

use anyhow::bail;
use ehi_admin::app::describe_routes;
use ehi_admin::{App, Cli, Command, Config, assets, logging, pages, shell};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let config = Config::resolve(&cli)?;
    logging::init(config.verbosity, config.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command(), config))
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Routes => {
            println!("{}", describe_routes(&pages::route_table(&config.mount())));
        }
        Command::ExportAssets { dir } => {
            let written = assets::export(&config.mount(), &dir)?;
            println!("wrote {written} files to {}", dir.display());
        }
        Command::Check => {
            let app = App::new(&config)?;
            app.start().await;
            let failures = app.check().await;
            let total = app.router().routes().len();
            for failure in &failures {
                println!("FAIL {}: {}", failure.route, failure.problem);
            }
            if !failures.is_empty() {
                bail!("{} of {total} routes failed", failures.len());
            }
            println!("ok: {total} routes rendered");
        }
        Command::Run { script } => {
            let app = App::new(&config)?;
            app.start().await;
            shell::run_script(&app, &script).await?;
        }
        Command::Shell => {
            let app = App::new(&config)?;
            app.start().await;
            println!("{}", app.render_view());
            shell::interactive(&app).await?;
        }
    }
    Ok(())
}
