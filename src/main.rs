// src/main.rs

use watchrun::cli::{self, CliCommand};
use watchrun::{config, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("watchrun error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();

    match args.command {
        Some(CliCommand::Version) => {
            println!("watchrun {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Init) => init_config(),
        None => Ok(run(args).await?),
    }
}

fn init_config() -> anyhow::Result<()> {
    let path = config::default_config_path();
    if config::exists(&path) {
        anyhow::bail!("{} already exists", path.display());
    }
    config::write_default(&path)?;
    println!("Created {}", path.display());
    Ok(())
}
