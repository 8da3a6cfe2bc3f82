use clap::Parser;

use jesus_configs::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("{}", std::env::args().collect::<Vec<_>>().join(" "));

    Cli::parse().run()
}
