//! `content-proxy` binary: load the configuration, install logging, and serve.

// crates.io
use clap::Parser;
use color_eyre::Result;
// self
use content_proxy::{
	config::{Cli, ProxyConfig},
	obs,
	server::ProxyServer,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let cli = Cli::parse();

	obs::init_subscriber(&cli.log)?;

	let config = ProxyConfig::from_path(&cli.config)?;
	let server = ProxyServer::from_config(&config, &cli.root, cli.port)?;

	server.run_with_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Shutdown requested."),
		Err(e) => {
			tracing::error!(error = %e, "Failed to listen for Ctrl-C; serving until killed.");

			std::future::pending::<()>().await;
		},
	}
}
