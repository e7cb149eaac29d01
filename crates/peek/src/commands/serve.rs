//! `peek serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use peek_config::{CliSettings, Config};
use peek_server::{ServerConfig, run_server};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// HTML file to preview.
    file: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover peek.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Debounce window for filesystem events in milliseconds (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Enable verbose output (show reload timing logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        // Resolve flags before moving into CliSettings
        let live_reload_enabled = self.resolve_live_reload_enabled();

        // Build CLI settings from args
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            debounce_ms: self.debounce_ms,
            live_reload_enabled,
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if let Some(file) = &self.file
            && !file.is_file()
        {
            return Err(CliError::Validation(format!(
                "not a file: {}",
                file.display()
            )));
        }

        // Print startup info
        output.highlight(&format!(
            "Preview on http://{}:{}",
            config.server.host, config.server.port
        ));

        match &self.file {
            Some(file) => output.info(&format!("Previewing: {}", file.display())),
            None => output.info("No file selected; POST a path to /api/file"),
        }

        if config.reload.enabled {
            output.info(&format!(
                "Live reload: enabled ({} ms debounce)",
                config.reload.debounce_ms
            ));
        } else {
            output.warning("Live reload: disabled");
        }

        // Build server config and run
        let server_config = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            file: self.file,
            debounce_ms: config.reload.debounce_ms,
            live_reload_enabled: config.reload.enabled,
            verbose: self.verbose,
            version: version.to_owned(),
        };
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> ServeArgs {
        ServeArgs {
            file: None,
            config: None,
            host: None,
            port: None,
            debounce_ms: None,
            verbose: false,
            live_reload: None,
            no_live_reload: false,
        }
    }

    #[test]
    fn test_resolve_live_reload_default() {
        assert_eq!(args().resolve_live_reload_enabled(), None);
    }

    #[test]
    fn test_resolve_live_reload_explicit() {
        let mut a = args();
        a.live_reload = Some(true);
        assert_eq!(a.resolve_live_reload_enabled(), Some(true));
    }

    #[test]
    fn test_resolve_no_live_reload_wins() {
        let mut a = args();
        a.no_live_reload = true;
        assert_eq!(a.resolve_live_reload_enabled(), Some(false));
    }
}
