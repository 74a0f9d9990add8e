//! Tracing setup
//!
//! Logs go to stderr, or to `log_file` when one is configured. `RUST_LOG`
//! overrides the level chosen from `--verbose` / `verbose`.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use bandroom_core::Config;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber (ignored if one is already installed)
pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(log_path) = config.log_file.as_ref() else {
        let _ = builder.with_writer(io::stderr).try_init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(io::stderr).try_init();
        }
    }
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "warn" };
    format!("bandroom_core={},bandroom_cli={}", level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives(false),
            "bandroom_core=warn,bandroom_cli=warn"
        );
        assert_eq!(
            default_directives(true),
            "bandroom_core=debug,bandroom_cli=debug"
        );
    }
}
