//! Logging setup
//!
//! Everything goes to stderr so stdout stays parseable with `--json`.

use semtag_core::{LogFormat, SemtagConfig};
use semtag_git::GitRepo;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "SEMTAG_LOG";

const DEFAULT_DIRECTIVE: &str = "semtag=warn";
const VERBOSE_DIRECTIVE: &str = "semtag=debug";

/// `--verbose` wins over `SEMTAG_LOG`, which wins over the default.
pub fn filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_DIRECTIVE);
    }
    env.and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log format configured for the repository at `dir`, text if there is no
/// readable configuration.
pub fn configured_format(dir: &Path) -> LogFormat {
    GitRepo::open(dir)
        .ok()
        .and_then(|git| SemtagConfig::load(git.root()).ok())
        .map(|config| config.log_format)
        .unwrap_or_default()
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: bool, format: LogFormat) {
    let env = std::env::var(LOG_ENV).ok();
    let registry = tracing_subscriber::registry().with(filter(verbose, env.as_deref()));
    let _ = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(filter(true, Some("semtag=trace")).to_string(), VERBOSE_DIRECTIVE);
        assert_eq!(filter(false, Some("semtag=trace")).to_string(), "semtag=trace");
        assert_eq!(filter(false, None).to_string(), DEFAULT_DIRECTIVE);
    }
}
