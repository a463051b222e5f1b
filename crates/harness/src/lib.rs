//! Verification harness for generated client implementations.
//!
//! Tests name an interface declared in `fixtures/` and either load a live
//! implementation of it bound to a [`MockDispatcher`], or check the
//! diagnostics its declaration produces:
//!
//! ```ignore
//! let (dispatcher, recorder) = MockDispatcher::recording();
//! let users = create_implementation("users::UsersApi", dispatcher);
//! users.invoke("get_user", vec![Value::Int(7)])?;
//! assert_eq!(recorder.take().expanded_path(), "/users/7");
//!
//! verify_diagnostics("invalid::missing_verb::NoVerbApi", &[ExpectedDiagnostic::new("SG0001")]);
//! ```

pub mod config;
pub mod contexts;
mod loader;
pub mod mock;
pub mod resources;
mod verify;

pub use config::{ConfigError, HarnessConfig};
pub use loader::{CreateError, ImplementationLoader, create_implementation, try_create_implementation};
pub use mock::{CallRecorder, MockDispatcher};
pub use verify::{DiagnosticVerifier, ExpectedDiagnostic, VerifyError, match_diagnostics, verify_diagnostics};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter for tests.
pub const LOG_ENV: &str = "STUBGEN_LOG";

/// Installs a test-writer `tracing` subscriber. Later calls are no-ops.
pub fn init_logging() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config::global().log_filter));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_test_writer()
		.try_init();
}
