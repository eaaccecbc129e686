pub mod cancel;
pub mod fetch;
pub mod git;
pub mod installer;
pub mod resolver;

// Re-export commonly used types
pub use cancel::Cancellation;
pub use fetch::{FetchError, FetchErrorKind, Fetcher};
pub use git::GitFetcher;
pub use installer::{run_install, Installer, ResolutionPolicy};
pub use resolver::{parse_dependency, resolve};
