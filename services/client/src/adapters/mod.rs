pub mod credentials;
pub mod http;
pub mod mock_auth;
pub mod oidc_auth;

pub use credentials::{FileCredentialStore, MemoryCredentialStore};
pub use http::{HealthStatus, HttpAnalysisAdapter};
pub use mock_auth::MockAuthAdapter;
pub use oidc_auth::{DeviceAuthorization, OidcAuthAdapter};
