pub mod auth;
pub mod domain;
pub mod normalize;
pub mod ports;
pub mod session;

pub use auth::Authenticator;
pub use domain::{
    AnalysisForm, AnalysisRequest, AnalysisRequestBuilder, BearerToken, Credential, Identity,
    Language, RefreshToken, SubjectKind, ValidationError,
};
pub use normalize::{normalize, Verdict, PLACEHOLDER_COMMENT};
pub use ports::{AnalysisService, AuthProvider, CredentialStore, PortError, PortResult};
pub use session::{SessionController, SessionSettings, SessionSnapshot, SessionState, SubmitOutcome};
