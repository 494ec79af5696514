//! services/client/src/bin/trustme.rs

use clap::Parser;
use client_lib::{
    adapters::DeviceAuthorization,
    cli::{AnalyzeArgs, Cli, Commands},
    config::Config,
    error::ClientError,
    presenter,
    state::ClientState,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trustme_core::{AnalysisForm, SessionState, SubmitOutcome};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env(cli.backend_url.clone())?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Wire the Adapters ---
    let state = ClientState::build(config, Some(Box::new(show_device_code)))?;

    // --- 3. Run the Command ---
    match cli.command {
        Commands::Analyze(args) => analyze(&state, args).await,
        Commands::Login => login(&state).await,
        Commands::Logout => {
            match &state.authenticator {
                Some(auth) => auth.logout().await?,
                None => state.credentials.clear().await?,
            }
            println!("Logged out.");
            Ok(())
        }
        Commands::Health => {
            let health = state.backend.health().await?;
            println!(
                "{} is {} (version {})",
                state.backend.base_url(),
                health.status,
                health.version.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
    }
}

async fn analyze(state: &ClientState, args: AnalyzeArgs) -> Result<(), ClientError> {
    let form = match &args.query {
        Some(path) => serde_json::from_str::<AnalysisForm>(&tokio::fs::read_to_string(path).await?)?,
        None => args.to_form(),
    };
    let request = form.into_request(state.config.default_language)?;

    // Progress goes to stderr so the verdict on stdout stays clean.
    let mut updates = state.session.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.state.is_terminal() {
                break;
            }
            if snapshot.state.is_loading() {
                eprintln!("{}", presenter::render(&snapshot));
            }
        }
    });

    let outcome = state.session.submit(request).await;
    progress.abort();

    match outcome {
        SubmitOutcome::Completed(SessionState::Failed(message)) => {
            println!("{}", presenter::render(&state.session.snapshot()));
            Err(ClientError::AnalysisFailed(message))
        }
        SubmitOutcome::Completed(_) => {
            println!("{}", presenter::render(&state.session.snapshot()));
            Ok(())
        }
        SubmitOutcome::Superseded => Err(ClientError::Internal(
            "the submission was superseded".to_string(),
        )),
    }
}

async fn login(state: &ClientState) -> Result<(), ClientError> {
    let auth = state.authenticator.as_ref().ok_or_else(|| {
        ClientError::Internal("no login provider configured (set TRUSTME_AUTH_PROVIDER)".to_string())
    })?;
    let identity = auth.login().await?;
    println!(
        "Logged in as {}.",
        identity.display_name.as_deref().unwrap_or("unknown user")
    );
    Ok(())
}

fn show_device_code(device: &DeviceAuthorization) {
    match &device.verification_uri_complete {
        Some(uri) => eprintln!("Open {} to finish logging in (code {}).", uri, device.user_code),
        None => eprintln!(
            "Open {} and enter the code {} to finish logging in.",
            device.verification_uri, device.user_code
        ),
    }
}
