use boxoffice_engine::{EngineConfig, TicketService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::load().expect("Failed to load config");
    tracing::info!(
        rows = config.venue.rows,
        seats_per_row = config.venue.seats_per_row,
        allocator = ?config.holds.allocator,
        "Starting boxoffice engine"
    );

    let service = TicketService::from_config(&config).expect("Failed to build ticket service");
    tracing::info!(available = service.num_available(), "Stage ready");

    // Walk one group through the hold/reserve lifecycle
    let customer = "walkthrough@example.com";
    match service
        .find_and_hold(4, customer)
        .expect("demo group fits the stage")
    {
        Some(hold) => {
            tracing::info!(seats = hold.seats_summary(), "held a group of 4");
            tracing::debug!(
                snapshot = %serde_json::to_string(&hold).expect("hold serializes"),
                "hold snapshot"
            );
            match service.reserve(hold.id(), customer) {
                Some(code) => tracing::info!(%code, "reservation confirmed"),
                None => tracing::warn!("hold expired before it could be reserved"),
            }
        }
        None => tracing::warn!("stage is sold out"),
    }
    tracing::info!(available = service.num_available(), "Done");
}
