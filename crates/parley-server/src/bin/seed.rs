use std::path::PathBuf;

use parley_db::seed::{self, Profile};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,parley_db=info".into()),
        )
        .init();

    let profile = match std::env::args().nth(1).as_deref() {
        None | Some("small") => Profile::Small,
        Some("large") => Profile::Large,
        Some(other) => anyhow::bail!("unknown seed profile '{}' (expected 'small' or 'large')", other),
    };

    let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
    let db = parley_db::Database::open(&PathBuf::from(&db_path))?;

    seed::run(&db, profile)?;
    info!("Seed complete");

    Ok(())
}
