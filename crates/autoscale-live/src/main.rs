use autoscale_client::{AutoscaleApi, AutoscaleConfig};
use autoscale_live::{CreatedGroups, GroupApiLiveSuite};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("autoscale_live=info,autoscale_client=info,info")
        }))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AutoscaleConfig::from_env()?;
    info!(
        tenant_id = %config.tenant_id,
        zones = ?config.zones,
        backend = ?config.backend,
        "Starting autoscale group live suite"
    );

    let api = AutoscaleApi::from_config(&config)?;
    let mut suite = GroupApiLiveSuite::new(api, CreatedGroups::default());
    let report = suite.run();

    let failed = report.failures().count();
    if failed > 0 {
        if !suite.created().is_empty() {
            error!(
                remaining = suite.created().len(),
                "Autoscale groups were left behind and must be deleted manually"
            );
        }
        return Err(format!("{failed} of {} suite steps failed", report.outcomes.len()).into());
    }

    info!(steps = report.outcomes.len(), "Autoscale group live suite passed");
    Ok(())
}
