//! Information handlers (health, stats, chain)

use tracing::info;

use crate::cli::output::print_category_report;
use crate::cli::output::print_chain;
use crate::cli::output::print_health;
use crate::models::HardwareProfile;
use crate::rag::RagService;
use crate::Result;

/// Probe both services; an unhealthy report is printed, not returned as an error
pub async fn handle_check(service: &RagService, profile: HardwareProfile) -> Result<()> {
    info!("Checking service health for {} profile", profile);
    let health = service.health(profile).await;
    print_health(&health);
    Ok(())
}

pub async fn handle_stats(service: &RagService) -> Result<()> {
    let report = service.category_counts().await?;
    print_category_report(&report);
    Ok(())
}

pub fn handle_chain(service: &RagService, profile: HardwareProfile) {
    let chain = service.candidate_chain(profile);
    print_chain(&chain, &service.unavailable_candidates());
}
