//! Track command: run the session tracker in the foreground

use std::sync::Arc;

use anyhow::{Result, bail};

use portal_engagement::session::{FileCheckpointStore, SessionTracker};

use super::Portal;

/// Track portal time until Ctrl-C
pub async fn track_command(portal: &Portal) -> Result<()> {
    let checkpoints = FileCheckpointStore::new(&portal.config.storage.checkpoint_path);
    let tracker = SessionTracker::new(
        &portal.engine,
        Arc::new(checkpoints),
        portal.config.session.clone(),
    );

    let before = portal
        .engine
        .get_user_gamification_stats(&portal.user_id)
        .await
        .map(|s| s.total_portal_time)
        .unwrap_or(0);

    if !tracker.start().await {
        bail!("Session tracker did not start");
    }
    println!(
        "Tracking portal time for {} (Ctrl-C to stop)",
        portal.user_id
    );

    tokio::signal::ctrl_c().await?;
    tracker.stop().await;

    let after = portal
        .engine
        .get_user_gamification_stats(&portal.user_id)
        .await
        .map(|s| s.total_portal_time)
        .unwrap_or(before);
    println!("\nCredited {} minutes this session.", after.saturating_sub(before));

    Ok(())
}
