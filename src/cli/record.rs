//! Commands that record activity: award, login, meeting, activity

use anyhow::{Result, bail};
use chrono::Utc;
use serde_json::json;

use portal_engagement::gamification::Activity;

use super::Portal;

/// Award points for an explicit event
pub async fn award_command(portal: &Portal, points: u32, reason: &str) -> Result<()> {
    let receipt = portal
        .engine
        .ledger()
        .try_award(&portal.user_id, points, reason, json!({ "source": "cli" }))
        .await?;

    println!(
        "+{} points ({}), total {}",
        receipt.transaction.points, receipt.transaction.reason, receipt.total_points
    );
    for badge in receipt.new_badges {
        println!("  New badge: {} {}", badge.icon, badge.name);
    }
    Ok(())
}

/// Credit today's login bonus
pub async fn login_command(portal: &Portal) -> Result<()> {
    let credited = portal.engine.track_daily_login(&portal.user_id).await;
    let stats = portal
        .engine
        .get_user_gamification_stats(&portal.user_id)
        .await;

    if credited {
        println!("+{} points for today's login", portal.config.points.daily_login);
    } else {
        println!("Today's login was already credited.");
    }
    if let Some(stats) = stats {
        println!("Streak: {} days", stats.consecutive_days);
    }
    Ok(())
}

/// Record a meeting join against its scheduled start
pub async fn meeting_command(
    portal: &Portal,
    meeting_id: &str,
    scheduled: &str,
    joined: Option<&str>,
) -> Result<()> {
    let joined = joined
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let Some(classification) = portal
        .engine
        .track_meeting_join_raw(&portal.user_id, meeting_id, scheduled, &joined)
        .await
    else {
        bail!("Failed to record meeting join (see log)");
    };

    if classification.delta_minutes.is_none() {
        eprintln!("Warning: could not read meeting times, counted as on time");
    }
    println!(
        "Joined {} {}: +{} points",
        meeting_id,
        classification.punctuality.as_str().replace('_', " "),
        classification.points
    );
    Ok(())
}

/// Record a research activity
pub async fn activity_command(portal: &Portal, kind: &str, target_id: &str) -> Result<()> {
    let Some(activity) = Activity::from_str(kind) else {
        bail!(
            "Unknown activity: {}\nExpected one of: {}",
            kind,
            Activity::all()
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    if !portal
        .engine
        .track_activity(&portal.user_id, activity, json!({ "targetId": target_id }))
        .await
    {
        bail!("Failed to record {} (see log)", activity.as_str());
    }

    println!("Recorded {} for {}", activity.as_str(), target_id);
    Ok(())
}
