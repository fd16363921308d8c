//! Read-only commands: stats, badges, history

use anyhow::{Result, bail};

use portal_engagement::gamification::{BADGES, Badge};

use super::Portal;

/// Print the user's aggregate
pub async fn stats_command(portal: &Portal) -> Result<()> {
    let Some(stats) = portal
        .engine
        .get_user_gamification_stats(&portal.user_id)
        .await
    else {
        bail!("Failed to load stats for {}", portal.user_id);
    };

    println!("Stats for {}:\n", stats.user_id);
    println!("  Points:          {}", stats.total_points);
    println!(
        "  Portal time:     {}h {:02}m",
        stats.total_portal_time / 60,
        stats.total_portal_time % 60
    );
    println!(
        "  Meetings:        {} (early {}, on time {}, late {})",
        stats.meetings_total, stats.meetings_early, stats.meetings_on_time, stats.meetings_late
    );
    println!(
        "  Projects:        {} created, {} updates",
        stats.projects_created, stats.projects_updated
    );
    println!("  Evaluations:     {}", stats.evaluations_submitted);
    println!(
        "  Papers:          {} read, {} submitted",
        stats.papers_read, stats.papers_submitted
    );
    println!("  Database writes: {}", stats.database_writes);
    match stats.last_login_date {
        Some(date) => println!(
            "  Login streak:    {} days (last {})",
            stats.consecutive_days, date
        ),
        None => println!("  Login streak:    -"),
    }
    println!("  Badges:          {}/{}", stats.badges.len(), Badge::total_count());

    Ok(())
}

/// Print earned badges, then the locked ones
pub async fn badges_command(portal: &Portal, all: bool) -> Result<()> {
    let earned = portal.engine.get_user_badges(&portal.user_id).await;

    println!("Badges ({}/{}):\n", earned.len(), Badge::total_count());
    for entry in &earned {
        let when = entry
            .earned_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {} {} [{}] - {} ({})",
            entry.badge.icon,
            entry.badge.name,
            entry.badge.category.label(),
            entry.badge.description,
            when
        );
    }

    if all {
        println!("\nLocked:\n");
        for badge in BADGES
            .iter()
            .filter(|b| !earned.iter().any(|e| e.badge.id == b.id))
        {
            println!("  {} {} - {}", badge.icon, badge.name, badge.description);
        }
    }

    Ok(())
}

/// Print the most recent point transactions
pub async fn history_command(portal: &Portal, limit: usize) -> Result<()> {
    let transactions = portal
        .engine
        .recent_transactions(&portal.user_id, limit)
        .await;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!("Recent transactions ({}):\n", transactions.len());
    for tx in transactions {
        println!(
            "  {} +{:<4} {}",
            tx.created_at.format("%Y-%m-%d %H:%M"),
            tx.points,
            tx.reason
        );
    }

    Ok(())
}
