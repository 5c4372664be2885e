//! Diff display - pgconverge-specific UI

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};

/// One-character marker for the kind of change
fn symbol(diff: &ResourceDiff) -> colored::ColoredString {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { .. }) => "+".green(),
        (ResourceState::Present { .. }, ResourceState::Absent) => "-".red(),
        (ResourceState::Modified { .. }, _) => "~".yellow(),
        _ => "?".dimmed(),
    }
}

fn state_desc(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(absent){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Modified { from, to }, _) if from != to => format!("{from} → {to}"),
        (ResourceState::Modified { from, .. }, _) => from.clone(),
        (ResourceState::Present { details }, ResourceState::Absent) => format!(
            "{} (will drop)",
            details.as_deref().unwrap_or_default()
        ),
        (ResourceState::Unknown, _) => "(could not plan)".to_string(),
        _ => String::new(),
    }
}

/// Format one attribute change, e.g. `connection_limit: -1 → 50`
pub fn format_change(change: &declarative::AttributeChange) -> String {
    match &change.from {
        Some(from) => format!("{}: {} → {}", change.attribute, from, change.to),
        None => format!("{}: {}", change.attribute, change.to),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diffs(diffs: &[ResourceDiff], verbose: bool) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Database Plan".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        let type_name = match resource_type.as_str() {
            "database" => "Databases",
            other => other,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            println!(
                "│   {} {:<24} {}",
                symbol(diff),
                diff.resource_id,
                state_desc(diff).dimmed()
            );
            let creating = diff.is_addition();
            for change in &diff.changes {
                // A create lists every attribute; only show them when asked.
                if creating && !verbose && change.attribute != "name" {
                    continue;
                }
                println!("│       {}", format_change(change));
            }
            for statement in &diff.statements {
                println!("│       {}", statement.dimmed());
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to change, {} to drop{}",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red(),
        if summary.unknown > 0 {
            format!(", {} failed to plan", summary.unknown.to_string().red())
        } else {
            String::new()
        }
    );
    println!("└─────────────────────────────────────────────────────┘");
}
