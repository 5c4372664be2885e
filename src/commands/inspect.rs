//! Read-only commands: `show`, `exists`, `probe`

use anyhow::{Result, bail};
use declarative::Lifecycle;
use serde_json::json;

use crate::Context;
use crate::ui;

/// Show the current state of one database
pub fn show(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let identity = config
        .find(name)
        .map_or(name, |(_, spec)| spec.name.as_str());
    let lifecycle = super::connect(ctx, &config.connection)?;

    let Some(db) = lifecycle.read(identity)? else {
        bail!("Database {identity} does not exist");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&db)?);
        return Ok(());
    }

    ui::header(&format!("Database {}", db.name));
    ui::kv("Owner", &db.owner);
    ui::kv("Encoding", &db.encoding);
    ui::kv("LC_COLLATE", &db.collation);
    ui::kv("LC_CTYPE", &db.ctype);
    ui::kv("Tablespace", &db.tablespace);
    ui::kv("Connection limit", &ui::connection_limit(db.connection_limit));
    ui::kv("Allow connections", &ui::or_unavailable(db.allow_connections));
    ui::kv("Is template", &ui::or_unavailable(db.is_template));

    if let Some((key, _)) = config.find(&db.name) {
        ui::kv("Configured as", &format!("databases.{key}"));
    }
    Ok(())
}

/// Succeed when the database exists
pub fn exists(ctx: &Context, name: &str) -> Result<()> {
    let config = super::load_config(ctx)?;
    let lifecycle = super::connect(ctx, &config.connection)?;
    if lifecycle.exists(name)? {
        if !ctx.quiet {
            ui::success(&format!("Database {name} exists"));
        }
        Ok(())
    } else {
        bail!("Database {name} does not exist")
    }
}

/// Show the server version and the optional features it supports
pub fn probe(ctx: &Context, as_json: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let lifecycle = super::connect(ctx, &config.connection)?;
    let caps = lifecycle.capabilities();

    if as_json {
        let features: serde_json::Map<String, serde_json::Value> = caps
            .features()
            .map(|(feature, supported)| (format!("{feature:?}"), json!(supported)))
            .collect();
        let out = json!({
            "version": caps.version(),
            "acting_role": lifecycle.acting_role(),
            "features": features,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    ui::header("Server");
    ui::kv("Version", &caps.version().to_string());
    ui::kv("Acting role", lifecycle.acting_role());

    ui::section("Features");
    for (feature, supported) in caps.features() {
        let mark = if supported { "✓" } else { "✗" };
        println!(
            "  {mark} {feature} (since {})",
            feature.minimum_version()
        );
    }
    Ok(())
}
