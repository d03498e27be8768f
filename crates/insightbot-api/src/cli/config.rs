//! Resolved-settings report.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use insightbot_infra::llm::{create_provider, test_provider_connection};
use insightbot_types::config::{BotSettings, ServiceConfig};

/// Print every setting (secrets masked), the missing ones, and optionally
/// the result of a live LLM round trip.
pub async fn show_config(
    config: &ServiceConfig,
    settings: &BotSettings,
    check_llm: bool,
    json: bool,
) -> Result<()> {
    let llm_check = if check_llm {
        Some(check_llm_connection(config, settings).await)
    } else {
        None
    };
    let missing = settings.missing();

    if json {
        let entries: serde_json::Map<String, serde_json::Value> = settings
            .display_entries()
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
            .collect();
        let body = serde_json::json!({
            "key_vault_url": config.secrets.key_vault_url,
            "settings": entries,
            "missing": missing,
            "llm_check": llm_check.as_ref().map(|r| match r {
                Ok(()) => serde_json::json!({"ok": true}),
                Err(e) => serde_json::json!({"ok": false, "error": e}),
            }),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("SETTING").fg(Color::White),
        Cell::new("VALUE").fg(Color::White),
    ]);
    for (name, value) in settings.display_entries() {
        let value_cell = if value.is_empty() {
            Cell::new("(not set)").fg(Color::DarkGrey)
        } else {
            Cell::new(value)
        };
        table.add_row(vec![Cell::new(name), value_cell]);
    }

    println!();
    match config.secrets.key_vault_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => println!("  {} {}", style("Key Vault:").dim(), style(url).cyan()),
        None => println!("  {}", style("Key Vault: not configured (environment only)").dim()),
    }
    println!();
    println!("{table}");

    println!();
    if missing.is_empty() {
        println!("  {} All settings resolved", style("✓").green().bold());
    } else {
        println!(
            "  {} {} setting(s) missing:",
            style("!").yellow().bold(),
            missing.len()
        );
        for name in &missing {
            println!("    {}", style(name).yellow());
        }
    }

    if let Some(result) = llm_check {
        match result {
            Ok(()) => println!("  {} LLM connection OK", style("✓").green().bold()),
            Err(e) => println!("  {} LLM connection failed: {e}", style("✗").red().bold()),
        }
    }
    println!();
    Ok(())
}

async fn check_llm_connection(
    config: &ServiceConfig,
    settings: &BotSettings,
) -> Result<(), String> {
    let provider = create_provider(settings, &config.llm).map_err(|e| e.to_string())?;
    test_provider_connection(&provider)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_llm_check_reports_missing_endpoint() {
        let err = check_llm_connection(&ServiceConfig::default(), &BotSettings::default())
            .await
            .unwrap_err();
        assert!(err.contains("AZURE_OPENAI_ENDPOINT"));
    }
}
