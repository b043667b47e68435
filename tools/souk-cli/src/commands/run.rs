//! Replay a script of wire envelopes against a seeded in-memory store.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use souk_checkout::{telemetry, Envelope, StaticBearers, Storefront, WireResponse};
use souk_commerce::GuestToken;
use souk_store::{MemoryStore, StoreSnapshot};

use super::RunArgs;
use crate::context::Context;

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    telemetry::init(&ctx.config.logging);

    let store = match &args.seed {
        Some(path) => {
            let path = ctx.resolve_path(path);
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed {}", path.display()))?;
            let snapshot = StoreSnapshot::from_json(&raw)
                .with_context(|| format!("Invalid seed {}", path.display()))?;
            ctx.output.debug(&format!(
                "Seeded {} products, {} discounts",
                snapshot.products.len(),
                snapshot.discounts.len()
            ));
            MemoryStore::from_snapshot(snapshot)
        }
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);

    let bearers = parse_bearers(&args.bearers)?;
    let shop = Storefront::new(Arc::clone(&store), &ctx.config).with_verifier(Arc::new(bearers));

    let script_path = ctx.resolve_path(&args.script);
    let envelopes = load_script(&script_path)?;
    ctx.output.header(&format!(
        "Replaying {} request(s) from {}",
        envelopes.len(),
        script_path.display()
    ));

    let total = envelopes.len();
    let mut responses: Vec<WireResponse> = Vec::with_capacity(total);
    let mut guest: Option<GuestToken> = None;
    let mut failed = 0;

    for (i, mut envelope) in envelopes.into_iter().enumerate() {
        if args.keep_guest && envelope.credentials.guest_token.is_none() {
            envelope.credentials.guest_token = guest.clone();
        }
        let op = envelope.request.op();
        let response = shop.handle(envelope).await;

        if let Some(token) = &response.guest_token {
            guest = Some(token.clone());
        }
        if response.ok {
            ctx.output.step(i + 1, total, &format!("{} ok", op));
        } else {
            failed += 1;
            let (kind, message) = response
                .error
                .as_ref()
                .map(|e| (e.kind.as_str(), e.message.as_str()))
                .unwrap_or(("unknown", ""));
            let line = format!("{} failed ({}): {}", op, kind, message);
            ctx.output.step(i + 1, total, &line);
        }
        if let Some(data) = &response.data {
            ctx.output.debug(&serde_json::to_string(data)?);
        }
        responses.push(response);
    }

    if ctx.output.is_json() {
        ctx.output.json(&responses);
    } else {
        ctx.output.info("");
        ctx.output.kv("succeeded", &(total - failed).to_string());
        ctx.output.kv("failed", &failed.to_string());
    }

    if let Some(path) = &args.dump {
        let path = ctx.resolve_path(path);
        let snapshot = store.snapshot().await;
        fs::write(&path, snapshot.to_json()?)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        ctx.output.success(&format!("Snapshot written: {}", path.display()));
    }

    Ok(())
}

fn parse_bearers(raw: &[String]) -> Result<StaticBearers> {
    let mut bearers = StaticBearers::new();
    for entry in raw {
        let Some((token, account)) = entry.split_once('=') else {
            bail!("Invalid bearer '{}': expected TOKEN=ACCOUNT", entry);
        };
        if token.trim().is_empty() || account.trim().is_empty() {
            bail!("Invalid bearer '{}': token and account must not be empty", entry);
        }
        bearers = bearers.with(token.trim(), account.trim());
    }
    Ok(bearers)
}

fn load_script(path: &Path) -> Result<Vec<Envelope>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "jsonl") {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid envelope on line {}", n + 1))
            })
            .collect()
    } else {
        serde_json::from_str(&raw).context("Script must be a JSON array of envelopes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearers() {
        assert!(parse_bearers(&["tok=5".to_string()]).is_ok());
        assert!(parse_bearers(&["tok".to_string()]).is_err());
        assert!(parse_bearers(&["=5".to_string()]).is_err());
    }
}
