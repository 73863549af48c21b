//! Full refresh: restore the session, then run the bootstrap fetches.

use serde_json::json;
use stockcount_client::{AppContext, ClientError};

use crate::error::CliError;
use crate::output::Output;

pub async fn run(ctx: &AppContext, out: &Output) -> Result<(), CliError> {
    let report = ctx.init().await?;
    if !report.authenticated {
        return Err(ClientError::Unauthenticated.into());
    }

    let failures: Vec<_> = report
        .failures()
        .into_iter()
        .map(|(fetch, error)| json!({ "fetch": fetch, "error": error }))
        .collect();
    let summary = json!({
        "complete": report.is_complete(),
        "categories": ctx.categories().items().await.len(),
        "products": ctx.products().items().await.len(),
        "active_period": ctx.periods().active().await.map(|p| p.name),
        "failures": failures,
    });

    out.show(&summary, || {
        let mut lines = vec![format!(
            "Synced: {} categories, {} products",
            summary["categories"], summary["products"]
        )];
        for (fetch, error) in report.failures() {
            lines.push(format!("  {fetch} failed: {error}"));
        }
        lines
    });
    Ok(())
}
