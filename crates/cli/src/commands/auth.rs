//! Session commands.

use secrecy::SecretString;
use serde_json::json;
use stockcount_client::AppContext;

use crate::error::CliError;
use crate::output::Output;

/// Sign in and keep the session for later commands.
pub async fn login(
    ctx: &AppContext,
    out: &Output,
    email: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    let user = ctx.auth().login(email, password).await?;
    let shown = user.email.clone().unwrap_or_else(|| user.id.to_string());
    out.show(&user, || vec![format!("Signed in as {shown}")]);
    Ok(())
}

/// Register an account. Without an immediate session the address has to be
/// confirmed first.
pub async fn signup(
    ctx: &AppContext,
    out: &Output,
    email: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    let has_session = ctx.auth().signup(email, password).await?;
    if has_session {
        out.done(&format!("Account created, signed in as {email}"));
    } else {
        out.done(&format!(
            "Account created. Confirm {email} from your inbox, then run `stockcount login`"
        ));
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext, out: &Output) -> Result<(), CliError> {
    ctx.sign_out().await;
    out.done("Signed out");
    Ok(())
}

/// Session and cache summary, read from the snapshots only.
pub async fn status(ctx: &AppContext, out: &Output) -> Result<(), CliError> {
    let session = ctx.auth().session().await;
    let categories = ctx.categories().items().await.len();
    let products = ctx.products().items().await.len();
    let periods = ctx.periods().items().await.len();
    let active = ctx.periods().active().await;

    let summary = json!({
        "authenticated": session.is_some(),
        "user": session.as_ref().map(|s| &s.user),
        "expires_at": session.as_ref().and_then(|s| s.expires_at),
        "expired": session.as_ref().is_some_and(stockcount_client::Session::is_expired),
        "cached": {
            "categories": categories,
            "products": products,
            "periods": periods,
        },
        "active_period": active.as_ref().map(|p| &p.name),
    });

    out.show(&summary, || {
        let mut lines = Vec::new();
        match &session {
            Some(session) => {
                let who = session
                    .user
                    .email
                    .clone()
                    .unwrap_or_else(|| session.user.id.to_string());
                lines.push(format!("Signed in as {who}"));
                if session.is_expired() {
                    lines.push(
                        "Session expired; the next backend command refreshes it".into(),
                    );
                }
            }
            None => lines.push("Not signed in".into()),
        }
        lines.push(format!(
            "Cached: {categories} categories, {products} products, {periods} periods"
        ));
        if let Some(period) = &active {
            lines.push(format!("Active period: {} (#{})", period.name, period.id));
        }
        lines
    });
    Ok(())
}
