//! Counting period commands.

use stockcount_client::AppContext;
use stockcount_core::{CreatePeriodInput, InventoryPeriod, UpdatePeriodInput};

use crate::PeriodAction;
use crate::error::CliError;
use crate::output::Output;

fn line(period: &InventoryPeriod) -> String {
    let end = period
        .end_date
        .map_or_else(|| "open".to_string(), |date| date.to_string());
    format!(
        "#{:<5} {:<20} {} .. {}  {}",
        period.id,
        period.name,
        period.start_date,
        end,
        period.effective_status()
    )
}

pub async fn run(ctx: &AppContext, out: &Output, action: PeriodAction) -> Result<(), CliError> {
    let store = ctx.periods();
    match action {
        PeriodAction::List => {
            let items = store.fetch_all().await?;
            out.show(&items, || items.iter().map(line).collect());
        }
        PeriodAction::Active => match store.fetch_active().await? {
            Some(period) => out.show(&period, || vec![line(&period)]),
            None => return Err(CliError::NotFound("no active period".to_string())),
        },
        PeriodAction::Create {
            name,
            start_date,
            notes,
        } => {
            let created = store
                .create(CreatePeriodInput {
                    name,
                    start_date,
                    notes,
                })
                .await?;
            out.show(&created, || vec![format!("Opened {}", line(&created))]);
        }
        PeriodAction::Update {
            id,
            name,
            end_date,
            notes,
        } => {
            let patch = UpdatePeriodInput {
                name,
                end_date,
                notes,
            };
            if patch == UpdatePeriodInput::default() {
                return Err(CliError::EmptyUpdate);
            }
            match store.update(id, patch).await? {
                Some(updated) => out.show(&updated, || vec![format!("Updated {}", line(&updated))]),
                None => out.done(&format!("Updated period #{id}")),
            }
        }
        PeriodAction::Close { id } => match store.close(id).await? {
            Some(closed) => out.show(&closed, || vec![format!("Closed {}", line(&closed))]),
            None => out.done(&format!("Closed period #{id}")),
        },
        PeriodAction::Delete { id } => {
            store.delete(id).await?;
            out.done(&format!("Deleted period #{id}"));
        }
    }
    Ok(())
}
