//! Inventory record commands.

use stockcount_client::AppContext;
use stockcount_core::{InventoryRecord, UpsertRecordInput};

use crate::RecordAction;
use crate::error::CliError;
use crate::output::Output;

fn line(record: &InventoryRecord) -> String {
    let product = record
        .product
        .as_ref()
        .map_or_else(|| format!("product #{}", record.product_id), |p| p.name.clone());
    match &record.notes {
        Some(notes) => format!("{product:<30} {:>6}  {notes}", record.quantity),
        None => format!("{product:<30} {:>6}", record.quantity),
    }
}

pub async fn run(ctx: &AppContext, out: &Output, action: RecordAction) -> Result<(), CliError> {
    let store = ctx.records();
    match action {
        RecordAction::List { period } => {
            let records = store.fetch_by_period(period).await?;
            out.show(&records, || records.iter().map(line).collect());
        }
        RecordAction::Current => {
            let current = store.fetch_current().await?;
            out.show(&current, || match &current.period {
                Some(period) => {
                    let mut lines = vec![format!("Period #{} {}", period.id, period.name)];
                    lines.extend(current.records.iter().map(line));
                    lines
                }
                None => vec!["No active period".to_string()],
            });
        }
        RecordAction::Set {
            period,
            product,
            quantity,
            notes,
        } => {
            let record = store
                .upsert(
                    period,
                    UpsertRecordInput {
                        product_id: product,
                        quantity,
                        notes,
                    },
                )
                .await?;
            out.show(&record, || vec![format!("Recorded {}", line(&record))]);
        }
        RecordAction::Delete { period, product } => {
            store.delete(period, product).await?;
            out.done(&format!("Deleted record of product #{product} in period #{period}"));
        }
    }
    Ok(())
}
