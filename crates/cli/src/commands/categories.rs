//! Category commands.

use stockcount_client::AppContext;
use stockcount_core::{Category, CreateCategoryInput, UpdateCategoryInput};

use crate::CategoryAction;
use crate::error::CliError;
use crate::output::Output;

fn line(category: &Category) -> String {
    match &category.description {
        Some(description) => format!("#{:<5} {}  ({description})", category.id, category.name),
        None => format!("#{:<5} {}", category.id, category.name),
    }
}

pub async fn run(ctx: &AppContext, out: &Output, action: CategoryAction) -> Result<(), CliError> {
    let store = ctx.categories();
    match action {
        CategoryAction::List(page) => {
            let limit = page.limit.unwrap_or_else(|| ctx.page_size());
            let items = store.fetch_all(page.page, limit).await?;
            let pagination = store.state().await.pagination;
            out.show(&items, || {
                let mut lines: Vec<String> = items.iter().map(line).collect();
                lines.push(format!(
                    "Page {} of {} ({} total)",
                    pagination.page, pagination.total_pages, pagination.total
                ));
                lines
            });
        }
        CategoryAction::Create { name, description } => {
            let created = store
                .create(CreateCategoryInput { name, description })
                .await?;
            out.show(&created, || vec![format!("Created {}", line(&created))]);
        }
        CategoryAction::Update {
            id,
            name,
            description,
            clear_description,
        } => {
            let patch = UpdateCategoryInput {
                name,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
            };
            if patch == UpdateCategoryInput::default() {
                return Err(CliError::EmptyUpdate);
            }
            match store.update(id, patch).await? {
                Some(updated) => out.show(&updated, || vec![format!("Updated {}", line(&updated))]),
                None => out.done(&format!("Updated category #{id}")),
            }
        }
        CategoryAction::Delete { id } => {
            store.delete(id).await?;
            out.done(&format!("Deleted category #{id}"));
        }
    }
    Ok(())
}
