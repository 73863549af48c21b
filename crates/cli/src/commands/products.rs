//! Product and product image commands.

use stockcount_client::{AppContext, ClientError, ImageFile, ImageSource};
use stockcount_core::{CreateProductInput, Product, UpdateProductInput};

use crate::error::CliError;
use crate::output::Output;
use crate::{ImageAction, ImageArgs, ProductAction};

fn line(product: &Product) -> String {
    let mut line = format!("#{:<5} {:<30} {:>10}", product.id, product.name, product.price);
    if !product.category_names.is_empty() {
        line.push_str(&format!("  [{}]", product.category_names.join(", ")));
    }
    line
}

fn details(product: &Product) -> Vec<String> {
    let mut lines = vec![line(product)];
    for image in &product.images {
        let id = image.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        lines.push(format!("  image {id}: {}", image.url));
    }
    lines
}

async fn image_source(args: ImageArgs) -> Result<Option<ImageSource>, CliError> {
    if let Some(url) = args.image_url {
        return Ok(Some(ImageSource::Url(url)));
    }
    match args.image_file {
        Some(path) => Ok(Some(ImageSource::File(read_image(path).await?))),
        None => Ok(None),
    }
}

async fn read_image(path: std::path::PathBuf) -> Result<ImageFile, CliError> {
    ImageFile::from_path(&path)
        .await
        .map_err(|source| CliError::ReadFile {
            path: path.display().to_string(),
            source,
        })
}

/// Mention a failed image step without failing the command.
async fn report_image_error(ctx: &AppContext, out: &Output, requested: bool) {
    if !requested {
        return;
    }
    if let Some(error) = ctx.products().state().await.image_error {
        out.error(&format!("Product saved, but the image was not attached: {error}"));
    }
}

pub async fn run(ctx: &AppContext, out: &Output, action: ProductAction) -> Result<(), CliError> {
    let store = ctx.products();
    match action {
        ProductAction::List(page) => {
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
        ProductAction::Show { id } => {
            let Some(token) = ctx.auth().token().await else {
                return Err(ClientError::Unauthenticated.into());
            };
            let product = ctx
                .api()
                .get_product(&token, id)
                .await
                .map_err(ClientError::from)?;
            out.show(&product, || details(&product));
        }
        ProductAction::Create {
            name,
            price,
            categories,
            image,
        } => {
            let image = image_source(image).await?;
            let with_image = image.is_some();
            let created = store
                .create(
                    CreateProductInput {
                        name,
                        price,
                        category_ids: categories,
                    },
                    image,
                )
                .await?;
            out.show(&created, || details(&created));
            report_image_error(ctx, out, with_image).await;
        }
        ProductAction::Update {
            id,
            name,
            price,
            categories,
            image,
        } => {
            let image = image_source(image).await?;
            let patch = UpdateProductInput {
                name,
                price,
                category_ids: categories,
            };
            let with_image = image.is_some();
            if patch == UpdateProductInput::default() && !with_image {
                return Err(CliError::EmptyUpdate);
            }
            match store.update(id, patch, image).await? {
                Some(updated) => out.show(&updated, || details(&updated)),
                None => out.done(&format!("Updated product #{id}")),
            }
            report_image_error(ctx, out, with_image).await;
        }
        ProductAction::Delete { id } => {
            store.delete(id).await?;
            out.done(&format!("Deleted product #{id}"));
        }
        ProductAction::History { id } => {
            let history = store.history(id).await?;
            out.show(&history, || {
                let mut lines = vec![line(&history.product)];
                if history.history.is_empty() {
                    lines.push("  never counted".to_string());
                }
                for entry in &history.history {
                    lines.push(format!(
                        "  {:<20} {} ({})",
                        entry.period.name,
                        entry.quantity,
                        entry.period.effective_status()
                    ));
                }
                lines
            });
        }
        ProductAction::Images { action } => images(ctx, out, action).await?,
    }
    Ok(())
}

async fn images(ctx: &AppContext, out: &Output, action: ImageAction) -> Result<(), CliError> {
    let store = ctx.products();
    let (id, product) = match action {
        ImageAction::Add { id, url } => (id, store.add_image_url(id, &url).await?),
        ImageAction::Upload { id, file } => {
            let file = read_image(file).await?;
            (id, store.upload_image(id, file).await?)
        }
        ImageAction::Delete { id, image } => (id, store.delete_image(id, image).await?),
        ImageAction::Reorder { id, order } => (id, store.reorder_images(id, order).await?),
    };
    match product {
        Some(product) => out.show(&product, || details(&product)),
        None => out.done(&format!("Images of product #{id} updated")),
    }
    Ok(())
}
