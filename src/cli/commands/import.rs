use anyhow::{Context, Result};
use engine::{FsStorage, ImportOverrides, OperationContext, StatementImporter, UploadedFile};
use sea_orm::Database;
use std::path::Path;
use tracing::{debug, info, trace};

pub async fn import_statement(
    database_url: &str,
    storage_root: &str,
    account_id: i32,
    file_path: &str,
    reference: Option<String>,
    user_id: i32,
) -> Result<()> {
    trace!("Entering import_statement function");
    info!("Importing {} for account {}", file_path, account_id);
    debug!("Database URL: {}", database_url);
    debug!("Storage root: {}", storage_root);

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    let path = Path::new(file_path);
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read statement file {}", file_path))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());

    let importer = StatementImporter::new(FsStorage::new(storage_root));
    let ctx = OperationContext::new(user_id, chrono::Utc::now().naive_utc());
    let overrides = ImportOverrides {
        reference,
        ..Default::default()
    };

    let statement = importer
        .handle(
            &db,
            account_id,
            UploadedFile::new(file_name, bytes),
            overrides,
            &ctx,
        )
        .await?;

    info!(
        "Imported statement {} (reference {:?}, opening {:?}, closing {:?})",
        statement.id, statement.reference, statement.opening_balance, statement.closing_balance
    );
    println!(
        "Imported statement {} from {} for account {}",
        statement.id, statement.original_filename, statement.account_id
    );
    Ok(())
}
