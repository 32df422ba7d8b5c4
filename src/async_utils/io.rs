//! I/O utilities.
//!
//! Everything we print either goes to standard output or to a file named
//! with `--out`.

use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt as _},
};

use crate::prelude::*;

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `data` verbatim to either standard output or a file.
pub async fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    let mut writer = create_writer(path).await?;
    writer
        .write_all(data)
        .await
        .context("Failed to write output")?;
    writer.flush().await.context("Failed to flush output")?;
    Ok(())
}

/// Write a value as pretty-printed JSON to either standard output or a file.
pub async fn write_output_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut json =
        serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    json.push('\n');
    write_output(path, json.as_bytes()).await
}
