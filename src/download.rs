use crate::error::{MediaError, Result};
use crate::http::REQUEST_TIMEOUT;
use futures_util::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// Downloads a generated artifact to `dest`, returning the number of bytes written.
///
/// The request carries no credentials: artifact URLs are pre-signed. The body is
/// streamed into `<dest>.part` and renamed onto `dest` once complete, so a
/// failed download never leaves a truncated file under the final name. A
/// non-200 response fails before anything is created on disk.
///
/// # Errors
///
/// - [`MediaError::HttpStatus`] if the server does not answer 200.
/// - [`MediaError::RequestFailed`] on transport errors before the body starts.
/// - [`MediaError::IoError`] if the file cannot be created or written, or the
///   body stream breaks midway.
pub async fn download_artifact<P: AsRef<Path>>(url: &str, dest: P) -> Result<u64> {
    let dest = dest.as_ref();
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT * 5).build()?;

    debug!(url, "downloading artifact");
    let response = client.get(url).send().await?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(MediaError::from_response(response).await);
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let part = part_path(dest);
    let stream = response.bytes_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(Box::pin(stream));

    let written = async {
        let mut file = fs::File::create(&part).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok::<u64, std::io::Error>(written)
    }
    .await;

    match written {
        Ok(written) => {
            fs::rename(&part, dest).await?;
            info!(path = %dest.display(), bytes = written, "artifact saved");
            Ok(written)
        }
        Err(err) => {
            let _ = fs::remove_file(&part).await;
            Err(err.into())
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    dest.with_file_name(name)
}
