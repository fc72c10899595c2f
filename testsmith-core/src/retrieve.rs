//! Repository content retrieval: blob listing and sequential blob fetching.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, error, info, warn};

use crate::contract::{Blob, Credential, FileContent, FileEntry, HostingClient, RepositoryCoordinate};
use crate::error::{HostingError, PipelineError};

/// Lists every regular file (blob entry) in the repository's default branch tree.
///
/// The default branch is resolved first and the tree is then listed recursively in
/// a single call. Directories and submodules are never returned.
pub async fn list_files<H>(
    client: &H,
    credential: &Credential,
    repo: &RepositoryCoordinate,
) -> Result<Vec<FileEntry>, PipelineError>
where
    H: HostingClient + ?Sized,
{
    let branch = match client.default_branch(credential, repo).await {
        Ok(Some(b)) if !b.is_empty() => b,
        Ok(_) => {
            error!(repo = %repo, "[FILES][ERROR] Repository reports no default branch");
            return Err(PipelineError::NotFound(format!("default branch of {repo}")));
        }
        Err(e) => {
            error!(repo = %repo, error = %e, "[FILES][ERROR] Failed to resolve repository");
            return Err(PipelineError::Upstream(e));
        }
    };
    info!(repo = %repo, branch = %branch, "[FILES] Listing tree of default branch");

    let tree = match client.get_tree(credential, repo, &branch).await {
        Ok(t) => t,
        Err(e) if e.is_not_found() => {
            error!(repo = %repo, branch = %branch, "[FILES][ERROR] Default branch tree not found");
            return Err(PipelineError::NotFound(format!("tree for {repo}@{branch}")));
        }
        Err(e) => {
            error!(repo = %repo, branch = %branch, error = %e, "[FILES][ERROR] Tree listing failed");
            return Err(PipelineError::Upstream(e));
        }
    };
    if tree.truncated {
        warn!(repo = %repo, entries = tree.entries.len(), "[FILES] Tree listing was truncated by the platform");
    }

    let total = tree.entries.len();
    let files: Vec<FileEntry> = tree.entries.into_iter().filter(FileEntry::is_blob).collect();
    info!(repo = %repo, total, blobs = files.len(), "[FILES] Tree listed");
    Ok(files)
}

/// Fetches and decodes the given blobs one at a time, in input order.
///
/// The first blob that cannot be fetched or decoded aborts the batch; blobs after it
/// are not requested and nothing is returned for the ones before it.
pub async fn fetch_contents<H>(
    client: &H,
    credential: &Credential,
    repo: &RepositoryCoordinate,
    blob_ids: &[String],
) -> Result<Vec<FileContent>, PipelineError>
where
    H: HostingClient + ?Sized,
{
    let mut contents = Vec::with_capacity(blob_ids.len());
    for blob_id in blob_ids {
        let blob = client
            .get_blob(credential, repo, blob_id)
            .await
            .and_then(|b| decode_blob(&b).map(|text| (b.url, text)));
        match blob {
            Ok((source_url, text)) => {
                debug!(repo = %repo, blob_id = %blob_id, bytes = text.len(), "[FETCH] Blob fetched");
                contents.push(FileContent {
                    blob_id: blob_id.clone(),
                    source_url,
                    text,
                });
            }
            Err(e) => {
                error!(repo = %repo, blob_id = %blob_id, fetched = contents.len(), error = %e, "[FETCH][ERROR] Blob fetch failed, aborting batch");
                return Err(PipelineError::PartialFetch {
                    blob_id: blob_id.clone(),
                    source: e,
                });
            }
        }
    }
    info!(repo = %repo, count = contents.len(), "[FETCH] All blobs fetched");
    Ok(contents)
}

/// Decodes a blob from its transport encoding into text.
///
/// Base64 payloads may contain line breaks. Bytes that are not valid UTF-8 are
/// replaced rather than rejected.
pub fn decode_blob(blob: &Blob) -> Result<String, HostingError> {
    match blob.encoding.as_str() {
        "base64" => {
            let compact: String = blob.content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| HostingError::Decode(format!("blob {}: {e}", blob.sha)))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "utf-8" | "utf8" => Ok(blob.content.clone()),
        other => Err(HostingError::Decode(format!(
            "blob {}: unsupported encoding {other}",
            blob.sha
        ))),
    }
}
