//! Optional upload of exported report files to S3.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

/// Object key for `file_name` under `prefix`; gzip adds a `.gz` suffix.
pub fn s3_key(prefix: &str, file_name: &str, gzip: bool) -> String {
    let prefix = prefix.trim_matches('/');
    let suffix = if gzip { ".gz" } else { "" };
    if prefix.is_empty() {
        format!("{file_name}{suffix}")
    } else {
        format!("{prefix}/{file_name}{suffix}")
    }
}

pub fn gzip_bytes(contents: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    Ok(encoder.finish()?)
}

fn content_type(path: &Path, gzip: bool) -> &'static str {
    if gzip {
        return "application/gzip";
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Uploads each report file to `s3://bucket/prefix/<file name>`.
///
/// Returns the number of objects written.
#[tracing::instrument(skip(client, paths), fields(files = paths.len()))]
pub async fn upload_reports(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    paths: &[PathBuf],
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;

    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("report path {} has no file name", path.display()))?;

        let contents = std::fs::read(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        let body = if gzip { gzip_bytes(&contents)? } else { contents };
        let key = s3_key(prefix, file_name, gzip);

        client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .content_type(content_type(path, gzip))
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for s3://{bucket}/{key}"))?;

        info!(key = %key, "Report uploaded");
        upload_count += 1;
    }

    info!(upload_count, "S3 upload complete");
    Ok(upload_count)
}
