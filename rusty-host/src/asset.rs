use std::path::Path;

use crate::error::AssetFetchError;

/// Fetches and returns the content of a binary file as a byte vector.
///
/// `src` is a filesystem path or a `file://` URL. Any other scheme is
/// rejected up front.
pub async fn load_binary(src: &str) -> Result<Vec<u8>, AssetFetchError> {
    let path = resolve_path(src)?;
    log::debug!("Fetching {}", path.display());
    tokio::fs::read(path).await.map_err(|source| AssetFetchError::Io {
        src: src.to_string(),
        kind: source.kind(),
        source,
    })
}

/// Same as [`load_binary`] but decodes the content as UTF-8 text.
pub async fn load_text(src: &str) -> Result<String, AssetFetchError> {
    let bytes = load_binary(src).await?;
    String::from_utf8(bytes).map_err(|e| AssetFetchError::Io {
        src: src.to_string(),
        kind: std::io::ErrorKind::InvalidData,
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

fn resolve_path(src: &str) -> Result<&Path, AssetFetchError> {
    if let Some(rest) = src.strip_prefix("file://") {
        return Ok(Path::new(rest));
    }
    match src.split_once("://") {
        Some((scheme, _)) if is_url_scheme(scheme) => {
            Err(AssetFetchError::UnsupportedScheme(src.to_string()))
        }
        _ => Ok(Path::new(src)),
    }
}

fn is_url_scheme(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
