use crate::GIT_COMMIT_HASH;
use axum::response::IntoResponse;

// axum handler for /
pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        GIT_COMMIT_HASH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn root_banner() -> anyhow::Result<()> {
        let response = root().await.into_response();
        let bytes = to_bytes(response.into_body(), 1024).await?;
        let banner = String::from_utf8(bytes.to_vec())?;
        assert!(banner.starts_with(env!("CARGO_PKG_NAME")));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
        Ok(())
    }
}
