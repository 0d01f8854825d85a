//! [`IRemoteFiles`] adapter over [`ApiClient`]
//!
//! Errors travel as `anyhow` errors wrapping [`ClientError`], which is what
//! [`IRemoteFiles::is_transient`] downcasts to classify them.

use filevault_core::domain::{newtypes::FileId, FileView};
use filevault_sync::IRemoteFiles;

use crate::client::ApiClient;
use crate::ClientError;

#[async_trait::async_trait]
impl IRemoteFiles for ApiClient {
    async fn list_files(&self) -> anyhow::Result<Vec<FileView>> {
        Ok(ApiClient::list_files(self).await?)
    }

    async fn upload_file(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Vec<u8>,
    ) -> anyhow::Result<FileView> {
        Ok(self.upload(file_name, content_type, content).await?)
    }

    async fn delete_file(&self, id: &FileId) -> anyhow::Result<()> {
        Ok(ApiClient::delete_file(self, id).await?)
    }

    fn is_transient(&self, err: &anyhow::Error) -> bool {
        err.downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_transient)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn api(status: StatusCode) -> anyhow::Error {
        ClientError::Api {
            status,
            code: "Http.Status".to_string(),
            message: "boom".to_string(),
        }
        .into()
    }

    #[test]
    fn test_is_transient_uses_status() {
        let client = ApiClient::with_base_url("token", "http://127.0.0.1:9");
        assert!(client.is_transient(&api(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(client.is_transient(&api(StatusCode::TOO_MANY_REQUESTS)));
        assert!(!client.is_transient(&api(StatusCode::UNAUTHORIZED)));
        assert!(!client.is_transient(&anyhow::anyhow!("HTTP 503 Service Unavailable")));
    }
}
