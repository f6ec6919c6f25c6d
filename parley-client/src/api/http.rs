use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

use parley_protocol::{MessageData, RoomData, RoomListing, RoomSnapshot};

use super::{Api, ApiError, NewMessage, NewRoom, Result};

/// The request header carrying the bound identity for echo suppression
pub const CONN_ID_HEADER: &str = "Conn-Id";

/// The reqwest-backed implementation of the chat API
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreatedRoom {
    room: RoomData,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

fn with_conn_id(request: RequestBuilder, conn_id: Option<&str>) -> RequestBuilder {
    match conn_id {
        Some(conn_id) => request.header(CONN_ID_HEADER, conn_id),
        None => request,
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn malformed(err: reqwest::Error) -> ApiError {
    ApiError::Malformed(err.to_string())
}

async fn successful(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Api for HttpApi {
    async fn list_rooms(&self) -> Result<Vec<RoomListing>> {
        let response = self
            .client
            .get(self.url("/rooms"))
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?.json().await.map_err(malformed)
    }

    async fn room_snapshot(&self, room_id: &str) -> Result<RoomSnapshot> {
        let response = self
            .client
            .get(self.url(&format!("/rooms/{}", room_id)))
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?.json().await.map_err(malformed)
    }

    async fn create_room(&self, new_room: NewRoom, conn_id: Option<&str>) -> Result<RoomData> {
        let request = self.client.post(self.url("/rooms")).json(&new_room);
        let response = with_conn_id(request, conn_id)
            .send()
            .await
            .map_err(transport)?;

        let created: CreatedRoom = successful(response).await?.json().await.map_err(malformed)?;

        Ok(created.room)
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/rooms/{}", room_id)))
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?;
        Ok(())
    }

    async fn join_room(&self, room_id: &str, conn_id: Option<&str>) -> Result<()> {
        let request = self.client.post(self.url(&format!("/rooms/{}/join", room_id)));
        let response = with_conn_id(request, conn_id)
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?;
        Ok(())
    }

    async fn exit_room(&self, room_id: &str, conn_id: Option<&str>) -> Result<()> {
        let request = self.client.post(self.url(&format!("/rooms/{}/exit", room_id)));
        let response = with_conn_id(request, conn_id)
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        new_message: NewMessage,
        conn_id: Option<&str>,
    ) -> Result<MessageData> {
        let request = self.client.post(self.url("/conversations")).json(&new_message);
        let response = with_conn_id(request, conn_id)
            .send()
            .await
            .map_err(transport)?;

        successful(response).await?.json().await.map_err(malformed)
    }
}
