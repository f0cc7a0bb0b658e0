use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use bingo_core::ledger::CallRecord;
use bingo_core::player::{PlayerEntry, PlayerId, RoomId};
use bingo_core::room::RoomSnapshot;
use bingo_core::win::WinnerReport;
use bingo_session::authority::{RemoteError, RoomAuthority, TicketRows};

use crate::config::HttpAuthorityConfig;
use crate::wire::{
    DrawHistoryDto, GenerateTicketBody, PlayerDto, RoomBody, RoomDto, SubmitCallBody, WinnerDto,
    decode_ticket, players_from,
};

/// `RoomAuthority` over the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: reqwest::Client,
    root: String,
}

fn transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::Decode(e.to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

/// Map non-success statuses; 404 becomes `NotFound`.
fn check(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else if status == StatusCode::NOT_FOUND {
        Err(RemoteError::NotFound)
    } else {
        Err(RemoteError::Status(status.as_u16()))
    }
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
    check(resp)?.json().await.map_err(transport)
}

impl HttpAuthority {
    pub fn new(config: &HttpAuthorityConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            root: config.root().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    async fn get(&self, path: &str) -> Result<Response, RemoteError> {
        self.client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)
    }
}

impl RoomAuthority for HttpAuthority {
    async fn get_room(&self, room: RoomId) -> Result<RoomSnapshot, RemoteError> {
        let resp = self.get(&format!("/api/rooms/{room}")).await?;
        json::<RoomDto>(resp).await?.into_snapshot()
    }

    async fn get_draw_history(&self, room: RoomId) -> Result<Vec<CallRecord>, RemoteError> {
        let resp = self.get(&format!("/api/draw/{room}")).await?;
        Ok(json::<DrawHistoryDto>(resp).await?.into_records())
    }

    async fn submit_call(
        &self,
        room: RoomId,
        player: PlayerId,
        number: u8,
    ) -> Result<(), RemoteError> {
        let body = SubmitCallBody {
            room_id: room,
            player_id: player,
            number,
        };
        let resp = self
            .client
            .post(self.url("/api/draw"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        // The backend answers a duplicate draw with 400 or 409
        match resp.status() {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Err(RemoteError::Conflict),
            _ => check(resp).map(|_| ()),
        }
    }

    async fn set_turn(&self, room: RoomId, player: PlayerId) -> Result<(), RemoteError> {
        // Body is the bare player id as a JSON string
        let resp = self
            .client
            .put(self.url(&format!("/api/rooms/{room}/turn")))
            .json(&player.to_string())
            .send()
            .await
            .map_err(transport)?;
        check(resp).map(|_| ())
    }

    async fn list_players(&self, room: RoomId) -> Result<Vec<PlayerEntry>, RemoteError> {
        let resp = self.get(&format!("/api/players/room/{room}")).await?;
        Ok(players_from(json::<Vec<PlayerDto>>(resp).await?))
    }

    async fn check_winner(&self, room: RoomId) -> Result<WinnerReport, RemoteError> {
        let resp = self
            .client
            .post(self.url("/api/game/check-winner"))
            .json(&RoomBody { room_id: room })
            .send()
            .await
            .map_err(transport)?;
        Ok(json::<WinnerDto>(resp).await?.into())
    }

    async fn get_winner(&self, room: RoomId) -> Result<WinnerReport, RemoteError> {
        let resp = self.get(&format!("/api/game/winner/{room}")).await?;
        match json::<WinnerDto>(resp).await {
            Ok(dto) => Ok(dto.into()),
            // Nothing published yet
            Err(RemoteError::NotFound) => Ok(WinnerReport::default()),
            Err(e) => Err(e),
        }
    }

    async fn restart_game(&self, room: RoomId) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(self.url(&format!("/api/rooms/{room}/restart")))
            .send()
            .await
            .map_err(transport)?;
        check(resp).map(|_| ())
    }

    async fn get_ticket(&self, player: PlayerId) -> Result<TicketRows, RemoteError> {
        let resp = self.get(&format!("/api/tickets/{player}")).await?;
        decode_ticket(json::<Value>(resp).await?)
    }

    async fn generate_ticket(
        &self,
        player: PlayerId,
        room: RoomId,
    ) -> Result<TicketRows, RemoteError> {
        let resp = self
            .client
            .post(self.url("/api/tickets/generate"))
            .json(&GenerateTicketBody {
                player_id: player,
                room_id: room,
            })
            .send()
            .await
            .map_err(transport)?;
        let resp = check(resp)?;
        let text = resp.text().await.map_err(transport)?;
        let generated = serde_json::from_str::<Value>(&text)
            .map_err(|e| RemoteError::Decode(e.to_string()))
            .and_then(decode_ticket);
        match generated {
            Ok(rows) => Ok(rows),
            Err(e) => {
                tracing::debug!(player = %player, error = %e, "Generate returned no grid, fetching ticket");
                self.get_ticket(player).await
            },
        }
    }
}
