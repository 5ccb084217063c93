use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{bail, Context};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use garou_core::{
    create_agents, create_agents_with_profiles, create_agents_with_roles, AgentTransport,
    Connection, Game,
};
use garou_types::{Packet, Profile, Request, Role, Team};
use rand::seq::SliceRandom;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::auth;
use crate::service::RealtimeBroadcaster;
use crate::{AppState, GameHandle, WsTransport};

#[derive(Debug, Deserialize, Default)]
struct TokenQuery {
    token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let mut router = Router::new().route("/ws", get(agent_ws));
    if state.realtime.is_some() {
        router = router.route("/realtime", get(realtime_ws));
    }
    router.layer(cors).with_state(state)
}

async fn agent_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    if state.signaled.load(Ordering::SeqCst) {
        warn!("draining for shutdown, refusing new connection");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| accept_agent(socket, state, headers, query))
}

/// One inbound agent: NAME handshake, optional token check, then into
/// the waiting room (which may complete a session).
async fn accept_agent(socket: WebSocket, state: AppState, headers: HeaderMap, query: TokenQuery) {
    let mut transport = WsTransport::new(socket);
    let name = match request_name(&mut transport, state.setting.timeout.response_ms).await {
        Ok(name) => name,
        Err(err) => {
            warn!("name handshake failed: {err:#}");
            transport.close().await;
            return;
        }
    };
    let team_name = name.clone();

    let authentication = &state.config.server.authentication;
    if authentication.enable {
        let token = query.token.clone().or_else(|| bearer_token(&headers));
        let authorized = token.as_deref().is_some_and(|token| {
            auth::is_valid_player_token(&authentication.secret, token, &team_name)
        });
        if !authorized {
            warn!(team = %team_name, "invalid player token, closing connection");
            transport.close().await;
            return;
        }
    }

    let conn = Connection::new(Box::new(transport), team_name, name);
    register_connection(&state, conn).await;
}

async fn request_name(transport: &mut WsTransport, response_ms: u64) -> anyhow::Result<String> {
    let frame = serde_json::to_string(&Packet::new(Request::Name))?;
    transport
        .send(frame)
        .await
        .context("failed to send the name request")?;
    let reply = timeout(Duration::from_millis(response_ms), transport.recv())
        .await
        .context("timed out waiting for the agent name")?
        .context("connection dropped during the name handshake")?;
    let name = reply.trim().to_string();
    if name.is_empty() {
        bail!("agent sent an empty name");
    }
    Ok(name)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

enum Composition {
    Fifo(Vec<Connection>),
    Assigned(HashMap<Role, Vec<Connection>>),
}

/// Adds the connection to the waiting room and composes a session when
/// enough compatible connections are waiting.
pub(crate) async fn register_connection(state: &AppState, conn: Connection) {
    let composition = {
        let mut room = state.waiting_room.lock().await;
        room.add(conn);
        if let Some(optimizer) = &state.optimizer {
            let mut optimizer = optimizer.lock().await;
            for team in room.teams() {
                optimizer.update_team(&team);
            }
            let mut taken = None;
            for candidate in optimizer.get_matches() {
                if let Some(conns) = room.take_for_match(&candidate) {
                    taken = Some(conns);
                    break;
                }
            }
            taken.map(Composition::Assigned)
        } else {
            room.take(state.setting.agent_count as usize)
                .map(Composition::Fifo)
        }
    };
    if let Some(composition) = composition {
        start_game(state, composition).await;
    }
}

async fn start_game(state: &AppState, composition: Composition) {
    let agents = match composition {
        Composition::Fifo(conns) => match resolve_profiles(state, conns.len()).await {
            Some(profiles) => {
                create_agents_with_profiles(conns, &state.setting.role_num_map, &profiles)
            }
            None => create_agents(conns, &state.setting.role_num_map),
        },
        Composition::Assigned(role_map) => create_agents_with_roles(role_map),
    };
    let mut game = Game::new(
        state.setting.clone(),
        state.config.game.max_continue_error_ratio,
        agents,
    )
    .with_collaborators(state.collaborators.clone());
    let handle = GameHandle {
        id: game.id().to_string(),
        finished: game.finished_handle(),
    };
    info!(id = %handle.id, "session composed");
    state.games.write().await.push(handle);

    let optimizer = state.optimizer.clone();
    tokio::spawn(async move {
        let role_teams = game.role_team_names();
        let winner = game.start().await;
        if let Some(optimizer) = optimizer {
            let mut optimizer = optimizer.lock().await;
            if winner != Team::None {
                optimizer.set_match_end(&role_teams);
            } else {
                // abandoned game: keep the pairing eligible for a retry
                optimizer.set_match_weight(&role_teams, 0.0);
            }
        }
    });
}

async fn resolve_profiles(state: &AppState, count: usize) -> Option<Vec<Profile>> {
    let custom = &state.config.game.custom_profile;
    if !custom.enable {
        return None;
    }
    if custom.dynamic.enable {
        if let Some(generator) = &state.profiles {
            match generator.generate_profiles(count).await {
                Ok(profiles) => return Some(profiles),
                Err(err) => {
                    warn!("dynamic profile generation failed, falling back to configured profiles: {err:#}");
                }
            }
        }
    }
    let mut profiles = custom.profiles.clone();
    profiles.shuffle(&mut rand::thread_rng());
    Some(profiles)
}

async fn realtime_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    let Some(hub) = state.realtime.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let authentication = &state.config.server.authentication;
    if authentication.enable {
        let token = query.token.clone().or_else(|| bearer_token(&headers));
        let authorized = token
            .as_deref()
            .is_some_and(|token| auth::is_valid_receiver_token(&authentication.secret, token));
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    ws.on_upgrade(move |socket| stream_realtime(socket, hub))
}

async fn stream_realtime(mut socket: WebSocket, hub: RealtimeBroadcaster) {
    let mut rx = hub.subscribe();
    loop {
        match rx.recv().await {
            Ok(packet) => {
                let Ok(text) = serde_json::to_string(&packet) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "slow spectator lagged behind the broadcast");
                continue;
            }
            Err(RecvError::Closed) => break,
        }
    }
}
