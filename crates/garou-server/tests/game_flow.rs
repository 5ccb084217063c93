use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use garou_core::Config;
use garou_server::{auth, serve_with_listener, AppState};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn test_config() -> Config {
    let mut config = Config::default();
    config.game.agent_count = 5;
    config.game.timeout.action_ms = 500;
    config.game.timeout.acceptable_ms = 800;
    config.game.timeout.response_ms = 1000;
    config
}

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_with_listener(listener, state));
    addr
}

fn pick_target(frame: &Value) -> String {
    let own = frame["info"]["agent"].as_str().unwrap_or_default();
    let mut alive: Vec<&str> = frame["info"]["status_map"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(name, status)| {
                    status.as_str() == Some("ALIVE") && name.as_str() != own
                })
                .map(|(name, _)| name.as_str())
                .collect()
        })
        .unwrap_or_default();
    alive.sort_unstable();
    alive.first().unwrap_or(&"Agent[01]").to_string()
}

/// Protocol-complete dummy agent: a few utterances per day, then `Over`;
/// every targeted action picks the first alive agent that is not itself.
async fn run_dummy_agent(url: String, name: String) -> anyhow::Result<()> {
    let (mut ws, _) = connect_async(url.as_str()).await?;
    let mut talk_count = 0u32;
    while let Some(message) = ws.next().await {
        let message = match message {
            Ok(message) => message,
            Err(_) => break,
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let frame: Value = serde_json::from_str(&text)?;
        let reply = match frame["request"].as_str().unwrap_or_default() {
            "NAME" => Some(name.clone()),
            "TALK" | "WHISPER" => {
                talk_count += 1;
                if talk_count % 4 == 0 {
                    Some("Over".to_string())
                } else {
                    Some(format!("hello {talk_count}"))
                }
            }
            "VOTE" | "ATTACK" | "DIVINE" | "GUARD" => Some(pick_target(&frame)),
            "DAILY_INITIALIZE" => {
                talk_count = 0;
                None
            }
            _ => None,
        };
        if let Some(reply) = reply {
            ws.send(Message::Text(reply)).await?;
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn five_dummy_agents_play_a_full_game() {
    let state = AppState::new(test_config()).unwrap();
    let addr = spawn_server(state.clone()).await;
    let url = format!("ws://{addr}/ws");

    let mut clients = Vec::new();
    for i in 0..5 {
        clients.push(tokio::spawn(run_dummy_agent(
            url.clone(),
            format!("team-{i}"),
        )));
    }
    for client in clients {
        tokio::time::timeout(Duration::from_secs(60), client)
            .await
            .expect("game finished in time")
            .unwrap()
            .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.all_games_finished().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("session reported finished");
    assert_eq!(state.games.read().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn authentication_gates_the_waiting_room() {
    let mut config = test_config();
    config.server.authentication.enable = true;
    config.server.authentication.secret = "s3cret".to_string();
    let state = AppState::new(config).unwrap();
    let addr = spawn_server(state.clone()).await;

    // wrong token: the server answers the name handshake, then hangs up
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws?token=bogus"))
        .await
        .unwrap();
    let mut closed = false;
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(frame["request"], "NAME");
                ws.send(Message::Text("team-x".to_string())).await.unwrap();
            }
            Message::Close(_) => {
                closed = true;
                break;
            }
            _ => {}
        }
    }
    assert!(closed || ws.next().await.is_none());
    assert_eq!(state.waiting_room.lock().await.len(), 0);

    // valid token: the connection reaches the waiting room
    let token = auth::player_token("s3cret", "team-y");
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    if let Some(Ok(Message::Text(text))) = ws.next().await {
        let frame: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["request"], "NAME");
        ws.send(Message::Text("team-y".to_string())).await.unwrap();
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if state.waiting_room.lock().await.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("authenticated connection joined the waiting room");
}
