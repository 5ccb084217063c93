use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use garou_core::{Collaborators, Config};
use garou_types::Setting;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub mod auth;
pub mod matching;
pub mod service;
pub mod waiting_room;
pub mod ws;

mod transport;

pub use transport::WsTransport;

use matching::MatchOptimizer;
use service::{
    EventLogService, GameLogService, ProfileGenerator, RealtimeBroadcaster, TtsClient,
};
use waiting_room::WaitingRoom;

/// Bookkeeping for one spawned session; the manager polls `finished`
/// during shutdown.
pub struct GameHandle {
    pub id: String,
    pub finished: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub setting: Setting,
    pub waiting_room: Arc<Mutex<WaitingRoom>>,
    pub games: Arc<RwLock<Vec<GameHandle>>>,
    pub signaled: Arc<AtomicBool>,
    pub collaborators: Collaborators,
    pub realtime: Option<RealtimeBroadcaster>,
    pub optimizer: Option<Arc<Mutex<MatchOptimizer>>>,
    pub profiles: Option<Arc<ProfileGenerator>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let setting = config.build_setting()?;
        let mut collaborators = Collaborators::default();
        if config.game_log.enable {
            collaborators.text_log = Some(Arc::new(GameLogService::new(&config.game_log)));
        }
        if config.event_log.enable {
            collaborators.event_sink = Some(Arc::new(EventLogService::new(&config.event_log)));
        }
        let realtime = config.realtime.enable.then(|| {
            let broadcaster = RealtimeBroadcaster::new(config.realtime.channel_capacity);
            collaborators.live = Some(Arc::new(broadcaster.clone()));
            broadcaster
        });
        if config.tts.enable {
            collaborators.speaker = Some(Arc::new(TtsClient::new(&config.tts)));
        }
        let optimizer = config.matching.optimize.then(|| {
            Arc::new(Mutex::new(MatchOptimizer::new(
                setting.agent_count,
                setting.role_num_map.clone(),
            )))
        });
        let profiles = (config.game.custom_profile.enable
            && config.game.custom_profile.dynamic.enable)
            .then(|| Arc::new(ProfileGenerator::new(&config.game.custom_profile.dynamic)));

        Ok(Self {
            config: Arc::new(config),
            setting,
            waiting_room: Arc::new(Mutex::new(WaitingRoom::new())),
            games: Arc::new(RwLock::new(Vec::new())),
            signaled: Arc::new(AtomicBool::new(false)),
            collaborators,
            realtime,
            optimizer,
            profiles,
        })
    }

    pub async fn all_games_finished(&self) -> bool {
        self.games
            .read()
            .await
            .iter()
            .all(|game| game.finished.load(Ordering::SeqCst))
    }
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, state).await
}

/// Runs the accept loop until a termination signal arrives, then drains:
/// new connections are refused while running sessions play out.
pub async fn serve_with_listener(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = ws::router(state.clone());
    info!(addr = %listener.local_addr()?, "garou server listening");
    let signaled = state.signaled.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(signaled))
        .await?;
    drain_games(&state).await;
    Ok(())
}

async fn shutdown_signal(signaled: Arc<AtomicBool>) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!("failed to install SIGTERM handler: {err}");
                let _ = ctrl_c.await;
                signaled.store(true, Ordering::SeqCst);
                return;
            }
        };
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(err) => {
                warn!("failed to install SIGHUP handler: {err}");
                let _ = ctrl_c.await;
                signaled.store(true, Ordering::SeqCst);
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
            _ = hangup.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    info!("termination signal received, refusing new connections");
    signaled.store(true, Ordering::SeqCst);
}

async fn drain_games(state: &AppState) {
    loop {
        if state.all_games_finished().await {
            break;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    info!("all games finished");
}
