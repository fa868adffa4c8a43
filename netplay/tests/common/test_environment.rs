use anyhow::{Result, bail};
use common::{RecorderConfig, TimingConfig};
use netplay::{PlayerSession, RecorderSession};
use tokio::time::{Duration, Instant, sleep};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A recorder listening on an ephemeral port with a player linked to it.
pub struct TestEnvironment {
    pub recorder: RecorderSession,
    pub player: PlayerSession,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        Self::with_configs(RecorderConfig::default(), TimingConfig::default()).await
    }

    pub async fn with_configs(recorder_config: RecorderConfig, timing: TimingConfig) -> Result<Self> {
        let mut recorder = RecorderSession::new(recorder_config);
        recorder.listen(0).await?;
        let port = recorder
            .status()
            .port
            .ok_or_else(|| anyhow::anyhow!("recorder has no port"))?;

        let mut player = PlayerSession::new(timing);
        player.connect("127.0.0.1", port, CONNECT_TIMEOUT).await?;

        let mut env = TestEnvironment { recorder, player };
        let recorder = &mut env.recorder;
        eventually(Duration::from_secs(5), || {
            recorder.tick();
            recorder.peer_connected()
        })
        .await?;
        Ok(env)
    }

    /// Records `presses` with explicit timestamps and stops.
    pub fn record(&mut self, presses: &[(usize, u64)]) {
        self.recorder.start_recording();
        for &(lane, now) in presses {
            self.recorder.record_press_at(lane, now);
        }
        self.recorder.stop_recording();
    }

    /// Ticks the player until it has `count` notes loaded.
    pub async fn wait_for_notes(&mut self, count: usize) -> Result<()> {
        let player = &mut self.player;
        eventually(Duration::from_secs(5), || {
            player.tick_at(0);
            player.notes().len() == count
        })
        .await
    }
}

/// Polls `check` every few milliseconds until it holds or `limit` passes.
pub async fn eventually<F: FnMut() -> bool>(limit: Duration, mut check: F) -> Result<()> {
    let deadline = Instant::now() + limit;
    loop {
        if check() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("Condition not met within {:?}", limit);
        }
        sleep(Duration::from_millis(5)).await;
    }
}
