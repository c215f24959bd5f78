//! Mock 仿真世界
//!
//! 每次 `tick` 计算一步：帧号 +1，并在独立的投递线程上异步通知
//! tick 回调与挂载的相机。支持注入同步模式拒绝。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use contracts::{
    ContractError, FrameId, FramePacket, FramePayload, PacketCallback, SimWorld,
    TickCallbackId, WorldSettings, WorldSnapshot, WORLD_PRODUCER_ID,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

/// 变步长模式下每步的模拟时长 (秒)
const VARIABLE_STEP_SECONDS: f64 = 0.05;

/// Mock 世界配置
#[derive(Debug, Clone)]
pub struct MockWorldConfig {
    /// 起始帧号
    pub initial_frame: FrameId,
    /// 初始设置
    pub initial_settings: WorldSettings,
    /// 拒绝同步模式 (模拟不支持同步的服务器)
    pub reject_synchronous: bool,
}

impl Default for MockWorldConfig {
    fn default() -> Self {
        Self {
            initial_frame: 0,
            initial_settings: WorldSettings::default(),
            reject_synchronous: false,
        }
    }
}

/// 步进订阅者 (tick 回调或相机)
struct Subscriber {
    id: u64,
    tx: Sender<WorldSnapshot>,
}

struct WorldState {
    frame: FrameId,
    elapsed_seconds: f64,
    settings: WorldSettings,
    settings_history: Vec<WorldSettings>,
    subscribers: Vec<Subscriber>,
}

struct WorldInner {
    config: MockWorldConfig,
    started: Instant,
    next_subscriber_id: AtomicU64,
    state: Mutex<WorldState>,
}

/// Mock 仿真世界
///
/// 可 clone，所有 clone 共享同一个世界。
#[derive(Clone)]
pub struct MockWorld {
    inner: Arc<WorldInner>,
}

impl MockWorld {
    /// 使用默认配置创建
    pub fn new() -> Self {
        Self::with_config(MockWorldConfig::default())
    }

    /// 使用配置创建
    pub fn with_config(config: MockWorldConfig) -> Self {
        let state = WorldState {
            frame: config.initial_frame,
            elapsed_seconds: 0.0,
            settings: config.initial_settings,
            settings_history: Vec::new(),
            subscribers: Vec::new(),
        };
        Self {
            inner: Arc::new(WorldInner {
                config,
                started: Instant::now(),
                next_subscriber_id: AtomicU64::new(1),
                state: Mutex::new(state),
            }),
        }
    }

    /// 当前帧号
    pub fn frame(&self) -> FrameId {
        self.inner.state.lock().frame
    }

    /// 所有 `apply_settings` 成功应用过的设置，按顺序
    pub fn settings_history(&self) -> Vec<WorldSettings> {
        self.inner.state.lock().settings_history.clone()
    }

    /// 当前订阅者数量 (tick 回调 + 正在监听的相机)
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// 订阅步进通知，返回订阅 id 与接收端
    ///
    /// 退订后发送端被释放，接收端随之断开。
    pub(crate) fn subscribe(&self) -> (u64, Receiver<WorldSnapshot>) {
        let (tx, rx) = unbounded();
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.inner.state.lock().subscribers.push(Subscriber { id, tx });
        (id, rx)
    }

    /// 退订。未知 id 忽略
    pub(crate) fn unsubscribe(&self, id: u64) {
        self.inner
            .state
            .lock()
            .subscribers
            .retain(|subscriber| subscriber.id != id);
    }

    /// 计算一步并广播给订阅者
    fn step(&self) -> FrameId {
        let mut state = self.inner.state.lock();
        let delta_seconds = state
            .settings
            .fixed_delta_seconds
            .unwrap_or(VARIABLE_STEP_SECONDS);

        state.frame += 1;
        state.elapsed_seconds += delta_seconds;

        let snapshot = WorldSnapshot {
            frame_id: state.frame,
            elapsed_seconds: state.elapsed_seconds,
            delta_seconds,
            platform_timestamp: self.inner.started.elapsed().as_secs_f64(),
        };

        // 已断开的订阅者顺便清理
        state
            .subscribers
            .retain(|subscriber| subscriber.tx.send(snapshot).is_ok());

        trace!(frame_id = snapshot.frame_id, "mock world stepped");
        snapshot.frame_id
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld for MockWorld {
    fn settings(&self) -> Result<WorldSettings, ContractError> {
        Ok(self.inner.state.lock().settings)
    }

    #[instrument(
        name = "mock_world_apply_settings",
        skip(self, settings),
        fields(sync = settings.synchronous_mode)
    )]
    fn apply_settings(&self, settings: &WorldSettings) -> Result<FrameId, ContractError> {
        if settings.synchronous_mode && self.inner.config.reject_synchronous {
            return Err(ContractError::world_settings(
                "synchronous mode not supported by this world",
            ));
        }

        {
            let mut state = self.inner.state.lock();
            state.settings = *settings;
            state.settings_history.push(*settings);
        }

        Ok(self.step())
    }

    fn tick(&self) -> Result<FrameId, ContractError> {
        Ok(self.step())
    }

    fn on_tick(&self, callback: PacketCallback) -> Result<TickCallbackId, ContractError> {
        let (id, rx) = self.subscribe();

        thread::Builder::new()
            .name(format!("mock-world-tick-{id}"))
            .spawn(move || {
                for snapshot in rx.iter() {
                    callback(FramePacket {
                        producer_id: WORLD_PRODUCER_ID.to_string(),
                        frame_id: snapshot.frame_id,
                        timestamp: snapshot.elapsed_seconds,
                        payload: FramePayload::Tick(snapshot),
                    });
                }
                debug!(callback_id = id, "tick delivery stopped");
            })?;

        Ok(id)
    }

    fn remove_on_tick(&self, id: TickCallbackId) {
        self.unsubscribe(id);
    }
}
