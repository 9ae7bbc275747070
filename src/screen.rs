//! Screen controller: local view state, periodic refresh, user commands.
//!
//! Everything here runs on a single-threaded tokio runtime inside a
//! `LocalSet`. State lives in a `RefCell` and is only touched from that
//! thread; every change is published as a [`ScreenEvent`].

use crate::backend::{BackendError, HotspotService};
use crate::models::{Notice, NoticeDuration, ScreenCommand, ScreenEvent, ScreenState};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const HOTSPOT_ENABLED_MESSAGE: &str = "Hotspot Enabled";
pub const HOTSPOT_DISABLED_MESSAGE: &str = "Hotspot Disabled";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

pub type EventSender = mpsc::UnboundedSender<ScreenEvent>;

pub struct Screen {
    service: Rc<dyn HotspotService>,
    state: RefCell<ScreenState>,
    mounted: Cell<bool>,
    events: EventSender,
}

impl Screen {
    pub fn new(service: Rc<dyn HotspotService>, events: EventSender) -> Self {
        Self {
            service,
            state: RefCell::new(ScreenState::default()),
            mounted: Cell::new(true),
            events,
        }
    }

    pub fn state(&self) -> ScreenState {
        self.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub async fn load_initial_state(&self) {
        let result = self.service.is_hotspot_enabled().await;
        if !self.is_mounted() {
            return;
        }
        match result {
            Ok(enabled) => {
                info!(enabled, "Loaded hotspot state");
                self.update(|state| state.hotspot_enabled = enabled);
            }
            Err(err) => self.report("is_hotspot_enabled", &err),
        }
    }

    /// Both queries are issued together; each result lands as soon as it
    /// resolves, so overlapping refreshes end with whichever answered last.
    pub async fn refresh_devices_and_ip(&self) {
        tokio::join!(self.refresh_devices(), self.refresh_ip());
    }

    async fn refresh_devices(&self) {
        let result = self.service.connected_devices().await;
        if !self.is_mounted() {
            return;
        }
        match result {
            Ok(devices) => {
                debug!(count = devices.len(), "Refreshed connected devices");
                self.update(|state| state.connected_devices = devices);
            }
            Err(err) => self.report("connected_devices", &err),
        }
    }

    async fn refresh_ip(&self) {
        let result = self.service.my_device_ip().await;
        if !self.is_mounted() {
            return;
        }
        match result {
            Ok(ip) => {
                debug!(%ip, "Refreshed device address");
                self.update(|state| state.own_ip = Some(ip));
            }
            Err(err) => {
                warn!(operation = "my_device_ip", error = %err, "Hotspot service call failed");
                self.notify(GENERIC_FAILURE_MESSAGE, NoticeDuration::Short);
            }
        }
    }

    pub async fn request_permissions(&self) {
        let result = self.service.open_write_settings().await;
        if !self.is_mounted() {
            return;
        }
        match result {
            Ok(()) => info!("Settings access granted"),
            Err(err) => self.report("open_write_settings", &err),
        }
    }

    /// Local state follows the request only after the service confirms it.
    pub async fn set_hotspot(&self, enabled: bool) {
        let result = self.service.set_hotspot_enabled(enabled).await;
        if !self.is_mounted() {
            return;
        }
        match result {
            Ok(()) => {
                info!(enabled, "Hotspot toggled");
                self.update(|state| state.hotspot_enabled = enabled);
                let message = if enabled {
                    HOTSPOT_ENABLED_MESSAGE
                } else {
                    HOTSPOT_DISABLED_MESSAGE
                };
                self.notify(message, NoticeDuration::Short);
            }
            Err(err) => {
                warn!(operation = "set_hotspot_enabled", enabled, error = %err, "Hotspot service call failed");
            }
        }
    }

    pub async fn execute(&self, command: ScreenCommand) {
        match command {
            ScreenCommand::RequestPermissions => self.request_permissions().await,
            ScreenCommand::SetHotspot(enabled) => self.set_hotspot(enabled).await,
            ScreenCommand::Refresh => self.refresh_devices_and_ip().await,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut ScreenState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            apply(&mut state);
            state.clone()
        };
        self.publish(ScreenEvent::StateChanged(snapshot));
    }

    fn notify(&self, message: &str, duration: NoticeDuration) {
        self.publish(ScreenEvent::Notice(Notice {
            message: message.to_string(),
            duration,
        }));
    }

    /// Recognized failures reach the user; everything is logged.
    fn report(&self, operation: &'static str, err: &BackendError) {
        if let Some(message) = err.service_message() {
            self.notify(message, NoticeDuration::Long);
        }
        warn!(operation, error = %err, "Hotspot service call failed");
    }

    fn publish(&self, event: ScreenEvent) {
        if self.events.send(event).is_err() {
            debug!("Screen event receiver dropped");
        }
    }
}

/// Repeating refresh bound to one mounted screen. Dropping it stops the ticks.
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// First tick fires one full `period` after start. Periods below one
    /// millisecond are raised to it.
    pub fn start(screen: Rc<Screen>, period: Duration) -> Self {
        let period = period.max(MIN_REFRESH_PERIOD);
        let handle = tokio::task::spawn_local(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let screen = screen.clone();
                tokio::task::spawn_local(async move { screen.refresh_devices_and_ip().await });
            }
        });
        Self { handle }
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A screen between mount and unmount. Must be created inside a `LocalSet`.
pub struct MountedScreen {
    screen: Rc<Screen>,
    _timer: RefreshTimer,
}

impl MountedScreen {
    pub fn mount(
        service: Rc<dyn HotspotService>,
        events: EventSender,
        refresh_interval: Duration,
    ) -> Self {
        info!(interval_ms = refresh_interval.as_millis() as u64, "Mounting hotspot screen");
        let screen = Rc::new(Screen::new(service, events));

        let initial = screen.clone();
        tokio::task::spawn_local(async move { initial.load_initial_state().await });

        let timer = RefreshTimer::start(screen.clone(), refresh_interval);
        Self {
            screen,
            _timer: timer,
        }
    }

    /// Runs `command` as its own task; the caller does not wait for it.
    pub fn dispatch(&self, command: ScreenCommand) {
        debug!(?command, "Dispatching screen command");
        let screen = self.screen.clone();
        tokio::task::spawn_local(async move { screen.execute(command).await });
    }

    pub fn state(&self) -> ScreenState {
        self.screen.state()
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for MountedScreen {
    fn drop(&mut self) {
        info!("Unmounting hotspot screen");
        self.screen.mounted.set(false);
    }
}

/// Mounts a screen, feeds it commands until the channel closes, then unmounts.
pub async fn run(
    service: Rc<dyn HotspotService>,
    events: EventSender,
    refresh_interval: Duration,
    mut commands: mpsc::UnboundedReceiver<ScreenCommand>,
) {
    let screen = MountedScreen::mount(service, events, refresh_interval);
    while let Some(command) = commands.recv().await {
        screen.dispatch(command);
    }
    screen.unmount();
}
