use std::time::Instant;

use glam::DVec2;
use tracing::{debug, info, instrument, trace};

use crate::actor;
use crate::common::config::{Config, ConfigWatcher};
use crate::layout_engine::{CarouselCommand, CarouselManager, FrameContext, command_for_key};
use crate::model::server::{WindowData, WindowId};
use crate::sys::event::{ButtonEvent, KeyEvent, MouseState};
use crate::sys::host::{HookError, HookRegistry, Host, KEY_EVENT_HOOK};
use crate::sys::screen::MonitorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Before the compositor starts drawing the frame.
    Pre,
    /// After everything else has been queued for the frame.
    LastMoment,
    Other,
}

#[derive(Debug)]
pub enum Event {
    Frame(RenderStage),
    Key(KeyEvent),
    MouseButton(ButtonEvent),
    /// Pointer position in global layout coordinates.
    MouseMove(DVec2),
    WindowOpened(WindowData),
    WindowClosed(WindowId),
    WindowMoved(WindowId),
    MonitorFocused(MonitorId),
    ConfigUpdated(Config),
    Command(CarouselCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// The host must not deliver the event any further.
    Consumed,
    Passthrough,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("no hook point named {0}")]
    MissingHook(&'static str),
    #[error("{count} hook points named {name}, expected exactly one")]
    AmbiguousHook { name: &'static str, count: usize },
    #[error(transparent)]
    Hook(#[from] HookError),
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

pub struct CarouselActor {
    config: Config,
    manager: CarouselManager,
    focused_monitor: Option<MonitorId>,
}

impl CarouselActor {
    /// Installs the key hook and builds the engine. Nothing is constructed
    /// unless exactly one hook point exists and accepts the hook.
    pub fn new(config: Config, hooks: &mut dyn HookRegistry) -> Result<Self, InitError> {
        let points = hooks.find_hook_points(KEY_EVENT_HOOK);
        let point = match points.as_slice() {
            [] => return Err(InitError::MissingHook(KEY_EVENT_HOOK)),
            [point] => point,
            _ => {
                return Err(InitError::AmbiguousHook {
                    name: KEY_EVENT_HOOK,
                    count: points.len(),
                });
            }
        };
        hooks.install_hook(point)?;
        info!(hook = %point.name, address = point.address, "key hook installed");
        let manager = CarouselManager::new(&config);
        Ok(Self { config, manager, focused_monitor: None })
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn manager(&self) -> &CarouselManager { &self.manager }

    pub fn is_active(&self) -> bool { self.manager.is_active() }

    pub fn handle_event(&mut self, event: Event, host: &mut dyn Host) -> Response {
        self.handle_event_at(event, host, Instant::now())
    }

    /// Handles every queued event, each under the span it was sent from.
    pub fn drain(&mut self, rx: &Receiver, host: &mut dyn Host) {
        for (span, event) in rx.try_iter() {
            let _guard = span.enter();
            self.handle_event(event, host);
        }
    }

    /// Applies the newest configuration the watcher has produced, if any.
    pub fn poll_config(&mut self, watcher: &ConfigWatcher, host: &mut dyn Host) {
        if let Some(config) = watcher.try_recv() {
            self.handle_event(Event::ConfigUpdated(config), host);
        }
    }

    #[instrument(skip(self, host, now), level = "debug")]
    pub fn handle_event_at(&mut self, event: Event, host: &mut dyn Host, now: Instant) -> Response {
        let cx = self.frame_context(&*host, now);
        match event {
            Event::Frame(stage) => self.on_frame(stage, host, &cx),
            Event::Key(key) => self.on_key(key, host, &cx),
            Event::MouseButton(button) => self.on_button(button, host, &cx),
            Event::MouseMove(position) => {
                if self.manager.is_active() {
                    let point = self.to_overlay(position, &*host);
                    self.manager.handle_mouse_move(point);
                }
                Response::Passthrough
            }
            Event::WindowOpened(window) => {
                self.manager.add_window(&window, host, &cx);
                Response::Passthrough
            }
            Event::WindowClosed(window) => {
                self.manager.remove_window(window, host, &cx);
                Response::Passthrough
            }
            Event::WindowMoved(window) => {
                if self.manager.is_active() {
                    debug!(%window, "window moved, rebuilding");
                    self.manager.rebuild_all(host, &cx);
                }
                Response::Passthrough
            }
            Event::MonitorFocused(monitor) => {
                self.focused_monitor = Some(monitor);
                Response::Passthrough
            }
            Event::ConfigUpdated(config) => {
                self.manager.apply_config(&config, host, &cx);
                self.config = config;
                Response::Passthrough
            }
            Event::Command(command) => {
                if command == CarouselCommand::Toggle || self.manager.is_active() {
                    self.manager.execute(command, host, &cx);
                }
                Response::Consumed
            }
        }
    }

    /// Until the host reports a monitor focus change, the host's own idea of
    /// the focused monitor is used.
    fn focused_monitor(&self, host: &dyn Host) -> Option<MonitorId> {
        self.focused_monitor.or_else(|| host.focused_monitor())
    }

    fn frame_context(&self, host: &dyn Host, now: Instant) -> FrameContext {
        FrameContext::new(self.focused_monitor(host).and_then(|id| host.monitor(id)), now)
    }

    fn on_frame(&mut self, stage: RenderStage, host: &mut dyn Host, cx: &FrameContext) -> Response {
        if !self.manager.is_active() {
            return Response::Passthrough;
        }
        match stage {
            RenderStage::Pre => {
                host.set_cursor_hidden(true);
                self.manager.update(host, cx);
            }
            RenderStage::LastMoment => {
                if let Some(monitor) = cx.monitor.as_ref() {
                    self.manager.draw_overlay(host, monitor);
                }
                host.set_cursor_hidden(false);
            }
            RenderStage::Other => {}
        }
        if self.manager.is_active() {
            host.damage_all_monitors();
        }
        Response::Passthrough
    }

    fn on_key(&mut self, key: KeyEvent, host: &mut dyn Host, cx: &FrameContext) -> Response {
        if !self.manager.is_active() {
            if !self.config.keys.trigger.matches(&key) {
                return Response::Passthrough;
            }
            if self.manager.activate(host, cx) {
                self.manager.next(host, cx);
            }
            return Response::Consumed;
        }
        match command_for_key(&key) {
            Some(command) => self.manager.execute(command, host, cx),
            None => trace!(keysym = key.keysym, "unmapped key swallowed"),
        }
        Response::Consumed
    }

    fn on_button(&mut self, button: ButtonEvent, host: &mut dyn Host, cx: &FrameContext) -> Response {
        if !self.manager.is_active() {
            return Response::Passthrough;
        }
        if button.state == MouseState::Down {
            let point = self.to_overlay(button.position, &*host);
            self.manager.handle_click(point, host, cx);
        }
        Response::Consumed
    }

    /// Converts a global pointer position to pixels on the monitor the
    /// carousel is shown on.
    fn to_overlay(&self, position: DVec2, host: &dyn Host) -> DVec2 {
        let monitor = self.manager.opened_on().or_else(|| self.focused_monitor(host)).and_then(|id| host.monitor(id));
        match monitor {
            Some(monitor) => (position - monitor.position) * monitor.scale,
            None => position,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::event::{KeyCode, KeyState, Keysym, Modifiers};
    use crate::sys::headless::{HeadlessHost, HostCall};
    use crate::sys::screen::{MonitorData, PixelFormat};

    fn monitor(id: u32, x: f64, scale: f64) -> MonitorData {
        MonitorData {
            id: MonitorId::new(id),
            name: format!("HDMI-{id}"),
            position: DVec2::new(x, 0.0),
            size: DVec2::new(1280.0, 720.0),
            scale,
            format: PixelFormat::XRGB8888,
            enabled: true,
        }
    }

    fn window(id: u64) -> WindowData {
        WindowData {
            id: WindowId::new(id),
            title: format!("app {id}"),
            position: DVec2::ZERO,
            size: DVec2::new(640.0, 480.0),
            workspace: None,
            monitor: Some(MonitorId::new(0)),
            is_mapped: true,
        }
    }

    fn host() -> HeadlessHost {
        let mut host = HeadlessHost::new()
            .with_monitor(monitor(0, 0.0, 1.0))
            .with_hook_point(KEY_EVENT_HOOK)
            .with_window(window(1))
            .with_window(window(2))
            .with_window(window(3));
        host.set_focused_window(Some(WindowId::new(1)));
        host
    }

    fn new_actor(host: &mut HeadlessHost) -> CarouselActor { CarouselActor::new(Config::default(), host).unwrap() }

    fn trigger() -> KeyEvent {
        KeyEvent {
            keycode: KeyCode::TAB,
            keysym: Keysym::Tab as u32,
            state: KeyState::Pressed,
            modifiers: Modifiers::ALT,
        }
    }

    #[test]
    fn init_requires_exactly_one_hook_point() {
        let mut bare = HeadlessHost::new();
        assert!(matches!(
            CarouselActor::new(Config::default(), &mut bare),
            Err(InitError::MissingHook(KEY_EVENT_HOOK))
        ));

        let mut doubled = HeadlessHost::new().with_hook_point(KEY_EVENT_HOOK).with_hook_point(KEY_EVENT_HOOK);
        assert!(matches!(
            CarouselActor::new(Config::default(), &mut doubled),
            Err(InitError::AmbiguousHook { count: 2, .. })
        ));

        let mut refusing = HeadlessHost::new().with_hook_point(KEY_EVENT_HOOK).refusing_hooks();
        assert!(matches!(
            CarouselActor::new(Config::default(), &mut refusing),
            Err(InitError::Hook(HookError::Refused { .. }))
        ));

        let mut host = host();
        new_actor(&mut host);
        assert!(host.calls().contains(&HostCall::InstallHook(KEY_EVENT_HOOK.to_string())));
    }

    #[test]
    fn trigger_opens_and_advances() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        let plain_tab = KeyEvent { modifiers: Modifiers::empty(), ..trigger() };
        assert_eq!(actor.handle_event(Event::Key(plain_tab), &mut host), Response::Passthrough);
        assert!(!actor.is_active());

        assert_eq!(actor.handle_event(Event::Key(trigger()), &mut host), Response::Consumed);
        assert!(actor.is_active());
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(2)));

        let tab = KeyEvent::pressed(Keysym::Tab, Modifiers::ALT);
        assert_eq!(actor.handle_event(Event::Key(tab), &mut host), Response::Consumed);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(3)));

        let stray = KeyEvent::pressed(Keysym::AltR, Modifiers::ALT);
        assert_eq!(actor.handle_event(Event::Key(stray), &mut host), Response::Consumed);

        actor.handle_event(Event::Key(KeyEvent::released(Keysym::AltL)), &mut host);
        assert!(!actor.is_active());
        assert!(host.calls().contains(&HostCall::FocusWindow(WindowId::new(3))));
    }

    #[test]
    fn escape_cancels_without_focusing() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        actor.handle_event(Event::Key(trigger()), &mut host);
        actor.handle_event(Event::Key(KeyEvent::pressed(Keysym::Escape, Modifiers::empty())), &mut host);
        assert!(!actor.is_active());
        assert!(!host.calls().iter().any(|c| matches!(c, HostCall::FocusWindow(_))));
    }

    #[test]
    fn frames_hide_cursor_update_and_draw() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        let start = Instant::now();
        actor.handle_event_at(Event::Key(trigger()), &mut host, start);
        host.take_calls();

        let later = start + Duration::from_millis(16);
        actor.handle_event_at(Event::Frame(RenderStage::Pre), &mut host, later);
        assert!(host.cursor_hidden());
        actor.handle_event_at(Event::Frame(RenderStage::LastMoment), &mut host, later);
        assert!(!host.cursor_hidden());

        let calls = host.take_calls();
        assert!(calls.iter().any(|c| matches!(c, HostCall::BeginOffscreen { .. })));
        assert!(calls.iter().any(|c| matches!(c, HostCall::Backdrop { blur: true, .. })));
        assert!(calls.iter().any(|c| matches!(c, HostCall::Texture { .. })));
        assert!(calls.contains(&HostCall::Damage(MonitorId::new(0))));

        actor.handle_event(Event::Command(CarouselCommand::Cancel), &mut host);
        host.take_calls();
        actor.handle_event(Event::Frame(RenderStage::Pre), &mut host);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn clicks_are_swallowed_and_mapped_to_the_overlay() {
        let mut host = HeadlessHost::new()
            .with_monitor(monitor(0, 0.0, 1.0))
            .with_monitor(monitor(1, 1280.0, 2.0))
            .with_hook_point(KEY_EVENT_HOOK);
        for id in 1..=3 {
            let mut w = window(id);
            w.monitor = Some(MonitorId::new(1));
            host.add_window(w);
        }
        host.set_focused_monitor(Some(MonitorId::new(1)));
        host.set_focused_window(Some(WindowId::new(1)));
        let mut actor = new_actor(&mut host);
        actor.handle_event(Event::Key(trigger()), &mut host);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(2)));

        // Clicks hit the animated boxes, so let them reach their targets.
        let mut now = Instant::now();
        for _ in 0..120 {
            if !actor.manager().is_animating() {
                break;
            }
            now += Duration::from_millis(16);
            actor.handle_event_at(Event::Frame(RenderStage::Pre), &mut host, now);
        }
        assert!(!actor.manager().is_animating());

        let first = actor
            .manager()
            .layout_snapshot()
            .into_iter()
            .find(|l| l.window == WindowId::new(1))
            .unwrap();
        // Overlay pixels on a 2x monitor that starts at x = 1280.
        let global = DVec2::new(
            1280.0 + (first.position[0] + 10.0) / 2.0,
            (first.position[1] + first.size[1] / 2.0) / 2.0,
        );
        let response = actor.handle_event(Event::MouseButton(ButtonEvent::press(global)), &mut host);
        assert_eq!(response, Response::Consumed);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(1)));

        actor.handle_event(Event::Command(CarouselCommand::Cancel), &mut host);
        let response = actor.handle_event(Event::MouseButton(ButtonEvent::press(global)), &mut host);
        assert_eq!(response, Response::Passthrough);
    }

    #[test]
    fn window_lifecycle_while_open() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        actor.handle_event(Event::Key(trigger()), &mut host);

        host.add_window(window(4));
        actor.handle_event(Event::WindowOpened(window(4)), &mut host);
        assert_eq!(actor.manager().row_windows()[0].len(), 4);

        host.remove_window(WindowId::new(2));
        actor.handle_event(Event::WindowClosed(WindowId::new(2)), &mut host);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(3)));

        actor.handle_event(Event::WindowMoved(WindowId::new(3)), &mut host);
        assert_eq!(actor.manager().row_windows()[0], vec![
            WindowId::new(1),
            WindowId::new(3),
            WindowId::new(4)
        ]);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(3)));
    }

    #[test]
    fn config_reload_rebuilds_with_new_settings() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        actor.handle_event(Event::Key(trigger()), &mut host);

        let mut config = Config::default();
        config.carousel.unfocused_alpha = 0.3;
        actor.handle_event(Event::ConfigUpdated(config), &mut host);
        assert_eq!(actor.config().carousel.unfocused_alpha, 0.3);
        let dimmed = actor
            .manager()
            .layout_snapshot()
            .into_iter()
            .find(|l| l.window == WindowId::new(1))
            .unwrap();
        assert_eq!(dimmed.alpha, 0.3);
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(2)));
    }

    #[test]
    fn queued_events_are_drained() {
        let mut host = host();
        let mut actor = new_actor(&mut host);
        let (tx, rx) = actor::channel();
        assert!(actor::send(&tx, Event::Command(CarouselCommand::Toggle)));
        assert!(actor::send(&tx, Event::Command(CarouselCommand::Next)));
        actor.drain(&rx, &mut host);
        assert!(actor.is_active());
        assert_eq!(actor.manager().selected_window(), Some(WindowId::new(2)));
    }
}
