//! Layout and selection engine.
//!
//! Proxies are grouped into one row per monitor, ordered by monitor id. Each
//! row keeps its own cursor; `active_row` picks the row that navigation and
//! confirmation act on. Removal is soft: a closed window's proxy is marked
//! and hidden from layout immediately, then dropped by the next
//! [`CarouselManager::update`].

use std::time::Instant;

use glam::DVec2;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::common::collections::BTreeMap;
use crate::common::color::Color;
use crate::common::config::{CarouselSettings, Config};
use crate::layout_engine::command::CarouselCommand;
use crate::layout_engine::graph::{Direction, Orientation};
use crate::layout_engine::render_list::{BACKDROP_PASS, CAROUSEL_PASS, render_order};
use crate::model::server::{WindowData, WindowId};
use crate::sys::host::Host;
use crate::sys::screen::{MonitorData, MonitorId};
use crate::ui::capture::{CapturePolicy, CaptureTask, CaptureTier, schedule};
use crate::ui::element::{DrawCx, ElementAction, UpdateCx};
use crate::ui::scene::Scene;
use crate::ui::style::Style;
use crate::ui::window_container::WindowContainer;

/// Per-frame view of host state the engine reads but does not own.
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// The focused monitor; layout is computed against its size.
    pub monitor: Option<MonitorData>,
    pub now: Instant,
}

impl FrameContext {
    pub fn new(monitor: Option<MonitorData>, now: Instant) -> Self { Self { monitor, now } }
}

/// Serializable summary of one proxy, used by the harness and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyLayout {
    pub window: WindowId,
    pub monitor: MonitorId,
    pub row: usize,
    pub index: usize,
    pub selected: bool,
    pub position: [f64; 2],
    pub size: [f64; 2],
    pub alpha: f64,
    pub title: Option<String>,
}

#[derive(Debug, Default)]
struct Row {
    proxies: Vec<WindowContainer>,
    active_index: usize,
}

impl Row {
    fn live_indices(&self, scene: &Scene) -> Vec<usize> {
        (0..self.proxies.len()).filter(|&i| !self.proxies[i].should_be_removed(scene)).collect()
    }

    /// Position within `live` of the entry shown as selected. A removed
    /// cursor target hands the selection to the next live entry.
    fn live_cursor(&self, live: &[usize]) -> Option<usize> {
        if live.is_empty() {
            return None;
        }
        let before = live.iter().filter(|&&i| i < self.active_index).count();
        Some(before.min(live.len() - 1))
    }

    fn clamp(&mut self) {
        if self.active_index >= self.proxies.len() {
            self.active_index = self.proxies.len().saturating_sub(1);
        }
    }
}

pub struct CarouselManager {
    active: bool,
    rows: BTreeMap<MonitorId, Row>,
    active_row: usize,
    scene: Scene,
    settings: CarouselSettings,
    style: Style,
    capture: CapturePolicy,
    last_frame: Option<Instant>,
    opened_on: Option<MonitorId>,
}

impl CarouselManager {
    pub fn new(config: &Config) -> Self {
        Self {
            active: false,
            rows: BTreeMap::new(),
            active_row: 0,
            scene: Scene::new(),
            settings: config.carousel.clone(),
            style: Style::from_settings(&config.carousel),
            capture: CapturePolicy::from_settings(&config.capture),
            last_frame: None,
            opened_on: None,
        }
    }

    pub fn is_active(&self) -> bool { self.active }

    pub fn settings(&self) -> &CarouselSettings { &self.settings }

    pub fn style(&self) -> &Style { &self.style }

    pub fn scene(&self) -> &Scene { &self.scene }

    pub fn opened_on(&self) -> Option<MonitorId> { self.opened_on }

    pub fn row_count(&self) -> usize { self.rows.len() }

    pub fn active_row(&self) -> usize { self.active_row }

    pub fn active_index(&self, row: usize) -> Option<usize> { self.rows.values().nth(row).map(|r| r.active_index) }

    /// Windows per row, including proxies awaiting removal.
    pub fn row_windows(&self) -> Vec<Vec<WindowId>> {
        self.rows.values().map(|r| r.proxies.iter().map(|p| p.window()).collect()).collect()
    }

    pub fn proxy_count(&self) -> usize { self.rows.values().map(|r| r.proxies.len()).sum() }

    pub fn proxy_for(&self, window: WindowId) -> Option<&WindowContainer> {
        self.rows.values().flat_map(|r| r.proxies.iter()).find(|p| p.window() == window)
    }

    /// True while any proxy is still travelling to its target box. Clicks hit
    /// the current box, not the target.
    pub fn is_animating(&self) -> bool {
        self.rows.values().flat_map(|r| r.proxies.iter()).any(|p| p.is_moving(&self.scene))
    }

    /// The entry confirmation would focus.
    pub fn selected_window(&self) -> Option<WindowId> {
        let row = self.rows.values().nth(self.active_row)?;
        let live = row.live_indices(&self.scene);
        let cursor = row.live_cursor(&live)?;
        Some(row.proxies[live[cursor]].window())
    }

    pub fn apply_config(&mut self, config: &Config, host: &mut dyn Host, cx: &FrameContext) {
        self.settings = config.carousel.clone();
        self.style = Style::from_settings(&config.carousel);
        self.capture = CapturePolicy::from_settings(&config.capture);
        debug!("carousel settings reloaded");
        if self.active {
            self.rebuild_all(host, cx);
        }
    }

    pub fn execute(&mut self, command: CarouselCommand, host: &mut dyn Host, cx: &FrameContext) {
        debug!(%command, "executing");
        match command {
            CarouselCommand::Next => self.next(host, cx),
            CarouselCommand::Prev => self.prev(host, cx),
            CarouselCommand::Up => self.up(host, cx),
            CarouselCommand::Down => self.down(host, cx),
            CarouselCommand::Confirm => self.confirm(host),
            CarouselCommand::Cancel => self.deactivate(host),
            CarouselCommand::Toggle => self.toggle(host, cx),
        }
    }

    /// Opens the carousel on the focused monitor. Returns false when it was
    /// already open or there is nothing to show.
    pub fn activate(&mut self, host: &mut dyn Host, cx: &FrameContext) -> bool {
        if self.active {
            return false;
        }
        self.rebuild_all(host, cx);
        if self.rows.is_empty() {
            debug!("no eligible windows, not activating");
            return false;
        }
        self.active = true;
        self.opened_on = cx.monitor.as_ref().map(|m| m.id);
        self.last_frame = Some(cx.now);
        self.active_row = 0;
        let focused = host.focused_window().and_then(|w| self.position_of(w));
        if let Some((row, index)) = focused {
            self.select(row, index);
        }
        self.refresh_layout(&*host, cx, true);
        debug!(rows = self.rows.len(), proxies = self.proxy_count(), opened_on = ?self.opened_on, "activated");
        if let Some(monitor) = self.opened_on {
            host.schedule_frame(monitor);
        }
        true
    }

    /// Closes the overlay. Safe to call when already inactive.
    pub fn deactivate(&mut self, host: &mut dyn Host) {
        if self.active {
            debug!("deactivating");
        }
        self.active = false;
        self.scene.freeze_all();
        host.remove_passes(CAROUSEL_PASS);
        host.remove_passes(BACKDROP_PASS);
        host.damage_all_monitors();
    }

    pub fn toggle(&mut self, host: &mut dyn Host, cx: &FrameContext) {
        if self.active {
            self.deactivate(host);
        } else {
            self.activate(host, cx);
        }
    }

    pub fn next(&mut self, host: &mut dyn Host, cx: &FrameContext) { self.navigate(Direction::Right, host, cx) }

    pub fn prev(&mut self, host: &mut dyn Host, cx: &FrameContext) { self.navigate(Direction::Left, host, cx) }

    pub fn up(&mut self, host: &mut dyn Host, cx: &FrameContext) { self.navigate(Direction::Up, host, cx) }

    pub fn down(&mut self, host: &mut dyn Host, cx: &FrameContext) { self.navigate(Direction::Down, host, cx) }

    fn navigate(&mut self, direction: Direction, host: &mut dyn Host, cx: &FrameContext) {
        if self.rows.is_empty() {
            return;
        }
        match direction.orientation() {
            Orientation::Horizontal => {
                let Some(row) = self.rows.values_mut().nth(self.active_row) else {
                    return;
                };
                let live = row.live_indices(&self.scene);
                let Some(cursor) = row.live_cursor(&live) else {
                    return;
                };
                row.active_index = live[direction.step(cursor, live.len())];
            }
            Orientation::Vertical => {
                self.active_row = direction.step(self.active_row, self.rows.len());
            }
        }
        trace!(?direction, row = self.active_row, "moved selection");
        self.refresh_layout(&*host, cx, false);
    }

    /// Focuses the selected window and closes the carousel. When the window
    /// lives on another monitor the cursor follows it, and monitor focus is
    /// handed back to the monitor the carousel was opened on.
    pub fn confirm(&mut self, host: &mut dyn Host) {
        if let Some(window) = self.selected_window() {
            debug!(%window, "confirming selection");
            host.focus_window(window);
            let window_monitor = host.window(window).and_then(|w| w.monitor);
            if let Some(opened_on) = self.opened_on {
                if window_monitor != Some(opened_on) {
                    host.warp_cursor_to(window);
                    host.simulate_pointer_motion(window);
                    host.focus_monitor(opened_on);
                }
            }
        }
        self.deactivate(host);
    }

    fn is_eligible(&self, window: &WindowData) -> bool {
        if !window.is_mapped || window.monitor.is_none() {
            return false;
        }
        self.settings.include_special || window.workspace.as_ref().is_some_and(|w| !w.is_special)
    }

    fn position_of(&self, window: WindowId) -> Option<(usize, usize)> {
        self.rows.values().enumerate().find_map(|(r, row)| {
            row.proxies
                .iter()
                .position(|p| p.window() == window && !p.should_be_removed(&self.scene))
                .map(|i| (r, i))
        })
    }

    fn select(&mut self, row: usize, index: usize) {
        if let Some(r) = self.rows.values_mut().nth(row) {
            if index < r.proxies.len() {
                self.active_row = row;
                r.active_index = index;
            }
        }
    }

    fn clamp_indices(&mut self) {
        for row in self.rows.values_mut() {
            row.clamp();
        }
        if self.active_row >= self.rows.len() {
            self.active_row = self.rows.len().saturating_sub(1);
        }
    }

    fn clear(&mut self, host: &mut dyn Host) {
        for row in std::mem::take(&mut self.rows).into_values() {
            for proxy in row.proxies {
                proxy.destroy(&mut self.scene, host);
            }
        }
    }

    /// Recreates every proxy from the host's window list. While open, the
    /// selected window stays selected if it survives.
    pub fn rebuild_all(&mut self, host: &mut dyn Host, cx: &FrameContext) {
        let keep = if self.active { self.selected_window() } else { None };
        self.clear(host);
        for window in host.windows() {
            if !self.is_eligible(&window) {
                continue;
            }
            let Some(monitor) = window.monitor else { continue };
            let mut proxy = WindowContainer::new(&mut self.scene, window.id, &self.style, self.settings.show_close_button);
            proxy.set_aspect(window.aspect_ratio());
            self.rows.entry(monitor).or_default().proxies.push(proxy);
        }
        self.clamp_indices();
        if let Some((row, index)) = keep.and_then(|w| self.position_of(w)) {
            self.select(row, index);
        }
        debug!(rows = self.rows.len(), proxies = self.proxy_count(), "rebuilt carousel");
        self.refresh_layout(&*host, cx, false);
    }

    pub fn add_window(&mut self, window: &WindowData, host: &mut dyn Host, cx: &FrameContext) {
        if !self.active {
            return;
        }
        if !self.is_eligible(window) || self.position_of(window.id).is_some() {
            trace!(window = %window.id, "not adding window");
            return;
        }
        let Some(monitor) = window.monitor else { return };
        let mut proxy = WindowContainer::new(&mut self.scene, window.id, &self.style, self.settings.show_close_button);
        proxy.set_aspect(window.aspect_ratio());
        self.rows.entry(monitor).or_default().proxies.push(proxy);
        debug!(window = %window.id, %monitor, "added window");
        self.refresh_layout(&*host, cx, false);
    }

    pub fn remove_window(&mut self, window: WindowId, host: &mut dyn Host, cx: &FrameContext) {
        let mut found = false;
        for proxy in self.rows.values().flat_map(|r| r.proxies.iter()) {
            if proxy.window() == window {
                proxy.mark_for_removal(&mut self.scene);
                found = true;
            }
        }
        if found {
            debug!(%window, "window marked for removal");
            self.refresh_layout(&*host, cx, false);
        }
    }

    /// Recomputes every proxy's target box, opacity and border state.
    ///
    /// The selected row is centered vertically on the monitor and the other
    /// rows stack above and below it. Within a row the selected entry is
    /// centered horizontally and its neighbours are packed outward from it.
    pub fn refresh_layout(&mut self, host: &dyn Host, cx: &FrameContext, snap: bool) {
        let Some(monitor) = cx.monitor.as_ref() else {
            debug!("no focused monitor, skipping layout");
            return;
        };
        if self.rows.is_empty() {
            return;
        }
        let s = &self.settings;
        let msize = monitor.pixel_size();
        let center = msize / 2.0;
        let spacing = f64::from(s.border_size + s.window_spacing);
        let active_row_h = msize.y * s.monitor_size_active;
        let inactive_row_h = msize.y * s.monitor_size_inactive;
        let vertical_step =
            (active_row_h + inactive_row_h * s.window_size_inactive) / 2.0 + f64::from(s.monitor_spacing);

        for (row_idx, row) in self.rows.values_mut().enumerate() {
            let live = row.live_indices(&self.scene);
            let Some(cursor) = row.live_cursor(&live) else {
                continue;
            };
            let selected_row = row_idx == self.active_row;
            let base_h = if selected_row { active_row_h } else { inactive_row_h };
            let row_center_y = center.y + (row_idx as f64 - self.active_row as f64) * vertical_step;

            let mut sizes = Vec::with_capacity(live.len());
            for (j, &i) in live.iter().enumerate() {
                let proxy = &mut row.proxies[i];
                if let Some(window) = host.window(proxy.window()) {
                    proxy.set_aspect(window.aspect_ratio());
                }
                let h = if selected_row && j == cursor { base_h } else { base_h * s.window_size_inactive };
                sizes.push(DVec2::new(h * proxy.aspect(), h));
            }

            let mut positions = vec![DVec2::ZERO; live.len()];
            let active = sizes[cursor];
            positions[cursor] = DVec2::new(center.x - active.x / 2.0, row_center_y - active.y / 2.0);
            let mut left = positions[cursor].x;
            for j in (0..cursor).rev() {
                left -= sizes[j].x + spacing;
                positions[j] = DVec2::new(left, row_center_y - sizes[j].y / 2.0);
            }
            let mut right = positions[cursor].x + active.x;
            for j in cursor + 1..live.len() {
                positions[j] = DVec2::new(right + spacing, row_center_y - sizes[j].y / 2.0);
                right += sizes[j].x + spacing;
            }

            for (j, &i) in live.iter().enumerate() {
                let proxy = &row.proxies[i];
                let focused = selected_row && j == cursor;
                proxy.set_target_layout(&mut self.scene, positions[j], sizes[j], snap);
                proxy.set_alpha(&mut self.scene, if focused { 1.0 } else { s.unfocused_alpha }, snap);
                proxy.set_active(&mut self.scene, focused);
            }
        }
    }

    /// Drops removed proxies and empty rows. Returns whether anything went.
    fn prune(&mut self, host: &mut dyn Host) -> bool {
        let mut pruned = false;
        let selected_row = self.rows.keys().nth(self.active_row).copied();
        for row in self.rows.values_mut() {
            let live = row.live_indices(&self.scene);
            row.active_index = row.live_cursor(&live).unwrap_or(0);
            let (gone, kept): (Vec<_>, Vec<_>) =
                std::mem::take(&mut row.proxies).into_iter().partition(|p| p.should_be_removed(&self.scene));
            row.proxies = kept;
            for proxy in gone {
                trace!(window = %proxy.window(), "dropping proxy");
                proxy.destroy(&mut self.scene, host);
                pruned = true;
            }
        }
        self.rows.retain(|_, row| !row.proxies.is_empty());
        if let Some(position) = selected_row.and_then(|id| self.rows.keys().position(|&k| k == id)) {
            self.active_row = position;
        }
        pruned
    }

    /// Advances one frame: prunes, animates, then refreshes a budgeted
    /// number of stale snapshots.
    pub fn update(&mut self, host: &mut dyn Host, cx: &FrameContext) {
        if !self.active || self.rows.is_empty() {
            return;
        }
        let delta = self.last_frame.map_or(0.0, |t| cx.now.saturating_duration_since(t).as_secs_f64());
        self.last_frame = Some(cx.now);

        let pruned = self.prune(host);
        if self.rows.is_empty() {
            debug!("last window gone");
            self.deactivate(host);
            return;
        }
        self.clamp_indices();
        if pruned {
            self.refresh_layout(&*host, cx, false);
        }

        {
            let mut ucx = UpdateCx { delta, speed: self.settings.animation_speed, host: &mut *host, style: &self.style };
            for row in self.rows.values_mut() {
                for proxy in &mut row.proxies {
                    proxy.update(&mut self.scene, &mut ucx);
                }
            }
        }

        let monitor = cx.monitor.as_ref();
        let mut tasks = Vec::new();
        for (row_idx, (key, row)) in self.rows.iter().enumerate() {
            for (i, proxy) in row.proxies.iter().enumerate() {
                let on_screen = monitor.is_some_and(|m| m.overlay_bounds().intersects(&proxy.bounds(&self.scene)));
                let tier = CaptureTier::classify(row_idx == self.active_row && i == row.active_index, on_screen);
                let last_captured = proxy.last_captured(&self.scene);
                if self.capture.is_stale(tier, last_captured, cx.now) {
                    tasks.push(CaptureTask { key: (*key, i), on_screen, last_captured });
                }
            }
        }
        for (key, i) in schedule(tasks, self.capture.budget) {
            let Some(proxy) = self.rows.get(&key).and_then(|r| r.proxies.get(i)) else {
                continue;
            };
            if let Err(err) = proxy.capture(&mut self.scene, monitor, host, cx.now) {
                debug!(window = %proxy.window(), %err, "snapshot skipped");
            }
        }
    }

    /// `(row, index)` of every live proxy, back to front.
    fn render_keys(&self) -> Vec<(usize, usize)> {
        let lives: Vec<(Vec<usize>, usize)> = self
            .rows
            .values()
            .map(|row| {
                let live = row.live_indices(&self.scene);
                let cursor = row.live_cursor(&live).unwrap_or(0);
                (live, cursor)
            })
            .collect();
        render_order(lives.iter().map(|(live, cursor)| (live.len(), *cursor)), self.active_row)
            .into_iter()
            .map(|(row, j)| (row, lives[row].0[j]))
            .collect()
    }

    fn proxy_at(&self, row: usize, index: usize) -> Option<&WindowContainer> {
        self.rows.values().nth(row).and_then(|r| r.proxies.get(index))
    }

    /// Live proxies in draw order; the selection comes last.
    pub fn render_list(&self) -> Vec<&WindowContainer> {
        self.render_keys().into_iter().filter_map(|(row, i)| self.proxy_at(row, i)).collect()
    }

    pub fn draw(&self, host: &mut dyn Host) {
        let mut cx = DrawCx { host, style: &self.style };
        for proxy in self.render_list() {
            proxy.draw(&self.scene, &mut cx);
        }
    }

    /// Emits the backdrop pass and the carousel pass for `monitor`.
    pub fn draw_overlay(&self, host: &mut dyn Host, monitor: &MonitorData) {
        if !self.active {
            return;
        }
        if self.style.dim || self.style.blur {
            let color = if self.style.dim { self.style.backdrop } else { Color::TRANSPARENT };
            host.begin_pass(BACKDROP_PASS, monitor.id);
            host.render_backdrop(monitor.overlay_bounds(), color, self.style.blur);
            host.end_pass();
        }
        host.begin_pass(CAROUSEL_PASS, monitor.id);
        self.draw(host);
        host.end_pass();
    }

    /// Selects the front-most proxy under `point`.
    pub fn window_picked(&mut self, point: DVec2, host: &mut dyn Host, cx: &FrameContext) -> bool {
        let hit = self
            .render_keys()
            .into_iter()
            .rev()
            .find(|&(row, i)| self.proxy_at(row, i).is_some_and(|p| p.bounds(&self.scene).contains_point(point)));
        match hit {
            Some((row, index)) => {
                self.update_selection(row, index, host, cx);
                true
            }
            None => false,
        }
    }

    pub fn update_selection(&mut self, row: usize, index: usize, host: &mut dyn Host, cx: &FrameContext) {
        self.select(row, index);
        self.refresh_layout(&*host, cx, false);
    }

    /// Offers a click to the proxies' children first, so a close button wins
    /// over selecting the proxy under it.
    pub fn handle_click(&mut self, point: DVec2, host: &mut dyn Host, cx: &FrameContext) -> bool {
        for (row, i) in self.render_keys().into_iter().rev() {
            let Some(proxy) = self.rows.values().nth(row).and_then(|r| r.proxies.get(i)) else {
                continue;
            };
            if let Some(hit) = proxy.on_mouse_click(&mut self.scene, point) {
                if let Some(ElementAction::CloseWindow(window)) = hit.action {
                    debug!(%window, "close requested");
                    host.close_window(window);
                    return true;
                }
                break;
            }
        }
        self.window_picked(point, host, cx)
    }

    pub fn handle_mouse_move(&mut self, point: DVec2) -> bool {
        let mut any = false;
        for (row, i) in self.render_keys() {
            let Some(proxy) = self.rows.values().nth(row).and_then(|r| r.proxies.get(i)) else {
                continue;
            };
            any |= proxy.on_mouse_move(&mut self.scene, point);
        }
        any
    }

    pub fn layout_snapshot(&self) -> Vec<ProxyLayout> {
        let selected = self.selected_window();
        let mut out = Vec::new();
        for (row_idx, (monitor, row)) in self.rows.iter().enumerate() {
            for (index, proxy) in row.proxies.iter().enumerate() {
                if proxy.should_be_removed(&self.scene) {
                    continue;
                }
                let target = proxy.target_bounds(&self.scene);
                out.push(ProxyLayout {
                    window: proxy.window(),
                    monitor: *monitor,
                    row: row_idx,
                    index,
                    selected: row_idx == self.active_row && selected == Some(proxy.window()),
                    position: [target.origin.x, target.origin.y],
                    size: [target.size.x, target.size.y],
                    alpha: proxy.target_alpha(&self.scene),
                    title: proxy.title(&self.scene),
                });
            }
        }
        out
    }

    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        for proxy in self.rows.values().flat_map(|r| r.proxies.iter()) {
            out.push_str(&proxy.debug_tree(&self.scene));
        }
        if out.is_empty() {
            warn!("debug tree requested with no proxies");
        }
        out
    }
}
