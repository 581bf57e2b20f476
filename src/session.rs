use std::num::NonZeroUsize;

use anyhow::Result;
use macroquad::{color::Color, math::Vec2};

use crate::export::{decode_image, encode_png};
use crate::history::History;
use crate::input::{InputEvent, KeyChord, PointerTracker, ShortcutAction, Shortcuts, SurfaceBounds};
use crate::stroke::{paint_segment, StrokeStyle};
use crate::surface::DrawingSurface;

pub const WHITE_RGB: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub style: StrokeStyle,
    pub history_limit: Option<NonZeroUsize>,
    pub shortcuts: Shortcuts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBackground {
    /// Raw bitmap, untouched pixels stay transparent.
    Transparent,
    /// Flattened over an opaque color.
    Solid([u8; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type SurfaceListener = Box<dyn FnMut(&DrawingSurface)>;

struct Mounted {
    surface: DrawingSurface,
    bounds: SurfaceBounds,
}

/// One drawing component instance, from mount to unmount.
///
/// Input only reaches the session between [`mount`](Self::mount) and
/// [`unmount`](Self::unmount); before that, or after, every operation is a
/// silent no-op. Strokes are recorded as one undo step each: the surface is
/// captured when the pointer goes down, before any of the stroke is painted.
pub struct DrawingSession {
    mounted: Option<Mounted>,
    tracker: PointerTracker,
    history: History,
    style: StrokeStyle,
    shortcuts: Shortcuts,
    listeners: Vec<(ListenerId, SurfaceListener)>,
    next_listener: u64,
}

impl DrawingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            mounted: None,
            tracker: PointerTracker::new(),
            history: History::with_limit(config.history_limit),
            style: config.style,
            shortcuts: config.shortcuts,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Creates a blank surface sized to `bounds` and starts accepting input.
    pub fn mount(&mut self, bounds: SurfaceBounds) {
        if self.mounted.is_some() {
            self.unmount();
        }
        tracing::debug!(
            width = bounds.width,
            height = bounds.height,
            x = bounds.origin.x,
            y = bounds.origin.y,
            "mount drawing session"
        );
        self.mounted = Some(Mounted {
            surface: DrawingSurface::new(bounds.width, bounds.height),
            bounds,
        });
    }

    /// Stops accepting input and drops the surface, history and listeners.
    pub fn unmount(&mut self) {
        if self.mounted.take().is_none() {
            return;
        }
        tracing::debug!(listeners = self.listeners.len(), "unmount drawing session");
        self.tracker = PointerTracker::new();
        self.history.reset();
        self.listeners.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.mounted.as_ref().map(|m| &m.surface)
    }

    pub fn bounds(&self) -> Option<SurfaceBounds> {
        self.mounted.as_ref().map(|m| m.bounds)
    }

    /// Moves the surface on screen without touching its content.
    pub fn set_origin(&mut self, origin: Vec2) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.bounds.origin = origin;
        }
    }

    /// Replaces the surface with a blank one of the new size. Content and
    /// history are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if (mounted.bounds.width, mounted.bounds.height) == (width, height) {
            return;
        }
        tracing::debug!(width, height, "resize surface, history reset");
        mounted.bounds.width = width;
        mounted.bounds.height = height;
        mounted.surface = DrawingSurface::new(width, height);
        self.tracker = PointerTracker::new();
        self.history.reset();
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        self.style
    }

    /// Applies to segments painted from now on.
    pub fn set_stroke_color(&mut self, color: Color) {
        self.style.color = color;
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.style.width = width.max(0.0);
    }

    pub fn shortcuts(&self) -> &Shortcuts {
        &self.shortcuts
    }

    pub fn is_pointer_down(&self) -> bool {
        self.tracker.is_pressed()
    }

    pub fn can_undo(&self) -> bool {
        self.is_mounted() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_mounted() && self.history.can_redo()
    }

    pub fn is_blank(&self) -> bool {
        self.surface().map_or(true, DrawingSurface::is_blank)
    }

    pub fn begin_stroke(&mut self) {
        if self.tracker.is_pressed() {
            self.end_stroke();
        }
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        self.tracker.on_pointer_down();
        self.history.capture_for_undo(&mounted.surface);
    }

    /// Starts a stroke and paints its first dot at `screen`.
    pub fn begin_stroke_at(&mut self, screen: Vec2) {
        self.begin_stroke();
        self.continue_stroke(screen);
    }

    /// Extends the current stroke to `screen`. Returns whether anything was painted.
    pub fn continue_stroke(&mut self, screen: Vec2) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let Some(point) = self.tracker.on_pointer_move(screen, &mounted.bounds) else {
            return false;
        };
        let style = self.style;
        paint_segment(&mut mounted.surface, self.tracker.last_point(), point, &style);
        self.tracker.advance(point);
        true
    }

    /// Releases the pointer and notifies listeners, whether or not a stroke
    /// was in progress.
    pub fn end_stroke(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.release_pointer();
        self.notify_changed();
    }

    /// Clears the surface as one undoable step. Does nothing on a blank surface.
    pub fn clear_surface(&mut self) -> bool {
        let ended = self.release_pointer();
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let changed = !mounted.surface.is_blank();
        if changed {
            self.history.capture_for_clear(&mounted.surface);
            mounted.surface.clear();
            tracing::debug!("surface cleared");
        }
        if changed || ended {
            self.notify_changed();
        }
        changed
    }

    pub fn undo(&mut self) -> bool {
        let ended = self.release_pointer();
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let changed = self.history.undo(&mut mounted.surface);
        if changed || ended {
            self.notify_changed();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let ended = self.release_pointer();
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let changed = self.history.redo(&mut mounted.surface);
        if changed || ended {
            self.notify_changed();
        }
        changed
    }

    // Ends a stroke in progress without notifying. Returns whether one was.
    fn release_pointer(&mut self) -> bool {
        if !self.tracker.is_pressed() {
            return false;
        }
        self.tracker.on_pointer_up();
        true
    }

    /// Routes one input event. Shortcut actions the session does not handle
    /// itself (export, import) are handed back to the caller.
    pub fn dispatch(&mut self, event: InputEvent) -> Option<ShortcutAction> {
        let bounds = self.bounds()?;
        match event {
            InputEvent::PointerDown(screen) => {
                if bounds.contains(screen) {
                    self.begin_stroke_at(screen);
                }
                None
            }
            InputEvent::PointerMove(screen) => {
                self.continue_stroke(screen);
                None
            }
            // released anywhere, not only over the surface
            InputEvent::PointerUp(_) => {
                self.end_stroke();
                None
            }
            InputEvent::Key(chord) => self.handle_shortcut(chord),
        }
    }

    pub fn handle_shortcut(&mut self, chord: KeyChord) -> Option<ShortcutAction> {
        if !self.is_mounted() {
            return None;
        }
        let action = self.shortcuts.action_for(chord)?;
        match action {
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::Clear => {
                self.clear_surface();
            }
            ShortcutAction::Export | ShortcutAction::Import => {}
        }
        Some(action)
    }

    /// Registers a "surface changed" listener. Listeners run on every
    /// [`end_stroke`](Self::end_stroke) and after every effective undo, redo,
    /// clear or import.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&DrawingSurface) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Current content as a PNG, or `None` when not mounted.
    pub fn export_png(&self, background: ExportBackground) -> Result<Option<Vec<u8>>> {
        let Some(surface) = self.surface() else {
            return Ok(None);
        };
        let png = match background {
            ExportBackground::Transparent => {
                encode_png(surface.width(), surface.height(), surface.pixels())?
            }
            ExportBackground::Solid(rgb) => {
                encode_png(surface.width(), surface.height(), &surface.flatten_onto(rgb))?
            }
        };
        Ok(Some(png))
    }

    /// Paints an encoded image at the surface origin and records the result
    /// as the new undo baseline.
    pub fn import_image(&mut self, bytes: &[u8]) -> Result<bool> {
        if !self.is_mounted() {
            return Ok(false);
        }
        let image = decode_image(bytes)?;
        self.release_pointer();

        let Some(mounted) = self.mounted.as_mut() else {
            return Ok(false);
        };
        if image.width > mounted.surface.width() || image.height > mounted.surface.height() {
            tracing::debug!(
                image_width = image.width,
                image_height = image.height,
                "imported image clipped to surface"
            );
        }
        mounted.surface.draw_image(&image.rgba, image.width, image.height);
        self.history.capture_for_undo(&mounted.surface);
        self.notify_changed();
        Ok(true)
    }

    fn notify_changed(&mut self) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&mounted.surface);
        }
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::parse_hex_color;
    use macroquad::math::vec2;
    use std::cell::Cell;
    use std::rc::Rc;

    fn mounted(width: u32, height: u32) -> DrawingSession {
        let mut session = DrawingSession::default();
        session.mount(SurfaceBounds::new(Vec2::ZERO, width, height));
        session
    }

    #[test]
    fn unmounted_session_ignores_everything() {
        let mut session = DrawingSession::default();
        session.begin_stroke_at(vec2(1.0, 1.0));
        assert!(!session.continue_stroke(vec2(2.0, 2.0)));
        assert!(!session.undo());
        assert!(!session.clear_surface());
        assert!(session.is_blank());
        assert!(!session.can_undo());
        assert_eq!(session.dispatch(InputEvent::pointer_down(1.0, 1.0)), None);
        assert_eq!(session.export_png(ExportBackground::Transparent).unwrap(), None);
    }

    #[test]
    fn pointer_down_outside_surface_does_not_start_a_stroke() {
        let mut session = DrawingSession::default();
        session.mount(SurfaceBounds::new(vec2(50.0, 50.0), 10, 10));
        session.dispatch(InputEvent::pointer_down(10.0, 10.0));
        assert!(!session.is_pointer_down());
        assert!(!session.can_undo());
    }

    #[test]
    fn origin_offset_is_applied_to_points() {
        let mut session = DrawingSession::default();
        session.mount(SurfaceBounds::new(vec2(100.0, 100.0), 20, 20));
        session.dispatch(InputEvent::pointer_down(105.0, 107.0));
        session.dispatch(InputEvent::pointer_up(105.0, 107.0));
        let surface = session.surface().unwrap();
        assert_eq!(surface.pixel(5, 7), Some([0, 0, 0, 255]));
    }

    #[test]
    fn undo_mid_stroke_removes_the_whole_stroke() {
        let mut session = mounted(30, 30);
        session.begin_stroke_at(vec2(5.0, 5.0));
        session.continue_stroke(vec2(20.0, 5.0));
        assert!(session.undo());
        assert!(!session.is_pointer_down());
        assert!(session.is_blank());
        assert!(!session.continue_stroke(vec2(25.0, 25.0)));
    }

    #[test]
    fn listeners_fire_on_end_stroke_and_can_be_removed() {
        let mut session = mounted(10, 10);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let id = session.subscribe(move |surface| {
            assert!(!surface.is_blank());
            seen.set(seen.get() + 1);
        });

        session.begin_stroke_at(vec2(3.0, 3.0));
        session.end_stroke();
        assert_eq!(calls.get(), 1);

        // a release with no stroke in progress still notifies
        session.end_stroke();
        assert_eq!(calls.get(), 2);
        session.dispatch(InputEvent::pointer_up(500.0, 500.0));
        assert_eq!(calls.get(), 3);

        assert!(session.unsubscribe(id));
        session.begin_stroke_at(vec2(4.0, 4.0));
        session.end_stroke();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn undo_mid_stroke_notifies_once() {
        let mut session = mounted(10, 10);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        session.subscribe(move |_| seen.set(seen.get() + 1));

        session.begin_stroke_at(vec2(3.0, 3.0));
        assert!(session.undo());
        assert_eq!(calls.get(), 1);

        // nothing left to undo, no stroke to end
        assert!(!session.undo());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn end_stroke_while_unmounted_notifies_nobody() {
        let mut session = mounted(10, 10);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        session.subscribe(move |_| seen.set(seen.get() + 1));
        session.unmount();
        session.end_stroke();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn unmount_drops_listeners_and_history() {
        let mut session = mounted(10, 10);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        session.subscribe(move |_| seen.set(seen.get() + 1));
        session.begin_stroke_at(vec2(3.0, 3.0));
        session.end_stroke();

        session.unmount();
        assert!(!session.is_mounted());
        assert!(!session.can_undo());

        session.mount(SurfaceBounds::new(Vec2::ZERO, 10, 10));
        session.begin_stroke_at(vec2(3.0, 3.0));
        session.end_stroke();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn resize_blanks_surface_and_resets_history() {
        let mut session = mounted(10, 10);
        session.begin_stroke_at(vec2(3.0, 3.0));
        session.end_stroke();
        assert!(session.can_undo());

        session.resize(20, 15);
        let surface = session.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (20, 15));
        assert!(session.is_blank());
        assert!(!session.can_undo());
        assert!(!session.undo());
    }

    #[test]
    fn shortcut_chords_drive_history() {
        let mut session = mounted(10, 10);
        session.begin_stroke_at(vec2(3.0, 3.0));
        session.end_stroke();

        let undo = crate::input::parse_chord("Ctrl+Z").unwrap();
        let redo = crate::input::parse_chord("Ctrl+Y").unwrap();
        let export = crate::input::parse_chord("Ctrl+S").unwrap();

        assert_eq!(
            session.dispatch(InputEvent::Key(undo)),
            Some(ShortcutAction::Undo)
        );
        assert!(session.is_blank());
        assert_eq!(
            session.dispatch(InputEvent::Key(redo)),
            Some(ShortcutAction::Redo)
        );
        assert!(!session.is_blank());
        assert_eq!(
            session.dispatch(InputEvent::Key(export)),
            Some(ShortcutAction::Export)
        );
        assert!(!session.is_blank());
    }

    #[test]
    fn import_paints_image_and_seeds_undo_baseline() {
        let mut source = mounted(4, 4);
        source.set_stroke_color(parse_hex_color("#FF0000").unwrap());
        source.begin_stroke_at(vec2(1.0, 1.0));
        source.end_stroke();
        let png = source
            .export_png(ExportBackground::Transparent)
            .unwrap()
            .unwrap();

        let mut session = mounted(4, 4);
        assert!(session.import_image(&png).unwrap());
        assert_eq!(session.surface().unwrap().pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(session.history().undo_len(), 1);
        assert!(!session.can_redo());
    }

    #[test]
    fn import_of_garbage_fails_without_touching_the_surface() {
        let mut session = mounted(4, 4);
        assert!(session.import_image(b"nope").is_err());
        assert!(session.is_blank());
        assert!(!session.can_undo());
    }
}
