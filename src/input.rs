use macroquad::math::{vec2, Vec2};

use crate::stroke::Point;

/// Where the surface sits on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub origin: Vec2,
    pub width: u32,
    pub height: u32,
}

impl SurfaceBounds {
    pub fn new(origin: Vec2, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    pub fn contains(&self, screen: Vec2) -> bool {
        let local = screen - self.origin;
        local.x >= 0.0
            && local.y >= 0.0
            && local.x < self.width as f32
            && local.y < self.height as f32
    }

    pub fn to_local(&self, screen: Vec2) -> Point {
        screen - self.origin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }
}

/// Parse a chord string like "Ctrl+Shift+Z".
pub fn parse_chord(s: &str) -> Option<KeyChord> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut key: Option<Key> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" | "CMD" => ctrl = true,
            "SHIFT" => shift = true,
            "ALT" => alt = true,
            "" => {}
            _ => key = Some(parse_key(&upper)?),
        }
    }

    key.map(|key| KeyChord {
        key,
        ctrl,
        shift,
        alt,
    })
}

fn parse_key(upper: &str) -> Option<Key> {
    match upper {
        "BACKSPACE" => Some(Key::Backspace),
        "DELETE" | "DEL" => Some(Key::Delete),
        "ESC" | "ESCAPE" => Some(Key::Escape),
        _ => {
            let mut chars = upper.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Some(Key::Char(c)),
                _ => None,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    Clear,
    Export,
    Import,
}

/// Keyboard chord to action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcuts {
    bindings: Vec<(KeyChord, ShortcutAction)>,
}

impl Default for Shortcuts {
    fn default() -> Self {
        let mut shortcuts = Self::empty();
        shortcuts.bind(KeyChord::ctrl(Key::Char('Z')), ShortcutAction::Undo);
        shortcuts.bind(
            KeyChord {
                shift: true,
                ..KeyChord::ctrl(Key::Char('Z'))
            },
            ShortcutAction::Redo,
        );
        shortcuts.bind(KeyChord::ctrl(Key::Char('Y')), ShortcutAction::Redo);
        shortcuts.bind(KeyChord::ctrl(Key::Backspace), ShortcutAction::Clear);
        shortcuts.bind(KeyChord::ctrl(Key::Char('S')), ShortcutAction::Export);
        shortcuts.bind(KeyChord::ctrl(Key::Char('O')), ShortcutAction::Import);
        shortcuts
    }
}

impl Shortcuts {
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Later bindings for the same chord replace earlier ones.
    pub fn bind(&mut self, chord: KeyChord, action: ShortcutAction) {
        self.bindings.retain(|(c, _)| *c != chord);
        self.bindings.push((chord, action));
    }

    pub fn action_for(&self, chord: KeyChord) -> Option<ShortcutAction> {
        self.bindings
            .iter()
            .find(|(c, _)| *c == chord)
            .map(|(_, action)| *action)
    }

    pub fn chords_for(&self, action: ShortcutAction) -> impl Iterator<Item = KeyChord> + '_ {
        self.bindings
            .iter()
            .filter(move |(_, a)| *a == action)
            .map(|(c, _)| *c)
    }
}

/// Raw input delivered to a session, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Vec2),
    PointerMove(Vec2),
    PointerUp(Vec2),
    Key(KeyChord),
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown(vec2(x, y))
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove(vec2(x, y))
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp(vec2(x, y))
    }
}

/// One frame of polled mouse button state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerFrame {
    pub position: Vec2,
    pub previous: Vec2,
    pub pressed: bool,
    pub held: bool,
    pub released: bool,
}

impl PointerFrame {
    /// Pointer events for this frame in arrival order. A release after
    /// movement gets a move to the release point first, so the stroke
    /// reaches where the button came up.
    pub fn events(&self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let moved = self.position != self.previous;
        if self.pressed {
            events.push(InputEvent::PointerDown(self.position));
        } else if moved && (self.held || self.released) {
            events.push(InputEvent::PointerMove(self.position));
        }
        if self.released {
            events.push(InputEvent::PointerUp(self.position));
        }
        events
    }
}

/// Pressed/released state of the pointer and the previous point of the
/// stroke in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerTracker {
    pressed: bool,
    last_point: Option<Point>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn last_point(&self) -> Option<Point> {
        self.last_point
    }

    pub fn on_pointer_down(&mut self) {
        self.pressed = true;
        self.last_point = None;
    }

    /// Surface-local position of a move event, or `None` while released.
    pub fn on_pointer_move(&self, screen: Vec2, bounds: &SurfaceBounds) -> Option<Point> {
        if !self.pressed {
            return None;
        }
        Some(bounds.to_local(screen))
    }

    /// Records `point` as the start of the next segment.
    pub fn advance(&mut self, point: Point) {
        if self.pressed {
            self.last_point = Some(point);
        }
    }

    pub fn on_pointer_up(&mut self) {
        self.pressed = false;
        self.last_point = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SurfaceBounds {
        SurfaceBounds::new(vec2(100.0, 50.0), 200, 100)
    }

    #[test]
    fn moves_are_ignored_while_released() {
        let tracker = PointerTracker::new();
        assert_eq!(tracker.on_pointer_move(vec2(150.0, 60.0), &bounds()), None);
    }

    #[test]
    fn moves_are_converted_to_surface_coordinates() {
        let mut tracker = PointerTracker::new();
        tracker.on_pointer_down();
        assert_eq!(
            tracker.on_pointer_move(vec2(150.0, 60.0), &bounds()),
            Some(vec2(50.0, 10.0))
        );
    }

    #[test]
    fn release_forgets_last_point() {
        let mut tracker = PointerTracker::new();
        tracker.on_pointer_down();
        tracker.advance(vec2(1.0, 2.0));
        assert_eq!(tracker.last_point(), Some(vec2(1.0, 2.0)));

        tracker.on_pointer_up();
        assert!(!tracker.is_pressed());
        assert_eq!(tracker.last_point(), None);

        tracker.advance(vec2(3.0, 4.0));
        assert_eq!(tracker.last_point(), None);
    }

    #[test]
    fn bounds_contain_only_the_surface_area() {
        let b = bounds();
        assert!(b.contains(vec2(100.0, 50.0)));
        assert!(b.contains(vec2(299.0, 149.0)));
        assert!(!b.contains(vec2(300.0, 60.0)));
        assert!(!b.contains(vec2(99.0, 60.0)));
    }

    #[test]
    fn chords_parse_modifiers_and_keys() {
        let chord = parse_chord("Ctrl+Shift+z").unwrap();
        assert_eq!(chord.key, Key::Char('Z'));
        assert!(chord.ctrl && chord.shift && !chord.alt);

        assert_eq!(
            parse_chord("ctrl + backspace"),
            Some(KeyChord::ctrl(Key::Backspace))
        );
        assert_eq!(parse_chord("Ctrl+F13"), None);
        assert_eq!(parse_chord("Ctrl"), None);
    }

    #[test]
    fn default_shortcuts_cover_undo_and_redo() {
        let shortcuts = Shortcuts::default();
        assert_eq!(
            shortcuts.action_for(parse_chord("Ctrl+Z").unwrap()),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            shortcuts.action_for(parse_chord("Ctrl+Shift+Z").unwrap()),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            shortcuts.action_for(parse_chord("Ctrl+Y").unwrap()),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(shortcuts.action_for(KeyChord::plain(Key::Char('Z'))), None);
    }

    #[test]
    fn rebinding_a_chord_replaces_its_action() {
        let mut shortcuts = Shortcuts::empty();
        let chord = KeyChord::ctrl(Key::Char('R'));
        shortcuts.bind(chord, ShortcutAction::Undo);
        shortcuts.bind(chord, ShortcutAction::Redo);
        assert_eq!(shortcuts.action_for(chord), Some(ShortcutAction::Redo));
        assert_eq!(shortcuts.chords_for(ShortcutAction::Undo).count(), 0);
    }

    fn frame(from: (f32, f32), to: (f32, f32)) -> PointerFrame {
        PointerFrame {
            position: vec2(to.0, to.1),
            previous: vec2(from.0, from.1),
            pressed: false,
            held: false,
            released: false,
        }
    }

    #[test]
    fn release_after_movement_moves_to_the_release_point_first() {
        let events = PointerFrame {
            released: true,
            ..frame((10.0, 10.0), (30.0, 12.0))
        }
        .events();
        assert_eq!(
            events,
            vec![
                InputEvent::pointer_move(30.0, 12.0),
                InputEvent::pointer_up(30.0, 12.0)
            ]
        );
    }

    #[test]
    fn still_pointer_emits_only_button_edges() {
        let still = frame((5.0, 5.0), (5.0, 5.0));
        assert!(PointerFrame { held: true, ..still }.events().is_empty());
        assert_eq!(
            PointerFrame { released: true, ..still }.events(),
            vec![InputEvent::pointer_up(5.0, 5.0)]
        );
        assert_eq!(
            PointerFrame { pressed: true, held: true, ..frame((0.0, 0.0), (5.0, 5.0)) }.events(),
            vec![InputEvent::pointer_down(5.0, 5.0)]
        );
        assert!(frame((0.0, 0.0), (5.0, 5.0)).events().is_empty());
    }
}
