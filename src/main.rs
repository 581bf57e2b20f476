use std::cell::RefCell;
use std::rc::Rc;

use macroquad::prelude::*;
use rfd::FileDialog;
use sketch_canvas::config::{Settings, SETTINGS_FILE};
use sketch_canvas::export::save_png;
use sketch_canvas::input::{InputEvent, Key, KeyChord, PointerFrame, ShortcutAction, SurfaceBounds};
use sketch_canvas::session::{DrawingSession, ExportBackground, WHITE_RGB};
use sketch_canvas::{logging, DrawingSurface};

const MARGIN: f32 = 20.0;
const TOOLBAR_HEIGHT: f32 = 100.0;
const SWATCH_RADIUS: f32 = 12.0;
const BUTTON_W: f32 = 110.0;
const BUTTON_H: f32 = 32.0;

#[derive(Clone, Copy, PartialEq)]
enum ButtonAction {
    Undo,
    Redo,
    Clear,
    Download,
    Open,
}

struct Button {
    rect: Rect,
    label: &'static str,
    action: ButtonAction,
}

fn window_conf() -> Conf {
    let settings = Settings::load(SETTINGS_FILE).unwrap_or_default();
    let (w, h) = settings.canvas_size();
    Conf {
        window_title: "Sketch Canvas".to_owned(),
        window_width: (w as f32 + MARGIN * 2.0) as i32,
        window_height: (h as f32 + MARGIN * 2.0 + TOOLBAR_HEIGHT) as i32,
        ..Default::default()
    }
}

fn key_from_code(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::A => Key::Char('A'),
        KeyCode::B => Key::Char('B'),
        KeyCode::C => Key::Char('C'),
        KeyCode::D => Key::Char('D'),
        KeyCode::E => Key::Char('E'),
        KeyCode::F => Key::Char('F'),
        KeyCode::G => Key::Char('G'),
        KeyCode::H => Key::Char('H'),
        KeyCode::I => Key::Char('I'),
        KeyCode::J => Key::Char('J'),
        KeyCode::K => Key::Char('K'),
        KeyCode::L => Key::Char('L'),
        KeyCode::M => Key::Char('M'),
        KeyCode::N => Key::Char('N'),
        KeyCode::O => Key::Char('O'),
        KeyCode::P => Key::Char('P'),
        KeyCode::Q => Key::Char('Q'),
        KeyCode::R => Key::Char('R'),
        KeyCode::S => Key::Char('S'),
        KeyCode::T => Key::Char('T'),
        KeyCode::U => Key::Char('U'),
        KeyCode::V => Key::Char('V'),
        KeyCode::W => Key::Char('W'),
        KeyCode::X => Key::Char('X'),
        KeyCode::Y => Key::Char('Y'),
        KeyCode::Z => Key::Char('Z'),
        KeyCode::Key0 => Key::Char('0'),
        KeyCode::Key1 => Key::Char('1'),
        KeyCode::Key2 => Key::Char('2'),
        KeyCode::Key3 => Key::Char('3'),
        KeyCode::Key4 => Key::Char('4'),
        KeyCode::Key5 => Key::Char('5'),
        KeyCode::Key6 => Key::Char('6'),
        KeyCode::Key7 => Key::Char('7'),
        KeyCode::Key8 => Key::Char('8'),
        KeyCode::Key9 => Key::Char('9'),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

// One frame of mouse and keyboard state, turned into events in arrival order.
fn collect_input(last_mouse: &mut Vec2) -> Vec<InputEvent> {
    let pos = vec2(mouse_position().0, mouse_position().1);
    let mut events = PointerFrame {
        position: pos,
        previous: *last_mouse,
        pressed: is_mouse_button_pressed(MouseButton::Left),
        held: is_mouse_button_down(MouseButton::Left),
        released: is_mouse_button_released(MouseButton::Left),
    }
    .events();
    *last_mouse = pos;

    let ctrl = is_key_down(KeyCode::LeftControl)
        || is_key_down(KeyCode::RightControl)
        || is_key_down(KeyCode::LeftSuper)
        || is_key_down(KeyCode::RightSuper);
    let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
    let alt = is_key_down(KeyCode::LeftAlt) || is_key_down(KeyCode::RightAlt);
    for code in get_keys_pressed() {
        if let Some(key) = key_from_code(code) {
            events.push(InputEvent::Key(KeyChord {
                key,
                ctrl,
                shift,
                alt,
            }));
        }
    }

    events
}

fn surface_image(surface: &DrawingSurface) -> Option<Image> {
    let width = u16::try_from(surface.width()).ok()?;
    let height = u16::try_from(surface.height()).ok()?;
    Some(Image {
        bytes: surface.pixels().to_vec(),
        width,
        height,
    })
}

fn download(session: &DrawingSession, file_name: &str) {
    let Some(path) = FileDialog::new()
        .add_filter("png", &["png"])
        .set_file_name(file_name)
        .save_file()
    else {
        return;
    };
    let result = session
        .export_png(ExportBackground::Solid(WHITE_RGB))
        .and_then(|png| match png {
            Some(png) => save_png(&path, &png),
            None => Ok(()),
        });
    match result {
        Ok(()) => tracing::info!("sketch saved to {}", path.display()),
        Err(err) => tracing::error!("failed to save sketch: {err:#}"),
    }
}

fn open(session: &mut DrawingSession) {
    let Some(path) = FileDialog::new()
        .add_filter("image", &["png"])
        .pick_file()
    else {
        return;
    };
    let result = std::fs::read(&path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| session.import_image(&bytes));
    match result {
        Ok(_) => tracing::info!("loaded {}", path.display()),
        Err(err) => tracing::warn!("could not load {}: {err:#}", path.display()),
    }
}

fn button_enabled(session: &DrawingSession, action: ButtonAction) -> bool {
    match action {
        ButtonAction::Undo => session.can_undo(),
        ButtonAction::Redo => session.can_redo(),
        ButtonAction::Clear => !session.is_blank(),
        ButtonAction::Download | ButtonAction::Open => true,
    }
}

fn run_action(session: &mut DrawingSession, settings: &Settings, action: ShortcutAction) {
    match action {
        ShortcutAction::Undo => {
            session.undo();
        }
        ShortcutAction::Redo => {
            session.redo();
        }
        ShortcutAction::Clear => {
            session.clear_surface();
        }
        ShortcutAction::Export => download(session, &settings.export_file_name),
        ShortcutAction::Import => open(session),
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let settings = match Settings::load(SETTINGS_FILE) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid {SETTINGS_FILE}, using defaults: {err}");
            Settings::default()
        }
    };
    logging::init(settings.debug_logging);

    let (canvas_w, canvas_h) = settings.canvas_size();
    let palette = settings.palette_colors();

    let mut session = DrawingSession::new(settings.session_config());
    session.mount(SurfaceBounds::new(vec2(MARGIN, MARGIN), canvas_w, canvas_h));

    // collaborators get the raw bitmap after every committed change
    let latest_sketch: Rc<RefCell<Option<Vec<u8>>>> = Rc::new(RefCell::new(None));
    let handoff = latest_sketch.clone();
    session.subscribe(move |surface| {
        match sketch_canvas::export::encode_png(surface.width(), surface.height(), surface.pixels()) {
            Ok(png) => {
                tracing::debug!(bytes = png.len(), "sketch updated");
                *handoff.borrow_mut() = Some(png);
            }
            Err(err) => tracing::error!("failed to encode sketch: {err:#}"),
        }
    });

    let toolbar_y = MARGIN * 2.0 + canvas_h as f32;
    let buttons_y = toolbar_y + SWATCH_RADIUS * 2.0 + 20.0;
    let buttons: Vec<Button> = [
        ("Undo", ButtonAction::Undo),
        ("Redo", ButtonAction::Redo),
        ("Clear", ButtonAction::Clear),
        ("Download", ButtonAction::Download),
        ("Open", ButtonAction::Open),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (label, action))| Button {
        rect: Rect::new(MARGIN + i as f32 * (BUTTON_W + 10.0), buttons_y, BUTTON_W, BUTTON_H),
        label,
        action,
    })
    .collect();

    let mut texture: Option<Texture2D> = None;
    let mut uploaded_revision: Option<u64> = None;
    let mut last_mouse = vec2(mouse_position().0, mouse_position().1);

    loop {
        let mouse = vec2(mouse_position().0, mouse_position().1);

        for event in collect_input(&mut last_mouse) {
            if let InputEvent::PointerDown(pos) = event {
                for (i, (_, color)) in palette.iter().enumerate() {
                    let center = vec2(
                        MARGIN + SWATCH_RADIUS + i as f32 * (SWATCH_RADIUS * 2.0 + 8.0),
                        toolbar_y + SWATCH_RADIUS,
                    );
                    if pos.distance(center) <= SWATCH_RADIUS {
                        session.set_stroke_color(*color);
                    }
                }
                for button in &buttons {
                    if button.rect.contains(pos) && button_enabled(&session, button.action) {
                        let action = match button.action {
                            ButtonAction::Undo => ShortcutAction::Undo,
                            ButtonAction::Redo => ShortcutAction::Redo,
                            ButtonAction::Clear => ShortcutAction::Clear,
                            ButtonAction::Download => ShortcutAction::Export,
                            ButtonAction::Open => ShortcutAction::Import,
                        };
                        run_action(&mut session, &settings, action);
                    }
                }
            }

            match session.dispatch(event) {
                Some(action @ (ShortcutAction::Export | ShortcutAction::Import)) => {
                    run_action(&mut session, &settings, action)
                }
                _ => {}
            }
        }

        clear_background(Color::new(0.95, 0.96, 0.97, 1.0));

        if let Some(surface) = session.surface() {
            if uploaded_revision != Some(surface.revision()) {
                match (surface_image(surface), &texture) {
                    (Some(image), Some(tex)) => tex.update(&image),
                    (Some(image), None) => {
                        let tex = Texture2D::from_image(&image);
                        tex.set_filter(FilterMode::Nearest);
                        texture = Some(tex);
                    }
                    (None, _) => tracing::error!(
                        width = surface.width(),
                        height = surface.height(),
                        "surface too large for a texture"
                    ),
                }
                uploaded_revision = Some(surface.revision());
            }

            draw_rectangle(MARGIN, MARGIN, canvas_w as f32, canvas_h as f32, WHITE);
            if let Some(tex) = &texture {
                draw_texture(tex, MARGIN, MARGIN, WHITE);
            }
            draw_rectangle_lines(MARGIN, MARGIN, canvas_w as f32, canvas_h as f32, 1.0, BLACK);
        }

        let current = session.stroke_style().color;
        for (i, (_, color)) in palette.iter().enumerate() {
            let cx = MARGIN + SWATCH_RADIUS + i as f32 * (SWATCH_RADIUS * 2.0 + 8.0);
            let cy = toolbar_y + SWATCH_RADIUS;
            draw_circle(cx, cy, SWATCH_RADIUS, *color);
            let ring = if *color == current { 3.0 } else { 1.0 };
            draw_circle_lines(cx, cy, SWATCH_RADIUS, ring, DARKGRAY);
        }

        for button in &buttons {
            let enabled = button_enabled(&session, button.action);
            let hovered = enabled && button.rect.contains(mouse);
            let fill = if hovered { LIGHTGRAY } else { WHITE };
            let text = if enabled { DARKGRAY } else { Color::new(0.6, 0.6, 0.6, 0.5) };
            draw_rectangle(button.rect.x, button.rect.y, button.rect.w, button.rect.h, fill);
            draw_rectangle_lines(button.rect.x, button.rect.y, button.rect.w, button.rect.h, 1.0, GRAY);
            draw_text(button.label, button.rect.x + 12.0, button.rect.y + 22.0, 22.0, text);
        }

        let history = session.history();
        let handoff_bytes = latest_sketch.borrow().as_ref().map_or(0, Vec::len);
        draw_text(
            &format!(
                "undo {}  redo {}  sketch {} KiB",
                history.undo_len(),
                history.redo_len(),
                handoff_bytes / 1024
            ),
            MARGIN + 5.0 * (BUTTON_W + 10.0),
            buttons_y + 22.0,
            18.0,
            GRAY,
        );

        next_frame().await;
    }
}
