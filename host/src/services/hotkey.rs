//! Global hotkey descriptions and modifier tracking

use rdev::{EventType, Key};
use std::fmt;

use crate::error::{HostError, HostResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Hotkey {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Parse an accelerator like `"/"`, `"Ctrl+Shift+O"` or `"CmdOrCtrl+F2"`
    pub fn parse(s: &str) -> HostResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(HostError::config("hotkey must not be empty"));
        }

        // A bare "+" would otherwise split into nothing.
        if trimmed == "+" {
            return Ok(Hotkey {
                shift: true,
                ..Hotkey::plain(Key::Equal)
            });
        }

        let mut hotkey = Hotkey::plain(Key::Unknown(0));
        let mut key = None;

        for part in trimmed.split('+') {
            let upper = part.trim().to_ascii_uppercase();
            match upper.as_str() {
                "CTRL" | "CONTROL" => hotkey.ctrl = true,
                "SHIFT" => hotkey.shift = true,
                "ALT" | "OPTION" => hotkey.alt = true,
                "META" | "CMD" | "COMMAND" | "SUPER" | "WIN" => hotkey.meta = true,
                "CMDORCTRL" | "COMMANDORCONTROL" => {
                    if cfg!(target_os = "macos") {
                        hotkey.meta = true;
                    } else {
                        hotkey.ctrl = true;
                    }
                }
                "" => {}
                other => match parse_key(other) {
                    Some(k) if key.is_none() => key = Some(k),
                    _ => return Err(HostError::config(format!("unsupported hotkey '{s}'"))),
                },
            }
        }

        match key {
            Some(key) => Ok(Hotkey { key, ..hotkey }),
            None => Err(HostError::config(format!("hotkey '{s}' has no key"))),
        }
    }

    pub fn matches(&self, key: Key, modifiers: &Modifiers) -> bool {
        self.key == key
            && self.ctrl == modifiers.ctrl
            && self.shift == modifiers.shift
            && self.alt == modifiers.alt
            && self.meta == modifiers.meta
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (held, name) in [
            (self.ctrl, "Ctrl+"),
            (self.shift, "Shift+"),
            (self.alt, "Alt+"),
            (self.meta, "Meta+"),
        ] {
            if held {
                f.write_str(name)?;
            }
        }
        match self.key {
            Key::Slash => f.write_str("/"),
            other => write!(f, "{other:?}"),
        }
    }
}

fn parse_key(upper: &str) -> Option<Key> {
    let key = match upper {
        "/" | "SLASH" => Key::Slash,
        "\\" | "BACKSLASH" => Key::BackSlash,
        "." | "PERIOD" | "DOT" => Key::Dot,
        "," | "COMMA" => Key::Comma,
        ";" | "SEMICOLON" => Key::SemiColon,
        "'" | "QUOTE" => Key::Quote,
        "`" | "BACKQUOTE" => Key::BackQuote,
        "-" | "MINUS" => Key::Minus,
        "=" | "EQUAL" => Key::Equal,
        "[" => Key::LeftBracket,
        "]" => Key::RightBracket,
        "SPACE" => Key::Space,
        "TAB" => Key::Tab,
        "ENTER" | "RETURN" => Key::Return,
        "ESC" | "ESCAPE" => Key::Escape,
        "CAPSLOCK" => Key::CapsLock,
        _ if upper.len() == 1 => return parse_char(upper.chars().next()?),
        _ if upper.starts_with('F') => return parse_function_key(upper[1..].parse().ok()?),
        _ => return None,
    };
    Some(key)
}

fn parse_char(c: char) -> Option<Key> {
    let key = match c {
        'A' => Key::KeyA,
        'B' => Key::KeyB,
        'C' => Key::KeyC,
        'D' => Key::KeyD,
        'E' => Key::KeyE,
        'F' => Key::KeyF,
        'G' => Key::KeyG,
        'H' => Key::KeyH,
        'I' => Key::KeyI,
        'J' => Key::KeyJ,
        'K' => Key::KeyK,
        'L' => Key::KeyL,
        'M' => Key::KeyM,
        'N' => Key::KeyN,
        'O' => Key::KeyO,
        'P' => Key::KeyP,
        'Q' => Key::KeyQ,
        'R' => Key::KeyR,
        'S' => Key::KeyS,
        'T' => Key::KeyT,
        'U' => Key::KeyU,
        'V' => Key::KeyV,
        'W' => Key::KeyW,
        'X' => Key::KeyX,
        'Y' => Key::KeyY,
        'Z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        _ => return None,
    };
    Some(key)
}

fn parse_function_key(n: u8) -> Option<Key> {
    let key = match n {
        1 => Key::F1,
        2 => Key::F2,
        3 => Key::F3,
        4 => Key::F4,
        5 => Key::F5,
        6 => Key::F6,
        7 => Key::F7,
        8 => Key::F8,
        9 => Key::F9,
        10 => Key::F10,
        11 => Key::F11,
        12 => Key::F12,
        _ => return None,
    };
    Some(key)
}

/// Modifier state reconstructed from the raw key stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Fold a key event into the state; returns true when it was a modifier
    pub fn update(&mut self, event: &EventType) -> bool {
        let (key, down) = match event {
            EventType::KeyPress(key) => (*key, true),
            EventType::KeyRelease(key) => (*key, false),
            _ => return false,
        };

        match key {
            Key::ControlLeft | Key::ControlRight => self.ctrl = down,
            Key::ShiftLeft | Key::ShiftRight => self.shift = down,
            Key::Alt | Key::AltGr => self.alt = down,
            Key::MetaLeft | Key::MetaRight => self.meta = down,
            _ => return false,
        }
        true
    }
}
