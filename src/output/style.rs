use std::sync::atomic::{AtomicBool, Ordering};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Clone, Copy)]
enum Tone {
    Bold,
    Muted,
    Green,
    Red,
    Cyan,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Bold => "1",
            Tone::Muted => "2",
            Tone::Green => "32",
            Tone::Red => "31",
            Tone::Cyan => "96",
        }
    }
}

/// Enables or disables ANSI styling. `NO_COLOR` and `TERM=dumb` disable it,
/// `CLICOLOR_FORCE=1` wins over both.
pub fn configure(no_color: bool) {
    let mut enabled = !no_color;

    if std::env::var_os("NO_COLOR").is_some() {
        enabled = false;
    }

    if let Ok(term) = std::env::var("TERM")
        && term.eq_ignore_ascii_case("dumb")
    {
        enabled = false;
    }

    if std::env::var("CLICOLOR_FORCE").ok().as_deref() == Some("1") {
        enabled = true;
    }

    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn paint(tone: Tone, text: &str) -> String {
    if text.is_empty() || !COLORS_ENABLED.load(Ordering::Relaxed) {
        return text.to_string();
    }

    format!("\x1b[{}m{text}\x1b[0m", tone.code())
}

pub fn bold(text: &str) -> String {
    paint(Tone::Bold, text)
}

pub fn muted(text: &str) -> String {
    paint(Tone::Muted, text)
}

pub fn success(text: &str) -> String {
    paint(Tone::Green, text)
}

pub fn failure(text: &str) -> String {
    paint(Tone::Red, text)
}

pub fn info(text: &str) -> String {
    paint(Tone::Cyan, text)
}

pub fn command(text: &str) -> String {
    paint(Tone::Cyan, text)
}

pub fn number(text: &str) -> String {
    paint(Tone::Cyan, text)
}
