use colored::{Color, Colorize};
use log::{Level, LevelFilter};
use std::io::Write;

struct LevelStyle {
    label: &'static str,
    color: Color,
    bold: bool,
}

// Indexed by `Level as usize - 1` (Error = 1 .. Trace = 5).
static LEVEL_STYLES: [LevelStyle; 5] = [
    LevelStyle {
        label: "ERROR",
        color: Color::Red,
        bold: true,
    },
    LevelStyle {
        label: "WARN",
        color: Color::Yellow,
        bold: true,
    },
    LevelStyle {
        label: "INFO",
        color: Color::Green,
        bold: false,
    },
    LevelStyle {
        label: "DEBUG",
        color: Color::Cyan,
        bold: false,
    },
    LevelStyle {
        label: "TRACE",
        color: Color::BrightBlack,
        bold: false,
    },
];

fn style_for(level: Level) -> &'static LevelStyle {
    &LEVEL_STYLES[level as usize - 1]
}

pub fn paint(level: Level, text: &str) -> String {
    let style = style_for(level);
    let colored = text.color(style.color);
    if style.bold {
        colored.bold().to_string()
    } else {
        colored.to_string()
    }
}

pub fn init(verbose: bool) {
    let default_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            let timestamp = chrono::Local::now().format("%b %d %H:%M:%S").to_string();
            let pid = std::process::id();
            let level = record.level();
            writeln!(
                buf,
                "{} server-bootstrap[{}]: {} {}",
                timestamp,
                pid,
                paint(level, style_for(level).label),
                record.args()
            )
        })
        .filter(None, default_filter)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_table_matches_levels() {
        for level in [
            Level::Error,
            Level::Warn,
            Level::Info,
            Level::Debug,
            Level::Trace,
        ] {
            assert_eq!(style_for(level).label, level.as_str());
        }
    }

    #[test]
    fn test_paint_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(paint(Level::Error, "boom"), "boom");
    }
}
