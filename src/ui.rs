//! Terminal output: labels, tables, spinners, and link action reports.
//!
//! # No-color detection (in priority order):
//! 1. `--no-color` CLI flag
//! 2. `NO_COLOR` environment variable (any value)
//! 3. `TERM=dumb`
//! 4. `--color always|never`, or a TTY check for `auto`

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use crate::reconciler::{LinkAction, LinkHealth, Reporter};

/// Color mode for output
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            _ => Err(format!("invalid color mode: {}", s)),
        }
    }
}

/// Resolved display settings
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both a TTY and color
    pub spinner_enabled: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(ColorMode::Auto, false)
    }
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let color_enabled = !force_no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::env::var("TERM").map_or(true, |t| t != "dumb")
            && match mode {
                ColorMode::Always => true,
                ColorMode::Never => false,
                ColorMode::Auto => is_tty,
            };

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled: color_enabled && is_tty,
        }
    }

    fn paint(&self, s: &str, style: Style) -> String {
        if self.color_enabled {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    fn label(&self, label: &str, color: AnsiColor) -> String {
        self.paint(label, Style::new().fg_color(Some(Color::Ansi(color))).bold())
    }

    /// Print OK label (green) with message to stdout
    pub fn ok(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("OK", AnsiColor::Green), msg.as_ref());
    }

    /// Print WARN label (yellow) with message to stdout
    pub fn warn(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("WARN", AnsiColor::Yellow), msg.as_ref());
    }

    /// Print ERROR label (red) with message to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        eprintln!("{} {}", self.label("ERROR", AnsiColor::Red), msg.as_ref());
    }

    /// Print INFO label (cyan) with message to stdout
    pub fn info(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("INFO", AnsiColor::Cyan), msg.as_ref());
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(
            s.as_ref(),
            Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
        )
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), Style::new().bold())
    }

    pub fn icon_ok(&self) -> &'static str {
        if self.color_enabled { "✓" } else { "[OK]" }
    }

    pub fn icon_warn(&self) -> &'static str {
        if self.color_enabled { "⚠" } else { "[!]" }
    }

    pub fn icon_err(&self) -> &'static str {
        if self.color_enabled { "✗" } else { "[X]" }
    }

    pub fn icon_info(&self) -> &'static str {
        if self.color_enabled { "•" } else { "-" }
    }

    // -------------------------------------------------------------------------
    // Tables (comfy-table)
    // -------------------------------------------------------------------------

    /// A borderless table for lists and key/value blocks
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(presets::NOTHING);
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    /// Bold when color is enabled
    pub fn header_cell(&self, content: impl Into<String>) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table so column widths stay correct
    pub fn colored_cell(&self, content: impl Into<String>, color: comfy_table::Color) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled { cell.fg(color) } else { cell }
    }

    /// A status cell describing a planned link
    pub fn health_cell(&self, health: &LinkHealth) -> Cell {
        use comfy_table::Color as C;
        match health {
            LinkHealth::Linked => self.colored_cell("linked", C::Green),
            LinkHealth::ViaParent => self.colored_cell("via parent", C::Green),
            LinkHealth::Merged => self.cell("directory"),
            LinkHealth::Missing => self.colored_cell("missing", C::Yellow),
            LinkHealth::Elsewhere { target } => {
                self.colored_cell(format!("→ {}", target.display()), C::Yellow)
            }
            LinkHealth::Dangling => self.colored_cell("dangling", C::Red),
            LinkHealth::Blocked => self.colored_cell("blocked by file", C::Red),
        }
    }

    // -------------------------------------------------------------------------
    // Spinners (indicatif)
    // -------------------------------------------------------------------------

    /// A spinner for longer operations; hidden when spinners are disabled
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        if !self.spinner_enabled {
            let pb = ProgressBar::hidden();
            pb.set_message(message);
            return pb;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Clear the spinner and print the outcome with the usual labels
    pub fn spinner_finish(&self, pb: &ProgressBar, ok: bool, msg: impl AsRef<str>) {
        pb.finish_and_clear();
        if ok {
            self.ok(msg);
        } else {
            self.err(msg);
        }
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}

impl Reporter for Ui {
    fn report(&mut self, action: &LinkAction, dry_run: bool) {
        let line = if dry_run {
            format!("{} {}", self.dim("[dry-run]"), action)
        } else {
            action.to_string()
        };

        match action {
            LinkAction::Skipped { .. } => self.warn(line),
            LinkAction::Kept { .. } => self.info(line),
            _ => self.println(line),
        }
    }
}
