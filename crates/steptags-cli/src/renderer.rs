//! Terminal rendering of markdown output
//!
//! Output from the core display types is markdown. With color enabled it is
//! styled with termimad; otherwise it is printed as-is. Workspace notices go
//! to stderr so that stdout stays parseable.

use anyhow::Result;
use steptags_core::{Notice, NoticeLevel};
use termimad::{crossterm::style::Color, MadSkin};

/// Terminal renderer that can switch between rich and plain text output
pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Cyan);
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::DarkGrey);
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    /// Print markdown to stdout.
    pub fn render(&self, markdown: &str) -> Result<()> {
        if !self.rich_enabled {
            print!("{markdown}");
            return Ok(());
        }
        for line in markdown.lines() {
            if line.starts_with('#') {
                // Keep the hashes visible so nesting stays readable
                println!("\x1b[36m{line}\x1b[0m");
            } else {
                self.skin.print_inline(line);
                println!();
            }
        }
        Ok(())
    }

    /// Print notices to stderr, errors highlighted.
    pub fn notices(&self, notices: &[Notice]) {
        for notice in notices {
            match (notice.level, self.rich_enabled) {
                (NoticeLevel::Error, true) => eprintln!("\x1b[31m{notice}\x1b[0m"),
                _ => eprintln!("{notice}"),
            }
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_renderer() {
        let renderer = TerminalRenderer::new(false);
        assert!(!renderer.rich_enabled);
        assert!(renderer.render("## Heading\n").is_ok());
    }

    #[test]
    fn test_default_is_rich() {
        let renderer = TerminalRenderer::default();
        assert!(renderer.rich_enabled);
    }
}
