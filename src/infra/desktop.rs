//! OS integrations: browser, clipboard, wall clock.

use anyhow::{Context, Result};

use crate::infra::contracts::{ClipboardWriter, Clock, ExternalOpener};

#[derive(Debug, Clone, Default)]
pub struct BrowserOpener;

impl ExternalOpener for BrowserOpener {
    fn open(&self, target: &str) -> Result<()> {
        open::that(target).with_context(|| format!("failed to open {target}"))
    }
}

#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn copy_text(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard
            .set_text(text.to_owned())
            .context("failed to write clipboard")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
