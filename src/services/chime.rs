use std::io::{self, Write};

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChimeKind {
    Top,
    Half,
}

impl ChimeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChimeKind::Top => "top of the hour",
            ChimeKind::Half => "half past",
        }
    }
}

pub trait ChimePlayer {
    fn play_chime(&self, kind: ChimeKind);
}

/// Rings the terminal bell: twice on the hour, once on the half hour.
pub struct TerminalBell;

impl ChimePlayer for TerminalBell {
    fn play_chime(&self, kind: ChimeKind) {
        info!(kind = kind.label(), "chime");
        if let Err(err) = ring(&mut io::stderr(), kind) {
            debug!(error = %err, "terminal bell not delivered");
        }
    }
}

fn ring(out: &mut impl Write, kind: ChimeKind) -> io::Result<()> {
    let bell: &[u8] = match kind {
        ChimeKind::Top => b"\x07\x07",
        ChimeKind::Half => b"\x07",
    };
    out.write_all(bell)?;
    out.flush()
}

pub struct Muted;

impl ChimePlayer for Muted {
    fn play_chime(&self, _kind: ChimeKind) {}
}
