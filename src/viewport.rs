use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        })
    }
}

/// Current display geometry in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square viewports count as horizontal.
    pub fn orientation(&self) -> Orientation {
        if self.width < self.height {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width = w.trim().parse().context("invalid viewport width")?;
        let height = h.trim().parse().context("invalid viewport height")?;
        Ok(Self { width, height })
    }
}

/// Reads the ambient display geometry. Answers may change between calls.
pub trait ViewportQuery {
    fn viewport(&self) -> Viewport;
}

impl ViewportQuery for Viewport {
    fn viewport(&self) -> Viewport {
        *self
    }
}

/// Geometry pushed by the host whenever the display resizes.
impl ViewportQuery for watch::Receiver<Viewport> {
    fn viewport(&self) -> Viewport {
        *self.borrow()
    }
}
