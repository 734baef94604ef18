//! Type-state builder for `Panel`.
//!
//! The builder enforces at compile time that a message bus and a display are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use pourer_traits::clock::{Clock, MonotonicClock};

use crate::bus::MessageBus;
use crate::config::PanelCfg;
use crate::error::{BuildError, Result};
use crate::panel::Panel;
use crate::view::Display;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Panel`. The config is validated on `build()`.
pub struct PanelBuilder<B, D, SB = Missing, SD = Missing> {
    bus: Option<B>,
    display: Option<D>,
    cfg: Option<PanelCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _sb: PhantomData<SB>,
    _sd: PhantomData<SD>,
}

impl<B, D> Default for PanelBuilder<B, D, Missing, Missing> {
    fn default() -> Self {
        Self {
            bus: None,
            display: None,
            cfg: None,
            clock: None,
            _sb: PhantomData,
            _sd: PhantomData,
        }
    }
}

impl<B: MessageBus, D: Display> Panel<B, D> {
    /// Start building a Panel.
    pub fn builder() -> PanelBuilder<B, D, Missing, Missing> {
        PanelBuilder::default()
    }
}

fn validate(cfg: &PanelCfg) -> Result<()> {
    if cfg.max_units == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_units must be >= 1",
        )));
    }
    if cfg.default_units == 0 || cfg.default_units > cfg.max_units {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "default_units must be in [1, max_units]",
        )));
    }
    if cfg.min_steps_before_end < 3 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "min_steps_before_end must be >= 3",
        )));
    }
    if cfg.default_automatic_units == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "default_automatic_units must be >= 1",
        )));
    }
    if cfg.default_start_at_min == 0 || cfg.default_every_min == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "schedule defaults must be >= 1 minute",
        )));
    }
    Ok(())
}

impl<B: MessageBus, D: Display, SB, SD> PanelBuilder<B, D, SB, SD> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Panel<B, D>> {
        let bus = self
            .bus
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBus))?;
        let display = self
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Panel::from_parts(bus, display, cfg, clock))
    }
}

/// Chainable setters that do not affect type-state.
impl<B, D, SB, SD> PanelBuilder<B, D, SB, SD> {
    pub fn with_cfg(mut self, cfg: PanelCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(Arc::from(clock));
        self
    }
    /// Share the clock the station and devices already use.
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<B, D, SD> PanelBuilder<B, D, Missing, SD> {
    pub fn with_bus(self, bus: B) -> PanelBuilder<B, D, Set, SD> {
        PanelBuilder {
            bus: Some(bus),
            display: self.display,
            cfg: self.cfg,
            clock: self.clock,
            _sb: PhantomData,
            _sd: PhantomData,
        }
    }
}

impl<B, D, SB> PanelBuilder<B, D, SB, Missing> {
    pub fn with_display(self, display: D) -> PanelBuilder<B, D, SB, Set> {
        PanelBuilder {
            bus: self.bus,
            display: Some(display),
            cfg: self.cfg,
            clock: self.clock,
            _sb: PhantomData,
            _sd: PhantomData,
        }
    }
}

impl<B: MessageBus, D: Display> PanelBuilder<B, D, Set, Set> {
    /// Validate and build the Panel. Only available when bus and display are set.
    pub fn build(self) -> Result<Panel<B, D>> {
        self.try_build()
    }
}
