//! Mattel Intellivision.
//!
//! Wires the CP1610, the STIC, the AY-3-8914 PSG and the hand
//! controllers into a [`Machine`](emu_core::Machine), with the
//! Entertainment Computer System (second PSG, extra RAM, paged ROM,
//! keyboard) and the Intellivoice (SP0256) as optional add-ons.

mod bus;
mod config;
mod input;
mod intellivision;

pub use bus::{Ecs, IntvBus};
pub use config::IntellivisionConfig;
pub use input::{Keyboard, buttons, controller_code};
pub use intellivision::{
    CPU_HZ, ECS_KEYBOARD, Intellivision, LEFT_CONTROLLER, PSG_HZ, RIGHT_CONTROLLER,
};
