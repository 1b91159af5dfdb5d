// MIT License - Copyright (c) 2026 Peter Wright
// TCP transports to and from the panel

pub mod command;
pub mod listener;

pub use command::CommandCorrelator;
pub use listener::PanelListener;
