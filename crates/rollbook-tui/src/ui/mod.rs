//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, status bar and overlays
//! - `input`: keyboard event handling
//! - `styles`: color palette and text styling
//! - `tabs`: the student and teacher listings

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
