//! Simulation state with no terminal dependency: the virtual file system,
//! window bookkeeping, the desktop apps and the phone device.

pub mod calculator;
pub mod context;
pub mod ctf;
pub mod explorer;
pub mod notepad;
pub mod paint;
pub mod path;
pub mod phone;
pub mod security;
pub mod shell;
pub mod store;
pub mod vfs;
pub mod window;
