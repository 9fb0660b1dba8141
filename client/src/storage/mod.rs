pub mod file;
pub mod layout;
pub mod session;

pub use file::{Config, FileIoWithBackup};
pub use layout::LayoutStore;
pub use session::SessionStore;
