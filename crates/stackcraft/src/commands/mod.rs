pub mod auth;
pub mod destroy;
pub mod kinds;
pub mod outputs;
pub mod preview;
pub mod up;
