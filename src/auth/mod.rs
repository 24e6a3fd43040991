// Public API
pub use models::{AccessClaims, Principal};
pub use service::{AuthService, JwtAuthService, TokenConfig};

// Internal modules
mod models;
mod service;
