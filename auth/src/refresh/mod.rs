pub mod errors;
pub mod factory;

pub use errors::RefreshTokenError;
pub use factory::GeneratedRefreshToken;
pub use factory::RefreshTokenFactory;
