pub mod claims;
pub mod codec;
pub mod errors;

pub use claims::AccessClaims;
pub use claims::IssuedAccessToken;
pub use codec::AccessTokenCodec;
pub use errors::TokenError;
