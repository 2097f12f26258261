//! Authentication: credentials, user lookup and the access gate

pub mod directory;
pub mod gate;
pub mod token;

pub use directory::{
    hash_password, hash_password_with_params, DirectoryError, InMemoryUserDirectory, UserDirectory,
    UserRecord,
};
pub use gate::{AccessGate, AuthContext};
pub use token::{Claims, Identity, IssuedToken, TokenError, TokenService};
