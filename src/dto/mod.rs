//! Wire shapes exchanged with the backend.

pub mod auth;
pub mod bout;
pub mod fighter;

pub use auth::{LoginRequest, LoginResponse, Role, UserClaims};
pub use bout::{Bout, BoutId, BoutStatus};
pub use fighter::{Fighter, FighterForm, FighterId, FighterPayload, FighterRecord, WeightClass};
