#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod game_service;
pub mod identity;
pub mod login_limiter;
pub mod profile_service;
pub mod ticker;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use auth_service::{AuthEvent, AuthService};
pub use config::{IdentityConfig, LoginLimits, QuizConfig};
pub use error::{AppServicesError, AuthError, ConfigError, GameError, IdentityError, ProfileError};
pub use game_loop::{GameEvent, GameLoop, GameOutcome, PlayerInput};
pub use game_service::GameService;
pub use identity::{
    IdentityProvider, LocalIdentityProvider, OtpKind, RestIdentityProvider, Session,
    UserAttributes,
};
pub use profile_service::{ProfileService, UserStats};
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
