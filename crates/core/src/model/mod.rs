pub mod credentials;
mod ids;
mod player;
mod question;
mod user;

pub use credentials::CredentialError;
pub use ids::{ParseIdError, PlayerId, QuestionId, UserId};

pub use player::{AVATAR_TAGS, Player, PlayerError};
pub use question::{OPTION_COUNT, Question, QuestionDraft, QuestionError};
pub use user::{AuthProvider, AuthenticatedUser, GUEST_NAME, GuestUser, User, display_name_for};
