//! Users domain: participant documents, the profile tagged union, and the
//! session-scoped display-name directory.

pub mod directory;
pub mod models;
pub mod ops;

pub use directory::UserDirectory;
pub use models::{
    ratings_path, user_path, Profile, ReducedUser, User, UserLookup, INITIAL_RATING, USERS,
};
pub use ops::{clear_current_room, ensure_user, fetch_profile, set_current_room, touch};
