pub mod api_key;
pub mod category;
pub mod google_token;
pub mod invite;
pub mod member;
pub mod project;
pub mod resource;
pub mod subtask;
pub mod task;
pub mod user;

pub use api_key::ApiKey;
pub use category::{Category, Subcategory};
pub use google_token::GoogleToken;
pub use invite::ProjectInvite;
pub use member::{MemberWithUser, ProjectMember};
pub use project::Project;
pub use resource::{Resource, ResourceWithCategory};
pub use subtask::Subtask;
pub use task::Task;
pub use user::User;
