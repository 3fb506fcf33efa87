//! Domain models for the workflow API.

pub mod activity;
pub mod comment;
pub mod notification;
pub mod request;
pub mod user;

pub use activity::{Activity, ActivityView, NewActivity};
pub use comment::{Comment, CommentView, NewComment};
pub use notification::NotificationEntry;
pub use request::{
    AssigneeChange, FieldValue, NewRequest, RemovableField, Request, RequestPatch, RequestUpdate,
    RequestView,
};
pub use user::{CurrentUser, NewUser, UserRecord, UserSummary};
