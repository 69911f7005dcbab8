//! Business operations. Each service is cheap to clone and owns handles to
//! the store and the blob store it needs.

pub mod image;
pub mod post;
pub mod user;

pub use image::ImageService;
pub use post::PostService;
pub use user::UserService;
