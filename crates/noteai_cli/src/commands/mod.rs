pub mod note;
pub mod version;
