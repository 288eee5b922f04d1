pub mod page;
pub mod previews;
pub mod sessions;
