pub mod composer;
pub mod media;
pub mod pagination;
pub mod slug;

pub use composer::ProductQuery;
pub use pagination::{Page, PageRequest};
pub use slug::slugify;
