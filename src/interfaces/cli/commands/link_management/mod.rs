//! Link management commands

mod batch;
mod delete;
mod list;
mod resolve;
mod shorten;

pub use batch::batch_shorten;
pub use delete::delete_links;
pub use list::list_links;
pub use resolve::resolve_link;
pub use shorten::shorten_link;
