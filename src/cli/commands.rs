pub mod close;
pub mod import;
pub mod initdb;
pub mod list_lines;
pub mod resolve;
pub mod suggest;

pub use close::close_period;
pub use import::import_statement;
pub use initdb::init_database;
pub use list_lines::list_lines;
pub use resolve::{confirm_match, ignore_line};
pub use suggest::suggest_matches;
