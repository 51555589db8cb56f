pub mod filenames;
pub mod html;
pub mod timezone;

pub use timezone::{format_date, format_timestamp, now_in};
