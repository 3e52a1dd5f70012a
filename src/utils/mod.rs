pub mod short_code;

pub use short_code::generate_short_code;
