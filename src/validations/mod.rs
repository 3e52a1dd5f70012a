mod short_link;

pub use short_link::{
    enforce_https, is_self_referential, parse_target_url, validate_custom_short,
};
