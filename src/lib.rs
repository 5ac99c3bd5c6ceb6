pub mod collage;
pub mod compositor;
pub mod config;
pub mod diary_parser;
pub mod error;
pub mod fetch;
pub mod film;
pub mod fonts;
pub mod handlers_collage;
pub mod handlers_diary;
pub mod handlers_wrapped;
pub mod layout;
pub mod placeholder;
pub mod poster_cache;
pub mod poster_resolver;
pub mod profile_parser;
pub mod user;
pub mod warp_helpers;
pub mod wrapped;
