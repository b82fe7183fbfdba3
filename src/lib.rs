#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::absolute_paths,
    clippy::arithmetic_side_effects,
    clippy::as_conversions,
    clippy::option_if_let_else,
    clippy::future_not_send,
    clippy::implicit_return,
    clippy::indexing_slicing,
    clippy::inline_always,
    clippy::min_ident_chars,
    clippy::missing_assert_message,
    clippy::missing_errors_doc,
    clippy::missing_trait_methods,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::non_ascii_literal,
    clippy::single_char_lifetime_names,
    clippy::pattern_type_mismatch,
    clippy::pub_use,
    clippy::question_mark_used,
    clippy::ref_patterns,
    clippy::self_named_module_files,
    clippy::shadow_reuse,
    clippy::shadow_unrelated,
    clippy::similar_names,
    clippy::single_call_fn,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::string_add,
    clippy::unseparated_literal_suffix,
    clippy::wildcard_enum_match_arm,
    non_snake_case,
)]

pub mod api;
pub mod config;
pub mod db;
pub mod harvest;
pub mod model;
pub mod scrape;
pub mod targets;
pub mod util;
