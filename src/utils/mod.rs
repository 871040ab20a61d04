pub mod db_utils;
pub mod username_filter;
