pub mod group_api;
