pub mod config;
pub mod dates;
pub mod gameindex;
pub mod grid;
pub mod http_cache;
pub mod http_client;
pub mod ids;
pub mod logging;
pub mod pbp;
pub mod rotation;
pub mod shots;
pub mod table;
