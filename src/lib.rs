pub mod config;
pub mod coordinator;
pub mod cumulative;
pub mod dedup;
pub mod fighter_page;
pub mod http_cache;
pub mod http_client;
pub mod match_history;
pub mod match_record;
pub mod pipeline;
pub mod reconstruct;
pub mod report;
pub mod scrape;
pub mod snapshot;
pub mod stats_store;
