//! API request handlers

pub mod health;
pub mod scrape;
pub mod socket;

pub use health::health;
pub use scrape::{
    get_task, prioritize, scrape_apple_store, scrape_google_play, scrape_google_search,
    scrape_reddit, start_scrape,
};
pub use socket::task_socket;
