mod auctioneer;
mod config;
mod registrar;
mod relay_mux;
pub mod scoring;
mod service;
mod unblinder;

pub use auctioneer::{AuctionResult, Auctioneer, BidParticipation};
pub use config::{Config, RegistrationMode};
pub use registrar::RelayRegistrar;
pub use relay_mux::RelayMux;
pub use service::{Service, ServiceHandle};
pub use unblinder::Unblinder;
