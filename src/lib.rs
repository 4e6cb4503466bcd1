pub mod app;
pub mod acme;
pub mod config;
pub mod pki;
pub mod server;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
