pub mod app;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod stats;
pub mod trace;

#[cfg(test)]
mod test;
