//! Mutation Gateway

pub mod gateway;

pub use gateway::MutationGateway;
