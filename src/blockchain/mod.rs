pub mod zksync_client;
