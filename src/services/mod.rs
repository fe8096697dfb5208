pub mod api_server;
pub mod directory;
pub mod registrar;
