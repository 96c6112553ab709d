mod metavoxel_server;
pub use metavoxel_server::MetavoxelServer;

mod server_config;
pub use server_config::ServerConfig;
