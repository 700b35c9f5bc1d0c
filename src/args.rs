use std::{net::SocketAddr, path::PathBuf};

#[derive(clap::Parser, Debug, Default)]
#[command(rename_all = "snake_case", version, about)]
pub struct Arguments {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(long = "config.file", env = "SSV_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Address to listen on, overriding `server.listen`.
    #[arg(long, env = "SSV_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Port to listen on, overriding the port of `server.listen`.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}
