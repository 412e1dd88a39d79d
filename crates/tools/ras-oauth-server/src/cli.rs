use clap::Parser;

/// Serve the OAuth2 callback and validation routes
#[derive(Debug, Clone, Parser)]
#[command(name = "ras-oauth-server")]
#[command(about = "Serve the OAuth2 code exchange and token validation routes")]
#[command(version)]
pub struct Args {
    /// Interface to bind
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[arg(long)]
    pub permissive_cors: bool,
}

impl Args {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
