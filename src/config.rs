use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::thread;
use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 1234;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "In-memory movie catalogue over HTTP", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[clap(long, env = "REEL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[clap(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON array of movies to preload instead of the bundled dataset
    #[clap(long, env = "REEL_SEED")]
    pub seed: Option<PathBuf>,

    /// Runtime worker threads (defaults to the number of logical cores)
    #[clap(long, env = "REEL_WORKERS")]
    pub workers: Option<usize>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid listen host '{0}'")]
    InvalidHost(String),

    #[error("worker thread count must be at least 1")]
    NoWorkers,
}

impl Config {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn worker_threads(&self) -> Result<usize, ConfigError> {
        match self.workers {
            Some(0) => Err(ConfigError::NoWorkers),
            Some(n) => Ok(n),
            None => Ok(thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("reel").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn explicit_flags() {
        let cfg = parse(&["--host", "127.0.0.1", "--port", "8080", "--workers", "2", "--seed", "m.json"]);
        assert_eq!(cfg.socket_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.worker_threads().unwrap(), 2);
        assert_eq!(cfg.seed, Some(PathBuf::from("m.json")));
    }

    #[test]
    fn ipv6_host() {
        let cfg = parse(&["--host", "::1", "--port", "9000"]);
        assert_eq!(cfg.socket_addr().unwrap(), "[::1]:9000".parse().unwrap());
    }

    #[test]
    fn rejects_bad_host() {
        let cfg = parse(&["--host", "not-an-ip"]);
        assert!(matches!(cfg.socket_addr(), Err(ConfigError::InvalidHost(_))));
    }

    #[test]
    fn rejects_zero_workers() {
        let cfg = parse(&["--workers", "0"]);
        assert!(matches!(cfg.worker_threads(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn auto_workers() {
        let cfg = parse(&["--workers", "3"]);
        assert_eq!(cfg.worker_threads().unwrap(), 3);
        let cfg = Config { workers: None, ..cfg };
        assert!(cfg.worker_threads().unwrap() >= 1);
    }
}
