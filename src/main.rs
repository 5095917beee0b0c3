mod cache;
mod config;
mod constants;
mod error;
mod http;
mod info;
mod jp2;
mod params;
mod rational;
mod resolver;
mod router;
mod transform;

use std::sync::Arc;

use config::Config;
use info::InfoCache;
use resolver::{FilesystemResolver, Resolver};
use router::{Router, RouterConfig};
use transform::{Jp2Transformer, Transformer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "iiirs.toml".to_string());
    let config_text = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|e| format!("could not read config file {config_path}: {e}"))?;
    let config = Config::from_toml_str(&config_text)?;

    let resolver = Resolver::Filesystem(FilesystemResolver::new(
        config.resolver.src_img_root.clone(),
        params::Format::Jp2,
    ));
    let transformer = Transformer::Jp2(Jp2Transformer::new(config.transforms.jp2.decoder_path.clone()));

    let derivative_cache = config
        .loris
        .enable_caching
        .then(|| cache::DerivativeCache::new(config.img_cache.cache_dp.clone(), config.img_cache.cache_links.clone()));

    let router = Arc::new(Router {
        resolver,
        transformer,
        info_cache: InfoCache::new(config.info_cache.cache_dp.clone()),
        derivative_cache,
        config: RouterConfig { redirect_canonical_image_request: config.loris.redirect_canonical_image_request },
    });

    let app = http::build_app(router, config.loris.base_uri.clone());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
