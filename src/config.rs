//! Configuration file shape, loaded from TOML via `toml`/`serde`. Loading
//! itself (picking a path, environment overlay, CLI flags) is a binding
//! concern, not a core one; this module only defines what a config file may
//! say.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub loris: LorisConfig,
    pub resolver: ResolverConfig,
    pub transforms: TransformsConfig,
    pub img_cache: ImgCacheConfig,
    pub info_cache: InfoCacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LorisConfig {
    pub tmp_dp: PathBuf,
    pub base_uri: String,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    #[serde(default)]
    pub redirect_canonical_image_request: bool,
    #[serde(default)]
    pub redirect_id_slash_to_info: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    #[serde(rename = "impl")]
    pub impl_: String,
    pub src_img_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformsConfig {
    pub jp2: Jp2TransformConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jp2TransformConfig {
    pub decoder_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgCacheConfig {
    pub cache_dp: PathBuf,
    pub cache_links: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoCacheConfig {
    pub cache_dp: PathBuf,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config_file() {
        let toml = r#"
            [loris]
            tmp_dp = "/tmp/iiirs"
            base_uri = "http://example.org/iiif"

            [resolver]
            impl = "filesystem"
            src_img_root = "/data/images"

            [transforms.jp2]
            decoder_path = "/usr/bin/opj_decompress"

            [img_cache]
            cache_dp = "/data/cache/img"
            cache_links = "/data/cache/links"

            [info_cache]
            cache_dp = "/data/cache/info"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.loris.enable_caching);
        assert!(!config.loris.redirect_canonical_image_request);
        assert_eq!(config.resolver.impl_, "filesystem");
    }
}
