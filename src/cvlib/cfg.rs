use crate::{
    file_util::{self, DEFAULT_HOMEDIR},
    result::{to_cv, CvError, CvResult},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

const CFG_DEFAULT: &str = r#"
    # seconds to wait for a remote image source before giving up
    http_timeout_secs = 120
    # truetype file used for category labels, system fonts are probed if unset
    # label_font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"
    "#;

pub fn get_default_cfg() -> Cfg {
    toml::from_str(CFG_DEFAULT).expect("default config broken")
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("cv_cfg.toml")
}

pub fn get_cfg() -> CvResult<Cfg> {
    let cfg_toml_path = get_cfg_path();
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        toml::from_str(&toml_str).map_err(to_cv)
    } else {
        Ok(get_default_cfg())
    }
}

pub fn write_cfg(cfg: &Cfg) -> CvResult<()> {
    let cfg_path = get_cfg_path();
    if let Some(cfg_parent) = cfg_path.parent() {
        fs::create_dir_all(cfg_parent).map_err(to_cv)?;
    }
    let cfg_str = toml::to_string_pretty(cfg).map_err(to_cv)?;
    fs::write(&cfg_path, cfg_str).map_err(to_cv)
}

pub fn get_log_folder() -> CvResult<PathBuf> {
    get_cfg_path()
        .parent()
        .map(|p| p.join("logs"))
        .ok_or_else(|| CvError::new("the cfg file needs a parent"))
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Cfg {
    http_timeout_secs: Option<u64>,
    pub label_font_path: Option<String>,
}
impl Cfg {
    pub fn http_timeout(&self) -> Duration {
        let default = 120;
        Duration::from_secs(self.http_timeout_secs.unwrap_or(default))
    }
}

#[test]
fn test_default_cfg() {
    let cfg = get_default_cfg();
    assert_eq!(cfg.http_timeout(), Duration::from_secs(120));
    assert_eq!(cfg.label_font_path, None);
}
