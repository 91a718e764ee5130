//! Config env-var fallback
//!
//! Lives in its own test binary because it mutates `DESVIO_CONFIG`.

use std::io::Write;

use desvio_review::config::CONFIG_ENV_VAR;
use desvio_review::{MarkerSet, ReviewConfig};

#[test]
fn bad_env_config_falls_back_to_defaults() {
    // Points at nothing
    std::env::set_var(CONFIG_ENV_VAR, "/definitely/not/here/desvio_config.toml");
    assert_eq!(ReviewConfig::load(), ReviewConfig::default());

    // Exists but does not validate
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[clock]\nutc_offset_hours = 40").expect("write");
    std::env::set_var(CONFIG_ENV_VAR, file.path());
    assert_eq!(ReviewConfig::load(), ReviewConfig::default());

    // A good file is picked up
    let mut good = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(good, "[classifier]\nmarkers = \"exact\"").expect("write");
    std::env::set_var(CONFIG_ENV_VAR, good.path());
    assert_eq!(ReviewConfig::load().classifier.markers, MarkerSet::Exact);

    std::env::remove_var(CONFIG_ENV_VAR);
}
