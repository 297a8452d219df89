//! The sampler override is keyed on the variable's presence, not its value

use reid_config::config::{sampler_override_present, SAMPLER_OVERRIDE_ENV};

#[test]
fn test_presence_not_content() {
    std::env::remove_var(SAMPLER_OVERRIDE_ENV);
    assert!(!sampler_override_present());

    std::env::set_var(SAMPLER_OVERRIDE_ENV, "");
    assert!(sampler_override_present());

    std::env::set_var(SAMPLER_OVERRIDE_ENV, "0");
    assert!(sampler_override_present());

    std::env::remove_var(SAMPLER_OVERRIDE_ENV);
    assert!(!sampler_override_present());
}
